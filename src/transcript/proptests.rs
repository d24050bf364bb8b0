//! Property-based tests for the transcript

use super::*;
use proptest::prelude::*;

fn arb_entry() -> impl Strategy<Value = Entry> {
    prop_oneof![
        "[a-zA-Z ]{0,20}".prop_map(Entry::user),
        "[a-zA-Z ]{0,20}".prop_map(Entry::assistant),
        "[a-zA-Z ]{0,20}".prop_map(Entry::system),
        Just(Entry::tool(Vec::new())),
    ]
}

proptest! {
    // The entries at any point are a prefix of the entries at any later point
    #[test]
    fn prop_history_is_prefix_of_future(entries in proptest::collection::vec(arb_entry(), 0..30)) {
        let mut history = vec![ConversationState::new()];
        for entry in entries {
            let next = history[history.len() - 1].append(entry);
            history.push(next);
        }

        for (t, earlier) in history.iter().enumerate() {
            for later in &history[t..] {
                let prefix = &later.entries()[..earlier.entries().len()];
                prop_assert_eq!(prefix, earlier.entries());
            }
        }
    }

    #[test]
    fn prop_append_grows_by_exactly_one(
        seed in proptest::collection::vec(arb_entry(), 0..10),
        entry in arb_entry(),
    ) {
        let state = ConversationState::from_entries(ConversationId::new(), seed);
        let before = state.clone();
        let next = state.append(entry.clone());

        prop_assert_eq!(&state, &before);
        prop_assert_eq!(next.entries().len(), state.entries().len() + 1);
        prop_assert_eq!(next.entries().last(), Some(&entry));
    }

    #[test]
    fn prop_shared_transcript_matches_pure_appends(entries in proptest::collection::vec(arb_entry(), 0..20)) {
        let initial = ConversationState::new();
        let shared = SharedTranscript::new(initial.clone());
        let mut expected = initial;
        for entry in entries {
            expected = expected.append(entry.clone());
            let published = shared.append(entry);
            prop_assert_eq!(published.as_ref(), &expected);
        }
    }
}
