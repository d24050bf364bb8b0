//! Progressive UI values
//!
//! A `StreamableUi` writer publishes any number of `update`s followed by
//! exactly one `complete`. The paired `UiStream` yields those frames in
//! order and ends after the terminal one.

use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// One observed display state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "frame", content = "value", rename_all = "snake_case")]
pub enum UiFrame<T> {
    Update(T),
    Done(T),
}

impl<T> UiFrame<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, UiFrame::Done(_))
    }

    pub fn value(&self) -> &T {
        match self {
            UiFrame::Update(value) | UiFrame::Done(value) => value,
        }
    }
}

/// Create a connected writer and reader
pub fn streamable<T>() -> (StreamableUi<T>, UiStream<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StreamableUi { tx }, UiStream { rx, finished: false })
}

/// Writer half. `complete` consumes it, so no frame can follow the
/// terminal one.
pub struct StreamableUi<T> {
    tx: mpsc::UnboundedSender<UiFrame<T>>,
}

impl<T> StreamableUi<T> {
    pub fn update(&self, value: T) {
        // A dropped reader only means nobody is watching
        let _ = self.tx.send(UiFrame::Update(value));
    }

    pub fn complete(self, value: T) {
        let _ = self.tx.send(UiFrame::Done(value));
    }
}

/// Reader half; finite and not restartable
pub struct UiStream<T> {
    rx: mpsc::UnboundedReceiver<UiFrame<T>>,
    finished: bool,
}

impl<T> Stream for UiStream<T> {
    type Item = UiFrame<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(frame)) => {
                if frame.is_done() {
                    self.finished = true;
                    self.rx.close();
                }
                Poll::Ready(Some(frame))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Unpin for UiStream<T> {}
