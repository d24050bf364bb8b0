//! Database module for the stock assistant
//!
//! Provides persistence for chats. A chat row stores the whole transcript
//! as JSON; rows are only ever replaced, never partially updated.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Malformed stored chat {id}: {source}")]
    Malformed {
        id: String,
        source: serde_json::Error,
    },
    #[error("Failed to encode chat: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Chat {0} belongs to another user")]
    NotOwner(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Chat Operations ====================

    /// Insert or replace a chat.
    ///
    /// `created_at` is kept from the first save. A chat id owned by a
    /// different user is never overwritten.
    pub fn save_chat(&self, chat: &Chat) -> DbResult<()> {
        let messages = serde_json::to_string(&chat.messages)?;
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let changed = conn.execute(
            "INSERT INTO chats (id, user_id, title, path, messages, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                path = excluded.path,
                messages = excluded.messages,
                updated_at = excluded.updated_at
             WHERE chats.user_id = excluded.user_id",
            params![
                chat.id,
                chat.user_id,
                chat.title,
                chat.path,
                messages,
                chat.created_at.to_rfc3339(),
                now.to_rfc3339()
            ],
        )?;

        if changed == 0 {
            return Err(DbError::NotOwner(chat.id.clone()));
        }
        Ok(())
    }

    /// Get a chat by id, only if it belongs to `user_id`
    pub fn get_chat(&self, id: &str, user_id: &str) -> DbResult<Option<Chat>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, user_id, title, path, messages, created_at
                 FROM chats WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, user_id, title, path, messages, created_at)) = row else {
            return Ok(None);
        };

        let messages = serde_json::from_str(&messages).map_err(|source| DbError::Malformed {
            id: id.clone(),
            source,
        })?;

        Ok(Some(Chat {
            id,
            title,
            user_id,
            created_at: parse_datetime(&created_at),
            messages,
            path,
        }))
    }

    /// List a user's chats, most recently updated first
    pub fn list_chats(&self, user_id: &str) -> DbResult<Vec<ChatSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, path, created_at FROM chats
             WHERE user_id = ?1
             ORDER BY updated_at DESC, created_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ChatSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                path: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete a chat owned by `user_id`; returns whether a row was removed
    pub fn delete_chat(&self, id: &str, user_id: &str) -> DbResult<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM chats WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(removed > 0)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
