//! In-memory row source for testing.

use crate::application::ports::{QueryError, RowSource};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
enum Reply {
    Rows(Vec<Value>),
    Fail(String),
}

/// Row source that records every query and answers with canned rows.
///
/// Clones share the recorded history, so a test can keep one clone to assert
/// on while the router owns another.
#[derive(Debug, Clone)]
pub struct MockRowSource {
    reply: Arc<Reply>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockRowSource {
    /// Answer every query with `rows`.
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self::from_reply(Reply::Rows(rows))
    }

    /// Fail every query with a database error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_reply(Reply::Fail(message.into()))
    }

    fn from_reply(reply: Reply) -> Self {
        Self {
            reply: Arc::new(reply),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// SQL text of every query received, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .expect("MockRowSource mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Number of queries received.
    pub fn query_count(&self) -> usize {
        self.executed
            .lock()
            .expect("MockRowSource mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }
}

impl Default for MockRowSource {
    fn default() -> Self {
        Self::with_rows(Vec::new())
    }
}

#[async_trait]
impl RowSource for MockRowSource {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Value>, QueryError> {
        self.executed
            .lock()
            .expect("MockRowSource mutex poisoned - a test thread panicked while holding the lock")
            .push(sql.to_string());

        match self.reply.as_ref() {
            Reply::Rows(rows) => Ok(rows.clone()),
            Reply::Fail(message) => Err(QueryError::Database(message.clone())),
        }
    }
}
