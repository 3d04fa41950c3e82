use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A queued notification email. Rows are written by producers and mutated
/// only by the delivery worker.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub to_addr: String,
    pub subject: String,
    pub body: String,
    pub sent: bool,
    pub attempts: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    pub fn is_eligible(&self, max_attempts: i32) -> bool {
        !self.sent && self.attempts < max_attempts
    }

    /// Unsent and out of retries. Only the stored `error` explains why.
    pub fn is_exhausted(&self, max_attempts: i32) -> bool {
        !self.sent && self.attempts >= max_attempts
    }
}

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct OutboxStats {
    pub pending: i64,
    pub sent: i64,
    pub exhausted: i64,
}
