pub mod outbox_message;

pub use outbox_message::{OutboxMessage, OutboxStats};
