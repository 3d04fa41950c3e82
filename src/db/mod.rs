pub mod email_outbox;
