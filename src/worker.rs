use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::WorkerSettings;
use crate::db;
use crate::email::{MailTransport, OutgoingEmail};
use crate::error::SendError;
use crate::models::OutboxMessage;

/// Drains the email outbox: each tick sends the oldest eligible messages one
/// at a time and records the outcome on each row.
pub struct DeliveryWorker {
    pool: PgPool,
    transport: Arc<dyn MailTransport>,
    settings: WorkerSettings,
    wake: Arc<Notify>,
}

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub fetched: usize,
    pub sent: usize,
    pub failed: usize,
    pub exhausted: usize,
}

enum Outcome {
    Sent,
    Failed { exhausted: bool },
    Unrecorded,
}

impl DeliveryWorker {
    pub fn new(pool: PgPool, transport: Arc<dyn MailTransport>, settings: WorkerSettings) -> Self {
        Self {
            pool,
            transport,
            settings,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Signal that wakes the running loop before its next scheduled tick.
    /// Hand it to [`crate::outbox::Outbox::with_wake_signal`].
    pub fn wake_signal(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Run one drain pass. Only a failure to fetch the batch is returned;
    /// per-message failures are recorded on their rows.
    pub async fn run_tick(&self) -> Result<TickReport, sqlx::Error> {
        let batch = db::email_outbox::fetch_eligible(
            &self.pool,
            self.settings.max_attempts,
            self.settings.batch_size,
        )
        .await?;

        let mut report = TickReport {
            fetched: batch.len(),
            ..TickReport::default()
        };

        if batch.is_empty() {
            return Ok(report);
        }

        tracing::info!("Found {} emails to send", batch.len());

        for message in &batch {
            match self.deliver(message).await {
                Outcome::Sent => report.sent += 1,
                Outcome::Failed { exhausted } => {
                    report.failed += 1;
                    if exhausted {
                        report.exhausted += 1;
                    }
                }
                Outcome::Unrecorded => {}
            }
        }

        Ok(report)
    }

    async fn deliver(&self, message: &OutboxMessage) -> Outcome {
        let email = OutgoingEmail {
            to: message.to_addr.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
        };

        tracing::info!("Sending email {} to {}: {}", message.id, email.to, email.subject);

        let send = self.transport.send(&email);
        let result = match tokio::time::timeout(self.settings.send_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(SendError::from(format!(
                "Send timed out after {:?}",
                self.settings.send_timeout
            ))),
        };

        match result {
            Ok(()) => match db::email_outbox::mark_sent(&self.pool, message.id).await {
                Ok(_) => {
                    tracing::info!("Email {} sent successfully to {}", message.id, email.to);
                    Outcome::Sent
                }
                Err(e) => {
                    // The row stays eligible, so the message will be sent again.
                    tracing::error!("Email {} was sent but could not be marked sent: {e}", message.id);
                    Outcome::Unrecorded
                }
            },
            Err(err) => {
                tracing::error!("Failed to send email {} to {}: {err}", message.id, email.to);

                let stored = truncate_error(&err.message, self.settings.max_error_len);
                match db::email_outbox::mark_failed(&self.pool, message.id, &stored).await {
                    Ok(false) => {
                        tracing::warn!(
                            "Email {} was already marked sent; failure not recorded",
                            message.id
                        );
                        Outcome::Unrecorded
                    }
                    Ok(true) => {
                        let exhausted = message.attempts + 1 >= self.settings.max_attempts;
                        if exhausted {
                            tracing::warn!(
                                "Email {} to {} exhausted after {} attempts; giving up",
                                message.id,
                                email.to,
                                message.attempts + 1
                            );
                        }
                        Outcome::Failed { exhausted }
                    }
                    Err(e) => {
                        tracing::error!("Failed to record failure for email {}: {e}", message.id);
                        Outcome::Unrecorded
                    }
                }
            }
        }
    }

    /// Spawn the polling loop. The first pass runs immediately; after that
    /// one pass per interval, or sooner when the wake signal fires. Passes
    /// never overlap.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        WorkerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Starting email polling (interval: {}ms, batch: {}, max attempts: {})",
            self.settings.poll_interval.as_millis(),
            self.settings.batch_size,
            self.settings.max_attempts
        );

        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
                _ = shutdown.changed() => break,
            }

            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.run_tick().await {
                tracing::error!("Error processing emails: {e}");
            }
        }

        tracing::info!("Email polling stopped");
    }
}

/// Owns the running delivery loop.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Cancel the timer and wait for an in-flight pass to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Delivery worker task ended abnormally: {e}");
        }
    }
}

/// Cap a stored error message at `max_chars` characters.
pub fn truncate_error(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
