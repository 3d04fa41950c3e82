use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Notify;

use crate::config::Config;
use crate::db;
use crate::email::templates;
use crate::error::AppError;
use crate::models::OutboxMessage;

/// Producer side of the email outbox.
///
/// Inserts are not tied to the caller's business transaction: an insert
/// failure is returned to the caller and nothing is retried here.
#[derive(Clone)]
pub struct Outbox {
    pool: PgPool,
    wake: Option<Arc<Notify>>,
    frontend_base_url: String,
    staff_notify_email: Option<String>,
}

impl Outbox {
    pub fn new(pool: PgPool, frontend_base_url: impl Into<String>) -> Self {
        Self {
            pool,
            wake: None,
            frontend_base_url: frontend_base_url.into(),
            staff_notify_email: None,
        }
    }

    /// Producer wired to the configured reset-link base URL and staff
    /// notice recipient.
    pub fn from_config(pool: PgPool, config: &Config) -> Self {
        Self::new(pool, config.frontend_base_url.clone())
            .with_staff_notify_email(config.staff_notify_email.clone())
    }

    pub fn with_staff_notify_email(mut self, email: Option<String>) -> Self {
        self.staff_notify_email = email;
        self
    }

    /// Ping the delivery worker after each insert instead of waiting for
    /// its next poll.
    pub fn with_wake_signal(mut self, wake: Arc<Notify>) -> Self {
        self.wake = Some(wake);
        self
    }

    pub async fn enqueue(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<OutboxMessage, AppError> {
        if to.trim().is_empty() {
            return Err(AppError::BadRequest("Recipient address is empty".to_string()));
        }

        let message = db::email_outbox::insert(&self.pool, to.trim(), subject, body).await?;
        tracing::debug!("Queued email {} to {}: {}", message.id, message.to_addr, subject);

        if let Some(wake) = &self.wake {
            wake.notify_one();
        }

        Ok(message)
    }

    pub async fn queue_welcome(
        &self,
        email: &str,
        first_name: Option<&str>,
    ) -> Result<OutboxMessage, AppError> {
        let (subject, body) = templates::render_welcome(first_name);
        self.enqueue(email, &subject, &body).await
    }

    pub async fn queue_password_reset(
        &self,
        email: &str,
        reset_token: &str,
    ) -> Result<OutboxMessage, AppError> {
        let (subject, body) = templates::render_password_reset(&self.frontend_base_url, reset_token);
        self.enqueue(email, &subject, &body).await
    }

    /// Notify staff of a new ticket. Returns `None` when no staff address is
    /// configured.
    pub async fn queue_ticket_created(
        &self,
        creator_email: &str,
        title: &str,
        description: &str,
    ) -> Result<Option<OutboxMessage>, AppError> {
        let Some(staff) = self.staff_notify_email.as_deref() else {
            return Ok(None);
        };
        let (subject, body) = templates::render_ticket_created(creator_email, title, description);
        self.enqueue(staff, &subject, &body).await.map(Some)
    }

    pub async fn queue_status_changed(
        &self,
        owner_email: &str,
        title: &str,
        old_status: &str,
        new_status: &str,
    ) -> Result<OutboxMessage, AppError> {
        let (subject, body) = templates::render_status_changed(title, old_status, new_status);
        self.enqueue(owner_email, &subject, &body).await
    }

    pub async fn queue_assignment_changed(
        &self,
        owner_email: &str,
        title: &str,
        assignee_email: Option<&str>,
    ) -> Result<OutboxMessage, AppError> {
        let (subject, body) = templates::render_assignment_changed(title, assignee_email);
        self.enqueue(owner_email, &subject, &body).await
    }
}
