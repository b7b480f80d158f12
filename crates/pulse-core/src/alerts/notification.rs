//! Notification dispatch interface.
//!
//! Transport mechanics (mail, webhooks, paging) live outside this crate;
//! the evaluator hands a finished subject and body to a
//! [`NotificationSender`] and moves on. Delivery is fire-and-forget: a
//! dispatch failure is logged by the caller and never re-attempted within
//! the same evaluation cycle.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Errors surfaced by a notification transport.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NotificationError {
    /// The transport could not deliver the notification.
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
}

/// Outbound notification transport.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends one notification for `rule_key`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when the transport fails; callers treat
    /// this as best-effort and do not retry within the cycle.
    async fn send(&self, rule_key: &str, subject: &str, body: &str)
        -> Result<(), NotificationError>;
}

/// Sender that writes notifications to the log instead of a transport.
///
/// The logging-only mode used by test environments and deployments without
/// an outbound channel configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(
        &self,
        rule_key: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        info!(rule_key = %rule_key, subject = %subject, body = %body, "alert notification");
        Ok(())
    }
}
