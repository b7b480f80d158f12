//! Alert rules, evaluation, and notification text.
//!
//! ## Components
//!
//! - **[`AlertRule`]** / **[`AlertCondition`]**: what to watch and when it
//!   counts as breached.
//! - **[`AlertRuleStore`]**: the configured rule set.
//! - **[`MetricAlertEvaluator`]**: runs the per-rule evaluation cycle:
//!   lock, read incident, compute value, transition, release.
//! - **[`NotificationSender`]**: outbound transport interface.
//! - **[`format`]**: the operator-facing message wording.
//!
//! ## Usage
//!
//! ```rust
//! use pulse_core::alerts::{AlertCondition, AlertRule, AlertRuleStore, AlertSeverity};
//!
//! let store = AlertRuleStore::new();
//! let rule = AlertRule::new(
//!     "slow web requests".to_string(),
//!     AlertCondition::TransactionPercentile {
//!         metric: "transaction".to_string(),
//!         transaction_type: "Web".to_string(),
//!         percentile: 95.0,
//!         threshold_millis: 1500,
//!         time_period_seconds: 300,
//!     },
//!     AlertSeverity::Warning,
//!     true,
//! );
//! assert!(store.add_rule(rule.clone()));
//!
//! // The same condition always derives the same incident identity.
//! assert_eq!(rule.rule_key("agent-1"), rule.rule_key("agent-1"));
//! ```

pub mod evaluator;
pub mod format;
pub mod notification;
pub mod rules;
pub mod types;

use thiserror::Error;

pub use evaluator::MetricAlertEvaluator;
pub use notification::{LogNotificationSender, NotificationError, NotificationSender};
pub use rules::AlertRuleStore;
pub use types::{AlertCondition, AlertRule, AlertSeverity, CheckOutcome};

use crate::aggregate::{HistogramError, RepositoryError};
use crate::incidents::IncidentError;

/// Errors that fail a single evaluation cycle.
///
/// Every variant is scoped to one rule-key cycle: the lock is released, the
/// incident state is untouched, and other rules are unaffected. The next
/// scheduled cycle retries from scratch.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AlertError {
    /// The rule's configuration is malformed; rejected before any
    /// collaborator is touched.
    #[error("invalid alert rule: {0}")]
    InvalidRule(String),

    /// An aggregate or gauge read failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A stored histogram snapshot could not be decoded.
    #[error(transparent)]
    Histogram(#[from] HistogramError),

    /// The incident store failed.
    #[error(transparent)]
    Incident(#[from] IncidentError),
}
