//! Alert rule and condition definitions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Severity level of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Critical alert requiring immediate attention.
    Critical,
    /// Warning alert indicating potential issues.
    Warning,
    /// Informational alert for awareness.
    Info,
}

impl AlertSeverity {
    /// Static label used in notification subjects and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Conditions an alert rule evaluates each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertCondition {
    /// A transaction latency percentile is at or above a threshold.
    TransactionPercentile {
        /// Metric the aggregates were rolled up from.
        metric: String,
        /// Transaction type the rule targets (e.g. "Web").
        transaction_type: String,
        /// Percentile to evaluate, `0..=100`.
        percentile: f64,
        /// Breach threshold in milliseconds.
        threshold_millis: u64,
        /// Evaluation window length in seconds.
        time_period_seconds: u32,
    },
    /// A gauge's weighted average is at or beyond a threshold.
    GaugeAverage {
        /// Fully qualified gauge name.
        gauge_name: String,
        /// Unit shown in notification text (e.g. "bytes", "milliseconds").
        display_unit: String,
        /// Breach threshold in the gauge's own unit.
        threshold: f64,
        /// Evaluation window length in seconds.
        time_period_seconds: u32,
        /// When set, breach means at or *below* the threshold.
        lower_bound: bool,
    },
}

impl AlertCondition {
    /// Evaluation window length in seconds.
    #[must_use]
    pub fn time_period_seconds(&self) -> u32 {
        match self {
            Self::TransactionPercentile { time_period_seconds, .. }
            | Self::GaugeAverage { time_period_seconds, .. } => *time_period_seconds,
        }
    }

    /// The breach threshold as a plain number.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::TransactionPercentile { threshold_millis, .. } => *threshold_millis as f64,
            Self::GaugeAverage { threshold, .. } => *threshold,
        }
    }

    /// `true` when breach means at-or-below the threshold.
    ///
    /// Percentile conditions are always upper-bound.
    #[must_use]
    pub fn lower_bound(&self) -> bool {
        match self {
            Self::TransactionPercentile { .. } => false,
            Self::GaugeAverage { lower_bound, .. } => *lower_bound,
        }
    }

    /// Feeds the condition's identity-relevant content into `hasher`.
    ///
    /// Field order and separators are part of the wire-stable key format;
    /// changing them changes every derived rule key.
    fn hash_content(&self, hasher: &mut Sha256) {
        match self {
            Self::TransactionPercentile {
                metric,
                transaction_type,
                percentile,
                threshold_millis,
                time_period_seconds,
            } => {
                hasher.update(b"transaction_percentile");
                hasher.update([0]);
                hasher.update(metric.as_bytes());
                hasher.update([0]);
                hasher.update(transaction_type.as_bytes());
                hasher.update([0]);
                hasher.update(percentile.to_be_bytes());
                hasher.update(threshold_millis.to_be_bytes());
                hasher.update(time_period_seconds.to_be_bytes());
            }
            Self::GaugeAverage {
                gauge_name,
                display_unit,
                threshold,
                time_period_seconds,
                lower_bound,
            } => {
                hasher.update(b"gauge_average");
                hasher.update([0]);
                hasher.update(gauge_name.as_bytes());
                hasher.update([0]);
                hasher.update(display_unit.as_bytes());
                hasher.update([0]);
                hasher.update(threshold.to_be_bytes());
                hasher.update(time_period_seconds.to_be_bytes());
                hasher.update([u8::from(*lower_bound)]);
            }
        }
    }
}

/// A rule defining when to open and close incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Human-readable name, unique within a rule store.
    pub name: String,
    /// Condition evaluated each cycle.
    pub condition: AlertCondition,
    /// Severity included in notifications.
    pub severity: AlertSeverity,
    /// Whether this rule is currently evaluated.
    pub enabled: bool,
}

impl AlertRule {
    /// Creates a new alert rule.
    #[must_use]
    pub fn new(
        name: String,
        condition: AlertCondition,
        severity: AlertSeverity,
        enabled: bool,
    ) -> Self {
        Self { name, condition, severity, enabled }
    }

    /// Stable identity key for locking and incident tracking.
    ///
    /// Derived from the agent id and the condition content only, never from
    /// the rule name, severity, enabled flag, or any other mutable field, so
    /// re-saving a rule without changing what it measures keeps its
    /// incident history.
    #[must_use]
    pub fn rule_key(&self, agent_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(agent_id.as_bytes());
        hasher.update([0]);
        self.condition.hash_content(&mut hasher);
        hex::encode(hasher.finalize())
    }
}

/// Result of one evaluation cycle for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No state transition: condition and incident state already agree.
    NoOp,
    /// A new incident was opened and a notification dispatched.
    Opened,
    /// The open incident was closed.
    Closed,
    /// Another evaluation holds the rule-key lock; this cycle was skipped.
    SkippedLocked,
}

impl CheckOutcome {
    /// Static label for logs and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::SkippedLocked => "skipped_locked",
        }
    }
}
