//! Alert rule evaluation.
//!
//! [`MetricAlertEvaluator::check_metric_alert`] is the entry point an
//! external scheduler invokes once per rule per evaluation interval. Each
//! call runs the full per-rule state machine: take the rule-key lock, read
//! the open incident, compute the condition's current value over the rule's
//! time window, decide breach, and open or close the incident accordingly.
//!
//! Evaluation cycles for the same rule are serialized through the
//! [`LockSet`]; a cycle that finds its key held is skipped outright, and the
//! in-flight evaluation is treated as authoritative. Cycles for different rules run
//! fully in parallel. Failures (repository reads, store writes) abort only
//! the failing cycle: the lock guard releases on every exit path and the
//! incident state is left as it was.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::format;
use super::notification::NotificationSender;
use super::rules::AlertRuleStore;
use super::types::{AlertCondition, AlertRule, CheckOutcome};
use super::AlertError;
use crate::aggregate::{
    rollup_level_for, AggregateRepository, GaugeValueRepository, Histogram, PercentileQuery,
};
use crate::config::AlertingConfig;
use crate::incidents::{IncidentError, IncidentRepository};
use crate::locks::LockSet;

/// Evaluates alert rules against rolled-up metric data.
pub struct MetricAlertEvaluator {
    aggregates: Arc<dyn AggregateRepository>,
    gauges: Arc<dyn GaugeValueRepository>,
    incidents: Arc<dyn IncidentRepository>,
    notifier: Arc<dyn NotificationSender>,
    locks: Arc<LockSet>,
    rules: Arc<AlertRuleStore>,
    config: AlertingConfig,
}

impl MetricAlertEvaluator {
    /// Creates a new evaluator over the given collaborators.
    #[must_use]
    pub fn new(
        aggregates: Arc<dyn AggregateRepository>,
        gauges: Arc<dyn GaugeValueRepository>,
        incidents: Arc<dyn IncidentRepository>,
        notifier: Arc<dyn NotificationSender>,
        locks: Arc<LockSet>,
        rules: Arc<AlertRuleStore>,
        config: AlertingConfig,
    ) -> Self {
        Self { aggregates, gauges, incidents, notifier, locks, rules, config }
    }

    /// The rule store this evaluator reads from.
    #[must_use]
    pub fn rules(&self) -> &Arc<AlertRuleStore> {
        &self.rules
    }

    /// Starts the background evaluation loop for one agent.
    ///
    /// Every interval tick spawns one task per enabled rule; overlapping
    /// evaluations of the same rule resolve through the rule-key lock (the
    /// later one skips). The task runs until the returned handle is aborted.
    #[must_use]
    pub fn start(self: Arc<Self>, agent_id: String) -> JoinHandle<()> {
        let interval = Duration::from_secs(self.config.evaluation_interval_seconds);
        tokio::spawn(async move {
            info!(
                agent_id = %agent_id,
                interval_seconds = interval.as_secs(),
                "starting alert evaluation loop"
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let now_millis = Utc::now().timestamp_millis();
                for rule in self.rules.enabled_rules() {
                    let evaluator = Arc::clone(&self);
                    let agent_id = agent_id.clone();
                    tokio::spawn(async move {
                        match evaluator.check_metric_alert(&agent_id, &rule, now_millis).await {
                            Ok(outcome) => {
                                debug!(
                                    rule = %rule.name,
                                    outcome = outcome.as_str(),
                                    "alert check finished"
                                );
                            }
                            Err(error) => {
                                warn!(rule = %rule.name, error = %error, "alert check failed");
                                counter!("alert_checks_failed_total").increment(1);
                            }
                        }
                    });
                }
            }
        })
    }

    /// Runs one evaluation cycle for one rule.
    ///
    /// Returns the state transition taken (or skipped). Lock contention is
    /// not an error: a concurrent evaluation of the same rule yields
    /// [`CheckOutcome::SkippedLocked`].
    ///
    /// # Errors
    ///
    /// Returns [`AlertError`] for malformed rules and for repository or
    /// incident-store failures. A failed cycle releases the rule-key lock,
    /// leaves incident state untouched, and sends nothing; the next
    /// scheduled cycle retries from scratch.
    pub async fn check_metric_alert(
        &self,
        agent_id: &str,
        rule: &AlertRule,
        now_millis: i64,
    ) -> Result<CheckOutcome, AlertError> {
        validate_rule(rule)?;
        let now = DateTime::<Utc>::from_timestamp_millis(now_millis)
            .ok_or_else(|| AlertError::InvalidRule(format!("timestamp {now_millis} out of range")))?;

        let rule_key = rule.rule_key(agent_id);
        counter!("alert_checks_total").increment(1);

        let Some(_guard) = self.locks.try_acquire_guard(&rule_key) else {
            debug!(
                rule = %rule.name,
                rule_key = %rule_key,
                "evaluation already in progress, skipping cycle"
            );
            counter!("alert_checks_skipped_total").increment(1);
            return Ok(CheckOutcome::SkippedLocked);
        };

        let open_incident = self.incidents.read_open_incident(&rule_key).await?;

        let Some(value) = self.condition_value(agent_id, &rule.condition, now_millis).await? else {
            debug!(rule = %rule.name, "no data in evaluation window");
            return Ok(CheckOutcome::NoOp);
        };

        let threshold = rule.condition.threshold();
        let breached = if rule.condition.lower_bound() {
            value <= threshold
        } else {
            value >= threshold
        };
        debug!(rule = %rule.name, value, threshold, breached, "condition evaluated");

        match (open_incident, breached) {
            (None, true) => self.open_and_notify(agent_id, rule, &rule_key, now, value).await,
            (None, false) => Ok(CheckOutcome::NoOp),
            (Some(_), true) => {
                debug!(rule = %rule.name, "condition still breached, incident already open");
                Ok(CheckOutcome::NoOp)
            }
            (Some(_), false) => self.close(agent_id, rule, &rule_key).await,
        }
    }

    /// Computes the condition's current value over `[now - period, now]`.
    ///
    /// Returns `Ok(None)` when the window holds no data; the caller treats
    /// that as "nothing to decide" rather than a breach or a resolution.
    async fn condition_value(
        &self,
        agent_id: &str,
        condition: &AlertCondition,
        now_millis: i64,
    ) -> Result<Option<f64>, AlertError> {
        let period_seconds = condition.time_period_seconds();
        let from_millis = now_millis - i64::from(period_seconds) * 1000;
        match condition {
            AlertCondition::TransactionPercentile { transaction_type, percentile, .. } => {
                let query = PercentileQuery {
                    transaction_type: transaction_type.clone(),
                    from_millis,
                    to_millis: now_millis,
                    rollup_level: rollup_level_for(period_seconds),
                };
                let aggregates =
                    self.aggregates.read_percentile_aggregates(agent_id, &query).await?;
                let mut merged = Histogram::new();
                for aggregate in &aggregates {
                    merged.merge_encoded(&aggregate.histogram_bytes)?;
                }
                #[allow(clippy::cast_precision_loss)]
                let value = merged.percentile(*percentile).map(|value| value as f64);
                Ok(value)
            }
            AlertCondition::GaugeAverage { gauge_name, .. } => {
                let points = self
                    .gauges
                    .read_gauge_values(
                        agent_id,
                        gauge_name,
                        from_millis,
                        now_millis,
                        rollup_level_for(period_seconds),
                    )
                    .await?;
                let mut weighted_sum = 0.0;
                let mut total_weight = 0.0;
                for point in &points {
                    #[allow(clippy::cast_precision_loss)]
                    let weight = point.weight as f64;
                    weighted_sum += point.value * weight;
                    total_weight += weight;
                }
                if total_weight == 0.0 {
                    Ok(None)
                } else {
                    Ok(Some(weighted_sum / total_weight))
                }
            }
        }
    }

    async fn open_and_notify(
        &self,
        agent_id: &str,
        rule: &AlertRule,
        rule_key: &str,
        now: DateTime<Utc>,
        value: f64,
    ) -> Result<CheckOutcome, AlertError> {
        match self.incidents.open_incident(rule_key, now).await {
            Ok(incident) => {
                info!(
                    rule = %rule.name,
                    rule_key = %rule_key,
                    incident_id = %incident.id,
                    value,
                    "alert incident opened"
                );
            }
            // Another process opened the incident between our read and this
            // write; it owns the notification.
            Err(IncidentError::AlreadyOpen(_)) => {
                warn!(
                    rule = %rule.name,
                    rule_key = %rule_key,
                    "incident already open, suppressing duplicate notification"
                );
                return Ok(CheckOutcome::NoOp);
            }
            Err(error) => return Err(error.into()),
        }
        counter!("alert_incidents_opened_total").increment(1);

        let subject = format::subject(agent_id, rule, false);
        let body = format::breach_message(&rule.condition);
        if let Err(error) = self.notifier.send(rule_key, &subject, &body).await {
            warn!(rule = %rule.name, error = %error, "notification dispatch failed");
        }
        Ok(CheckOutcome::Opened)
    }

    async fn close(
        &self,
        agent_id: &str,
        rule: &AlertRule,
        rule_key: &str,
    ) -> Result<CheckOutcome, AlertError> {
        self.incidents.close_incident(rule_key).await?;
        info!(rule = %rule.name, rule_key = %rule_key, "alert incident closed");
        counter!("alert_incidents_closed_total").increment(1);

        if self.config.notify_on_close {
            let subject = format::subject(agent_id, rule, true);
            let body = format::resolution_message(&rule.condition);
            if let Err(error) = self.notifier.send(rule_key, &subject, &body).await {
                warn!(rule = %rule.name, error = %error, "resolution dispatch failed");
            }
        }
        Ok(CheckOutcome::Closed)
    }
}

/// Rejects malformed rule configuration before any collaborator is touched.
fn validate_rule(rule: &AlertRule) -> Result<(), AlertError> {
    if rule.condition.time_period_seconds() == 0 {
        return Err(AlertError::InvalidRule(format!(
            "rule '{}' has a zero time period",
            rule.name
        )));
    }
    if let AlertCondition::TransactionPercentile { percentile, .. } = &rule.condition {
        if !(0.0..=100.0).contains(percentile) {
            return Err(AlertError::InvalidRule(format!(
                "rule '{}' has percentile {percentile} outside 0..=100",
                rule.name
            )));
        }
    }
    Ok(())
}
