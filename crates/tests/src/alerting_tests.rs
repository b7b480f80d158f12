//! Integration tests for the alert evaluation lifecycle.
//!
//! Each test drives `check_metric_alert` through multiple cycles against
//! scripted collaborators and asserts on the state transitions, the
//! notifications dispatched, and the failure isolation guarantees.

use pulse_core::alerts::{
    AlertCondition, AlertError, AlertRule, AlertSeverity, CheckOutcome,
};
use pulse_core::config::AlertingConfig;
use pulse_core::incidents::IncidentRepository;

use crate::mock_infrastructure::{aggregate_row, gauge_point, AlertHarness};

const AGENT: &str = "agent-1";

fn percentile_rule() -> AlertRule {
    AlertRule::new(
        "slow web requests".to_string(),
        AlertCondition::TransactionPercentile {
            metric: "transaction".to_string(),
            transaction_type: "Web".to_string(),
            percentile: 95.0,
            threshold_millis: 1500,
            time_period_seconds: 300,
        },
        AlertSeverity::Warning,
        true,
    )
}

fn gauge_rule(threshold: f64, lower_bound: bool) -> AlertRule {
    AlertRule::new(
        "connection pool".to_string(),
        AlertCondition::GaugeAverage {
            gauge_name: "pool.available".to_string(),
            display_unit: "connections".to_string(),
            threshold,
            time_period_seconds: 60,
            lower_bound,
        },
        AlertSeverity::Critical,
        true,
    )
}

/// Samples that put the 95th percentile well above the 1500ms threshold.
fn breaching_rows() -> Vec<pulse_core::aggregate::PercentileAggregate> {
    vec![aggregate_row(60_000, &[2000; 100]), aggregate_row(120_000, &[2500; 100])]
}

/// Samples that keep the 95th percentile well below the threshold.
fn quiet_rows() -> Vec<pulse_core::aggregate::PercentileAggregate> {
    vec![aggregate_row(60_000, &[100; 100])]
}

#[tokio::test]
async fn test_breach_notifies_exactly_once() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    harness.aggregates.set_rows(breaching_rows());

    let first = harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap();
    assert_eq!(first, CheckOutcome::Opened);

    // Still breached on the next cycle: incident is open, no second
    // notification.
    let second = harness.evaluator.check_metric_alert(AGENT, &rule, 600_000).await.unwrap();
    assert_eq!(second, CheckOutcome::NoOp);

    assert_eq!(harness.notifier.sent().len(), 1);
    assert_eq!(harness.incidents.open_count(), 1);
}

#[tokio::test]
async fn test_resolution_closes_incident() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    harness.aggregates.set_rows(breaching_rows());

    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap(),
        CheckOutcome::Opened
    );

    harness.aggregates.set_rows(quiet_rows());
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 600_000).await.unwrap(),
        CheckOutcome::Closed
    );
    assert_eq!(harness.incidents.open_count(), 0);

    // Further quiet cycles stay silent.
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 900_000).await.unwrap(),
        CheckOutcome::NoOp
    );
    assert_eq!(harness.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_notify_on_close_sends_resolution() {
    let config = AlertingConfig { notify_on_close: true, ..AlertingConfig::default() };
    let harness = AlertHarness::with_config(config);
    let rule = percentile_rule();

    harness.aggregates.set_rows(breaching_rows());
    harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap();

    harness.aggregates.set_rows(quiet_rows());
    harness.evaluator.check_metric_alert(AGENT, &rule, 600_000).await.unwrap();

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].subject.ends_with("resolved"));
    assert!(sent[1].body.contains("no longer"));
}

#[tokio::test]
async fn test_notification_body_wording() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    harness.aggregates.set_rows(breaching_rows());

    harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap();

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].rule_key, rule.rule_key(AGENT));
    assert_eq!(sent[0].subject, "[warning] agent-1 - slow web requests");
    assert_eq!(
        sent[0].body,
        "95th percentile over the last 5 minutes is greater than or equal to the alert \
         threshold of 1500 milliseconds."
    );
}

#[tokio::test]
async fn test_gauge_lower_bound_is_inclusive() {
    // An observed average of exactly the threshold must breach.
    let harness = AlertHarness::new();
    let rule = gauge_rule(500.0, true);
    harness.gauges.set_points(vec![gauge_point(10_000, 500.0, 4)]);

    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 60_000).await.unwrap(),
        CheckOutcome::Opened
    );

    // 501 is above the lower-bound threshold: no breach.
    let harness = AlertHarness::new();
    harness.gauges.set_points(vec![gauge_point(10_000, 501.0, 4)]);
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 60_000).await.unwrap(),
        CheckOutcome::NoOp
    );
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_gauge_average_is_weight_weighted() {
    // (400 * 1 + 600 * 3) / 4 = 550.
    let points = vec![gauge_point(10_000, 400.0, 1), gauge_point(20_000, 600.0, 3)];

    let harness = AlertHarness::new();
    harness.gauges.set_points(points.clone());
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &gauge_rule(550.0, false), 60_000).await.unwrap(),
        CheckOutcome::Opened
    );

    let harness = AlertHarness::new();
    harness.gauges.set_points(points);
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &gauge_rule(551.0, false), 60_000).await.unwrap(),
        CheckOutcome::NoOp
    );
}

#[tokio::test]
async fn test_empty_window_leaves_open_incident_alone() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    harness.aggregates.set_rows(breaching_rows());
    harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap();

    // No data at all is not a resolution.
    harness.aggregates.set_rows(Vec::new());
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 600_000).await.unwrap(),
        CheckOutcome::NoOp
    );
    assert_eq!(harness.incidents.open_count(), 1);
}

#[tokio::test]
async fn test_repository_failure_is_isolated_to_one_cycle() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    let rule_key = rule.rule_key(AGENT);

    harness.aggregates.set_failing(true);
    let err = harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap_err();
    assert!(matches!(err, AlertError::Repository(_)));
    assert_eq!(harness.incidents.open_count(), 0);
    assert!(harness.notifier.sent().is_empty());
    // The failed cycle must not leave the rule-key lock held.
    assert!(!harness.locks.is_held(&rule_key));

    // The next cycle proceeds normally.
    harness.aggregates.set_failing(false);
    harness.aggregates.set_rows(breaching_rows());
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 600_000).await.unwrap(),
        CheckOutcome::Opened
    );
}

#[tokio::test]
async fn test_corrupt_histogram_fails_cycle() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    harness.aggregates.set_rows(vec![pulse_core::aggregate::PercentileAggregate {
        capture_time_millis: 60_000,
        histogram_bytes: vec![0xde, 0xad, 0xbe, 0xef],
        sample_count: 1,
    }]);

    let err = harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap_err();
    assert!(matches!(err, AlertError::Histogram(_)));
    assert_eq!(harness.incidents.open_count(), 0);
    assert!(!harness.locks.is_held(&rule.rule_key(AGENT)));
}

#[tokio::test]
async fn test_concurrent_evaluation_skips() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    let rule_key = rule.rule_key(AGENT);
    harness.aggregates.set_rows(breaching_rows());

    let guard = harness.locks.try_acquire_guard(&rule_key).unwrap();
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap(),
        CheckOutcome::SkippedLocked
    );
    assert!(harness.notifier.sent().is_empty());
    drop(guard);

    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 600_000).await.unwrap(),
        CheckOutcome::Opened
    );
}

#[tokio::test]
async fn test_failures_do_not_cross_rules() {
    let harness = AlertHarness::new();
    harness.gauges.set_failing(true);
    harness.aggregates.set_rows(breaching_rows());

    // The gauge rule's cycle fails...
    let gauge = gauge_rule(500.0, false);
    assert!(harness.evaluator.check_metric_alert(AGENT, &gauge, 300_000).await.is_err());

    // ...while the percentile rule evaluates normally in the same cycle.
    let percentile = percentile_rule();
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &percentile, 300_000).await.unwrap(),
        CheckOutcome::Opened
    );
}

#[tokio::test]
async fn test_dispatch_failure_still_opens_incident() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    harness.aggregates.set_rows(breaching_rows());
    harness.notifier.set_failing(true);

    // Dispatch is fire-and-forget: the incident opens even when the
    // transport fails, and the next cycle does not re-notify.
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 300_000).await.unwrap(),
        CheckOutcome::Opened
    );
    assert_eq!(harness.incidents.open_count(), 1);
    assert_eq!(
        harness.evaluator.check_metric_alert(AGENT, &rule, 600_000).await.unwrap(),
        CheckOutcome::NoOp
    );
}

#[tokio::test]
async fn test_incident_carries_opened_at_timestamp() {
    let harness = AlertHarness::new();
    let rule = percentile_rule();
    harness.aggregates.set_rows(breaching_rows());

    let now_millis = 1_700_000_000_000;
    harness.evaluator.check_metric_alert(AGENT, &rule, now_millis).await.unwrap();

    let incident =
        harness.incidents.read_open_incident(&rule.rule_key(AGENT)).await.unwrap().unwrap();
    assert_eq!(incident.opened_at.timestamp_millis(), now_millis);
}
