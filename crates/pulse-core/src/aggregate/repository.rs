//! Read interfaces for rolled-up data.
//!
//! The aggregation pipeline that produces rollups lives outside this crate;
//! the evaluator only ever reads. Implementations are expected to be backed
//! by whatever store the deployment uses (embedded, SQL, remote), so the
//! traits are async and return typed rows.

use async_trait::async_trait;
use thiserror::Error;

/// Longest evaluation window each rollup tier serves; anything beyond the
/// last threshold reads tier 3.
const ROLLUP_1_THRESHOLD_SECONDS: u32 = 60 * 60;
const ROLLUP_2_THRESHOLD_SECONDS: u32 = 8 * 60 * 60;
const ROLLUP_3_THRESHOLD_SECONDS: u32 = 24 * 60 * 60;

/// Errors surfaced by aggregate and gauge reads.
///
/// All variants are transient from the evaluator's point of view: the cycle
/// fails, state is left untouched, and the next scheduled cycle retries.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RepositoryError {
    /// The underlying store reported a failure.
    #[error("repository read failed: {0}")]
    Read(String),

    /// The read did not complete within the externally imposed deadline.
    #[error("repository read timed out")]
    Timeout,
}

/// Query bounds for percentile aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercentileQuery {
    /// Transaction type the rule targets (e.g. "Web", "Background").
    pub transaction_type: String,
    /// Inclusive lower bound, epoch milliseconds.
    pub from_millis: i64,
    /// Inclusive upper bound, epoch milliseconds.
    pub to_millis: i64,
    /// Which rollup tier to read; see [`rollup_level_for`].
    pub rollup_level: u32,
}

/// One rolled-up latency window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercentileAggregate {
    /// End of the rollup window, epoch milliseconds.
    pub capture_time_millis: i64,
    /// Encoded [`Histogram`](crate::aggregate::Histogram) snapshot.
    pub histogram_bytes: Vec<u8>,
    /// Sample count in the window, duplicated out of the histogram so
    /// callers can weigh windows without decoding.
    pub sample_count: u64,
}

/// One rolled-up gauge observation.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugePoint {
    /// End of the rollup window, epoch milliseconds.
    pub capture_time_millis: i64,
    /// Average gauge value over the window.
    pub value: f64,
    /// Number of raw readings folded into `value`; weighs the window in
    /// cross-window averages.
    pub weight: u64,
}

/// Read access to rolled-up transaction latency histograms.
#[async_trait]
pub trait AggregateRepository: Send + Sync {
    /// Reads every aggregate whose capture time falls inside the query
    /// bounds, ordered by capture time.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the underlying store fails or times
    /// out; the failure is scoped to the calling evaluation cycle.
    async fn read_percentile_aggregates(
        &self,
        agent_id: &str,
        query: &PercentileQuery,
    ) -> Result<Vec<PercentileAggregate>, RepositoryError>;
}

/// Read access to rolled-up gauge values.
#[async_trait]
pub trait GaugeValueRepository: Send + Sync {
    /// Reads every gauge point for `gauge_name` captured inside
    /// `[from_millis, to_millis]`, ordered by capture time.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the underlying store fails or times
    /// out; the failure is scoped to the calling evaluation cycle.
    async fn read_gauge_values(
        &self,
        agent_id: &str,
        gauge_name: &str,
        from_millis: i64,
        to_millis: i64,
        rollup_level: u32,
    ) -> Result<Vec<GaugePoint>, RepositoryError>;
}

/// Selects the rollup tier for an evaluation window.
///
/// Longer windows read coarser rollups so the number of aggregates merged
/// per cycle stays bounded.
#[must_use]
pub fn rollup_level_for(time_period_seconds: u32) -> u32 {
    if time_period_seconds <= ROLLUP_1_THRESHOLD_SECONDS {
        0
    } else if time_period_seconds <= ROLLUP_2_THRESHOLD_SECONDS {
        1
    } else if time_period_seconds <= ROLLUP_3_THRESHOLD_SECONDS {
        2
    } else {
        3
    }
}
