//! Metric aggregation: the online histogram and the read interfaces for
//! rolled-up data.
//!
//! ## Components
//!
//! - **[`Histogram`]**: online latency histogram, exact below an internal
//!   sample limit, log-linear bucketed above it, with a compact binary
//!   encoding exchanged between the sampling and aggregating processes.
//! - **[`AggregateRepository`]** / **[`GaugeValueRepository`]**: collaborator
//!   interfaces the alert evaluator reads rolled-up windows through.

pub mod histogram;
pub mod repository;

pub use histogram::{Histogram, HistogramError};
pub use repository::{
    rollup_level_for, AggregateRepository, GaugePoint, GaugeValueRepository, PercentileAggregate,
    PercentileQuery, RepositoryError,
};
