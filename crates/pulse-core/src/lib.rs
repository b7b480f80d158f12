//! # Pulse Core
//!
//! Metric aggregation and alerting core for the Pulse APM agent.
//!
//! This crate provides the foundational components for:
//!
//! - **[`aggregate`]**: the online latency [`Histogram`](aggregate::Histogram)
//!   (exact for low-volume windows, log-linear bucketed above an internal
//!   limit, with a compact binary wire form) and the read interfaces for
//!   rolled-up aggregates and gauge values.
//!
//! - **[`alerts`]**: alert rules and conditions, the
//!   [`MetricAlertEvaluator`](alerts::MetricAlertEvaluator) that decides each
//!   cycle whether to open or close an incident, and notification dispatch.
//!
//! - **[`incidents`]**: the open-incident record and tracker interface used
//!   to fire exactly one notification per state transition.
//!
//! - **[`locks`]**: the keyed [`LockSet`](locks::LockSet) serializing
//!   evaluation cycles per rule key.
//!
//! - **[`config`]**: layered configuration loading.
//!
//! ## Data flow
//!
//! ```text
//! raw samples ──► Histogram (aggregation layer, external)
//!                     │ encode() per rollup window
//!                     ▼
//!            AggregateRepository ◄─── GaugeValueRepository
//!                     │ read + merge per evaluation cycle
//!                     ▼
//!           MetricAlertEvaluator ──► condition value vs threshold
//!                     │                       │
//!              LockSet (per rule key)         ▼
//!                     │              IncidentRepository
//!                     │                       │ open / close
//!                     ▼                       ▼
//!              skip if contended      NotificationSender
//! ```
//!
//! The evaluator is driven by an external scheduler, once per rule per
//! evaluation interval; overlapping evaluations of the same rule are
//! resolved through the `LockSet` (the later one skips its cycle).

pub mod aggregate;
pub mod alerts;
pub mod config;
pub mod incidents;
pub mod locks;
