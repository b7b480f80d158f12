//! Incident tracking.
//!
//! An incident is the persisted record that an alert rule's condition is
//! currently breached. Its only job is notification dedup: a rule with an
//! open incident does not notify again until the incident closes. At most
//! one open incident exists per rule key; the evaluator guarantees this via
//! the per-key lock, and the store signals a conflict if the guarantee is
//! ever violated from outside.
//!
//! The backing store is a deployment concern; see [`IncidentRepository`].

pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use repository::{IncidentRepository, MemoryIncidentRepository};

/// An open incident for one alert rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Stable key of the rule this incident belongs to.
    pub rule_key: String,
    /// When the condition was first observed in breach.
    pub opened_at: DateTime<Utc>,
    /// Opaque identity of this incident record.
    pub id: Uuid,
}

/// Errors surfaced by the incident store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IncidentError {
    /// An open incident already exists for the rule key.
    #[error("an open incident already exists for rule key {0}")]
    AlreadyOpen(String),

    /// The backing store reported a failure.
    #[error("incident store error: {0}")]
    Store(String),
}
