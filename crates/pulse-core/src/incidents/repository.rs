//! Incident store interface and the in-memory default.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{Incident, IncidentError};

/// Backing persistence for incident records.
///
/// Implementations must be safe for concurrent use. The evaluator already
/// serializes calls per rule key; per-key atomicity in the store only
/// matters when another process writes to the same records.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Creates an open-incident record for `rule_key`.
    ///
    /// # Errors
    ///
    /// Returns [`IncidentError::AlreadyOpen`] if a record already exists,
    /// or [`IncidentError::Store`] on a backing-store failure.
    async fn open_incident(
        &self,
        rule_key: &str,
        opened_at: DateTime<Utc>,
    ) -> Result<Incident, IncidentError>;

    /// Reads the open incident for `rule_key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IncidentError::Store`] on a backing-store failure.
    async fn read_open_incident(&self, rule_key: &str) -> Result<Option<Incident>, IncidentError>;

    /// Removes the open-incident record for `rule_key`; no-op when none
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`IncidentError::Store`] on a backing-store failure.
    async fn close_incident(&self, rule_key: &str) -> Result<(), IncidentError>;
}

/// In-memory incident store.
///
/// The default for embedded deployments and the store the integration tests
/// run against. Incidents do not survive a process restart; deployments that
/// need durable dedup across restarts plug in a persistent implementation.
#[derive(Debug, Default)]
pub struct MemoryIncidentRepository {
    incidents: DashMap<String, Incident>,
}

impl MemoryIncidentRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open incidents.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.incidents.len()
    }
}

#[async_trait]
impl IncidentRepository for MemoryIncidentRepository {
    async fn open_incident(
        &self,
        rule_key: &str,
        opened_at: DateTime<Utc>,
    ) -> Result<Incident, IncidentError> {
        match self.incidents.entry(rule_key.to_string()) {
            Entry::Occupied(_) => Err(IncidentError::AlreadyOpen(rule_key.to_string())),
            Entry::Vacant(entry) => {
                let incident =
                    Incident { rule_key: rule_key.to_string(), opened_at, id: Uuid::new_v4() };
                entry.insert(incident.clone());
                Ok(incident)
            }
        }
    }

    async fn read_open_incident(&self, rule_key: &str) -> Result<Option<Incident>, IncidentError> {
        Ok(self.incidents.get(rule_key).map(|entry| entry.value().clone()))
    }

    async fn close_incident(&self, rule_key: &str) -> Result<(), IncidentError> {
        self.incidents.remove(rule_key);
        Ok(())
    }
}
