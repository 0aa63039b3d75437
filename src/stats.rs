//! System-wide usage counters shown on the landing page.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::store::{BackendError, DocumentBackend, Fields};

const STATS_COLLECTION: &str = "stats";
const STATS_DOCUMENT: &str = "system_v2";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub exams_created: i64,
    pub papers_graded: i64,
    pub students_registered: i64,
}

impl Default for SystemStats {
    fn default() -> Self {
        Self {
            exams_created: 124,
            papers_graded: 211,
            students_registered: 41,
        }
    }
}

impl SystemStats {
    fn to_fields(self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Fields::new(),
        }
    }

    #[must_use]
    pub fn get(&self, field: StatField) -> i64 {
        match field {
            StatField::ExamsCreated => self.exams_created,
            StatField::PapersGraded => self.papers_graded,
            StatField::StudentsRegistered => self.students_registered,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatField {
    ExamsCreated,
    PapersGraded,
    StudentsRegistered,
}

impl StatField {
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            Self::ExamsCreated => "examsCreated",
            Self::PapersGraded => "papersGraded",
            Self::StudentsRegistered => "studentsRegistered",
        }
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

pub struct StatsStore {
    remote: Arc<dyn DocumentBackend>,
    timeout: Duration,
}

impl fmt::Debug for StatsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl StatsStore {
    #[must_use]
    pub fn new(remote: Arc<dyn DocumentBackend>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    /// Current counters, seeding the document when it does not exist.
    /// Falls back to the defaults on any backend failure.
    #[instrument(skip(self))]
    pub async fn system_stats(&self) -> SystemStats {
        match self.load().await {
            Ok(stats) => stats,
            Err(err) => {
                warn!("failed to fetch system stats: {}", err);
                SystemStats::default()
            }
        }
    }

    /// Adds one to `field`. Best effort: failures are logged only.
    ///
    /// The read and the write are separate calls, so concurrent increments
    /// from two clients can lose one.
    #[instrument(skip(self))]
    pub async fn increment(&self, field: StatField) {
        if let Err(err) = self.try_increment(field).await {
            warn!("failed to increment {}: {}", field, err);
        }
    }

    async fn try_increment(&self, field: StatField) -> Result<(), BackendError> {
        let current = self.load().await?;

        let mut fields = Fields::new();
        fields.insert(
            field.field().to_string(),
            Value::from(current.get(field) + 1),
        );
        self.call(self.remote.update(STATS_COLLECTION, STATS_DOCUMENT, fields))
            .await?;

        debug!("{} incremented to {}", field, current.get(field) + 1);
        Ok(())
    }

    async fn load(&self) -> Result<SystemStats, BackendError> {
        let document = self
            .call(self.remote.get(STATS_COLLECTION, STATS_DOCUMENT))
            .await?;

        match document {
            Some(document) => serde_json::from_value(Value::Object(document.fields))
                .map_err(|err| BackendError::Decode(err.to_string())),
            None => {
                let defaults = SystemStats::default();
                self.call(self.remote.set(
                    STATS_COLLECTION,
                    STATS_DOCUMENT,
                    defaults.to_fields(),
                    false,
                ))
                .await?;
                Ok(defaults)
            }
        }
    }

    async fn call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))?
    }
}
