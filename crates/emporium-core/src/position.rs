//! Projection position tracking.
//!
//! A position records how far a named projection has consumed the global
//! event feed. It exists for resuming catch-up and measuring lag only — the
//! idempotency truth is the read-model record's own version, never the
//! position.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// Per-projection consumption marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// The last event successfully applied, for diagnostics.
    pub last_event_id: Option<Uuid>,
    /// Global sequence of the last event applied; 0 means "nothing yet".
    pub global_sequence: i64,
    /// Cumulative count of events processed since the last reset.
    pub processed_count: u64,
}

impl ProjectionPosition {
    /// The zero position: nothing consumed yet.
    #[must_use]
    pub fn beginning() -> Self {
        Self::default()
    }

    /// The position after applying one more event.
    #[must_use]
    pub fn advanced_to(&self, event_id: Uuid, global_sequence: i64) -> Self {
        Self {
            last_event_id: Some(event_id),
            global_sequence,
            processed_count: self.processed_count + 1,
        }
    }
}

/// Storage for per-projection positions, keyed by projection name.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Load the position for a named projection, if one has been recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn load(&self, projection_name: &str) -> Result<Option<ProjectionPosition>, DomainError>;

    /// Upsert the position for a named projection.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn save(
        &self,
        projection_name: &str,
        position: &ProjectionPosition,
    ) -> Result<(), DomainError>;

    /// Reset a projection's position to the beginning (used by rebuild).
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn reset(&self, projection_name: &str) -> Result<(), DomainError>;
}
