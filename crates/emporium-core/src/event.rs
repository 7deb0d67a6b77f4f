//! Domain event abstractions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contextual metadata attached to a domain event.
///
/// All fields are optional: events appended outside a traced command flow
/// (backfills, migrations) carry none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// ID of the command or event that caused this event.
    pub causation_id: Option<Uuid>,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Option<Uuid>,
    /// The principal that issued the originating command.
    pub actor: Option<String>,
}

impl EventMetadata {
    /// Metadata for an event produced within a correlated command flow.
    #[must_use]
    pub fn correlated(correlation_id: Uuid) -> Self {
        Self {
            causation_id: None,
            correlation_id: Some(correlation_id),
            actor: None,
        }
    }
}

/// Trait that all domain event payloads implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;
}
