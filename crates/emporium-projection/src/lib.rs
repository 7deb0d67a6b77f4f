//! Read-side projection machinery for the Emporium catalog.
//!
//! The [`engine::ProjectionEngine`] consumes recorded events in stream order
//! and maintains denormalized [`read_model::ProductRecord`]s; the
//! [`scheduler::CatchUpScheduler`] drives it over the global event feed.

pub mod engine;
pub mod memory;
pub mod read_model;
pub mod scheduler;

pub use engine::{MissingRecordPolicy, ProjectionEngine};
pub use memory::{InMemoryPositionStore, InMemoryReadModelStore};
pub use read_model::{CursorKey, ProductRecord, ReadModelStore, SortField, WriteOutcome};
pub use scheduler::CatchUpScheduler;
