//! Shared test mocks and utilities for the Emporium catalog.

mod clock;
mod store;

pub use clock::FixedClock;
pub use store::{EmptyEventStore, FailingEventStore, RecordingEventStore};
