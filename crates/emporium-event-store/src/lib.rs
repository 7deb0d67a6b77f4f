//! Event store implementations for the Emporium catalog.
//!
//! Two implementations of [`emporium_core::store::EventStore`]:
//!
//! - [`memory::InMemoryEventStore`] — process-local, used by tests and the
//!   development loop.
//! - [`pg_event_store::PgEventStore`] — durable PostgreSQL storage with a
//!   transactional version check.

pub mod memory;
pub mod pg_event_store;
pub mod schema;

pub use memory::InMemoryEventStore;
pub use pg_event_store::PgEventStore;
