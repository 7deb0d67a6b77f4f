//! Emporium Core — shared event-sourcing abstractions.
//!
//! This crate defines the traits and record types that the write side
//! (event store, command handlers) and the read side (projections, queries)
//! both depend on. It contains no storage or transport code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod position;
pub mod store;
