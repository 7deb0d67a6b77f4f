//! Domain layer: events, commands, and the `Product` aggregate.

pub mod aggregates;
pub mod commands;
pub mod events;
