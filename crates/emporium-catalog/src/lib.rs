//! Emporium — product catalog bounded context.
//!
//! Holds the closed set of catalog event kinds, the commands that produce
//! them, the `Product` aggregate, the schema-versioned [`codec`], and the
//! application-level command handlers.

pub mod application;
pub mod codec;
pub mod domain;
