//! Query surface over the Emporium product read model.
//!
//! Offers offset pagination for small browsable sets, opaque-cursor
//! pagination for deep traversal, and relevance-ranked search. All reads go
//! through a [`emporium_projection::ReadModelStore`], never the event store.

pub mod pagination;
pub mod service;

pub use pagination::{CursorPage, Page, PageRequest, decode_cursor, encode_cursor};
pub use service::ProductQueryService;
