//! Trait abstractions for dependency injection and testability.
//!
//! This module provides trait-based abstractions for external dependencies,
//! enabling unit testing without requiring a database or transport layer.

pub mod datastore;
pub mod notify;
pub mod time;

// Re-export all traits for crate-internal use.
// The public API surface is controlled by lib.rs re-exports.
pub use datastore::{from_doc, to_doc, BatchWrite, Datastore, FieldWrite};
pub use notify::{ChangeNotifier, ConversationEvent, NoopNotifier};
pub use time::TimeProvider;

// Re-export default implementations
pub use time::SystemTimeProvider;
