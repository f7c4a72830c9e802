//! Mock implementations for testing.
//!
//! This module provides mock implementations of the trait abstractions
//! that allow unit testing without external dependencies.

pub mod datastore;
pub mod notify;
pub mod time;

pub use datastore::{make_test_user, MemoryDatastore, MemoryFailure};
pub use notify::MockNotifier;
pub use time::MockTime;
