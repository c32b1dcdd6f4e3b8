//! Tests for the crate-root domain types.
//!
//! - `state` - SessionState parsing and display
//! - `status` - SessionStatus, TaskBinding and serialization
