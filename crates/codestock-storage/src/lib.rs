//! codestock-storage
//!
//! Access to the tabular REST store: request encoding, execution over a
//! pluggable transport, and the snippet CRUD gateway.

pub mod config;
pub mod error;
pub mod execute;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod query;
pub mod snippets;
