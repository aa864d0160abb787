//! codestock-core
//!
//! Pure domain types, store column conventions, and write-payload limits.
//! No HTTP dependency; this is the shared vocabulary of the Code Stock system.

pub mod columns;
pub mod error;
pub mod models;
pub mod payload;
