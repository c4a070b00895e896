//! Pipeline-level tests for the knowledge crate.
