//! Command handlers for the Orbit CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod ingest;
pub mod stats;
pub mod status;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;
pub use status::StatusCommand;

/// Shown when no knowledge base has been loaded.
pub const OFFLINE_MESSAGE: &str = "Orbit is offline. Please initialize the knowledge base.";

/// Shown when the knowledge base is ready.
pub const GREETING: &str =
    "Hi, I'm Orbit! The AI assistant for CollabCircle. How may I help you?";

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) -> orbit_core::AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
