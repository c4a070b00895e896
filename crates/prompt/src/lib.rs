//! Prompt system for Orbit.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - A built-in answer prompt carrying the Orbit persona
//! - Workspace overrides under `.orbit/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_answer_prompt, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec};
