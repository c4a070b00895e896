//! Retrieval-augmented answering.

pub mod generator;
pub mod query;
pub mod retriever;
pub mod types;

pub use generator::Generator;
pub use query::QueryPipeline;
pub use retriever::Retriever;
pub use types::{Answer, SourceRef};
