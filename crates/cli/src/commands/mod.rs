//! Command handlers for the askfaq CLI.
//!
//! Each subcommand lives in its own module.

pub mod import;
pub mod ingest;
pub mod remove;
pub mod search;
pub mod stats;

// Re-export command types for convenience
pub use import::ImportCommand;
pub use ingest::IngestCommand;
pub use remove::RemoveCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;
