//! Stats command handler.

use askfaq_core::{config::AppConfig, AppResult};
use askfaq_index::IndexState;
use clap::Args;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for index '{}'", config.index_name);

        let summary = askfaq_index::stats(config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }

        let state = match summary.stats.state {
            IndexState::Empty => "empty",
            IndexState::Populated => "populated",
        };

        println!("Index: {} ({})", summary.index_name, state);
        println!("  Dimension:       {}", summary.stats.dimension);
        println!("  Entries:         {}", summary.stats.entries);
        println!("  Documents:       {}", summary.stats.documents);
        println!("  Processed files: {}", summary.processed_files);
        println!("  Size on disk:    {} bytes", summary.size_bytes);

        Ok(())
    }
}
