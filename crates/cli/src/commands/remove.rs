//! Remove command handler.

use askfaq_core::{config::AppConfig, AppResult};
use clap::Args;

/// Remove every entry of one or more documents
#[derive(Args, Debug)]
pub struct RemoveCommand {
    /// Document ids to remove
    #[arg(required = true)]
    pub doc_ids: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RemoveCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing remove command for {} document ids", self.doc_ids.len());

        let report = askfaq_index::remove(config, &self.doc_ids)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.is_noop() {
            println!("No entries found for {}", self.doc_ids.join(", "));
        } else {
            println!(
                "Removed {} entries for {}",
                report.removed,
                self.doc_ids.join(", ")
            );
        }

        Ok(())
    }
}
