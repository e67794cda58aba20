//! Import command handler.

use askfaq_core::{config::AppConfig, AppResult};
use clap::Args;
use std::path::PathBuf;

/// Add pre-computed embeddings from a JSON file
#[derive(Args, Debug)]
pub struct ImportCommand {
    /// JSON array of {id, embedding, metadata} records
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ImportCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing import command for {:?}", self.file);

        let stats = askfaq_index::import(config, &self.file)?;

        if self.json {
            let output = serde_json::json!({
                "index": config.index_name,
                "records": stats.records,
                "documentIds": stats.document_ids,
                "chunksReplaced": stats.chunks_replaced,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Imported {} records for {} documents into '{}'",
                stats.records,
                stats.document_ids.len(),
                config.index_name
            );
        }

        Ok(())
    }
}
