//! Ingest command handler.
//!
//! Embeds chunk files and adds them to the index.

use askfaq_core::{config::AppConfig, AppResult};
use askfaq_index::IngestOptions;
use clap::Args;
use std::path::PathBuf;

/// Embed chunk files (.json, .txt) into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Re-embed files that were already processed
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for index '{}'", config.index_name);

        let options = IngestOptions {
            paths: self.paths.clone(),
            force: self.force,
        };

        let stats = askfaq_index::ingest(config, options).await?;

        if self.json {
            let output = serde_json::json!({
                "index": config.index_name,
                "filesIngested": stats.files_ingested,
                "filesSkipped": stats.files_skipped,
                "filesFailed": stats.files_failed,
                "chunksAdded": stats.chunks_added,
                "chunksReplaced": stats.chunks_replaced,
                "documentIds": stats.document_ids,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} files ({} chunks, {} replaced) in {:.2}s",
                stats.files_ingested, stats.chunks_added, stats.chunks_replaced, stats.duration_secs
            );
            if stats.files_skipped > 0 {
                println!(
                    "Skipped {} already processed files (use --force to re-embed)",
                    stats.files_skipped
                );
            }
            if stats.files_failed > 0 {
                println!("Failed to ingest {} files (see log)", stats.files_failed);
            }
        }

        Ok(())
    }
}
