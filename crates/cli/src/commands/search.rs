//! Search command handler.
//!
//! Embeds a query and prints the nearest entries.

use askfaq_core::{config::AppConfig, AppResult};
use askfaq_index::SearchHit;
use clap::Args;

/// Longest text excerpt shown per hit in human-readable output
const EXCERPT_CHARS: usize = 160;

/// Search the index
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of results to return
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command on index '{}'", config.index_name);

        let hits = askfaq_index::search(config, &self.query, self.top_k).await?;
        let matches: Vec<&SearchHit> = hits.iter().filter(|h| h.is_match()).collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&matches)?);
            return Ok(());
        }

        if matches.is_empty() {
            println!("No results (index '{}' is empty)", config.index_name);
            return Ok(());
        }

        for (rank, hit) in matches.iter().enumerate() {
            let field = |key: &str| {
                hit.metadata
                    .as_ref()
                    .and_then(|m| m.get(key))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            };

            println!(
                "{}. [{:.4}] {} ({})",
                rank + 1,
                hit.distance,
                field("filename"),
                hit.document_id.as_deref().unwrap_or("-")
            );

            let text = field("text");
            if !text.is_empty() {
                println!("   {}", excerpt(&text));
            }
        }

        Ok(())
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}
