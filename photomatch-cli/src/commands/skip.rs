//! Skip command implementation.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::client::ApiClient;

/// Execute the skip command.
pub async fn execute(client: &ApiClient, item_id: i64, quiet: bool) -> Result<()> {
    let response = client
        .skip(item_id)
        .await
        .with_context(|| format!("Failed to skip item {item_id}"))?;

    if !quiet {
        if response.changed {
            println!("{} item {}", "Skipped".green().bold(), item_id);
        } else {
            println!("Item {} {}", item_id, "was already skipped".dimmed());
        }
    }

    Ok(())
}
