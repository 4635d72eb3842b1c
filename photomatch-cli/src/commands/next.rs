//! Next command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::client::ApiClient;
use crate::utils::print_task;

/// Execute the next command.
pub async fn execute(client: &ApiClient, offset: u64, json: bool) -> Result<()> {
    let task = client
        .next_task(offset)
        .await
        .with_context(|| format!("Failed to fetch task at offset {offset}"))?;

    info!(
        item_id = task.item.as_ref().map(|i| i.id),
        candidates = task.candidates.len(),
        auto_select_id = task.auto_select_id,
        "Fetched task"
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&task).context("Failed to serialize task")?
        );
    } else {
        print_task(&task);
    }

    Ok(())
}
