//! Commit and rematch command implementations.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::api::CommitResponse;
use crate::client::ApiClient;

/// Confirm `reference_id` as the match for `item_id`, or "no match" when `None`.
pub async fn execute(
    client: &ApiClient,
    item_id: i64,
    reference_id: Option<i64>,
    quiet: bool,
) -> Result<()> {
    let response = client
        .commit(item_id, reference_id, false, 0)
        .await
        .with_context(|| format!("Failed to commit item {item_id}"))?;

    info!(item_id, reference_id, changed = response.changed, "Committed");

    if !quiet {
        let decision = match reference_id {
            Some(id) => format!("matched to {id}"),
            None => "confirmed as no match".to_string(),
        };
        report(&response, &decision);
    }

    Ok(())
}

/// Drop an item's precomputed candidate set so it is retrieved live.
pub async fn execute_rematch(client: &ApiClient, item_id: i64, quiet: bool) -> Result<()> {
    let response = client
        .commit(item_id, None, true, 0)
        .await
        .with_context(|| format!("Failed to request rematch for item {item_id}"))?;

    info!(item_id, changed = response.changed, "Rematch requested");

    if !quiet {
        report(&response, "queued for live retrieval");
    }

    Ok(())
}

fn report(response: &CommitResponse, decision: &str) {
    if response.changed {
        println!(
            "{} item {} {} ({})",
            "OK".green().bold(),
            response.item_id,
            decision,
            response.match_state
        );
    } else {
        println!(
            "Item {} {}",
            response.item_id,
            format!("already {} ({decision})", response.match_state).dimmed()
        );
    }
}
