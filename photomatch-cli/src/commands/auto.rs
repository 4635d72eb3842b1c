//! Auto command: commit every auto-selected match in the queue.

use anyhow::{Context, Result};
use colored::Colorize;
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::api::MatchTask;
use crate::client::ApiClient;

/// What to do with the task at the current offset.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Queue exhausted.
    Stop,
    /// Commit `reference_id`; the item leaves the queue so the offset stays.
    Commit { item_id: i64, reference_id: i64 },
    /// Leave the item to a reviewer and move past it.
    Advance,
}

fn plan_step(task: &MatchTask, dry_run: bool) -> Step {
    let Some(item) = &task.item else {
        return Step::Stop;
    };
    match task.auto_select_id {
        Some(reference_id) if !dry_run => Step::Commit {
            item_id: item.id,
            reference_id,
        },
        _ => Step::Advance,
    }
}

#[derive(Debug, Default)]
struct Summary {
    committed: u64,
    would_commit: u64,
    left_for_review: u64,
    conflicts: u64,
}

/// Execute the auto command over at most `limit` tasks.
pub async fn execute(client: &ApiClient, limit: u64, dry_run: bool, quiet: bool) -> Result<()> {
    let mut summary = Summary::default();
    let mut offset = 0;

    for _ in 0..limit {
        let task = client
            .next_task(offset)
            .await
            .with_context(|| format!("Failed to fetch task at offset {offset}"))?;

        match plan_step(&task, dry_run) {
            Step::Stop => break,
            Step::Advance => {
                if let (Some(item), Some(reference_id)) = (&task.item, task.auto_select_id) {
                    summary.would_commit += 1;
                    if !quiet {
                        println!("{} item {} -> {}", "would match".cyan(), item.id, reference_id);
                    }
                } else {
                    summary.left_for_review += 1;
                }
                offset += 1;
            }
            Step::Commit {
                item_id,
                reference_id,
            } => match client.commit(item_id, Some(reference_id), false, offset).await {
                Ok(response) => {
                    summary.committed += 1;
                    info!(item_id, reference_id, changed = response.changed, "Auto-committed");
                    if !quiet {
                        println!("{} item {} -> {}", "matched".green(), item_id, reference_id);
                    }
                }
                // Someone else decided first; the item is gone from the queue either way
                Err(e) if e.status() == Some(StatusCode::CONFLICT) => {
                    summary.conflicts += 1;
                    warn!(item_id, error = %e, "Skipping conflicting item");
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to commit item {item_id}"));
                }
            },
        }
    }

    info!(
        committed = summary.committed,
        would_commit = summary.would_commit,
        left_for_review = summary.left_for_review,
        conflicts = summary.conflicts,
        "Auto pass finished"
    );

    if !quiet {
        println!();
        if dry_run {
            println!("{} {} auto-selectable", "Dry run:".bold(), summary.would_commit);
        } else {
            println!("{} {} committed", "Done:".green().bold(), summary.committed);
        }
        println!(
            "   {} {}   {} {}",
            "left for review:".dimmed(),
            summary.left_for_review,
            "conflicts:".dimmed(),
            summary.conflicts
        );
    }

    Ok(())
}
