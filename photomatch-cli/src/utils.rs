//! Formatting helpers shared across CLI commands.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::api::{CandidateView, MatchTask};

/// Format an optional capture time, `-` when unknown.
pub fn format_capture_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

/// Format a distance, `-` when undefined.
pub fn format_distance<T: std::fmt::Display>(distance: Option<T>) -> String {
    distance.map_or_else(|| "-".to_string(), |d| d.to_string())
}

fn candidate_row(candidate: &CandidateView, auto_select_id: Option<i64>) -> String {
    let marker = if auto_select_id == Some(candidate.id) {
        "*".green().bold().to_string()
    } else {
        " ".to_string()
    };

    format!(
        " {marker} {:>8}  {:<16}  {:>5}  {:>5}  {:<16}  {}",
        candidate.id,
        format_capture_time(candidate.capture_time),
        format_distance(candidate.hamming_distance),
        format_distance(candidate.thumb_distance),
        candidate.camera_name.as_deref().unwrap_or("-"),
        candidate.location.as_deref().unwrap_or("-"),
    )
}

/// Print a review task as a candidate table.
pub fn print_task(task: &MatchTask) {
    let Some(item) = &task.item else {
        println!(
            "{} ({} unresolved, offset {})",
            "Queue exhausted".yellow(),
            task.count,
            task.offset
        );
        return;
    };

    println!();
    println!(
        "{} {}  {}",
        "Item".bold(),
        item.id.to_string().bold(),
        item.filename.as_deref().unwrap_or("").dimmed()
    );
    println!(
        "   {} {}   {} {}   {} {}",
        "kind:".dimmed(),
        item.media_kind,
        "captured:".dimmed(),
        format_capture_time(item.capture_time),
        "remaining:".dimmed(),
        task.count
    );
    if item.has_precomputed_candidates {
        println!("   {}", "candidates are precomputed".dimmed());
    }

    println!();
    if task.candidates.is_empty() {
        println!("   {}", "No candidates".yellow());
    } else {
        println!(
            "   {:>8}  {:<16}  {:>5}  {:>5}  {:<16}  {}",
            "id", "captured", "dist", "thumb", "camera", "location"
        );
        for candidate in &task.candidates {
            println!("{}", candidate_row(candidate, task.auto_select_id));
        }
    }

    if !task.partner_candidates.is_empty() {
        println!();
        println!("   {}", "Partner candidates".bold());
        for candidate in &task.partner_candidates {
            println!("{}", candidate_row(candidate, None));
        }
    }

    if let Some(id) = task.auto_select_id {
        println!();
        println!("   {} {}", "Auto-select:".green().bold(), id);
    }
}
