//! Example demonstrating match engine tracing instrumentation.
//!
//! Run with: cargo run -p photomatch-core --example engine_tracing

use std::sync::Arc;

use photomatch_core::{
    EngineConfig, Fingerprint, InMemoryStore, Item, MatchEngine, MediaKind, ReferenceEntry,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("photomatch_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .init();

    println!("=== Match Engine Tracing Demo ===\n");

    let store = Arc::new(InMemoryStore::new());

    let mut item = Item::new(1, MediaKind::Video);
    item.thumbnail_hash = Some(Fingerprint::from_u64(0xFF00_FF00_FF00_FF00));
    item.content_hash = Some(Fingerprint::from_u64(0xFF00_FF00_FF00_FF0F));
    store.insert_item(item);

    for (id, hash, location) in [
        (10, 0xFF00_FF00_FF00_FF01_u64, None),
        (11, 0xFF00_FF00_FF00_FF1F_u64, Some("Lisbon")),
    ] {
        let mut entry = ReferenceEntry::new(id, MediaKind::Video);
        entry.thumbnail_hash = Some(Fingerprint::from_u64(hash));
        entry.location = location.map(String::from);
        store.insert_reference(entry);
    }

    let engine = MatchEngine::new(store, EngineConfig::default());

    let task = match engine.next_match_task(0).await {
        Ok(task) => task,
        Err(e) => {
            eprintln!("Failed to build task: {e}");
            return;
        }
    };

    println!("\nCandidates: {}", task.candidates.len());
    for candidate in &task.candidates {
        println!(
            "   {} thumb_distance={:?} location={:?}",
            candidate.id(),
            candidate.thumb_distance,
            candidate.reference.location
        );
    }

    match task.auto_select_id {
        Some(id) => match engine.commit_match(1, Some(id), false).await {
            Ok(outcome) => println!("\nCommitted {id}: {}", outcome.item.match_state),
            Err(e) => println!("\nCommit failed: {e}"),
        },
        None => println!("\nNo auto-selection, left for review"),
    }
}
