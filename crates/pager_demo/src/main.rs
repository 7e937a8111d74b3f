//! Scrolls a paged window over a synthetic row source and prints what stays loaded.
//!
//! Usage: `pager_demo [config.json]`. Missing config fields fall back to defaults.
mod rows;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use pager_engine::{PageEventStorage, PageEventStream, PageFetcherSnapshot, PagingConfig};
use pager_logging::{pager_info, LevelFilter, LogDestination};

use crate::rows::RowSource;

const TOTAL_ROWS: usize = 500;
const START_ROW: usize = 200;
const SCROLL_STEPS: usize = 12;
const IDLE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    pager_logging::initialize(LogDestination::default_file(), LevelFilter::Debug);
    println!("logging to {}", pager_logging::DEFAULT_LOG_FILE);

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => PagingConfig::new(10).with_max_size(60),
    };
    config.validate()?;
    pager_info!("demo config: {:?}", config);

    let snapshot = PageFetcherSnapshot::new(
        Some(START_ROW),
        Arc::new(RowSource::new(TOTAL_ROWS)),
        config,
    )?;
    let mut events = snapshot.page_events()?;
    let mut storage = PageEventStorage::new();
    drain(&mut events, &mut storage).await;
    report("initial", &storage);

    // Scroll down, then back up past the starting point.
    let stride = config.page_size;
    let mut position = storage.snapshot().placeholders_before;
    let moves = (0..SCROLL_STEPS)
        .map(|_| stride as isize)
        .chain((0..SCROLL_STEPS * 2).map(|_| -(stride as isize)));
    for step in moves {
        position = position
            .saturating_add_signed(step)
            .min(storage.presented_len().saturating_sub(1));
        if let Some(hint) = storage.hint_for(position) {
            snapshot.add_hint(hint);
        }
        drain(&mut events, &mut storage).await;
        report(&format!("at {position}"), &storage);
    }

    match snapshot.refresh_key().await {
        Some(key) => println!("a new generation would resume at row {key}"),
        None => println!("nothing loaded; a new generation would start from the top"),
    }
    snapshot.close();
    Ok(())
}

fn load_config(path: &Path) -> Result<PagingConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Applies events until the snapshot has been quiet for [`IDLE`].
async fn drain(events: &mut PageEventStream<String>, storage: &mut PageEventStorage<String>) {
    while let Ok(Some(event)) = tokio::time::timeout(IDLE, events.next()).await {
        storage.add(event);
    }
}

fn report(label: &str, storage: &PageEventStorage<String>) {
    let snapshot = storage.snapshot();
    let first = snapshot.items.first().map(String::as_str).unwrap_or("-");
    let last = snapshot.items.last().map(String::as_str).unwrap_or("-");
    println!(
        "{label:>8}: {} loaded [{first} .. {last}], {} before, {} after, append {:?}, prepend {:?}",
        snapshot.items.len(),
        snapshot.placeholders_before,
        snapshot.placeholders_after,
        snapshot.source_states.append,
        snapshot.source_states.prepend,
    );
}
