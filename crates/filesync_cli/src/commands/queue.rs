//! Inspect and clear the Redis delay queue.

use crate::commands::open_queue;
use crate::config::AppConfig;
use crate::error::CliResult;
use filesync_queue::{DelayedQueue, QueueListing};

/// Prints up to `limit` pending entries, soonest first.
pub async fn list(config: &AppConfig, limit: usize, format: &str) -> CliResult<()> {
    let queue = open_queue(config).await?;
    let size = queue.size().await?;
    let entries = queue.list(limit).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", render_text(queue.key(), size, &entries));
    }
    Ok(())
}

/// Removes every pending entry.
pub async fn flush(config: &AppConfig) -> CliResult<()> {
    let queue = open_queue(config).await?;
    let removed = queue.flush().await?;
    println!("flushed {removed} entries from {}", queue.key());
    Ok(())
}

fn render_text(key: &str, size: usize, entries: &[QueueListing]) -> String {
    let mut out = format!("Queue {key}: {size} pending\n");
    for entry in entries {
        out.push_str(&format!(
            "  {:<36}  {:<6}  {:<40}  retries={}  due={}",
            entry.id.as_deref().unwrap_or("-"),
            entry.verb,
            entry.path,
            entry.retry_count,
            entry.not_before,
        ));
        if let Some(error) = &entry.last_error {
            out.push_str(&format!("  last_error={error:?}"));
        }
        out.push('\n');
    }
    out
}
