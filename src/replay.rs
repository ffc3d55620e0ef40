//! One-shot replay of a Suricata EVE JSON-lines file through the pipeline.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::alert::Alert;
use crate::pipeline;
use crate::storage::Pool;
use crate::triage::Resolver;

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Pause after each submitted alert.
    pub delay: Duration,
    /// Submit every event, not just `event_type == "alert"`.
    pub all_events: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Non-blank lines read.
    pub lines: usize,
    pub submitted: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub failed: usize,
}

/// Read `path` from start to end and analyse each selected event in turn.
pub async fn replay_file(
    path: &Path,
    pool: &Pool,
    resolver: &Resolver,
    opts: &ReplayOptions,
) -> Result<ReplaySummary> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open EVE file: {}", path.display()))?;
    let mut segments = BufReader::new(file).split(b'\n');
    let mut summary = ReplaySummary::default();
    let mut line_no = 0usize;

    while let Some(raw) = segments
        .next_segment()
        .await
        .with_context(|| format!("failed to read EVE file: {}", path.display()))?
    {
        line_no += 1;
        let Ok(text) = std::str::from_utf8(&raw) else {
            warn!(line = line_no, "skipping EVE line that is not valid UTF-8");
            summary.lines += 1;
            summary.invalid += 1;
            continue;
        };
        let line = text.trim();
        if line.is_empty() {
            continue;
        }
        summary.lines += 1;

        let alert = match serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(Alert::from_value)
        {
            Some(alert) => alert,
            None => {
                warn!(line = line_no, "skipping unparseable EVE line");
                summary.invalid += 1;
                continue;
            }
        };

        if !opts.all_events && alert.event_type().as_deref() != Some("alert") {
            summary.skipped += 1;
            continue;
        }

        info!(signature = %alert.resolved_signature(), "replaying alert");
        match pipeline::process_alert(pool, resolver, alert).await {
            Ok(_) => summary.submitted += 1,
            Err(e) => {
                warn!(error = %e, "failed to process replayed alert");
                summary.failed += 1;
            }
        }

        if !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }
    }

    info!(?summary, "replay finished");
    Ok(summary)
}
