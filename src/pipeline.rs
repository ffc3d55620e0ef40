//! Store-analyze-store sequence shared by the HTTP intake and replay.

use anyhow::{Context, Result};
use tracing::info;

use crate::alert::Alert;
use crate::storage::{self, Pool};
use crate::triage::{Resolution, Resolver};

/// Persist `alert`, triage it, and persist the verdict.
///
/// SQLite work runs on the blocking pool; the model call is the only await
/// point that can take long, and it is bounded by the backend timeout.
pub async fn process_alert(pool: &Pool, resolver: &Resolver, alert: Alert) -> Result<(i64, Resolution)> {
    let alert_id = {
        let pool = pool.clone();
        let alert = alert.clone();
        tokio::task::spawn_blocking(move || storage::records::save_alert(&pool, &alert))
            .await
            .context("alert insert task panicked")??
    };

    let resolution = resolver.resolve(&alert).await;

    {
        let pool = pool.clone();
        let resolution = resolution.clone();
        tokio::task::spawn_blocking(move || {
            storage::records::save_verdict(&pool, alert_id, &resolution)
        })
        .await
        .context("verdict insert task panicked")??;
    }

    info!(
        alert_id,
        tipo_ataque = resolution.verdict.attack_type(),
        criticidade = %resolution.verdict.criticality(),
        source = %resolution.source,
        "alert analysed"
    );

    Ok((alert_id, resolution))
}
