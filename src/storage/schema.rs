//! Database schema.

use anyhow::Result;
use rusqlite::Connection;

/// Create tables and indices if missing. Safe to run on every start.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS alerts (
            id INTEGER PRIMARY KEY,
            received_at TEXT NOT NULL,
            event_type TEXT NOT NULL,
            src_ip TEXT,
            dest_ip TEXT,
            src_port INTEGER,
            dest_port INTEGER,
            protocol TEXT,
            signature TEXT NOT NULL,
            severity INTEGER NOT NULL DEFAULT 3,
            raw_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS verdicts (
            id INTEGER PRIMARY KEY,
            alert_id INTEGER NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            tipo_ataque TEXT NOT NULL,
            resumo TEXT NOT NULL,
            criticidade TEXT NOT NULL,
            acao_recomendada TEXT NOT NULL,
            source TEXT NOT NULL,
            raw_response TEXT,
            FOREIGN KEY (alert_id) REFERENCES alerts(id)
        );

        CREATE INDEX IF NOT EXISTS idx_alerts_received ON alerts(received_at);
        CREATE INDEX IF NOT EXISTS idx_verdicts_criticidade ON verdicts(criticidade);
        CREATE INDEX IF NOT EXISTS idx_verdicts_tipo ON verdicts(tipo_ataque);",
    )?;
    Ok(())
}
