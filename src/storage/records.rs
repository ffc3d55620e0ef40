use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::Pool;
use crate::alert::{Alert, UNKNOWN};
use crate::triage::{Criticality, Resolution};

/// Severity stored when the alert carries none (Suricata's lowest).
const DEFAULT_SEVERITY: i64 = 3;

/// Number of attack types reported by [`stats`].
const TOP_ATTACKS: usize = 10;

/// A persisted alert, with its verdict once analysis has finished.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAlert {
    pub id: i64,
    pub received_at: String,
    pub event_type: String,
    pub src_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub src_port: Option<i64>,
    pub dest_port: Option<i64>,
    pub protocol: Option<String>,
    pub signature: String,
    pub severity: i64,
    pub verdict: Option<StoredVerdict>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredVerdict {
    pub tipo_ataque: String,
    pub resumo: String,
    pub criticidade: String,
    pub acao_recomendada: String,
    pub source: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttackCount {
    pub tipo: String,
    pub count: i64,
}

/// Aggregate figures over everything stored.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_alerts: i64,
    pub alta_criticidade: i64,
    pub media_criticidade: i64,
    pub baixa_criticidade: i64,
    pub pending: i64,
    pub top_attacks: Vec<AttackCount>,
}

/// Store the raw alert. Returns its row id.
pub fn save_alert(pool: &Pool, alert: &Alert) -> Result<i64> {
    let conn = pool.get()?;
    let raw_json = serde_json::to_string(alert.as_map())?;

    conn.execute(
        "INSERT INTO alerts (received_at, event_type, src_ip, dest_ip, src_port, dest_port,
                             protocol, signature, severity, raw_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            Utc::now().to_rfc3339(),
            alert.event_type().unwrap_or_else(|| UNKNOWN.to_string()),
            alert.src_ip(),
            alert.dest_ip(),
            alert.src_port_number(),
            alert.dest_port_number(),
            alert.proto(),
            alert.resolved_signature(),
            alert.severity_level().unwrap_or(DEFAULT_SEVERITY),
            raw_json,
        ],
    )
    .context("failed to insert alert")?;

    Ok(conn.last_insert_rowid())
}

/// Store the verdict for a previously saved alert.
pub fn save_verdict(pool: &Pool, alert_id: i64, resolution: &Resolution) -> Result<i64> {
    let conn = pool.get()?;
    let v = &resolution.verdict;

    conn.execute(
        "INSERT INTO verdicts (alert_id, created_at, tipo_ataque, resumo, criticidade,
                               acao_recomendada, source, raw_response)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            alert_id,
            Utc::now().to_rfc3339(),
            v.attack_type(),
            v.summary(),
            v.criticality().as_str(),
            v.recommended_action(),
            resolution.source.as_str(),
            resolution.raw_response,
        ],
    )
    .with_context(|| format!("failed to insert verdict for alert {}", alert_id))?;

    Ok(conn.last_insert_rowid())
}

const SELECT_ALERTS: &str = "SELECT a.id, a.received_at, a.event_type, a.src_ip, a.dest_ip,
        a.src_port, a.dest_port, a.protocol, a.signature, a.severity,
        v.tipo_ataque, v.resumo, v.criticidade, v.acao_recomendada, v.source, v.created_at
     FROM alerts a
     LEFT JOIN verdicts v ON v.alert_id = a.id";

/// Most recent alerts first, optionally only those with a given criticality.
pub fn list_recent(
    pool: &Pool,
    limit: usize,
    criticality: Option<Criticality>,
) -> Result<Vec<StoredAlert>> {
    let conn = pool.get()?;
    let sql = format!(
        "{} WHERE (?1 IS NULL OR v.criticidade = ?1) ORDER BY a.id DESC LIMIT ?2",
        SELECT_ALERTS
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(
        params![criticality.map(|c| c.as_str()), limit as i64],
        stored_alert,
    )?;

    let mut alerts = Vec::new();
    for r in rows {
        alerts.push(r?);
    }
    Ok(alerts)
}

pub fn get_alert(pool: &Pool, id: i64) -> Result<Option<StoredAlert>> {
    let conn = pool.get()?;
    let sql = format!("{} WHERE a.id = ?1", SELECT_ALERTS);
    let alert = conn.query_row(&sql, params![id], stored_alert).optional()?;
    Ok(alert)
}

pub fn stats(pool: &Pool) -> Result<Stats> {
    let conn = pool.get()?;

    let total_alerts: i64 = conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
    let count_level = |level: Criticality| -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM verdicts WHERE criticidade = ?1",
            params![level.as_str()],
            |row| row.get(0),
        )?)
    };
    let alta = count_level(Criticality::High)?;
    let media = count_level(Criticality::Medium)?;
    let baixa = count_level(Criticality::Low)?;
    let analysed: i64 = conn.query_row("SELECT COUNT(*) FROM verdicts", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT tipo_ataque, COUNT(*) AS n FROM verdicts
         GROUP BY tipo_ataque ORDER BY n DESC, tipo_ataque ASC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![TOP_ATTACKS as i64], |row| {
        Ok(AttackCount {
            tipo: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut top_attacks = Vec::new();
    for r in rows {
        top_attacks.push(r?);
    }

    Ok(Stats {
        total_alerts,
        alta_criticidade: alta,
        media_criticidade: media,
        baixa_criticidade: baixa,
        pending: (total_alerts - analysed).max(0),
        top_attacks,
    })
}

fn stored_alert(row: &Row<'_>) -> rusqlite::Result<StoredAlert> {
    let tipo: Option<String> = row.get(10)?;
    let verdict = match tipo {
        Some(tipo_ataque) => Some(StoredVerdict {
            tipo_ataque,
            resumo: row.get(11)?,
            criticidade: row.get(12)?,
            acao_recomendada: row.get(13)?,
            source: row.get(14)?,
            created_at: row.get(15)?,
        }),
        None => None,
    };

    Ok(StoredAlert {
        id: row.get(0)?,
        received_at: row.get(1)?,
        event_type: row.get(2)?,
        src_ip: row.get(3)?,
        dest_ip: row.get(4)?,
        src_port: row.get(5)?,
        dest_port: row.get(6)?,
        protocol: row.get(7)?,
        signature: row.get(8)?,
        severity: row.get(9)?,
        verdict,
    })
}
