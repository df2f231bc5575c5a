//! SQLite persistence layer: the optional append-only classroom log.
//!
//! RULE: Only store/ talks to the database.
//! The engine never calls the store; the runner records the events
//! the engine returns.

use crate::{
    error::SimResult,
    event::{EventLogEntry, SimEvent},
    snapshot::SessionSnapshot,
};
mod decision;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the classroom database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: the dashboard may read while a session writes.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_decision_log.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    /// Register a run. Re-registering the same run id is a no-op so a
    /// runner can reattach to an existing log.
    pub fn insert_run(&self, run_id: &str, seed: u64, variant_id: &str, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO run (run_id, seed, variant_id, version, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, seed as i64, variant_id, version, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    /// Append engine events to the log in one transaction. Decision events
    /// also land in decision_log for the instructor dashboard.
    pub fn record(&mut self, run_id: &str, events: &[SimEvent]) -> SimResult<()> {
        let recorded_at = Utc::now();
        let tx = self.conn.transaction()?;
        for event in events {
            tx.execute(
                "INSERT INTO event_log (run_id, team, recorded_at, event_type, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_id,
                    event.team(),
                    recorded_at.to_rfc3339(),
                    event.type_name(),
                    serde_json::to_string(event)?,
                ],
            )?;
            if let SimEvent::DecisionSubmitted { team, round, labels, cost, .. } = event {
                decision::insert_decision(&tx, run_id, recorded_at, team, *round, &labels.join(" + "), *cost)?;
            }
        }
        tx.commit()?;
        log::debug!("run={run_id} recorded {} event(s)", events.len());
        Ok(())
    }

    pub fn events_for_team(&self, run_id: &str, team: &str) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, team, recorded_at, event_type, payload
             FROM event_log WHERE run_id = ?1 AND team = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, team], |row| {
                Ok(EventLogEntry {
                    id:          Some(row.get(0)?),
                    run_id:      row.get(1)?,
                    team:        row.get(2)?,
                    recorded_at: parse_time(row.get::<_, String>(3)?, 3)?,
                    event_type:  row.get(4)?,
                    payload:     row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Snapshot ───────────────────────────────────────────────

    /// Keep the latest snapshot per team.
    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshot (run_id, team, taken_at, state_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.run_id,
                snapshot.team,
                snapshot.taken_at.to_rfc3339(),
                serde_json::to_string(snapshot)?,
            ],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self, run_id: &str, team: &str) -> SimResult<Option<SessionSnapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM snapshot WHERE run_id = ?1 AND team = ?2",
                params![run_id, team],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

/// Parse an RFC 3339 column, mapping failures to a rusqlite conversion error.
fn parse_time(raw: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}
