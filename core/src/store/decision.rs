//! Store methods for the flat decision log read by the instructor dashboard.

use crate::{
    dashboard::DecisionRow,
    error::SimResult,
    types::{Money, Round},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::SimStore;

pub(super) fn insert_decision(
    conn:        &Connection,
    run_id:      &str,
    recorded_at: DateTime<Utc>,
    team:        &str,
    round:       Round,
    decision:    &str,
    cost:        Money,
) -> SimResult<()> {
    conn.execute(
        "INSERT INTO decision_log (run_id, recorded_at, team, round, decision, cost)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![run_id, recorded_at.to_rfc3339(), team, round, decision, cost],
    )?;
    Ok(())
}

impl SimStore {
    /// Decision rows in log order, for one run or for every run.
    pub fn decision_rows(&self, run_id: Option<&str>) -> SimResult<Vec<DecisionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT recorded_at, team, round, decision, cost
             FROM decision_log
             WHERE ?1 IS NULL OR run_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(DecisionRow {
                    timestamp: row.get(0)?,
                    team:      row.get(1)?,
                    round:     Some(row.get(2)?),
                    decision:  row.get(3)?,
                    cost:      Some(row.get(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Test / summary helpers ────────────────────────────────────────

    /// Number of event log entries for a run (for tests).
    pub fn event_count(&self, run_id: &str) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
