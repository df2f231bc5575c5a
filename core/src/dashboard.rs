//! Instructor dashboard: a read-only view over decision rows.
//!
//! The dashboard never touches session state. It reads a tabular snapshot
//! from some source (CSV file, published spreadsheet, or the local SQLite
//! decision log) and aggregates it.
//!
//! RULE: reading a snapshot is best effort. Any failure (missing file,
//! network, malformed CSV) degrades to an empty row set so the dashboard
//! stays usable.

use crate::{
    config::DiscussionTrigger,
    store::SimStore,
    types::{Money, Round},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeSet, io::Read, path::PathBuf};

/// One decision as the spreadsheet records it.
/// Column names follow the sheet ("Timestamp", "Team", ...); lowercase
/// headers are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRow {
    #[serde(rename = "Timestamp", alias = "timestamp", default)]
    pub timestamp: String,
    #[serde(rename = "Team", alias = "team")]
    pub team:      String,
    #[serde(rename = "Round", alias = "round", default, deserialize_with = "lenient_round")]
    pub round:     Option<Round>,
    #[serde(rename = "Decision", alias = "decision")]
    pub decision:  String,
    #[serde(rename = "Cost", alias = "cost", default, deserialize_with = "lenient_money")]
    pub cost:      Option<Money>,
}

/// Sheet exports format numbers loosely ("300000.0", "1,000 PLN"). A cell
/// that still does not parse blanks that cell, never the row.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches("PLN")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn lenient_money<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Money>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_number).map(|n| n.round() as Money))
}

fn lenient_round<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Round>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(parse_number)
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= Round::MAX as f64)
        .map(|n| n as Round))
}

impl DecisionRow {
    /// Best-effort parse of the timestamp column.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
            return Some(t.naive_utc());
        }
        const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S", "%d.%m.%Y %H:%M:%S"];
        FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

/// Anything the dashboard can read decision rows from.
pub trait SnapshotSource {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    fn fetch(&self) -> anyhow::Result<Vec<DecisionRow>>;
}

/// Parse CSV text into rows. Rows that do not fit the schema are skipped
/// with a warning rather than failing the whole read.
pub fn parse_csv<R: Read>(reader: R) -> anyhow::Result<Vec<DecisionRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (index, record) in reader.deserialize::<DecisionRow>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                log::debug!("snapshot row {} skipped: {e}", index + 1);
            }
        }
    }
    if skipped > 0 {
        log::warn!("snapshot: skipped {skipped} malformed row(s)");
    }
    Ok(rows)
}

// ── Sources ──────────────────────────────────────────────────────────

pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> anyhow::Result<Vec<DecisionRow>> {
        let file = std::fs::File::open(&self.path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", self.path.display()))?;
        parse_csv(file)
    }
}

/// A CSV published over HTTP. Google Sheets share links are rewritten to
/// their CSV export endpoint. Needs the `remote` feature.
pub struct HttpCsvSource {
    url:     String,
    #[cfg_attr(not(feature = "remote"), allow(dead_code))]
    timeout: std::time::Duration,
}

impl HttpCsvSource {
    pub fn new(url: &str) -> Self {
        Self {
            url:     export_url(url),
            timeout: std::time::Duration::from_secs(10),
        }
    }
}

impl SnapshotSource for HttpCsvSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> anyhow::Result<Vec<DecisionRow>> {
        #[cfg(feature = "remote")]
        {
            let client = reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()?;
            let response = client.get(&self.url).send()?.error_for_status()?;
            parse_csv(response)
        }

        #[cfg(not(feature = "remote"))]
        {
            Err(anyhow::anyhow!("remote feature not enabled"))
        }
    }
}

/// The local SQLite decision log written by the runner.
pub struct StoreSource {
    path:   String,
    run_id: Option<String>,
}

impl StoreSource {
    pub fn new(path: &str, run_id: Option<&str>) -> Self {
        Self {
            path:   path.to_string(),
            run_id: run_id.map(String::from),
        }
    }
}

impl SnapshotSource for StoreSource {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path)
    }

    fn fetch(&self) -> anyhow::Result<Vec<DecisionRow>> {
        if !std::path::Path::new(&self.path).exists() {
            anyhow::bail!("no decision log at {}", self.path);
        }
        let store = SimStore::open(&self.path)?;
        Ok(store.decision_rows(self.run_id.as_deref())?)
    }
}

/// Pick a source by the shape of `location`: http(s) URL, SQLite file
/// (`.db`, `.sqlite`, `.sqlite3`), or CSV file.
pub fn source_for(location: &str, run_id: Option<&str>) -> Box<dyn SnapshotSource> {
    let location = location.trim();
    if location.starts_with("http://") || location.starts_with("https://") {
        return Box::new(HttpCsvSource::new(location));
    }
    let is_sqlite = [".db", ".sqlite", ".sqlite3"]
        .iter()
        .any(|ext| location.ends_with(ext));
    if is_sqlite {
        Box::new(StoreSource::new(location, run_id))
    } else {
        Box::new(CsvFileSource::new(location))
    }
}

/// Rewrite a Google Sheets share link to its CSV export URL. Other URLs
/// pass through unchanged.
pub fn export_url(url: &str) -> String {
    if !url.contains("docs.google.com/spreadsheets/") || url.contains("/export?") {
        return url.to_string();
    }
    let base = match url.find("/edit") {
        Some(i) => &url[..i],
        None => url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/'),
    };
    format!("{base}/export?format=csv")
}

/// Read the snapshot, degrading to an empty set on any failure.
pub fn load_snapshot(source: &dyn SnapshotSource) -> Vec<DecisionRow> {
    match source.fetch() {
        Ok(rows) => {
            log::debug!("snapshot: {} row(s) from {}", rows.len(), source.describe());
            rows
        }
        Err(e) => {
            log::warn!("snapshot source {} unavailable: {e}", source.describe());
            Vec::new()
        }
    }
}

// ── Aggregation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardMetrics {
    pub active_teams:    usize,
    pub total_decisions: usize,
    pub total_committed: Money,
}

impl DashboardMetrics {
    pub fn from_rows(rows: &[DecisionRow]) -> Self {
        let teams: BTreeSet<&str> = rows
            .iter()
            .map(|r| r.team.trim())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            active_teams:    teams.len(),
            total_decisions: rows.len(),
            total_committed: rows.iter().filter_map(|r| r.cost).sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructorDashboard {
    /// Newest first. Rows with unparseable timestamps sink to the bottom.
    pub rows:     Vec<DecisionRow>,
    pub metrics:  DashboardMetrics,
    /// Messages of the discussion triggers that fired.
    pub triggers: Vec<String>,
}

impl InstructorDashboard {
    pub fn build(mut rows: Vec<DecisionRow>, triggers: &[DiscussionTrigger]) -> Self {
        let metrics = DashboardMetrics::from_rows(&rows);
        rows.sort_by(|a, b| {
            b.parsed_timestamp()
                .cmp(&a.parsed_timestamp())
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        let fired = triggers
            .iter()
            .filter(|t| trigger_fires(t, &rows))
            .map(|t| t.message.clone())
            .collect();
        Self { rows, metrics, triggers: fired }
    }
}

/// True when one team's decision mentions `first` and a different team's
/// decision mentions `second`.
fn trigger_fires(trigger: &DiscussionTrigger, rows: &[DecisionRow]) -> bool {
    let mentions = |row: &DecisionRow, needle: &str| {
        row.decision.to_lowercase().contains(&needle.to_lowercase())
    };
    rows.iter()
        .filter(|a| mentions(a, &trigger.first))
        .any(|a| {
            rows.iter()
                .any(|b| b.team.trim() != a.team.trim() && mentions(b, &trigger.second))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_share_links_become_csv_exports() {
        let id = "https://docs.google.com/spreadsheets/d/abc123";
        assert_eq!(export_url(&format!("{id}/edit?usp=sharing")), format!("{id}/export?format=csv"));
        assert_eq!(export_url(&format!("{id}/edit#gid=0")), format!("{id}/export?format=csv"));
        assert_eq!(export_url(id), format!("{id}/export?format=csv"));
        assert_eq!(export_url(&format!("{id}/export?format=csv")), format!("{id}/export?format=csv"));
        assert_eq!(export_url("https://example.com/data.csv"), "https://example.com/data.csv");
    }

    #[test]
    fn timestamps_parse_in_common_sheet_formats() {
        let row = |ts: &str| DecisionRow {
            timestamp: ts.into(),
            team:      "t".into(),
            round:     None,
            decision:  "d".into(),
            cost:      None,
        };
        assert!(row("2024-03-01T10:00:00Z").parsed_timestamp().is_some());
        assert!(row("2024-03-01 10:00:00").parsed_timestamp().is_some());
        assert!(row("3/1/2024 10:00:00").parsed_timestamp().is_some());
        assert!(row("2024-03-01").parsed_timestamp().is_some());
        assert!(row("yesterday").parsed_timestamp().is_none());
    }

    #[test]
    fn loosely_formatted_numbers_parse() {
        assert_eq!(parse_number("300000"), Some(300000.0));
        assert_eq!(parse_number(" 300000.0 "), Some(300000.0));
        assert_eq!(parse_number("1,000,000 PLN"), Some(1_000_000.0));
        assert_eq!(parse_number("lots"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn source_is_chosen_by_location_shape() {
        assert!(source_for("https://example.com/x.csv", None).describe().starts_with("https://"));
        assert!(source_for("run.db", None).describe().starts_with("sqlite:"));
        assert_eq!(source_for("decisions.csv", None).describe(), "decisions.csv");
    }
}
