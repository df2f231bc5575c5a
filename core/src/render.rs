//! Rendering: pure functions from state to something a person reads.
//!
//! Nothing here mutates a session or draws a random number. Showing the
//! same state twice shows the same screen, scenario included.

use crate::{
    access::{Department, Role},
    config::{SlotConfig, VariantCatalog},
    dashboard::InstructorDashboard,
    phase::SessionPhase,
    scoring::FinalSummary,
    state::SessionState,
    types::{Money, Round},
};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub choice_id: String,
    pub label:     String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub slot_id: String,
    pub prompt:  String,
    pub options: Vec<OptionView>,
}

impl From<&SlotConfig> for SlotView {
    fn from(slot: &SlotConfig) -> Self {
        Self {
            slot_id: slot.slot_id.clone(),
            prompt:  slot.prompt.clone(),
            options: slot
                .options
                .iter()
                .map(|o| OptionView {
                    choice_id: o.choice_id.clone(),
                    label:     o.label.clone(),
                })
                .collect(),
        }
    }
}

/// Everything a front end needs to draw one team's screen.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub team:        String,
    pub variant_id:  String,
    pub title:       String,
    /// The department's mission when the team name is a selector role.
    pub mission:     Option<String>,
    pub phase:       SessionPhase,
    pub round:       Round,
    pub round_title: Option<String>,
    pub scenario:    Option<String>,
    pub briefing:    Option<String>,
    pub slots:       Vec<SlotView>,
    pub budget:      Money,
    pub morale:      i64,
    pub adoption:    i64,
    pub roi:         i64,
    pub history:     Vec<String>,
    pub summary:     Option<FinalSummary>,
}

impl SessionView {
    pub fn of(team: &str, catalog: &VariantCatalog, state: &SessionState) -> Self {
        let round_config = catalog.round(state.round);
        let scenario = state
            .active_scenario
            .as_deref()
            .and_then(|name| round_config.and_then(|r| r.scenario(name)));
        let slots = round_config
            .and_then(|r| r.active_slots(state.active_scenario.as_deref()))
            .unwrap_or_default()
            .iter()
            .map(SlotView::from)
            .collect();

        Self {
            team:        team.to_string(),
            variant_id:  catalog.variant_id.clone(),
            title:       catalog.title.clone(),
            mission:     Role::parse(team)
                .and_then(|r| r.department())
                .map(|d| d.mission().to_string()),
            phase:       state.phase(catalog),
            round:       state.round,
            round_title: round_config.map(|r| r.title.clone()),
            scenario:    scenario.map(|s| s.name.clone()),
            briefing:    scenario.map(|s| s.briefing.clone()).filter(|b| !b.is_empty()),
            slots,
            budget:      state.budget,
            morale:      state.morale,
            adoption:    state.adoption,
            roi:         state.roi,
            history:     state.history.clone(),
            summary:     FinalSummary::of(catalog, state),
        }
    }
}

/// Format whole PLN with thousands separators: 1000000 -> "1,000,000 PLN".
pub fn money(amount: Money) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} PLN")
}

/// The text screen for one team.
pub fn screen(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} | {} ===", view.title, view.team);
    if let Some(mission) = &view.mission {
        let _ = writeln!(out, "Mission: {mission}");
    }
    let _ = writeln!(
        out,
        "  budget: {}  morale: {}  adoption: {}  roi: {}",
        money(view.budget),
        view.morale,
        view.adoption,
        view.roi
    );

    if !view.history.is_empty() {
        let _ = writeln!(out, "\nDecisions so far:");
        for entry in &view.history {
            let _ = writeln!(out, "  - {entry}");
        }
    }

    match &view.summary {
        Some(summary) => out.push_str(&final_summary(summary)),
        None => {
            if let Some(title) = &view.round_title {
                let _ = writeln!(out, "\n--- {title} ---");
            }
            if let Some(scenario) = &view.scenario {
                let _ = writeln!(out, "Scenario: {scenario}");
                if let Some(briefing) = &view.briefing {
                    let _ = writeln!(out, "  {briefing}");
                }
            }
            for (index, slot) in view.slots.iter().enumerate() {
                let _ = writeln!(out, "\nDecision {}: {}", index + 1, slot.prompt);
                for option in &slot.options {
                    let _ = writeln!(out, "  [{}] {}", option.choice_id, option.label);
                }
            }
        }
    }
    out
}

pub fn final_summary(summary: &FinalSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== FINAL SUMMARY ===");
    let _ = writeln!(out, "  final score: {}", summary.final_score);
    let _ = writeln!(out, "  outcome:     {}", summary.outcome.label());
    let _ = writeln!(out, "  budget:      {}", money(summary.budget));
    if summary.bankrupt {
        let _ = writeln!(out, "  WARNING: budget overspent, the program is bankrupt.");
    }
    out
}

/// The change-management debrief shown to a department after submitting.
pub fn insight(department: Department) -> Option<String> {
    department.insight().map(|concept| {
        format!(
            "Change Management Concept for {}:\n  {concept}",
            department.label()
        )
    })
}

pub fn dashboard(view: &InstructorDashboard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Classroom Control Center ===");
    let _ = writeln!(out, "  active teams:      {}", view.metrics.active_teams);
    let _ = writeln!(out, "  decisions made:    {}", view.metrics.total_decisions);
    let _ = writeln!(out, "  budget committed:  {}", money(view.metrics.total_committed));

    let _ = writeln!(out, "\n--- Live Decision Matrix ---");
    if view.rows.is_empty() {
        let _ = writeln!(out, "  (no decisions yet)");
    }
    for row in &view.rows {
        let round = row.round.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
        let cost = row.cost.map(money).unwrap_or_else(|| "-".into());
        let _ = writeln!(
            out,
            "  {} | {} | round {} | {} | {}",
            row.timestamp, row.team, round, row.decision, cost
        );
    }

    if !view.triggers.is_empty() {
        let _ = writeln!(out, "\n--- Discussion Triggers ---");
        for message in &view.triggers {
            let _ = writeln!(out, "  * {message}");
        }
    }
    out
}
