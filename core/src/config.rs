//! Catalogs and run settings.
//!
//! A catalog is the versioned lookup table behind one simulation variant:
//! `(round, slot, choice) -> Effect`. Catalogs are plain data. The engine
//! only reads them; nothing here knows about session state.

use crate::{
    access::Department,
    error::{SimError, SimResult},
    types::{ChoiceId, Money, Round},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const BUILTIN_CATALOGS: [&str; 10] = [
    include_str!("../../data/catalogs/department_rollout.json"),
    include_str!("../../data/catalogs/enterprise_rollout.json"),
    include_str!("../../data/catalogs/change_pulse.json"),
    include_str!("../../data/catalogs/team_business.json"),
    include_str!("../../data/catalogs/team_it.json"),
    include_str!("../../data/catalogs/team_operations.json"),
    include_str!("../../data/catalogs/team_legal.json"),
    include_str!("../../data/catalogs/team_hr.json"),
    include_str!("../../data/catalogs/team_transformation.json"),
    include_str!("../../data/catalogs/team_communications.json"),
];

const BUILTIN_SETTINGS: &str = include_str!("../../data/settings.json");

/// The metric deltas one option applies. Missing fields default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Effect {
    pub budget_delta:   Money,
    pub morale_delta:   i64,
    pub adoption_delta: i64,
    pub roi_delta:      i64,
    pub sets_risk_flag: bool,
}

impl Effect {
    /// Sum two effects. The risk flag is sticky: either side sets it.
    pub fn combine(self, other: Effect) -> Effect {
        Effect {
            budget_delta:   self.budget_delta + other.budget_delta,
            morale_delta:   self.morale_delta + other.morale_delta,
            adoption_delta: self.adoption_delta + other.adoption_delta,
            roi_delta:      self.roi_delta + other.roi_delta,
            sets_risk_flag: self.sets_risk_flag || other.sets_risk_flag,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionConfig {
    pub choice_id: ChoiceId,
    pub label:     String,
    #[serde(default)]
    pub effect:    Effect,
}

impl OptionConfig {
    /// A choice may be submitted by its stable id or its exact label.
    pub fn matches(&self, choice: &str) -> bool {
        self.choice_id == choice || self.label == choice
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub slot_id: String,
    pub prompt:  String,
    pub options: Vec<OptionConfig>,
}

impl SlotConfig {
    pub fn find(&self, choice: &str) -> Option<&OptionConfig> {
        self.options.iter().find(|o| o.matches(choice))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name:     String,
    #[serde(default)]
    pub briefing: String,
    pub slots:    Vec<SlotConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundConfig {
    pub round: Round,
    pub title: String,
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
    /// Non-empty for rounds whose slots depend on a drawn scenario.
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
    /// Scenario forced when the session's risk flag is set on entry.
    #[serde(default)]
    pub risk_forced_scenario: Option<String>,
}

impl RoundConfig {
    pub fn is_scenario_round(&self) -> bool {
        !self.scenarios.is_empty()
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioConfig> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Slots active for this round given the persisted scenario.
    /// Returns None for a scenario round whose scenario is unknown.
    pub fn active_slots(&self, scenario: Option<&str>) -> Option<&[SlotConfig]> {
        if !self.is_scenario_round() {
            return Some(&self.slots);
        }
        scenario
            .and_then(|name| self.scenario(name))
            .map(|s| s.slots.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialState {
    pub budget:   Money,
    pub morale:   i64,
    pub adoption: i64,
    #[serde(default)]
    pub roi:      i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeThresholds {
    pub min_morale:   i64,
    pub min_adoption: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantCatalog {
    pub variant_id: String,
    pub version:    String,
    pub title:      String,
    /// Set on a department's own decision set; a team in that department
    /// plays this catalog when no variant is pinned.
    #[serde(default)]
    pub department: Option<Department>,
    pub initial:    InitialState,
    pub outcome:    OutcomeThresholds,
    pub rounds:     Vec<RoundConfig>,
}

impl VariantCatalog {
    /// Parse and validate a catalog from its JSON form.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let catalog: VariantCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The round value a session holds once every decision round is done.
    pub fn terminal_round(&self) -> Round {
        self.rounds.len() as Round + 1
    }

    pub fn round(&self, round: Round) -> Option<&RoundConfig> {
        self.rounds.iter().find(|r| r.round == round)
    }

    pub fn validate(&self) -> SimResult<()> {
        let invalid = |reason: String| SimError::InvalidCatalog {
            variant_id: self.variant_id.clone(),
            reason,
        };

        if self.rounds.is_empty() {
            return Err(invalid("catalog has no rounds".into()));
        }

        for (index, round) in self.rounds.iter().enumerate() {
            let expected = index as Round + 1;
            if round.round != expected {
                return Err(invalid(format!(
                    "round {} listed at position {expected}",
                    round.round
                )));
            }

            if round.is_scenario_round() {
                if expected == 1 {
                    return Err(invalid("round 1 cannot draw a scenario".into()));
                }
                if !round.slots.is_empty() {
                    return Err(invalid(format!(
                        "round {expected} mixes plain slots and scenarios"
                    )));
                }
                let mut names = HashSet::new();
                for scenario in &round.scenarios {
                    if !names.insert(scenario.name.as_str()) {
                        return Err(invalid(format!(
                            "round {expected} repeats scenario '{}'",
                            scenario.name
                        )));
                    }
                    if scenario.slots.is_empty() {
                        return Err(invalid(format!(
                            "scenario '{}' has no decision slots",
                            scenario.name
                        )));
                    }
                    validate_slots(&scenario.slots).map_err(invalid)?;
                }
                if let Some(forced) = &round.risk_forced_scenario {
                    if round.scenario(forced).is_none() {
                        return Err(invalid(format!(
                            "forced scenario '{forced}' is not defined in round {expected}"
                        )));
                    }
                }
            } else {
                if round.slots.is_empty() {
                    return Err(invalid(format!("round {expected} has no decision slots")));
                }
                if round.risk_forced_scenario.is_some() {
                    return Err(invalid(format!(
                        "round {expected} forces a scenario but defines none"
                    )));
                }
                validate_slots(&round.slots).map_err(invalid)?;
            }
        }
        Ok(())
    }
}

fn validate_slots(slots: &[SlotConfig]) -> Result<(), String> {
    let mut slot_ids = HashSet::new();
    for slot in slots {
        if !slot_ids.insert(slot.slot_id.as_str()) {
            return Err(format!("slot '{}' appears twice", slot.slot_id));
        }
        if slot.options.is_empty() {
            return Err(format!("slot '{}' has no options", slot.slot_id));
        }
        let mut keys = HashSet::new();
        for option in &slot.options {
            let fresh_id = keys.insert(option.choice_id.as_str());
            let fresh_label = option.label == option.choice_id || keys.insert(option.label.as_str());
            if !fresh_id || !fresh_label {
                return Err(format!(
                    "slot '{}' has an ambiguous option '{}'",
                    slot.slot_id, option.choice_id
                ));
            }
        }
    }
    Ok(())
}

/// Instructor dashboard rule: fires when one team's decision contains
/// `first` and a different team's decision contains `second`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionTrigger {
    pub first:   String,
    pub second:  String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    instructor_secret:   String,
    default_variant:     String,
    #[serde(default)]
    snapshot_source:     Option<String>,
    #[serde(default)]
    discussion_triggers: Vec<DiscussionTrigger>,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub catalogs:            HashMap<String, VariantCatalog>,
    pub default_variant:     String,
    pub instructor_secret:   String,
    /// CSV path, URL, or SQLite path the dashboard reads from.
    pub snapshot_source:     Option<String>,
    pub discussion_triggers: Vec<DiscussionTrigger>,
}

impl SimConfig {
    /// Load from the data/ directory: `settings.json` plus every
    /// `catalogs/*.json`.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let settings_path = format!("{data_dir}/settings.json");
        let settings_content = std::fs::read_to_string(&settings_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {settings_path}: {e}"))?;
        let settings: SettingsFile = serde_json::from_str(&settings_content)?;

        let catalog_dir = format!("{data_dir}/catalogs");
        let mut paths = std::fs::read_dir(&catalog_dir)
            .map_err(|e| anyhow::anyhow!("Cannot read {catalog_dir}: {e}"))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>();
        paths.sort();

        let mut catalogs = HashMap::new();
        for path in paths {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
            let catalog = VariantCatalog::from_json(&content)
                .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
            log::debug!(
                "loaded catalog {} v{} ({} rounds)",
                catalog.variant_id,
                catalog.version,
                catalog.rounds.len()
            );
            catalogs.insert(catalog.variant_id.clone(), catalog);
        }

        let config = Self::from_parts(settings, catalogs);
        config.check_consistency()?;
        Ok(config)
    }

    /// The catalogs and settings compiled into the binary.
    pub fn builtin() -> SimResult<Self> {
        let settings: SettingsFile = serde_json::from_str(BUILTIN_SETTINGS)?;
        let mut catalogs = HashMap::new();
        for json in BUILTIN_CATALOGS {
            let catalog = VariantCatalog::from_json(json)?;
            catalogs.insert(catalog.variant_id.clone(), catalog);
        }
        let config = Self::from_parts(settings, catalogs);
        config.check_consistency()?;
        Ok(config)
    }

    /// Built-in config for use in unit tests. The compiled-in catalogs are
    /// validated by their own tests, so a failure here is a build defect.
    pub fn default_test() -> Self {
        Self::builtin().expect("built-in catalogs are valid")
    }

    pub fn catalog(&self, variant_id: &str) -> SimResult<&VariantCatalog> {
        self.catalogs
            .get(variant_id)
            .ok_or_else(|| SimError::UnknownVariant {
                variant_id: variant_id.to_string(),
            })
    }

    /// The decision set belonging to `department`, if one is loaded.
    pub fn department_catalog(&self, department: Department) -> Option<&VariantCatalog> {
        self.catalogs
            .values()
            .find(|c| c.department == Some(department))
    }

    /// Variant ids in stable (sorted) order.
    pub fn variant_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.catalogs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn from_parts(settings: SettingsFile, catalogs: HashMap<String, VariantCatalog>) -> Self {
        Self {
            catalogs,
            default_variant:     settings.default_variant,
            instructor_secret:   settings.instructor_secret,
            snapshot_source:     settings.snapshot_source,
            discussion_triggers: settings.discussion_triggers,
        }
    }

    fn check_consistency(&self) -> SimResult<()> {
        self.catalog(&self.default_variant)?;
        for department in Department::ALL {
            let mut owners = self
                .catalogs
                .values()
                .filter(|c| c.department == Some(department))
                .map(|c| c.variant_id.as_str())
                .collect::<Vec<_>>();
            if owners.len() > 1 {
                owners.sort_unstable();
                return Err(SimError::InvalidCatalog {
                    variant_id: owners.join(", "),
                    reason:     format!("more than one decision set for {}", department.label()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogs_load_and_validate() {
        let config = SimConfig::builtin().unwrap();
        assert_eq!(config.variant_ids().len(), 10);
        assert_eq!(config.catalog("change_pulse").unwrap().terminal_round(), 3);
        assert_eq!(config.catalog("enterprise_rollout").unwrap().terminal_round(), 4);
        assert_eq!(config.catalog("department_rollout").unwrap().terminal_round(), 4);
    }

    #[test]
    fn every_department_has_its_own_decision_set() {
        let config = SimConfig::builtin().unwrap();
        for department in Department::ALL {
            let catalog = config
                .department_catalog(department)
                .unwrap_or_else(|| panic!("no decision set for {}", department.label()));
            assert_eq!(catalog.rounds.len(), 1);
            assert_eq!(catalog.rounds[0].slots.len(), 2);
            assert_eq!(catalog.terminal_round(), 2);
        }
        assert_eq!(config.catalog("change_pulse").unwrap().department, None);
    }

    #[test]
    fn two_decision_sets_for_one_department_are_rejected() {
        let mut config = SimConfig::builtin().unwrap();
        let mut copy = config.catalog("team_legal").unwrap().clone();
        copy.variant_id = "team_legal_copy".into();
        config.catalogs.insert(copy.variant_id.clone(), copy);
        assert!(config.check_consistency().is_err());
    }

    #[test]
    fn effects_sum_and_risk_flag_is_sticky() {
        let a = Effect { budget_delta: -300, morale_delta: -15, sets_risk_flag: true, ..Default::default() };
        let b = Effect { budget_delta: -100, roi_delta: 10, ..Default::default() };
        let sum = a.combine(b);
        assert_eq!(sum.budget_delta, -400);
        assert_eq!(sum.morale_delta, -15);
        assert_eq!(sum.roi_delta, 10);
        assert!(sum.sets_risk_flag);
    }

    #[test]
    fn options_match_by_id_or_label() {
        let config = SimConfig::default_test();
        let slot = &config.catalog("change_pulse").unwrap().rounds[0].slots[0];
        assert_eq!(slot.find("town_hall").unwrap().label, "B. Town Hall");
        assert_eq!(slot.find("B. Town Hall").unwrap().choice_id, "town_hall");
        assert!(slot.find("town hall").is_none());
    }

    #[test]
    fn forced_scenario_must_exist() {
        let mut catalog = SimConfig::default_test()
            .catalog("enterprise_rollout")
            .unwrap()
            .clone();
        catalog.rounds[2].risk_forced_scenario = Some("Alien Invasion".into());
        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, SimError::InvalidCatalog { .. }), "{err}");
    }

    #[test]
    fn duplicate_choice_ids_are_rejected() {
        let mut catalog = SimConfig::default_test()
            .catalog("change_pulse")
            .unwrap()
            .clone();
        let first = catalog.rounds[0].slots[0].options[0].clone();
        catalog.rounds[0].slots[0].options.push(first);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn rounds_must_be_numbered_in_order() {
        let mut catalog = SimConfig::default_test()
            .catalog("change_pulse")
            .unwrap()
            .clone();
        catalog.rounds.swap(0, 1);
        assert!(catalog.validate().is_err());
    }
}
