//! Controller-toggleable rules and areas, per airport.
//!
//! Seeded from each airport document's defaults; after that the toggle state
//! belongs to the session. Re-seeding never duplicates or resets an entry.

use std::sync::Mutex;

use vsid_core::document::normalize_name;
use vsid_core::{geofence, AirportConfig, Area, Rule};

use crate::lock;

#[derive(Default)]
struct RegistryState {
    rules: Vec<Rule>,
    areas: Vec<Area>,
}

#[derive(Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the rules and areas of `config` that are not known yet.
    /// Returns how many entries were added.
    pub fn populate(&self, config: &AirportConfig) -> usize {
        let icao = config.icao.as_str();
        let mut state = lock(&self.state);
        let mut added = 0;

        for (name, active) in config.custom_rules.iter() {
            if state.rules.iter().any(|r| r.oaci == icao && r.name == name) {
                continue;
            }
            state.rules.push(Rule {
                oaci: icao.to_string(),
                name: name.to_string(),
                active: *active,
            });
            added += 1;
        }

        for def in &config.areas {
            if state.areas.iter().any(|a| a.oaci == icao && a.name == def.name) {
                continue;
            }
            if !geofence::is_usable(&def.polygon) {
                tracing::warn!(
                    "Area {} at {} has {} vertices and will never match",
                    def.name,
                    icao,
                    def.polygon.len()
                );
            }
            state.areas.push(Area {
                oaci: icao.to_string(),
                name: def.name.clone(),
                polygon: def.polygon.clone(),
                active: def.active,
            });
            added += 1;
        }

        if added > 0 {
            tracing::debug!("Registry seeded {} entries for {}", added, icao);
        }
        added
    }

    pub fn list_rules(&self, icao: &str) -> Vec<Rule> {
        let icao = icao.trim().to_uppercase();
        lock(&self.state)
            .rules
            .iter()
            .filter(|r| r.oaci == icao)
            .cloned()
            .collect()
    }

    pub fn list_areas(&self, icao: &str) -> Vec<Area> {
        let icao = icao.trim().to_uppercase();
        lock(&self.state)
            .areas
            .iter()
            .filter(|a| a.oaci == icao)
            .cloned()
            .collect()
    }

    pub fn all_rules(&self) -> Vec<Rule> {
        lock(&self.state).rules.clone()
    }

    pub fn all_areas(&self) -> Vec<Area> {
        lock(&self.state).areas.clone()
    }

    /// Flip a rule. Returns its new state, or `None` if it is unknown.
    pub fn toggle_rule(&self, icao: &str, name: &str) -> Option<bool> {
        let icao = icao.trim().to_uppercase();
        let name = normalize_name(name);
        let mut state = lock(&self.state);
        let rule = state
            .rules
            .iter_mut()
            .find(|r| r.oaci == icao && r.name == name)?;
        rule.active = !rule.active;
        Some(rule.active)
    }

    /// Flip an area. Returns its new state, or `None` if it is unknown.
    pub fn toggle_area(&self, icao: &str, name: &str) -> Option<bool> {
        let icao = icao.trim().to_uppercase();
        let name = normalize_name(name);
        let mut state = lock(&self.state);
        let area = state
            .areas
            .iter_mut()
            .find(|a| a.oaci == icao && a.name == name)?;
        area.active = !area.active;
        Some(area.active)
    }

    pub fn active_rule_names(&self, icao: &str) -> Vec<String> {
        let icao = icao.trim().to_uppercase();
        lock(&self.state)
            .rules
            .iter()
            .filter(|r| r.oaci == icao && r.active)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Find an area by name across every airport.
    pub fn find_area(&self, name: &str) -> Option<Area> {
        let name = normalize_name(name);
        lock(&self.state)
            .areas
            .iter()
            .find(|a| a.name == name)
            .cloned()
    }

    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.rules.clear();
        state.areas.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AirportConfig {
        AirportConfig::parse(
            "LFPG",
            r#"{
                "version": "1.0.0",
                "customRules": {"R1": true, "R2": false},
                "areas": {
                    "North": {
                        "active": true,
                        "p1": {"lat": "49.0", "lon": "2.0"},
                        "p2": {"lat": "49.1", "lon": "2.0"},
                        "p3": {"lat": "49.1", "lon": "2.1"}
                    }
                }
            }"#,
            "1.0.0",
        )
        .unwrap()
    }

    #[test]
    fn populate_seeds_defaults() {
        let registry = Registry::new();
        assert_eq!(registry.populate(&config()), 3);
        assert_eq!(registry.active_rule_names("lfpg"), vec!["r1".to_string()]);
        let areas = registry.list_areas("LFPG");
        assert_eq!(areas.len(), 1);
        assert!(areas[0].active);
        assert_eq!(areas[0].polygon.len(), 3);
    }

    #[test]
    fn repopulate_keeps_manual_toggles() {
        let registry = Registry::new();
        registry.populate(&config());
        assert_eq!(registry.toggle_rule("LFPG", "R2"), Some(true));
        assert_eq!(registry.toggle_area("LFPG", "north"), Some(false));

        assert_eq!(registry.populate(&config()), 0);
        assert_eq!(registry.list_rules("LFPG").len(), 2);
        assert_eq!(
            registry.active_rule_names("LFPG"),
            vec!["r1".to_string(), "r2".to_string()]
        );
        assert!(!registry.list_areas("LFPG")[0].active);
    }

    #[test]
    fn unknown_toggle_is_none() {
        let registry = Registry::new();
        registry.populate(&config());
        assert_eq!(registry.toggle_rule("LFPG", "R9"), None);
        assert_eq!(registry.toggle_area("EGLL", "north"), None);
    }

    #[test]
    fn clear_resets_to_defaults_on_next_populate() {
        let registry = Registry::new();
        registry.populate(&config());
        registry.toggle_rule("LFPG", "R1");
        registry.clear();
        assert!(registry.list_rules("LFPG").is_empty());
        registry.populate(&config());
        assert_eq!(registry.active_rule_names("LFPG"), vec!["r1".to_string()]);
    }
}
