//! Static aircraft performance table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// Engine class assumed for types missing from the table.
pub const DEFAULT_ENGINE_CLASS: &str = "J";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftProfile {
    #[serde(rename = "engineType")]
    pub engine_type: String,
    #[serde(default)]
    pub rnav: bool,
}

/// Aircraft type designator to engine class and RNAV capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceTable {
    profiles: HashMap<String, AircraftProfile>,
}

impl PerformanceTable {
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        let profiles: HashMap<String, AircraftProfile> = serde_json::from_str(raw)?;
        Ok(Self {
            profiles: profiles
                .into_iter()
                .map(|(k, v)| (k.trim().to_uppercase(), v))
                .collect(),
        })
    }

    pub fn get(&self, aircraft_type: &str) -> Option<&AircraftProfile> {
        self.profiles.get(&aircraft_type.trim().to_uppercase())
    }

    /// Engine class of a type; unknown types are treated as jets.
    pub fn engine_class(&self, aircraft_type: &str) -> &str {
        self.get(aircraft_type)
            .map(|p| p.engine_type.as_str())
            .unwrap_or(DEFAULT_ENGINE_CLASS)
    }

    /// RNAV capability of a type; unknown types are not capable.
    pub fn is_rnav(&self, aircraft_type: &str) -> bool {
        self.get(aircraft_type).map(|p| p.rnav).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<(String, AircraftProfile)> for PerformanceTable {
    fn from_iter<I: IntoIterator<Item = (String, AircraftProfile)>>(iter: I) -> Self {
        Self {
            profiles: iter
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
        }
    }
}
