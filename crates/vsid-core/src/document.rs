//! Typed airport configuration documents.
//!
//! An airport document is parsed once into [`AirportConfig`]; the matching
//! logic never walks raw JSON. Custom override documents are parsed into
//! [`OverrideDocument`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;
use crate::ordered::OrderedMap;

/// One or more names, written either as a string or as an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Lower-cased set of rule or area names declared by a SID variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct NameSet(Vec<String>);

impl From<OneOrMany> for NameSet {
    fn from(raw: OneOrMany) -> Self {
        let names = match raw {
            OneOrMany::One(name) => vec![name],
            OneOrMany::Many(names) => names,
        };
        NameSet::new(names)
    }
}

impl From<NameSet> for Vec<String> {
    fn from(set: NameSet) -> Self {
        set.0
    }
}

impl NameSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = normalize_name(name.as_ref());
            if !name.is_empty() && !out.contains(&name) {
                out.push(name);
            }
        }
        NameSet(out)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rule and area names are case-insensitive; they are stored lower-case.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(rename = "RNAV", default)]
    pub rnav: bool,
}

/// Constraint set of one numbered variant under a SID letter.
///
/// `None` on an optional axis means the variant is unconstrained on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidVariant {
    /// Runways this variant is flown from, matched by substring (`"27R,26L"`).
    pub rwy: String,
    #[serde(rename = "customRule", default, skip_serializing_if = "Option::is_none")]
    pub custom_rule: Option<NameSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<NameSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equip: Option<Equipment>,
    /// Allowed engine classes, one letter each (`"JT"`).
    #[serde(rename = "engineType", default, skip_serializing_if = "Option::is_none")]
    pub engine_type: Option<String>,
    /// Initial climb altitude in feet.
    pub initial: i32,
}

impl SidVariant {
    pub fn requires_rnav(&self) -> bool {
        self.equip.as_ref().map(|e| e.rnav).unwrap_or(false)
    }
}

/// Letters of one SID family in document order, each holding its variants in order.
pub type SidFamily = OrderedMap<OrderedMap<SidVariant>>;

/// An operator-defined polygon with its default state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDefinition {
    pub name: String,
    /// Vertices as `[lat, lon]` in document order.
    pub polygon: Vec<[f64; 2]>,
    pub active: bool,
}

/// Parsed, version-checked airport document.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportConfig {
    pub icao: String,
    pub version: String,
    /// Waypoint to SID family.
    pub sids: OrderedMap<SidFamily>,
    /// Rule name to default active flag.
    pub custom_rules: OrderedMap<bool>,
    pub areas: Vec<AreaDefinition>,
    pub trans_alt: i32,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct RawArea {
    #[serde(default)]
    active: bool,
    #[serde(flatten)]
    points: OrderedMap<RawPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAirportDocument {
    #[serde(default)]
    sids: OrderedMap<SidFamily>,
    #[serde(default)]
    custom_rules: OrderedMap<bool>,
    #[serde(default)]
    areas: OrderedMap<RawArea>,
    #[serde(default)]
    trans_alt: i32,
}

impl AirportConfig {
    /// Parse a document and check its `version` against `expected_version`.
    ///
    /// The version is checked before the typed parse so that an older schema
    /// is reported as a version mismatch rather than as unreadable.
    pub fn parse(icao: &str, raw: &str, expected_version: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(raw)?;
        let version = match value.get("version") {
            Some(Value::String(v)) => v.clone(),
            Some(other) => other.to_string(),
            None => return Err(DocumentError::MissingVersion),
        };
        if version != expected_version {
            return Err(DocumentError::VersionMismatch {
                expected: expected_version.to_string(),
                found: version,
            });
        }

        let doc: RawAirportDocument = serde_json::from_str(raw)?;

        let custom_rules = doc
            .custom_rules
            .into_iter()
            .map(|(name, active)| (normalize_name(&name), active))
            .collect();

        let mut areas = Vec::with_capacity(doc.areas.len());
        for (name, area) in doc.areas {
            let name = normalize_name(&name);
            let mut polygon = Vec::with_capacity(area.points.len());
            for (_, point) in area.points {
                let lat = parse_coordinate(&point.lat).ok_or_else(|| DocumentError::Coordinate {
                    area: name.clone(),
                    value: point.lat.clone(),
                })?;
                let lon = parse_coordinate(&point.lon).ok_or_else(|| DocumentError::Coordinate {
                    area: name.clone(),
                    value: point.lon.clone(),
                })?;
                polygon.push([lat, lon]);
            }
            areas.push(AreaDefinition {
                name,
                polygon,
                active: area.active,
            });
        }

        Ok(Self {
            icao: icao.to_uppercase(),
            version,
            sids: doc.sids,
            custom_rules,
            areas,
            trans_alt: doc.trans_alt,
        })
    }

    pub fn family(&self, waypoint: &str) -> Option<&SidFamily> {
        self.sids.get(waypoint)
    }

    pub fn variants(&self, waypoint: &str, letter: &str) -> Option<&OrderedMap<SidVariant>> {
        self.family(waypoint)?.get(letter)
    }

    pub fn area(&self, name: &str) -> Option<&AreaDefinition> {
        self.areas.iter().find(|a| a.name == name)
    }
}

/// Parse a coordinate in decimal degrees (`"49.0097"`) or sector-file
/// notation (`"N049.00.34.920"`).
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let first = raw.chars().next()?;
    let hemisphere = match first.to_ascii_uppercase() {
        'N' | 'E' => Some(1.0),
        'S' | 'W' => Some(-1.0),
        _ => None,
    };

    let Some(sign) = hemisphere else {
        return raw.parse::<f64>().ok().filter(|v| v.is_finite());
    };

    let body = &raw[1..];
    let parts: Vec<&str> = body.split('.').collect();
    let value = match parts.as_slice() {
        [deg, min, sec, frac] => {
            let deg: f64 = deg.parse().ok()?;
            let min: f64 = min.parse().ok()?;
            let sec: f64 = format!("{}.{}", sec, frac).parse().ok()?;
            deg + min / 60.0 + sec / 3600.0
        }
        [deg, min, sec] => {
            let deg: f64 = deg.parse().ok()?;
            let min: f64 = min.parse().ok()?;
            let sec: f64 = sec.parse().ok()?;
            deg + min / 60.0 + sec / 3600.0
        }
        // Hemisphere prefix on a plain decimal value
        _ => body.parse::<f64>().ok()?,
    };
    Some(sign * value).filter(|v| v.is_finite())
}

/// Per-waypoint escape hatch applied before variant filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOverride {
    /// Runways the waypoint is restricted to.
    #[serde(rename = "RWY", default, skip_serializing_if = "Option::is_none")]
    pub runways: Option<Vec<String>>,
    /// Initial level that replaces the variant lookup.
    #[serde(rename = "CFL", default, skip_serializing_if = "Option::is_none")]
    pub cfl: Option<i32>,
}

/// Waypoint to override, for one airport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideDocument {
    pub waypoints: OrderedMap<CustomOverride>,
}

impl OverrideDocument {
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        let waypoints: OrderedMap<CustomOverride> = serde_json::from_str(raw)?;
        Ok(Self { waypoints })
    }

    pub fn get(&self, waypoint: &str) -> Option<&CustomOverride> {
        self.waypoints.get(waypoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LFPG: &str = r#"{
        "version": "1.0.0",
        "transAlt": 5000,
        "customRules": { "R1": true, "night": false },
        "areas": {
            "West": {
                "active": true,
                "1": { "lat": "49.000", "lon": "2.500" },
                "2": { "lat": "49.020", "lon": "2.500" },
                "3": { "lat": "N049.01.12.000", "lon": "E002.33.36.000" }
            }
        },
        "sids": {
            "OKIPA": {
                "B": { "1": { "rwy": "26L", "initial": 6000 } },
                "A": {
                    "2": { "rwy": "27R", "initial": 4000 },
                    "1": { "rwy": "27R,26L", "customRule": "R1", "area": ["West"],
                           "equip": { "RNAV": true }, "engineType": "JT", "initial": 5000 }
                }
            }
        }
    }"#;

    #[test]
    fn parses_full_document() {
        let config = AirportConfig::parse("lfpg", LFPG, "1.0.0").unwrap();
        assert_eq!(config.icao, "LFPG");
        assert_eq!(config.trans_alt, 5000);
        assert_eq!(config.custom_rules.get("r1"), Some(&true));
        assert_eq!(config.custom_rules.get("night"), Some(&false));

        let area = config.area("west").unwrap();
        assert!(area.active);
        assert_eq!(area.polygon.len(), 3);
        assert!((area.polygon[2][0] - 49.02).abs() < 1e-9);
        assert!((area.polygon[2][1] - 2.56).abs() < 1e-9);
    }

    #[test]
    fn letters_and_variants_keep_document_order() {
        let config = AirportConfig::parse("LFPG", LFPG, "1.0.0").unwrap();
        let family = config.family("OKIPA").unwrap();
        let letters: Vec<&str> = family.keys().collect();
        assert_eq!(letters, vec!["B", "A"]);

        let variants: Vec<&str> = config.variants("OKIPA", "A").unwrap().keys().collect();
        assert_eq!(variants, vec!["2", "1"]);

        let tagged = config.variants("OKIPA", "A").unwrap().get("1").unwrap();
        assert!(tagged.custom_rule.as_ref().unwrap().contains("r1"));
        assert!(tagged.area.as_ref().unwrap().contains("west"));
        assert!(tagged.requires_rnav());
        assert_eq!(tagged.engine_type.as_deref(), Some("JT"));
    }

    #[test]
    fn missing_version_is_reported() {
        let err = AirportConfig::parse("LFPG", r#"{"sids": {}}"#, "1.0.0").unwrap_err();
        assert!(matches!(err, DocumentError::MissingVersion));
    }

    #[test]
    fn wrong_version_is_reported_before_schema_errors() {
        let raw = r#"{"version": "0.9", "sids": "not-an-object"}"#;
        let err = AirportConfig::parse("LFPG", raw, "1.0.0").unwrap_err();
        match err {
            DocumentError::VersionMismatch { expected, found } => {
                assert_eq!(expected, "1.0.0");
                assert_eq!(found, "0.9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_coordinate_is_rejected() {
        let raw = r#"{"version": "1.0.0", "areas": {"a": {"active": true,
            "1": {"lat": "north", "lon": "2.0"}}}}"#;
        let err = AirportConfig::parse("LFPG", raw, "1.0.0").unwrap_err();
        assert!(matches!(err, DocumentError::Coordinate { .. }));
    }

    #[test]
    fn coordinate_formats() {
        assert_eq!(parse_coordinate("49.5"), Some(49.5));
        assert_eq!(parse_coordinate("-1.25"), Some(-1.25));
        let dms = parse_coordinate("S033.30.00.000").unwrap();
        assert!((dms + 33.5).abs() < 1e-9);
        let west = parse_coordinate("W001.15.00").unwrap();
        assert!((west + 1.25).abs() < 1e-9);
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("N0x9.00.00.000"), None);
    }

    #[test]
    fn override_document() {
        let doc = OverrideDocument::parse(r#"{"OKIPA": {"RWY": ["27L"], "CFL": 7000}, "LGL": {"CFL": 3000}}"#)
            .unwrap();
        let okipa = doc.get("OKIPA").unwrap();
        assert_eq!(okipa.runways.as_deref(), Some(&["27L".to_string()][..]));
        assert_eq!(okipa.cfl, Some(7000));
        assert_eq!(doc.get("LGL").unwrap().runways, None);
        assert!(doc.get("NURMO").is_none());
    }
}
