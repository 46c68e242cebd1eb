//! Global settings document.
//!
//! Every field is optional: a missing or malformed value falls back to its
//! default and is reported as a [`SettingsFault`] so the caller can surface it
//! once without aborting startup.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Rgb = [u8; 3];

/// Semantic colors used when rendering tag fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Confirmed,
    Unconfirmed,
    Checkfp,
    Deviation,
    AlertText,
    AlertBackground,
    RequestText,
}

impl ColorName {
    pub const ALL: [ColorName; 7] = [
        ColorName::Confirmed,
        ColorName::Unconfirmed,
        ColorName::Checkfp,
        ColorName::Deviation,
        ColorName::AlertText,
        ColorName::AlertBackground,
        ColorName::RequestText,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ColorName::Confirmed => "confirmed",
            ColorName::Unconfirmed => "unconfirmed",
            ColorName::Checkfp => "checkfp",
            ColorName::Deviation => "deviation",
            ColorName::AlertText => "alerttext",
            ColorName::AlertBackground => "alertbackground",
            ColorName::RequestText => "requesttext",
        }
    }

    fn default_rgb(self) -> Rgb {
        match self {
            ColorName::Confirmed => [127, 252, 73],
            ColorName::Unconfirmed => [255, 255, 255],
            ColorName::Checkfp => [255, 128, 0],
            ColorName::Deviation => [255, 255, 0],
            ColorName::AlertText => [255, 255, 255],
            ColorName::AlertBackground => [200, 0, 0],
            ColorName::RequestText => [0, 200, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub confirmed: Rgb,
    pub unconfirmed: Rgb,
    pub checkfp: Rgb,
    pub deviation: Rgb,
    pub alert_text: Rgb,
    pub alert_background: Rgb,
    pub request_text: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            confirmed: ColorName::Confirmed.default_rgb(),
            unconfirmed: ColorName::Unconfirmed.default_rgb(),
            checkfp: ColorName::Checkfp.default_rgb(),
            deviation: ColorName::Deviation.default_rgb(),
            alert_text: ColorName::AlertText.default_rgb(),
            alert_background: ColorName::AlertBackground.default_rgb(),
            request_text: ColorName::RequestText.default_rgb(),
        }
    }
}

impl Palette {
    pub fn get(&self, name: ColorName) -> Rgb {
        match name {
            ColorName::Confirmed => self.confirmed,
            ColorName::Unconfirmed => self.unconfirmed,
            ColorName::Checkfp => self.checkfp,
            ColorName::Deviation => self.deviation,
            ColorName::AlertText => self.alert_text,
            ColorName::AlertBackground => self.alert_background,
            ColorName::RequestText => self.request_text,
        }
    }

    fn set(&mut self, name: ColorName, rgb: Rgb) {
        match name {
            ColorName::Confirmed => self.confirmed = rgb,
            ColorName::Unconfirmed => self.unconfirmed = rgb,
            ColorName::Checkfp => self.checkfp = rgb,
            ColorName::Deviation => self.deviation = rgb,
            ColorName::AlertText => self.alert_text = rgb,
            ColorName::AlertBackground => self.alert_background = rgb,
            ColorName::RequestText => self.request_text = rgb,
        }
    }
}

/// Runtime settings shared by every airport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between bulk rescans, at least 1.
    pub update_interval: u64,
    /// Ceiling for ground alerts, in feet.
    pub alert_max_alt: i32,
    /// Distance from origin beyond which an aircraft leaves scope, in nautical miles.
    pub max_distance: f64,
    /// `owner/repo/branch` path used to build remote document URLs.
    pub config_github_url: String,
    pub colors: Palette,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            update_interval: 5,
            alert_max_alt: 6000,
            max_distance: 4.0,
            config_github_url: "french-vacc/vsid-config/main".to_string(),
            colors: Palette::default(),
        }
    }
}

/// A settings field that was missing or malformed and fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFault {
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for SettingsFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "settings field {}: {}", self.field, self.reason)
    }
}

fn fault(field: &str, reason: &str) -> SettingsFault {
    SettingsFault {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl Settings {
    /// Parse the settings document, defaulting every unusable field.
    pub fn from_json(raw: &str) -> (Self, Vec<SettingsFault>) {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(err) => (Self::default(), vec![fault("<document>", &err.to_string())]),
        }
    }

    pub fn from_value(value: &Value) -> (Self, Vec<SettingsFault>) {
        let mut settings = Self::default();
        let mut faults = Vec::new();

        match value.get("update_interval").map(Value::as_u64) {
            Some(Some(v)) if v >= 1 => settings.update_interval = v,
            Some(_) => faults.push(fault("update_interval", "expected an integer >= 1")),
            None => faults.push(fault("update_interval", "missing")),
        }

        match value.get("alert_max_alt").map(Value::as_i64) {
            Some(Some(v)) if i32::try_from(v).is_ok() => settings.alert_max_alt = v as i32,
            Some(_) => faults.push(fault("alert_max_alt", "expected an integer altitude")),
            None => faults.push(fault("alert_max_alt", "missing")),
        }

        match value.get("max_distance").map(Value::as_f64) {
            Some(Some(v)) if v.is_finite() && v >= 0.0 => settings.max_distance = v,
            Some(_) => faults.push(fault("max_distance", "expected a number >= 0")),
            None => faults.push(fault("max_distance", "missing")),
        }

        match value.get("config_github_url").map(Value::as_str) {
            Some(Some(v)) if !v.trim().is_empty() => {
                settings.config_github_url = v.trim().trim_matches('/').to_string()
            }
            Some(_) => faults.push(fault("config_github_url", "expected a non-empty string")),
            None => faults.push(fault("config_github_url", "missing")),
        }

        match value.get("colors") {
            Some(Value::Object(colors)) => {
                for name in ColorName::ALL {
                    let field = format!("colors.{}", name.key());
                    match colors.get(name.key()).map(parse_rgb) {
                        Some(Some(rgb)) => settings.colors.set(name, rgb),
                        Some(None) => faults.push(fault(&field, "expected [r, g, b] with 0-255 components")),
                        None => faults.push(fault(&field, "missing")),
                    }
                }
            }
            Some(_) => faults.push(fault("colors", "expected an object")),
            None => faults.push(fault("colors", "missing")),
        }

        (settings, faults)
    }
}

fn parse_rgb(value: &Value) -> Option<Rgb> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    let mut rgb = [0u8; 3];
    for (slot, item) in rgb.iter_mut().zip(items) {
        *slot = u8::try_from(item.as_u64()?).ok()?;
    }
    Some(rgb)
}
