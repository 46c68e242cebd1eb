//! Boundary to the radar client hosting the plugin.
//!
//! The host owns flight plans, aircraft positions, controller data, the chat
//! window and the tag renderer. The plugin only reads snapshots through
//! [`TrafficProvider`] and pushes text through [`Notifier`] and [`TagSink`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vsid_core::{FlightSnapshot, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirportStatus {
    Active,
    Inactive,
}

/// Airport configuration as set up on the controller's display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportConfiguration {
    pub icao: String,
    pub status: AirportStatus,
    #[serde(default)]
    pub dep_runways: Vec<String>,
}

/// Flight, aircraft and airport data from the host.
///
/// Implementations must be cheap and non-blocking: they are called from the
/// scheduler and from event handlers.
pub trait TrafficProvider: Send + Sync {
    /// Merged flight plan, aircraft and controller data for one callsign.
    /// `position` is `None` when no aircraft is being tracked for it.
    fn flight(&self, callsign: &str) -> Option<FlightSnapshot>;

    /// Every flight plan currently known.
    fn flights(&self) -> Vec<FlightSnapshot>;

    fn airport_configurations(&self) -> Vec<AirportConfiguration>;
}

/// Operator-visible chat channel.
pub trait Notifier: Send + Sync {
    fn send(&self, sender: &str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagField {
    Cfl,
    Rwy,
    Sid,
    Request,
    Alert,
}

/// Rendered content of one tag field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValue {
    pub text: String,
    pub color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Rgb>,
}

impl TagValue {
    pub fn new(text: impl Into<String>, color: Option<Rgb>) -> Self {
        Self {
            text: text.into(),
            color,
            background: None,
        }
    }

    pub fn with_background(mut self, background: Rgb) -> Self {
        self.background = Some(background);
        self
    }
}

/// Tag renderer of the host.
pub trait TagSink: Send + Sync {
    fn update_tag(&self, callsign: &str, field: TagField, value: &TagValue);
}

/// The three host capabilities the plugin is wired to.
#[derive(Clone)]
pub struct Host {
    pub traffic: Arc<dyn TrafficProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub tags: Arc<dyn TagSink>,
}
