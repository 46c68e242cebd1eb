//! Shared data models for flights, assignments and controller toggles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SID shown when a flight needs no departure procedure.
pub const NO_SID: &str = "------";
/// SID shown when the route needs human review.
pub const CHECK_FP: &str = "CHECKFP";

// ========== FLIGHT DATA ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightRules {
    #[default]
    Ifr,
    Vfr,
}

/// Ground state reported by the controller data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundStatus {
    #[default]
    None,
    Startup,
    Push,
    Taxi,
    Departed,
}

/// Parsed route as delivered by the flight-data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<String>,
    /// SID suggested by the provider, e.g. `OKIPA3A`.
    #[serde(default)]
    pub suggested_sid: String,
    #[serde(default)]
    pub suggested_runway: String,
    /// SID currently on the flight record, empty if none.
    #[serde(default)]
    pub sid: String,
    /// Departure runway currently on the flight record, empty if none.
    #[serde(default)]
    pub dep_runway: String,
}

/// Point-in-time view of one flight, assembled from the host's providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSnapshot {
    pub callsign: String,
    pub origin: String,
    #[serde(default)]
    pub flight_rules: FlightRules,
    #[serde(default)]
    pub route: Option<Route>,
    #[serde(default)]
    pub aircraft_type: String,
    /// `[lat, lon]` of the aircraft, if it is being tracked.
    #[serde(default)]
    pub position: Option<[f64; 2]>,
    /// Distance from the origin airport in nautical miles.
    #[serde(default)]
    pub distance_from_origin: Option<f64>,
    /// Altitude in feet, if reported.
    #[serde(default)]
    pub altitude: Option<i32>,
    /// Ground speed in knots, if reported.
    #[serde(default)]
    pub ground_speed: Option<u32>,
    #[serde(default)]
    pub ground_status: Option<GroundStatus>,
    #[serde(default)]
    pub clearance_issued: bool,
    /// Level cleared by the controller, 0 when none.
    #[serde(default)]
    pub cleared_flight_level: i32,
}

impl FlightSnapshot {
    pub fn is_vfr(&self) -> bool {
        self.flight_rules == FlightRules::Vfr
    }

    pub fn suggested_runway(&self) -> &str {
        self.route
            .as_ref()
            .map(|r| r.suggested_runway.as_str())
            .unwrap_or_default()
    }

    pub fn has_departed(&self) -> bool {
        self.ground_status == Some(GroundStatus::Departed)
    }
}

/// Airport as configured on the controller's display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAirport {
    pub icao: String,
    pub dep_runways: Vec<String>,
}

// ========== ASSIGNMENT ==========

/// Runway, SID and initial level suggested for one departure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub runway: String,
    pub sid: String,
    pub cfl: i32,
}

impl Assignment {
    pub fn new(runway: impl Into<String>, sid: impl Into<String>, cfl: i32) -> Self {
        Self {
            runway: runway.into(),
            sid: sid.into(),
            cfl,
        }
    }

    pub fn needs_review(&self) -> bool {
        self.sid == CHECK_FP
    }
}

/// Cached output of one engine run for one aircraft.
///
/// Replaced wholesale on recompute, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pilot {
    pub callsign: String,
    pub origin: String,
    pub runway: String,
    pub sid: String,
    pub cfl: i32,
    pub computed_at: DateTime<Utc>,
}

impl Pilot {
    pub fn from_assignment(callsign: &str, origin: &str, assignment: Assignment) -> Self {
        Self {
            callsign: callsign.to_string(),
            origin: origin.to_string(),
            runway: assignment.runway,
            sid: assignment.sid,
            cfl: assignment.cfl,
            computed_at: Utc::now(),
        }
    }

    pub fn assignment(&self) -> Assignment {
        Assignment::new(self.runway.clone(), self.sid.clone(), self.cfl)
    }
}

// ========== CONTROLLER TOGGLES ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub oaci: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub oaci: String,
    pub name: String,
    /// Vertices as `[lat, lon]`.
    pub polygon: Vec<[f64; 2]>,
    pub active: bool,
}

impl Area {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        crate::geofence::contains(lat, lon, &self.polygon)
    }
}

/// Pending controller request for a callsign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Request {
    #[default]
    None,
    Clearance,
    Push,
    Taxi,
}

impl Request {
    /// Whether the controller data shows this request has been served.
    pub fn is_satisfied_by(self, flight: &FlightSnapshot) -> bool {
        match self {
            Request::None => false,
            Request::Clearance => flight.clearance_issued,
            Request::Push => flight.ground_status == Some(GroundStatus::Push),
            Request::Taxi => flight.ground_status == Some(GroundStatus::Taxi),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Request::None => "",
            Request::Clearance => "CLR",
            Request::Push => "PUSH",
            Request::Taxi => "TAXI",
        }
    }
}
