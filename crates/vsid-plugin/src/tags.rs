//! Tag values and the diffing cache in front of the host's tag renderer.

use dashmap::DashMap;
use vsid_core::{ColorName, FlightSnapshot, GroundStatus, Palette, Pilot, Request, CHECK_FP};

use crate::host::{TagField, TagSink, TagValue};

/// Shown for a level that cannot be expressed in hundreds of feet.
pub const NO_CFL: &str = "---";

/// Ground speed from which an aircraft counts as taxiing, in knots.
pub const TAXI_SPEED_KT: u32 = 8;

/// Feet to hundreds of feet, three digits: 4000 -> `040`, 12000 -> `120`.
pub fn format_cfl(cfl: i32) -> String {
    let feet = cfl.to_string();
    if feet.len() <= 2 {
        return NO_CFL.to_string();
    }
    let hundreds = &feet[..feet.len() - 2];
    if hundreds.len() == 2 {
        format!("0{}", hundreds)
    } else {
        hundreds.to_string()
    }
}

/// Controller's cleared level when set, otherwise the suggestion.
pub fn render_cfl(flight: &FlightSnapshot, pilot: &Pilot, palette: &Palette) -> TagValue {
    let cleared = flight.cleared_flight_level;
    let shown = if cleared == 0 { pilot.cfl } else { cleared };
    let color = if cleared == 0 {
        ColorName::Unconfirmed
    } else if cleared == pilot.cfl {
        ColorName::Confirmed
    } else {
        ColorName::Deviation
    };
    TagValue::new(format_cfl(shown), Some(palette.get(color)))
}

/// Filed departure runway when set, otherwise the suggestion.
pub fn render_rwy(
    flight: &FlightSnapshot,
    pilot: &Pilot,
    dep_runways: &[String],
    palette: &Palette,
) -> TagValue {
    let filed = flight
        .route
        .as_ref()
        .map(|r| r.dep_runway.trim())
        .unwrap_or_default();
    let is_dep_runway = dep_runways.iter().any(|r| r == &pilot.runway);
    let color = if filed.is_empty() {
        ColorName::Unconfirmed
    } else if filed == pilot.runway && is_dep_runway {
        ColorName::Confirmed
    } else {
        ColorName::Deviation
    };
    let text = if filed.is_empty() { pilot.runway.as_str() } else { filed };
    TagValue::new(text, Some(palette.get(color)))
}

/// Filed SID when set, otherwise the suggestion.
pub fn render_sid(flight: &FlightSnapshot, pilot: &Pilot, palette: &Palette) -> TagValue {
    let filed = flight
        .route
        .as_ref()
        .map(|r| r.sid.trim())
        .unwrap_or_default();
    let color = if pilot.sid == CHECK_FP {
        ColorName::Checkfp
    } else if filed.is_empty() {
        ColorName::Unconfirmed
    } else if filed == pilot.sid {
        ColorName::Confirmed
    } else {
        ColorName::Deviation
    };
    let text = if filed.is_empty() { pilot.sid.as_str() } else { filed };
    TagValue::new(text, Some(palette.get(color)))
}

pub fn render_request(request: Request, palette: &Palette) -> TagValue {
    let color = match request {
        Request::None => None,
        _ => Some(palette.get(ColorName::RequestText)),
    };
    TagValue::new(request.label(), color)
}

/// Ground-movement alert, only below `alert_max_alt`.
///
/// `NO CLR` for a push or taxi without clearance, `NO TAXI` for an aircraft
/// moving at taxi speed without a taxi status. An unknown altitude counts as
/// on the ground.
pub fn render_alert(flight: &FlightSnapshot, alert_max_alt: i32, palette: &Palette) -> TagValue {
    let on_ground = flight.altitude.map_or(true, |alt| alt <= alert_max_alt);
    let status = flight.ground_status.unwrap_or_default();
    let moving = flight.ground_speed.unwrap_or(0) >= TAXI_SPEED_KT;

    let alert = if !on_ground {
        None
    } else if matches!(status, GroundStatus::Push | GroundStatus::Taxi) && !flight.clearance_issued {
        Some("NO CLR")
    } else if moving && status != GroundStatus::Taxi {
        Some("NO TAXI")
    } else {
        None
    };
    match alert {
        Some(text) => TagValue::new(text, Some(palette.get(ColorName::AlertText)))
            .with_background(palette.get(ColorName::AlertBackground)),
        None => TagValue::new("", None),
    }
}

/// Last value pushed per (callsign, field). Only changes reach the sink.
#[derive(Default)]
pub struct TagRenderCache {
    rendered: DashMap<(String, TagField), TagValue>,
}

impl TagRenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `value` to `sink` if it differs from what was last pushed.
    pub fn publish(&self, sink: &dyn TagSink, callsign: &str, field: TagField, value: TagValue) -> bool {
        let key = (callsign.to_string(), field);
        if let Some(previous) = self.rendered.get(&key) {
            if *previous == value {
                return false;
            }
        }
        sink.update_tag(callsign, field, &value);
        self.rendered.insert(key, value);
        true
    }

    pub fn get(&self, callsign: &str, field: TagField) -> Option<TagValue> {
        self.rendered
            .get(&(callsign.to_string(), field))
            .map(|entry| entry.value().clone())
    }

    pub fn forget(&self, callsign: &str) {
        self.rendered.retain(|(cs, _), _| cs != callsign);
    }

    pub fn clear(&self) {
        self.rendered.clear();
    }
}
