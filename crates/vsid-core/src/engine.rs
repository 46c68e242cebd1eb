//! Runway, SID and initial level selection.
//!
//! The engine is a pure function of the flight snapshot and an
//! [`AirportContext`] assembled by the caller: it keeps no memory between
//! calls, so identical inputs always give identical output.
//!
//! Selection walks the airport's SID letters for the route's first waypoint
//! in document order, and under each letter its numbered variants in
//! document order. A variant is accepted when every constraint holds,
//! checked cheapest first:
//!
//! 1. its runway string contains a candidate departure runway
//! 2. its custom rules cover every active rule (untagged only when none is active)
//! 3. the aircraft is inside its active areas (skipped at single-runway airports)
//! 4. RNAV equipage, when required
//! 5. engine class, when restricted
//!
//! A failed check skips only that variant. Only total exhaustion yields
//! `CHECKFP`.

use crate::document::{AirportConfig, OverrideDocument, SidVariant};
use crate::error::AssignError;
use crate::models::{Area, Assignment, FlightSnapshot, CHECK_FP, NO_SID};
use crate::performance::PerformanceTable;

/// Everything the engine reads about one airport, snapshotted by the caller.
#[derive(Debug, Clone, Copy)]
pub struct AirportContext<'a> {
    pub config: &'a AirportConfig,
    /// Departure runways currently configured on the display, in order.
    pub dep_runways: &'a [String],
    /// Names of the rules currently active at this airport.
    pub active_rules: &'a [String],
    /// Every area of this airport with its current toggle state.
    pub areas: &'a [Area],
    pub overrides: Option<&'a OverrideDocument>,
    pub performance: &'a PerformanceTable,
}

/// Engine result plus the diagnostics gathered while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub assignment: Assignment,
    pub issues: Vec<AssignError>,
}

impl EngineOutput {
    fn new(assignment: Assignment, issues: Vec<AssignError>) -> Self {
        Self { assignment, issues }
    }
}

/// Compute the assignment for one flight.
///
/// `airport` is `None` when the origin's configuration could not be loaded;
/// the flight then keeps its suggested runway and SID with an unconfirmed level.
pub fn assign(flight: &FlightSnapshot, airport: Option<&AirportContext<'_>>) -> EngineOutput {
    let suggested_runway = flight.suggested_runway().to_string();
    let mut issues = Vec::new();

    let route = match flight.route.as_ref() {
        Some(route) if !flight.is_vfr() && !route.waypoints.is_empty() => route,
        _ => {
            let first = flight
                .route
                .as_ref()
                .and_then(|r| r.waypoints.first())
                .map(String::as_str);
            let cfl = airport.map(|ctx| fetch_cfl(ctx, NO_SID, &flight.aircraft_type, first)).unwrap_or(0);
            return EngineOutput::new(Assignment::new(suggested_runway, NO_SID, cfl), issues);
        }
    };

    let waypoint = route.waypoints[0].as_str();
    let suggested_sid = route.suggested_sid.trim();
    let Some(indicator) = sid_indicator(suggested_sid) else {
        issues.push(AssignError::MalformedRoute {
            callsign: flight.callsign.clone(),
            reason: format!("suggested SID {:?} is too short", suggested_sid),
        });
        let cfl = airport
            .map(|ctx| fetch_cfl(ctx, NO_SID, &flight.aircraft_type, Some(waypoint)))
            .unwrap_or(0);
        return EngineOutput::new(Assignment::new(suggested_runway, CHECK_FP, cfl), issues);
    };

    let Some(ctx) = airport else {
        return EngineOutput::new(Assignment::new(suggested_runway, suggested_sid, 0), issues);
    };

    let check_fp = |issues: Vec<AssignError>| {
        let cfl = fetch_cfl(ctx, NO_SID, &flight.aircraft_type, Some(waypoint));
        EngineOutput::new(Assignment::new(suggested_runway.clone(), CHECK_FP, cfl), issues)
    };

    let Some(family) = ctx.config.family(waypoint) else {
        issues.push(AssignError::NoMatchingSid {
            callsign: flight.callsign.clone(),
            waypoint: waypoint.to_string(),
        });
        return check_fp(issues);
    };

    let overrides = ctx.overrides.and_then(|doc| doc.get(waypoint));
    let candidates = candidate_runways(ctx.dep_runways, overrides.and_then(|o| o.runways.as_deref()));

    for (letter, variants) in family.iter() {
        for (_, variant) in variants.iter() {
            let Some(runway) = matching_runway(variant, &candidates) else {
                continue;
            };
            if !rules_match(variant, ctx.active_rules) {
                continue;
            }
            if !areas_match(variant, ctx, flight, &mut issues) {
                continue;
            }
            if variant.requires_rnav() && !ctx.performance.is_rnav(&flight.aircraft_type) {
                continue;
            }
            if !engine_matches(variant, ctx.performance, &flight.aircraft_type) {
                continue;
            }

            let sid = format!("{}{}{}", waypoint, indicator, letter);
            let cfl = fetch_cfl(ctx, &sid, &flight.aircraft_type, Some(waypoint));
            return EngineOutput::new(Assignment::new(runway, sid, cfl), issues);
        }
    }

    issues.push(AssignError::NoMatchingSid {
        callsign: flight.callsign.clone(),
        waypoint: waypoint.to_string(),
    });
    check_fp(issues)
}

/// Initial level for a SID string.
///
/// The SID is split back into waypoint and letter and the letter's variants
/// are walked with only the rule and engine filters. A Custom Override CFL
/// for the waypoint wins outright. Sentinel SIDs use the override of
/// `first_waypoint`, if any. No match yields 0.
pub fn fetch_cfl(
    ctx: &AirportContext<'_>,
    sid: &str,
    aircraft_type: &str,
    first_waypoint: Option<&str>,
) -> i32 {
    let override_cfl = |waypoint: &str| {
        ctx.overrides
            .and_then(|doc| doc.get(waypoint))
            .and_then(|o| o.cfl)
    };

    let Some((waypoint, letter)) = split_sid(sid) else {
        return first_waypoint.and_then(override_cfl).unwrap_or(0);
    };
    if let Some(cfl) = override_cfl(waypoint) {
        return cfl;
    }

    let Some(variants) = ctx.config.variants(waypoint, letter) else {
        return 0;
    };
    variants
        .values()
        .find(|variant| {
            rules_match(variant, ctx.active_rules)
                && engine_matches(variant, ctx.performance, aircraft_type)
        })
        .map(|variant| variant.initial)
        .unwrap_or(0)
}

/// Second-to-last character of the suggested SID (the procedure number).
fn sid_indicator(suggested_sid: &str) -> Option<char> {
    let mut chars = suggested_sid.chars().rev();
    chars.next()?;
    chars.next()
}

/// Split `OKIPA3A` into (`OKIPA`, `A`). Sentinels and short strings give `None`.
fn split_sid(sid: &str) -> Option<(&str, &str)> {
    if sid == NO_SID || sid == CHECK_FP {
        return None;
    }
    let mut indices = sid.char_indices().rev();
    let (letter_at, _) = indices.next()?;
    let (indicator_at, _) = indices.next()?;
    if indicator_at == 0 {
        return None;
    }
    Some((&sid[..indicator_at], &sid[letter_at..]))
}

/// Configured departure runways, narrowed by an override when the narrowing
/// leaves at least one runway.
fn candidate_runways<'a>(dep_runways: &'a [String], forced: Option<&[String]>) -> Vec<&'a str> {
    let all: Vec<&str> = dep_runways
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    let Some(forced) = forced else {
        return all;
    };
    let narrowed: Vec<&str> = all
        .iter()
        .copied()
        .filter(|rwy| forced.iter().any(|f| f.trim() == *rwy))
        .collect();
    if narrowed.is_empty() {
        all
    } else {
        narrowed
    }
}

fn matching_runway(variant: &SidVariant, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|rwy| variant.rwy.contains(*rwy))
        .map(|rwy| rwy.to_string())
}

/// With active rules, a variant must be tagged with every one of them. With
/// none active, only untagged variants are eligible.
fn rules_match(variant: &SidVariant, active_rules: &[String]) -> bool {
    match variant.custom_rule.as_ref().filter(|tags| !tags.is_empty()) {
        Some(tags) => !active_rules.is_empty() && active_rules.iter().all(|rule| tags.contains(rule)),
        None => active_rules.is_empty(),
    }
}

fn areas_match(
    variant: &SidVariant,
    ctx: &AirportContext<'_>,
    flight: &FlightSnapshot,
    issues: &mut Vec<AssignError>,
) -> bool {
    if ctx.dep_runways.len() == 1 {
        return true;
    }
    let tags = match variant.area.as_ref() {
        Some(tags) if !tags.is_empty() => tags,
        _ => return true,
    };

    let mut listed_active = Vec::new();
    for name in tags.iter() {
        match ctx.areas.iter().find(|a| a.name == name) {
            Some(area) if area.active => listed_active.push(area),
            Some(_) => {}
            None => push_unique(
                issues,
                AssignError::AreaUndefined {
                    icao: ctx.config.icao.clone(),
                    name: name.to_string(),
                },
            ),
        }
    }
    if listed_active.is_empty() {
        return false;
    }

    let Some([lat, lon]) = flight.position else {
        push_unique(
            issues,
            AssignError::AircraftUnknown {
                callsign: flight.callsign.clone(),
            },
        );
        return false;
    };

    listed_active.iter().all(|area| {
        if !crate::geofence::is_usable(&area.polygon) {
            push_unique(
                issues,
                AssignError::AreaUndefined {
                    icao: ctx.config.icao.clone(),
                    name: area.name.clone(),
                },
            );
            return false;
        }
        area.contains(lat, lon)
    })
}

fn engine_matches(variant: &SidVariant, performance: &PerformanceTable, aircraft_type: &str) -> bool {
    match variant.engine_type.as_deref().map(str::trim) {
        Some(allowed) if !allowed.is_empty() => {
            allowed.contains(performance.engine_class(aircraft_type))
        }
        _ => true,
    }
}

fn push_unique(issues: &mut Vec<AssignError>, issue: AssignError) {
    if !issues.contains(&issue) {
        issues.push(issue);
    }
}
