//! Host events, controller requests, tag diffing and operator commands.

mod common;

use common::{airport, departure, harness};
use vsid_core::{GroundStatus, Request};
use vsid_plugin::TagField;

#[test]
fn test_rescan_renders_tags_once() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.traffic.upsert(departure("EZY45"));

    assert_eq!(h.plugin.rescan(), 2);
    let after_first = h.tags.updates();
    assert_eq!(after_first, 8, "four fields for each of two callsigns");

    let cfl = h.tags.last("AFR123", TagField::Cfl).unwrap();
    assert_eq!(cfl.text, "050");
    let sid = h.tags.last("AFR123", TagField::Sid).unwrap();
    assert_eq!(sid.text, "OKIPA9A");

    assert_eq!(h.plugin.rescan(), 2);
    assert_eq!(h.tags.updates(), after_first, "unchanged values are not pushed again");
}

#[test]
fn test_rescan_drops_flights_leaving_scope() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.traffic.upsert(departure("EZY45"));
    h.plugin.rescan();
    assert_eq!(h.plugin.pilots().len(), 2);

    h.traffic.update("EZY45", |f| f.ground_status = Some(GroundStatus::Departed));
    assert_eq!(h.plugin.rescan(), 1);
    let pilots = h.plugin.pilots();
    assert_eq!(pilots.len(), 1);
    assert_eq!(pilots[0].callsign, "AFR123");
    assert_eq!(h.plugin.scope(), vec!["AFR123".to_string()]);
}

#[test]
fn test_cleared_level_changes_cfl_tag() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();

    h.traffic.update("AFR123", |f| f.cleared_flight_level = 7000);
    h.plugin.on_temporary_altitude_changed("AFR123");
    let cfl = h.tags.last("AFR123", TagField::Cfl).unwrap();
    assert_eq!(cfl.text, "070");
    assert_eq!(cfl.color, Some(h.plugin.settings().colors.deviation));
}

#[test]
fn test_served_request_is_cleared() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();

    h.plugin.set_request("AFR123", Request::Clearance);
    assert_eq!(h.plugin.pending_requests(Request::Clearance), vec!["AFR123".to_string()]);
    assert_eq!(h.tags.last("AFR123", TagField::Request).unwrap().text, "CLR");

    h.traffic.update("AFR123", |f| f.clearance_issued = true);
    h.plugin.on_controller_data_updated("AFR123");
    assert_eq!(h.plugin.request("AFR123"), Request::None);
    assert_eq!(h.tags.last("AFR123", TagField::Request).unwrap().text, "");
}

#[test]
fn test_departed_aircraft_is_evicted() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();
    h.plugin.set_request("AFR123", Request::Taxi);

    h.traffic.update("AFR123", |f| f.ground_status = Some(GroundStatus::Departed));
    h.plugin.on_controller_data_updated("AFR123");
    assert!(h.plugin.pilots().is_empty());
    assert_eq!(h.plugin.request("AFR123"), Request::None);
}

#[test]
fn test_flightplan_removed_evicts() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();

    h.traffic.remove("AFR123");
    h.plugin.on_flightplan_removed("AFR123");
    assert!(h.plugin.pilots().is_empty());
    assert!(!h.plugin.in_scope("AFR123"));
}

#[test]
fn test_flightplan_update_recomputes() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();

    h.traffic.update("AFR123", |f| {
        if let Some(route) = f.route.as_mut() {
            route.waypoints = vec!["UNKNOWN".into()];
            route.suggested_sid = "UNKNO1A".into();
        }
    });
    h.plugin.on_flightplan_updated("AFR123");
    let pilot = h.plugin.get_or_compute("AFR123").unwrap();
    assert_eq!(pilot.sid, vsid_core::CHECK_FP);
}

#[test]
fn test_airport_reconfiguration_resets_toggles() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();
    h.plugin.toggle_rule("LFPG", "r1");
    assert!(!h.plugin.rules()[0].active);

    *h.traffic.airports.lock().unwrap() = vec![airport("LFPG", &["27L"])];
    h.plugin.on_airport_configurations_updated();

    assert!(h.plugin.pilots().is_empty());
    assert_eq!(h.plugin.active_airports()[0].dep_runways, vec!["27L".to_string()]);
    let rules = h.plugin.rules();
    assert_eq!(rules.len(), 1);
    assert!(rules[0].active, "registry is re-seeded from document defaults");
}

#[test]
fn test_unknown_toggle_is_announced() {
    let h = harness();
    assert_eq!(h.plugin.toggle_area("LFPG", "nowhere"), None);
    assert_eq!(h.chat.count_containing("Unknown area nowhere at LFPG"), 1);
}

#[test]
fn test_remove_pilot() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.get_or_compute("AFR123").unwrap();
    assert!(h.plugin.remove_pilot("afr123"));
    assert!(!h.plugin.remove_pilot("AFR123"));
}

#[test]
fn test_reset_disables_auto_mode_and_clears_state() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();
    h.plugin.set_request("AFR123", Request::Push);
    assert!(h.plugin.auto_mode());

    h.plugin.reset();
    assert!(!h.plugin.auto_mode());
    assert!(h.plugin.pilots().is_empty());
    assert!(h.plugin.rules().is_empty());
    assert!(h.plugin.scope().is_empty());
    assert_eq!(h.plugin.request("AFR123"), Request::None);
    assert!(h.plugin.config_store().loaded_airports().is_empty());

    assert!(h.plugin.toggle_auto_mode());
}

#[test]
fn test_tick_follows_update_interval() {
    let h = harness();
    let interval = h.plugin.update_interval();
    let due: Vec<bool> = (0..interval * 2).map(|_| h.plugin.tick()).collect();
    assert_eq!(due.iter().filter(|d| **d).count(), 2);
    assert!(due[(interval - 1) as usize]);

    h.plugin.toggle_auto_mode();
    assert!((0..interval * 2).all(|_| !h.plugin.tick()));
}

#[test]
fn test_position_update_raises_ground_alert() {
    let h = harness();
    h.traffic.upsert(departure("AFR123"));
    h.plugin.rescan();

    h.plugin.on_position_update("AFR123");
    assert_eq!(h.plugin.tag("AFR123", TagField::Alert).unwrap().text, "");

    h.traffic.update("AFR123", |f| f.ground_status = Some(GroundStatus::Push));
    h.plugin.on_position_update("AFR123");
    let alert = h.tags.last("AFR123", TagField::Alert).unwrap();
    let colors = h.plugin.settings().colors;
    assert_eq!(alert.text, "NO CLR");
    assert_eq!(alert.color, Some(colors.alert_text));
    assert_eq!(alert.background, Some(colors.alert_background));

    h.traffic.update("AFR123", |f| f.clearance_issued = true);
    h.plugin.on_position_update("AFR123");
    assert_eq!(h.tags.last("AFR123", TagField::Alert).unwrap().text, "");
}

#[test]
fn test_evicted_flight_is_announced_again() {
    let h = harness();
    let mut flight = departure("AFR123");
    if let Some(route) = flight.route.as_mut() {
        route.suggested_sid = "A".into();
    }
    h.traffic.upsert(flight);

    assert_eq!(h.plugin.get_or_compute("AFR123").unwrap().sid, vsid_core::CHECK_FP);
    assert!(h.plugin.remove_pilot("AFR123"));
    h.plugin.get_or_compute("AFR123").unwrap();
    assert_eq!(h.chat.count_containing("route of AFR123 is malformed"), 2);
}
