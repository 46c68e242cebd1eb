//! The plugin: host events, operator commands and the periodic rescan.
//!
//! Each concern has its own lock: the scope list, the request board, the
//! config store and registry and assignment cache behind the engine, and the
//! tag render cache. None of them is held across config I/O.
//!
//! Only [`VsidPlugin::rescan`] and [`VsidPlugin::get_or_compute`] may load
//! configuration. Host events work from what is already loaded and leave
//! missing airports to the next rescan.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Context;
use thiserror::Error;
use vsid_core::{
    engine, ActiveAirport, AirportContext, Area, AssignError, FlightSnapshot, Palette, Pilot,
    Request, Rule, Settings,
};

use crate::config::PluginConfig;
use crate::host::{AirportStatus, Host, TagField, TagValue};
use crate::loops::scheduler::Scheduler;
use crate::notify::NoticeBoard;
use crate::pilots::AssignmentCache;
use crate::registry::Registry;
use crate::requests::RequestBoard;
use crate::source::{ConfigSource, HttpConfigSource};
use crate::store::ConfigStore;
use crate::tags::{self, TagRenderCache};
use crate::{lock, read, write};

/// Why a callsign gets no assignment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutOfScope {
    #[error("no flight plan")]
    NoFlightPlan,
    #[error("no aircraft is tracked")]
    NoAircraft,
    #[error("origin {0} is not an active departure airport")]
    NotDepartureAirport(String),
    #[error("{distance:.1} NM from origin, limit {limit:.1} NM")]
    TooFar { distance: f64, limit: f64 },
    #[error("already departed")]
    Departed,
}

pub struct VsidPlugin {
    host: Host,
    notices: Arc<NoticeBoard>,
    store: ConfigStore,
    registry: Registry,
    pilots: AssignmentCache,
    requests: RequestBoard,
    rendered: TagRenderCache,
    scope: Mutex<Vec<String>>,
    airports: RwLock<Vec<ActiveAirport>>,
    settings: RwLock<Settings>,
    auto_mode: AtomicBool,
    ticks: AtomicU64,
}

/// Whether a lookup may load a missing airport configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigAccess {
    Load,
    LoadedOnly,
}

pub fn normalize_callsign(callsign: &str) -> String {
    callsign.trim().to_uppercase()
}

impl VsidPlugin {
    /// Build the plugin with the HTTP config source described by `config`
    /// and the local settings document.
    pub fn connect(config: PluginConfig, host: Host) -> anyhow::Result<Self> {
        let settings = crate::source::LocalStore::new(&config.config_dir)
            .read_settings()
            .ok()
            .flatten()
            .map(|raw| Settings::from_json(&raw).0)
            .unwrap_or_default();
        let remote = HttpConfigSource::new(
            config.remote_base.clone(),
            settings.config_github_url,
            config.fetch_timeout,
        )
        .context("failed to build HTTP config source")?;
        Ok(Self::new(config, host, Arc::new(remote)))
    }

    pub fn new(config: PluginConfig, host: Host, remote: Arc<dyn ConfigSource>) -> Self {
        let notices = Arc::new(NoticeBoard::new(host.notifier.clone()));
        let store = ConfigStore::new(&config, remote, notices.clone());
        let settings = store.load_settings();
        store.load_performance();

        let plugin = Self {
            host,
            notices,
            store,
            registry: Registry::new(),
            pilots: AssignmentCache::new(),
            requests: RequestBoard::new(),
            rendered: TagRenderCache::new(),
            scope: Mutex::new(Vec::new()),
            airports: RwLock::new(Vec::new()),
            settings: RwLock::new(settings),
            auto_mode: AtomicBool::new(true),
            ticks: AtomicU64::new(0),
        };
        plugin.populate_active_airports();
        tracing::info!(
            "vSID {} ready with config dir {}",
            env!("CARGO_PKG_VERSION"),
            config.config_dir.display()
        );
        plugin
    }

    /// Start the periodic rescan on the current tokio runtime.
    pub fn start(self: &Arc<Self>) -> Scheduler {
        Scheduler::spawn(self.clone())
    }

    pub fn settings(&self) -> Settings {
        read(&self.settings).clone()
    }

    pub fn update_interval(&self) -> u64 {
        read(&self.settings).update_interval.max(1)
    }

    fn palette(&self) -> Palette {
        read(&self.settings).colors.clone()
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.store
    }

    // ========== SCOPE ==========

    /// Refresh the departure airports from the host. Rules and areas of
    /// airports already loaded are seeded; nothing is fetched.
    pub fn populate_active_airports(&self) -> Vec<ActiveAirport> {
        let active: Vec<ActiveAirport> = self
            .host
            .traffic
            .airport_configurations()
            .into_iter()
            .filter(|cfg| cfg.status == AirportStatus::Active)
            .map(|cfg| ActiveAirport {
                icao: cfg.icao.trim().to_uppercase(),
                dep_runways: cfg.dep_runways,
            })
            .collect();

        for airport in &active {
            if let Some(bundle) = self.store.cached(&airport.icao) {
                self.registry.populate(&bundle.config);
            }
        }
        tracing::info!(
            "Active departure airports: {}",
            active.iter().map(|a| a.icao.as_str()).collect::<Vec<_>>().join(", ")
        );
        *write(&self.airports) = active.clone();
        active
    }

    pub fn active_airports(&self) -> Vec<ActiveAirport> {
        read(&self.airports).clone()
    }

    fn dep_runways(&self, icao: &str) -> Vec<String> {
        read(&self.airports)
            .iter()
            .find(|a| a.icao == icao)
            .map(|a| a.dep_runways.clone())
            .unwrap_or_default()
    }

    pub fn check_scope(&self, flight: &FlightSnapshot) -> Result<(), OutOfScope> {
        if flight.callsign.trim().is_empty() {
            return Err(OutOfScope::NoFlightPlan);
        }
        let origin = flight.origin.trim().to_uppercase();
        if !read(&self.airports).iter().any(|a| a.icao == origin) {
            return Err(OutOfScope::NotDepartureAirport(origin));
        }
        let (Some(_), Some(distance)) = (flight.position, flight.distance_from_origin) else {
            return Err(OutOfScope::NoAircraft);
        };
        let limit = read(&self.settings).max_distance;
        if distance > limit {
            return Err(OutOfScope::TooFar { distance, limit });
        }
        if flight.has_departed() {
            return Err(OutOfScope::Departed);
        }
        Ok(())
    }

    pub fn in_scope(&self, callsign: &str) -> bool {
        let callsign = normalize_callsign(callsign);
        lock(&self.scope).contains(&callsign)
    }

    pub fn scope(&self) -> Vec<String> {
        lock(&self.scope).clone()
    }

    fn evict(&self, callsign: &str) -> bool {
        let removed = self.pilots.invalidate(callsign).is_some();
        self.rendered.forget(callsign);
        self.notices.forget(callsign);
        lock(&self.scope).retain(|c| c != callsign);
        removed
    }

    // ========== ASSIGNMENT ==========

    /// Cached assignment for `callsign`, computing it if needed. An
    /// out-of-scope callsign is evicted.
    ///
    /// May block while the origin's configuration loads.
    pub fn get_or_compute(&self, callsign: &str) -> Result<Pilot, OutOfScope> {
        self.lookup(callsign, ConfigAccess::Load)
    }

    fn lookup(&self, callsign: &str, access: ConfigAccess) -> Result<Pilot, OutOfScope> {
        let callsign = normalize_callsign(callsign);
        let Some(flight) = self.host.traffic.flight(&callsign) else {
            self.evict(&callsign);
            return Err(OutOfScope::NoFlightPlan);
        };
        if let Err(reason) = self.check_scope(&flight) {
            if self.evict(&callsign) {
                tracing::debug!("Evicted {}: {}", callsign, reason);
            }
            return Err(reason);
        }
        {
            let mut scope = lock(&self.scope);
            if !scope.contains(&callsign) {
                scope.push(callsign.clone());
            }
        }
        Ok(self.pilot_for(&callsign, &flight, access))
    }

    fn pilot_for(&self, callsign: &str, flight: &FlightSnapshot, access: ConfigAccess) -> Pilot {
        if let Some(pilot) = self.pilots.get(callsign) {
            return pilot;
        }
        let ticket = self.pilots.begin();
        let (pilot, configured) = self.compute(callsign, flight, access);
        // Fallback results are not cached so the next pass retries the config.
        if configured {
            self.pilots.commit(ticket, pilot.clone());
        }
        pilot
    }

    /// Run the engine for one flight. The flag tells whether the origin's
    /// configuration was available.
    fn compute(&self, callsign: &str, flight: &FlightSnapshot, access: ConfigAccess) -> (Pilot, bool) {
        let origin = flight.origin.trim().to_uppercase();
        let bundle = match access {
            ConfigAccess::Load => match self.store.get(&origin) {
                Ok(bundle) => Some(bundle),
                Err(err) => {
                    tracing::debug!("No configuration for {} ({}): {}", callsign, origin, err);
                    None
                }
            },
            ConfigAccess::LoadedOnly => {
                let bundle = self.store.cached(&origin);
                if bundle.is_none() {
                    tracing::debug!("{} not loaded yet, {} keeps its suggestion", origin, callsign);
                }
                bundle
            }
        };
        if let Some(bundle) = &bundle {
            self.registry.populate(&bundle.config);
        }

        let dep_runways = self.dep_runways(&origin);
        let active_rules = self.registry.active_rule_names(&origin);
        let areas = self.registry.list_areas(&origin);
        let performance = self.store.performance();
        let ctx = bundle.as_ref().map(|bundle| AirportContext {
            config: &bundle.config,
            dep_runways: &dep_runways,
            active_rules: &active_rules,
            areas: &areas,
            overrides: bundle.overrides.as_ref(),
            performance: &performance,
        });

        let output = engine::assign(flight, ctx.as_ref());
        for issue in &output.issues {
            self.notices.report_issue(issue);
        }
        let pilot = Pilot::from_assignment(callsign, &origin, output.assignment);
        tracing::debug!(
            "{} from {}: rwy {} sid {} cfl {}",
            pilot.callsign,
            pilot.origin,
            pilot.runway,
            pilot.sid,
            pilot.cfl
        );
        (pilot, bundle.is_some())
    }

    fn render_tags(&self, flight: &FlightSnapshot, pilot: &Pilot) {
        let palette = self.palette();
        let dep_runways = self.dep_runways(&pilot.origin);
        let sink = self.host.tags.as_ref();
        let callsign = pilot.callsign.as_str();

        self.rendered
            .publish(sink, callsign, TagField::Cfl, tags::render_cfl(flight, pilot, &palette));
        self.rendered.publish(
            sink,
            callsign,
            TagField::Rwy,
            tags::render_rwy(flight, pilot, &dep_runways, &palette),
        );
        self.rendered
            .publish(sink, callsign, TagField::Sid, tags::render_sid(flight, pilot, &palette));
        self.rendered.publish(
            sink,
            callsign,
            TagField::Request,
            tags::render_request(self.requests.get(callsign), &palette),
        );
    }

    fn publish_alert(&self, callsign: &str, flight: &FlightSnapshot) {
        let (alert_max_alt, palette) = {
            let settings = read(&self.settings);
            (settings.alert_max_alt, settings.colors.clone())
        };
        self.rendered.publish(
            self.host.tags.as_ref(),
            callsign,
            TagField::Alert,
            tags::render_alert(flight, alert_max_alt, &palette),
        );
    }

    /// Last value pushed to the host for one tag field.
    pub fn tag(&self, callsign: &str, field: TagField) -> Option<TagValue> {
        self.rendered.get(&normalize_callsign(callsign), field)
    }

    /// Recompute and redraw from loaded configuration only.
    fn refresh(&self, callsign: &str) {
        if let Ok(pilot) = self.lookup(callsign, ConfigAccess::LoadedOnly) {
            if let Some(flight) = self.host.traffic.flight(callsign) {
                self.render_tags(&flight, &pilot);
            }
        }
    }

    /// Recompute the scope from every flight plan, evict what left it and
    /// refresh the tags of what remains. Returns the scope size.
    pub fn rescan(&self) -> usize {
        let mut in_scope: Vec<(String, FlightSnapshot)> = Vec::new();
        for flight in self.host.traffic.flights() {
            let callsign = normalize_callsign(&flight.callsign);
            if self.check_scope(&flight).is_ok() && !in_scope.iter().any(|(c, _)| *c == callsign) {
                in_scope.push((callsign, flight));
            }
        }

        let callsigns: Vec<String> = in_scope.iter().map(|(c, _)| c.clone()).collect();
        let evicted = self.pilots.retain(&callsigns);
        let previous = std::mem::replace(&mut *lock(&self.scope), callsigns.clone());
        for gone in previous.iter().filter(|c| !callsigns.contains(c)) {
            self.rendered.forget(gone);
        }

        for (callsign, flight) in &in_scope {
            let pilot = self.pilot_for(callsign, flight, ConfigAccess::Load);
            self.render_tags(flight, &pilot);
        }

        tracing::debug!("Rescan: {} in scope, {} evicted", in_scope.len(), evicted);
        in_scope.len()
    }

    /// Advance the one-second counter. True when a rescan is due.
    pub fn tick(&self) -> bool {
        let count = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        self.auto_mode.load(Ordering::Relaxed) && count % self.update_interval() == 0
    }

    // ========== HOST EVENTS ==========

    pub fn on_controller_data_updated(&self, callsign: &str) {
        let callsign = normalize_callsign(callsign);
        if !self.in_scope(&callsign) {
            return;
        }
        let Some(flight) = self.host.traffic.flight(&callsign) else {
            self.evict(&callsign);
            return;
        };
        if flight.has_departed() {
            self.evict(&callsign);
            self.requests.clear(&callsign);
            return;
        }
        if let Some(request) = self.requests.resolve_if_satisfied(&flight) {
            tracing::debug!("{} request of {} served", request.label(), callsign);
        }
        self.refresh(&callsign);
    }

    /// The controller changed airport configurations: everything derived
    /// from the old setup is dropped.
    pub fn on_airport_configurations_updated(&self) {
        let evicted = self.pilots.invalidate_all();
        self.registry.clear();
        self.rendered.clear();
        lock(&self.scope).clear();
        self.populate_active_airports();
        tracing::info!("Airport configuration changed, {} pilots evicted", evicted);
    }

    pub fn on_temporary_altitude_changed(&self, callsign: &str) {
        let callsign = normalize_callsign(callsign);
        if self.in_scope(&callsign) {
            self.refresh(&callsign);
        }
    }

    pub fn on_position_update(&self, callsign: &str) {
        let callsign = normalize_callsign(callsign);
        if !self.in_scope(&callsign) {
            return;
        }
        match self.host.traffic.flight(&callsign) {
            Some(flight) => match self.check_scope(&flight) {
                Ok(()) => self.publish_alert(&callsign, &flight),
                Err(reason) => {
                    tracing::debug!("{} left scope: {}", callsign, reason);
                    self.evict(&callsign);
                }
            },
            None => {
                self.evict(&callsign);
            }
        }
    }

    pub fn on_flightplan_updated(&self, callsign: &str) {
        let callsign = normalize_callsign(callsign);
        self.pilots.invalidate(&callsign);
        self.refresh(&callsign);
    }

    pub fn on_flightplan_removed(&self, callsign: &str) {
        let callsign = normalize_callsign(callsign);
        self.evict(&callsign);
        self.requests.clear(&callsign);
    }

    // ========== CONTROLLER REQUESTS ==========

    pub fn set_request(&self, callsign: &str, request: Request) {
        let callsign = normalize_callsign(callsign);
        self.requests.set(&callsign, request);
        if let Some(flight) = self.host.traffic.flight(&callsign) {
            if let Some(pilot) = self.pilots.get(&callsign) {
                self.render_tags(&flight, &pilot);
            }
        }
    }

    pub fn request(&self, callsign: &str) -> Request {
        self.requests.get(&normalize_callsign(callsign))
    }

    pub fn pending_requests(&self, request: Request) -> Vec<String> {
        self.requests.pending(request)
    }

    // ========== OPERATOR COMMANDS ==========

    pub fn toggle_auto_mode(&self) -> bool {
        let enabled = !self.auto_mode.fetch_xor(true, Ordering::Relaxed);
        self.notices.announce(&format!(
            "Automatic updates {}",
            if enabled { "enabled" } else { "disabled" }
        ));
        enabled
    }

    pub fn auto_mode(&self) -> bool {
        self.auto_mode.load(Ordering::Relaxed)
    }

    pub fn pilots(&self) -> Vec<Pilot> {
        self.pilots.list()
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.registry.all_rules()
    }

    pub fn areas(&self) -> Vec<Area> {
        self.registry.all_areas()
    }

    /// Flip a rule; any flight may be affected, so every pilot is evicted.
    pub fn toggle_rule(&self, icao: &str, name: &str) -> Option<bool> {
        let icao = icao.trim().to_uppercase();
        let Some(active) = self.registry.toggle_rule(&icao, name) else {
            self.notices.announce(&format!("Unknown rule {} at {}", name, icao));
            return None;
        };
        self.pilots.invalidate_all();
        self.notices.announce(&format!(
            "Rule {} at {} is now {}",
            name.trim().to_lowercase(),
            icao,
            if active { "active" } else { "inactive" }
        ));
        Some(active)
    }

    /// Flip an area; every pilot is evicted.
    pub fn toggle_area(&self, icao: &str, name: &str) -> Option<bool> {
        let icao = icao.trim().to_uppercase();
        let Some(active) = self.registry.toggle_area(&icao, name) else {
            self.notices.announce(&format!("Unknown area {} at {}", name, icao));
            return None;
        };
        self.pilots.invalidate_all();
        self.notices.announce(&format!(
            "Area {} at {} is now {}",
            name.trim().to_lowercase(),
            icao,
            if active { "active" } else { "inactive" }
        ));
        Some(active)
    }

    /// Evict every pilot departing `icao` and drop its loaded document, so
    /// the next rescan reloads it from disk or remote.
    pub fn invalidate_airport(&self, icao: &str) -> usize {
        let icao = icao.trim().to_uppercase();
        let evicted = self.pilots.invalidate_airport(&icao);
        let dropped = self.store.forget(&icao);
        tracing::info!(
            "{} invalidated: {} pilots evicted, document {}",
            icao,
            evicted,
            if dropped { "dropped" } else { "not loaded" }
        );
        evicted
    }

    pub fn remove_pilot(&self, callsign: &str) -> bool {
        self.evict(&normalize_callsign(callsign))
    }

    /// Whether the aircraft is inside the named area. Unknown aircraft,
    /// unknown areas and degenerate polygons answer `false`.
    pub fn position_in_area(&self, callsign: &str, area: &str) -> bool {
        let callsign = normalize_callsign(callsign);
        let Some([lat, lon]) = self.host.traffic.flight(&callsign).and_then(|f| f.position) else {
            self.notices
                .report_issue(&AssignError::AircraftUnknown { callsign });
            return false;
        };
        let found = self.registry.find_area(area);
        match found {
            Some(area) if vsid_core::geofence::is_usable(&area.polygon) => area.contains(lat, lon),
            Some(area) => {
                self.notices.report_issue(&AssignError::AreaUndefined {
                    icao: area.oaci,
                    name: area.name,
                });
                false
            }
            None => {
                self.notices.report_issue(&AssignError::AreaUndefined {
                    icao: String::new(),
                    name: area.trim().to_lowercase(),
                });
                false
            }
        }
    }

    /// Back to a freshly started state with automatic updates off.
    pub fn reset(&self) {
        self.auto_mode.store(false, Ordering::Relaxed);
        self.pilots.invalidate_all();
        self.store.clear();
        self.registry.clear();
        self.requests.clear_all();
        self.rendered.clear();
        lock(&self.scope).clear();
        self.notices.clear();
        *write(&self.settings) = self.store.load_settings();
        self.store.load_performance();
        self.populate_active_airports();
        self.notices.announce("vSID reset");
    }
}
