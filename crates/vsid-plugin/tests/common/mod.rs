//! In-memory host and config source for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vsid_core::{FlightSnapshot, Route};
use vsid_plugin::{
    AirportConfiguration, AirportStatus, ConfigSource, Host, Notifier, PluginConfig, SourceError,
    TagField, TagSink, TagValue, TrafficProvider, VsidPlugin,
};

pub const LFPG: &str = r#"{
    "version": "1.0.0",
    "customRules": {"R1": true},
    "areas": {
        "NORTH": {
            "active": true,
            "a": {"lat": "49.00", "lon": "2.40"},
            "b": {"lat": "49.20", "lon": "2.40"},
            "c": {"lat": "49.20", "lon": "2.70"},
            "d": {"lat": "49.00", "lon": "2.70"}
        }
    },
    "sids": {
        "OKIPA": {
            "A": {
                "1": {"rwy": "27R", "customRule": "R1", "initial": 5000}
            }
        }
    },
    "transAlt": 5000
}"#;

pub const AIRCRAFT: &str = r#"{
    "A320": {"engineType": "J", "rnav": true},
    "AT76": {"engineType": "T", "rnav": false}
}"#;

#[derive(Default)]
pub struct FakeTraffic {
    pub flights: Mutex<HashMap<String, FlightSnapshot>>,
    pub airports: Mutex<Vec<AirportConfiguration>>,
    pub scans: AtomicU32,
}

impl FakeTraffic {
    pub fn upsert(&self, flight: FlightSnapshot) {
        self.flights
            .lock()
            .unwrap()
            .insert(flight.callsign.clone(), flight);
    }

    pub fn update(&self, callsign: &str, change: impl FnOnce(&mut FlightSnapshot)) {
        if let Some(flight) = self.flights.lock().unwrap().get_mut(callsign) {
            change(flight);
        }
    }

    pub fn remove(&self, callsign: &str) {
        self.flights.lock().unwrap().remove(callsign);
    }
}

impl TrafficProvider for FakeTraffic {
    fn flight(&self, callsign: &str) -> Option<FlightSnapshot> {
        self.flights.lock().unwrap().get(callsign).cloned()
    }

    fn flights(&self) -> Vec<FlightSnapshot> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.flights.lock().unwrap().values().cloned().collect()
    }

    fn airport_configurations(&self) -> Vec<AirportConfiguration> {
        self.airports.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct Chat(pub Mutex<Vec<String>>);

impl Chat {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

impl Notifier for Chat {
    fn send(&self, sender: &str, message: &str) {
        self.0.lock().unwrap().push(format!("[{}] {}", sender, message));
    }
}

#[derive(Default)]
pub struct Tags(pub Mutex<Vec<(String, TagField, TagValue)>>);

impl Tags {
    pub fn updates(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn last(&self, callsign: &str, field: TagField) -> Option<TagValue> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(c, f, _)| c == callsign && *f == field)
            .map(|(_, _, v)| v.clone())
    }
}

impl TagSink for Tags {
    fn update_tag(&self, callsign: &str, field: TagField, value: &TagValue) {
        self.0
            .lock()
            .unwrap()
            .push((callsign.to_string(), field, value.clone()));
    }
}

pub struct FakeRemote {
    pub documents: Mutex<HashMap<String, String>>,
    pub fetches: AtomicU32,
}

impl FakeRemote {
    pub fn with(icao: &str, body: &str) -> Self {
        let mut documents = HashMap::new();
        documents.insert(icao.to_string(), body.to_string());
        Self {
            documents: Mutex::new(documents),
            fetches: AtomicU32::new(0),
        }
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ConfigSource for FakeRemote {
    fn fetch_airport(&self, icao: &str) -> Result<String, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .get(icao)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(icao.to_string()))
    }
}

pub const LFPO: &str = r#"{
    "version": "1.0.0",
    "sids": {
        "OKIPA": {
            "A": {"1": {"rwy": "06", "initial": 4000}}
        }
    }
}"#;

/// Serves documents, holding fetches for one airport until released.
pub struct GatedRemote {
    gated: String,
    documents: HashMap<String, String>,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
    pub fetches: AtomicU32,
}

/// Test side of a [`GatedRemote`]: learn that a fetch is held, then let it go.
pub struct Gate {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

impl GatedRemote {
    pub fn new(gated: &str, documents: &[(&str, &str)]) -> (Self, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let remote = Self {
            gated: gated.to_string(),
            documents: documents
                .iter()
                .map(|(icao, body)| (icao.to_string(), body.to_string()))
                .collect(),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            fetches: AtomicU32::new(0),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (remote, gate)
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ConfigSource for GatedRemote {
    fn fetch_airport(&self, icao: &str) -> Result<String, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if icao == self.gated {
            let _ = self.entered.lock().unwrap().send(());
            // bounded so a regression fails the test instead of hanging it
            let _ = self
                .release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(2));
        }
        self.documents
            .get(icao)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(icao.to_string()))
    }
}

pub struct Harness<R = FakeRemote> {
    pub plugin: Arc<VsidPlugin>,
    pub traffic: Arc<FakeTraffic>,
    pub chat: Arc<Chat>,
    pub tags: Arc<Tags>,
    pub remote: Arc<R>,
    pub dir: tempfile::TempDir,
}

pub fn airport(icao: &str, runways: &[&str]) -> AirportConfiguration {
    AirportConfiguration {
        icao: icao.to_string(),
        status: AirportStatus::Active,
        dep_runways: runways.iter().map(|r| r.to_string()).collect(),
    }
}

pub fn departure(callsign: &str) -> FlightSnapshot {
    FlightSnapshot {
        callsign: callsign.to_string(),
        origin: "LFPG".to_string(),
        flight_rules: Default::default(),
        route: Some(Route {
            waypoints: vec!["OKIPA".into(), "UN860".into()],
            suggested_sid: "OKIPA9A".into(),
            suggested_runway: "27R".into(),
            ..Route::default()
        }),
        aircraft_type: "A320".to_string(),
        position: Some([49.1, 2.5]),
        distance_from_origin: Some(0.5),
        altitude: None,
        ground_speed: None,
        ground_status: None,
        clearance_issued: false,
        cleared_flight_level: 0,
    }
}

pub fn write_local(dir: &Path, settings: Option<&str>) {
    std::fs::write(dir.join("aircraft.json"), AIRCRAFT).unwrap();
    if let Some(settings) = settings {
        std::fs::write(dir.join("settings.json"), settings).unwrap();
    }
}

pub fn harness_with(remote_doc: &str, airports: Vec<AirportConfiguration>) -> Harness {
    harness_with_source(Arc::new(FakeRemote::with("LFPG", remote_doc)), airports)
}

pub fn harness_with_source<R: ConfigSource + 'static>(
    remote: Arc<R>,
    airports: Vec<AirportConfiguration>,
) -> Harness<R> {
    let dir = tempfile::tempdir().unwrap();
    write_local(dir.path(), None);

    let traffic = Arc::new(FakeTraffic::default());
    *traffic.airports.lock().unwrap() = airports;
    let chat = Arc::new(Chat::default());
    let tags = Arc::new(Tags::default());

    let config = PluginConfig {
        config_dir: dir.path().to_path_buf(),
        retry_backoff: Duration::from_millis(1),
        ..PluginConfig::default()
    };
    let host = Host {
        traffic: traffic.clone(),
        notifier: chat.clone(),
        tags: tags.clone(),
    };
    let plugin = Arc::new(VsidPlugin::new(config, host, remote.clone()));

    Harness {
        plugin,
        traffic,
        chat,
        tags,
        remote,
        dir,
    }
}

pub fn harness() -> Harness {
    harness_with(LFPG, vec![airport("LFPG", &["27R", "27L"])])
}
