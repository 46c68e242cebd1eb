//! Config Store: per-airport documents and the aircraft performance table.
//!
//! Each airport has one slot. A caller that finds the slot empty claims it
//! (marking it loading), releases the lock, runs the load state machine, and
//! re-locks only to commit. Concurrent callers for the same airport get
//! `Pending` instead of starting a second load. Failed airports are not
//! attempted again until their cool-down expires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use vsid_core::{AirportConfig, ConfigError, OverrideDocument, PerformanceTable, Settings};

use crate::backoff::Backoff;
use crate::config::PluginConfig;
use crate::load::{LoadState, SourceIo};
use crate::notify::NoticeBoard;
use crate::source::{ConfigSource, LocalStore};
use crate::{lock, read, write};

/// A loaded airport document and its optional operator overrides.
#[derive(Debug)]
pub struct AirportBundle {
    pub config: AirportConfig,
    pub overrides: Option<OverrideDocument>,
}

enum Slot {
    Loading,
    Ready(Arc<AirportBundle>),
    Failed { error: ConfigError, backoff: Backoff },
}

pub struct ConfigStore {
    local: LocalStore,
    remote: Arc<dyn ConfigSource>,
    schema_version: String,
    retry_backoff: Duration,
    failed_reload: Duration,
    slots: Mutex<HashMap<String, Slot>>,
    performance: RwLock<Arc<PerformanceTable>>,
    notices: Arc<NoticeBoard>,
}

impl ConfigStore {
    pub fn new(config: &PluginConfig, remote: Arc<dyn ConfigSource>, notices: Arc<NoticeBoard>) -> Self {
        Self {
            local: LocalStore::new(&config.config_dir),
            remote,
            schema_version: config.schema_version.clone(),
            retry_backoff: config.retry_backoff,
            failed_reload: config.failed_reload,
            slots: Mutex::new(HashMap::new()),
            performance: RwLock::new(Arc::new(PerformanceTable::default())),
            notices,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Airport document for `icao`, loading it if needed.
    ///
    /// Blocks for the duration of a load (local read, at most two fetches
    /// and one pause). No lock is held meanwhile.
    pub fn get(&self, icao: &str) -> Result<Arc<AirportBundle>, ConfigError> {
        let icao = icao.trim().to_uppercase();
        let prior_backoff = {
            let mut slots = lock(&self.slots);
            match slots.get(&icao) {
                Some(Slot::Ready(bundle)) => return Ok(bundle.clone()),
                Some(Slot::Loading) => return Err(ConfigError::Pending { icao }),
                Some(Slot::Failed { error, backoff }) if !backoff.ready() => {
                    return Err(error.clone());
                }
                Some(Slot::Failed { backoff, .. }) => {
                    let backoff = backoff.clone();
                    slots.insert(icao.clone(), Slot::Loading);
                    Some(backoff)
                }
                None => {
                    slots.insert(icao.clone(), Slot::Loading);
                    None
                }
            }
        };

        let io = SourceIo {
            local: &self.local,
            remote: self.remote.as_ref(),
            retry_backoff: self.retry_backoff,
        };
        let result = LoadState::run(&icao, &self.schema_version, &io);

        match result {
            Ok(config) => {
                let bundle = Arc::new(AirportBundle {
                    overrides: self.load_overrides(&icao),
                    config,
                });
                lock(&self.slots).insert(icao.clone(), Slot::Ready(bundle.clone()));
                self.notices.forget(&icao);
                tracing::info!("Configuration for {} loaded", icao);
                Ok(bundle)
            }
            Err(error) => {
                let mut backoff = prior_backoff
                    .unwrap_or_else(|| Backoff::new(self.failed_reload, self.failed_reload * 10));
                let delay = backoff.fail();
                tracing::debug!(
                    "Configuration for {} failed {} time(s), next attempt in {:?}",
                    icao,
                    backoff.failures(),
                    delay
                );
                lock(&self.slots).insert(
                    icao,
                    Slot::Failed {
                        error: error.clone(),
                        backoff,
                    },
                );
                self.notices.report_config(&error);
                Err(error)
            }
        }
    }

    /// Loaded document for `icao`, without triggering any I/O.
    pub fn cached(&self, icao: &str) -> Option<Arc<AirportBundle>> {
        match lock(&self.slots).get(&icao.trim().to_uppercase()) {
            Some(Slot::Ready(bundle)) => Some(bundle.clone()),
            _ => None,
        }
    }

    /// Drop the in-memory copy for `icao` so the next lookup reloads it.
    /// A load in flight is left alone.
    pub fn forget(&self, icao: &str) -> bool {
        let icao = icao.trim().to_uppercase();
        let mut slots = lock(&self.slots);
        match slots.get(&icao) {
            Some(Slot::Loading) | None => false,
            Some(_) => slots.remove(&icao).is_some(),
        }
    }

    /// Drop every in-memory document so the next lookup reloads.
    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    pub fn loaded_airports(&self) -> Vec<String> {
        let mut icaos: Vec<String> = lock(&self.slots)
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(icao, _)| icao.clone())
            .collect();
        icaos.sort();
        icaos
    }

    fn load_overrides(&self, icao: &str) -> Option<OverrideDocument> {
        match self.local.read_overrides(icao) {
            Ok(Some(raw)) => match OverrideDocument::parse(&raw) {
                Ok(doc) => Some(doc),
                Err(err) => {
                    tracing::warn!("Ignoring overrides for {}: {}", icao, err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!("Could not read overrides for {}: {}", icao, err);
                None
            }
        }
    }

    /// (Re)load the aircraft performance table. A missing or broken table
    /// leaves an empty one, so every type falls back to the defaults.
    pub fn load_performance(&self) -> usize {
        let table = match self.local.read_aircraft() {
            Ok(Some(raw)) => match PerformanceTable::parse(&raw) {
                Ok(table) => table,
                Err(err) => {
                    self.notices.announce(&format!("Aircraft table unreadable: {}", err));
                    PerformanceTable::default()
                }
            },
            Ok(None) => {
                tracing::warn!("No aircraft table at {}", self.local.aircraft_path().display());
                PerformanceTable::default()
            }
            Err(err) => {
                self.notices.announce(&format!("Aircraft table unreadable: {}", err));
                PerformanceTable::default()
            }
        };
        let count = table.len();
        *write(&self.performance) = Arc::new(table);
        tracing::info!("Loaded {} aircraft types", count);
        count
    }

    pub fn performance(&self) -> Arc<PerformanceTable> {
        read(&self.performance).clone()
    }

    /// Global settings, with each faulty field reported once and defaulted.
    pub fn load_settings(&self) -> Settings {
        let raw = match self.local.read_settings() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!("No settings at {}, using defaults", self.local.settings_path().display());
                return Settings::default();
            }
            Err(err) => {
                self.notices.announce(&format!("Settings unreadable, using defaults: {}", err));
                return Settings::default();
            }
        };
        let (settings, faults) = Settings::from_json(&raw);
        for fault in faults {
            self.notices.announce(&format!("Settings: {}", fault));
        }
        settings
    }
}
