//! Airport document load state machine.
//!
//! ```text
//! Absent ──local copy──▶ Validating ──ok──▶ Ready
//!    │                      │
//!    └──no copy──▶ Fetching ◀──fail, first attempt (pause)
//!                     │
//!                     └──fail, second attempt──▶ Failed
//! ```
//!
//! A load makes at most two attempts. The first failure, whether the local
//! copy was stale or the fetch went wrong, is followed by a pause and one
//! fresh fetch. The second failure is final.

use std::time::Duration;

use vsid_core::{AirportConfig, ConfigError, DocumentError};

use crate::source::{ConfigSource, LocalStore, SourceError};

pub const MAX_ATTEMPTS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

#[derive(Debug)]
pub enum LoadState {
    Absent,
    Fetching { attempt: u8 },
    Validating { attempt: u8, origin: Origin, raw: String },
    Ready(AirportConfig),
    Failed(ConfigError),
}

/// I/O performed by the state machine. Nothing here is called under a lock.
pub trait LoadIo {
    fn read_local(&self, icao: &str) -> Result<Option<String>, SourceError>;
    fn fetch_remote(&self, icao: &str) -> Result<String, SourceError>;
    fn persist(&self, icao: &str, raw: &str) -> Result<(), SourceError>;
    /// Wait between the failed attempt and the retry.
    fn pause(&self);
}

impl LoadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }

    /// Advance by one transition.
    pub fn step(self, icao: &str, expected_version: &str, io: &dyn LoadIo) -> LoadState {
        match self {
            Self::Absent => match io.read_local(icao) {
                Ok(Some(raw)) => Self::Validating {
                    attempt: 1,
                    origin: Origin::Local,
                    raw,
                },
                Ok(None) => Self::Fetching { attempt: 1 },
                Err(err) => {
                    tracing::warn!("Local configuration for {} unreadable: {}", icao, err);
                    Self::Fetching { attempt: 1 }
                }
            },
            Self::Fetching { attempt } => match io.fetch_remote(icao) {
                Ok(raw) => Self::Validating {
                    attempt,
                    origin: Origin::Remote,
                    raw,
                },
                Err(err) => {
                    tracing::warn!("Fetch of {} failed (attempt {}): {}", icao, attempt, err);
                    retry_or_fail(attempt, io, || ConfigError::Unreadable {
                        icao: icao.to_string(),
                        reason: err.to_string(),
                    })
                }
            },
            Self::Validating {
                attempt,
                origin,
                raw,
            } => match AirportConfig::parse(icao, &raw, expected_version) {
                Ok(config) => {
                    if origin == Origin::Remote {
                        if let Err(err) = io.persist(icao, &raw) {
                            tracing::warn!("Could not cache configuration for {}: {}", icao, err);
                        }
                    }
                    Self::Ready(config)
                }
                Err(err) => {
                    tracing::warn!(
                        "Configuration for {} from {:?} rejected (attempt {}): {}",
                        icao,
                        origin,
                        attempt,
                        err
                    );
                    retry_or_fail(attempt, io, || config_error(icao, expected_version, err))
                }
            },
            terminal => terminal,
        }
    }

    /// Drive from `Absent` to a terminal state.
    pub fn run(
        icao: &str,
        expected_version: &str,
        io: &dyn LoadIo,
    ) -> Result<AirportConfig, ConfigError> {
        let mut state = Self::Absent;
        while !state.is_terminal() {
            state = state.step(icao, expected_version, io);
        }
        match state {
            Self::Ready(config) => Ok(config),
            Self::Failed(err) => Err(err),
            _ => Err(ConfigError::Pending {
                icao: icao.to_string(),
            }),
        }
    }
}

fn retry_or_fail(attempt: u8, io: &dyn LoadIo, error: impl FnOnce() -> ConfigError) -> LoadState {
    if attempt < MAX_ATTEMPTS {
        io.pause();
        LoadState::Fetching {
            attempt: attempt + 1,
        }
    } else {
        LoadState::Failed(error())
    }
}

fn config_error(icao: &str, expected_version: &str, err: DocumentError) -> ConfigError {
    match err {
        DocumentError::MissingVersion => ConfigError::VersionMismatch {
            icao: icao.to_string(),
            expected: expected_version.to_string(),
            found: None,
        },
        DocumentError::VersionMismatch { expected, found } => ConfigError::VersionMismatch {
            icao: icao.to_string(),
            expected,
            found: Some(found),
        },
        other => ConfigError::Unreadable {
            icao: icao.to_string(),
            reason: other.to_string(),
        },
    }
}

/// [`LoadIo`] over the local directory and a remote source, pausing the
/// calling thread between attempts.
pub struct SourceIo<'a> {
    pub local: &'a LocalStore,
    pub remote: &'a dyn ConfigSource,
    pub retry_backoff: Duration,
}

impl LoadIo for SourceIo<'_> {
    fn read_local(&self, icao: &str) -> Result<Option<String>, SourceError> {
        self.local.read_airport(icao)
    }

    fn fetch_remote(&self, icao: &str) -> Result<String, SourceError> {
        self.remote.fetch_airport(icao)
    }

    fn persist(&self, icao: &str, raw: &str) -> Result<(), SourceError> {
        self.local.write_airport(icao, raw)
    }

    fn pause(&self) {
        std::thread::sleep(self.retry_backoff);
    }
}
