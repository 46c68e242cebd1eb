//! Where configuration documents come from.
//!
//! [`LocalStore`] is the plugin-owned directory of cached documents.
//! [`ConfigSource`] is the remote side, implemented over HTTP by
//! [`HttpConfigSource`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("document not found at {0}")]
    NotFound(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Remote provider of airport documents.
pub trait ConfigSource: Send + Sync {
    /// Raw JSON of the airport document for `icao`.
    fn fetch_airport(&self, icao: &str) -> Result<String, SourceError>;
}

/// Fetches `<base>/<repo_path>/<ICAO>.json`, following redirects, with a
/// short request deadline.
pub struct HttpConfigSource {
    client: Client,
    base_url: String,
    repo_path: String,
}

impl HttpConfigSource {
    pub fn new(
        base_url: impl Into<String>,
        repo_path: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(Policy::limited(5))
            .user_agent(concat!("vsid/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SourceError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repo_path: repo_path.into().trim_matches('/').to_string(),
        })
    }

    pub fn airport_url(&self, icao: &str) -> String {
        format!("{}/{}/{}.json", self.base_url, self.repo_path, icao.to_uppercase())
    }
}

impl ConfigSource for HttpConfigSource {
    fn fetch_airport(&self, icao: &str) -> Result<String, SourceError> {
        let url = self.airport_url(icao);
        tracing::debug!("Fetching configuration {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url,
            });
        }

        response
            .text()
            .map_err(|err| SourceError::Transport(err.to_string()))
    }
}

/// Plugin-owned directory of cached and operator-provided documents.
///
/// ```text
/// <root>/airports/<ICAO>.json
/// <root>/overrides/<ICAO>.json
/// <root>/aircraft.json
/// <root>/settings.json
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn airport_path(&self, icao: &str) -> PathBuf {
        self.root
            .join("airports")
            .join(format!("{}.json", icao.to_uppercase()))
    }

    pub fn overrides_path(&self, icao: &str) -> PathBuf {
        self.root
            .join("overrides")
            .join(format!("{}.json", icao.to_uppercase()))
    }

    pub fn aircraft_path(&self) -> PathBuf {
        self.root.join("aircraft.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn read_airport(&self, icao: &str) -> Result<Option<String>, SourceError> {
        read_optional(&self.airport_path(icao))
    }

    /// Persist a freshly fetched document so later sessions start from it.
    pub fn write_airport(&self, icao: &str, raw: &str) -> Result<(), SourceError> {
        let path = self.airport_path(icao);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn read_overrides(&self, icao: &str) -> Result<Option<String>, SourceError> {
        read_optional(&self.overrides_path(icao))
    }

    pub fn read_aircraft(&self) -> Result<Option<String>, SourceError> {
        read_optional(&self.aircraft_path())
    }

    pub fn read_settings(&self) -> Result<Option<String>, SourceError> {
        read_optional(&self.settings_path())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, SourceError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
