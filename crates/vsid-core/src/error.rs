//! Error taxonomy for configuration loading and assignment.
//!
//! None of these are fatal: every variant maps to a fallback output at the
//! engine boundary. `kind()` gives a stable key for per-airport dedup of
//! operator notices.

use thiserror::Error;

/// Stable identifier of an error variant, used as a dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    ConfigUnreadable,
    ConfigVersionMismatch,
    ConfigPending,
    NoMatchingSid,
    MalformedRoute,
    AircraftUnknown,
    AreaUndefined,
}

/// Failure to obtain a usable airport document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Local copy and remote source both absent, or the payload did not parse.
    #[error("configuration for {icao} is unreadable: {reason}")]
    Unreadable { icao: String, reason: String },

    /// The document parsed but carries the wrong schema version.
    #[error("configuration for {icao} has version {found:?}, expected {expected}")]
    VersionMismatch {
        icao: String,
        expected: String,
        found: Option<String>,
    },

    /// Another caller is loading this airport right now, or it is cooling down
    /// after a failure.
    #[error("configuration for {icao} is not available yet")]
    Pending { icao: String },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreadable { .. } => ErrorKind::ConfigUnreadable,
            Self::VersionMismatch { .. } => ErrorKind::ConfigVersionMismatch,
            Self::Pending { .. } => ErrorKind::ConfigPending,
        }
    }

    pub fn icao(&self) -> &str {
        match self {
            Self::Unreadable { icao, .. }
            | Self::VersionMismatch { icao, .. }
            | Self::Pending { icao } => icao,
        }
    }
}

/// Reasons an assignment fell back to a sentinel value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("no matching SID for {callsign} via {waypoint}, check flight plan")]
    NoMatchingSid { callsign: String, waypoint: String },

    #[error("route of {callsign} is malformed: {reason}")]
    MalformedRoute { callsign: String, reason: String },

    #[error("aircraft {callsign} position or type is unknown")]
    AircraftUnknown { callsign: String },

    #[error("area {name} at {icao} is undefined or has fewer than 3 vertices")]
    AreaUndefined { icao: String, name: String },
}

impl AssignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoMatchingSid { .. } => ErrorKind::NoMatchingSid,
            Self::MalformedRoute { .. } => ErrorKind::MalformedRoute,
            Self::AircraftUnknown { .. } => ErrorKind::AircraftUnknown,
            Self::AreaUndefined { .. } => ErrorKind::AreaUndefined,
        }
    }
}

/// Parse and validation failures of a single JSON document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing \"version\" field")]
    MissingVersion,

    #[error("version {found} does not match expected {expected}")]
    VersionMismatch { expected: String, found: String },

    #[error("invalid coordinate {value:?} in area {area}")]
    Coordinate { area: String, value: String },
}
