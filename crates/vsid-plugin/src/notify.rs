//! Deduplicated operator notices.
//!
//! A notice is keyed by subject (an ICAO or a callsign) and error kind and is
//! sent at most once until the subject is forgotten, so polling during an
//! outage does not flood the chat.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use vsid_core::{AssignError, ConfigError, ErrorKind};

use crate::host::Notifier;

pub const SENDER: &str = "vSID";

pub struct NoticeBoard {
    notifier: Arc<dyn Notifier>,
    seen: Mutex<HashSet<(String, ErrorKind)>>,
}

impl NoticeBoard {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Send an informational message, never deduplicated.
    pub fn announce(&self, message: &str) {
        tracing::info!("{}", message);
        self.notifier.send(SENDER, message);
    }

    /// Send `message` unless the same (subject, kind) was already reported.
    /// Returns whether it was sent.
    pub fn report(&self, subject: &str, kind: ErrorKind, message: &str) -> bool {
        let first = match self.seen.lock() {
            Ok(mut seen) => seen.insert((subject.to_string(), kind)),
            Err(_) => true,
        };
        if first {
            tracing::warn!(subject, ?kind, "{}", message);
            self.notifier.send(SENDER, message);
        } else {
            tracing::debug!(subject, ?kind, "suppressed repeated notice");
        }
        first
    }

    pub fn report_config(&self, error: &ConfigError) -> bool {
        if matches!(error, ConfigError::Pending { .. }) {
            return false;
        }
        self.report(error.icao(), error.kind(), &error.to_string())
    }

    pub fn report_issue(&self, issue: &AssignError) -> bool {
        let subject = match issue {
            AssignError::NoMatchingSid { callsign, .. }
            | AssignError::MalformedRoute { callsign, .. }
            | AssignError::AircraftUnknown { callsign } => callsign.clone(),
            AssignError::AreaUndefined { icao, name } => format!("{}/{}", icao, name),
        };
        self.report(&subject, issue.kind(), &issue.to_string())
    }

    /// Allow notices about `subject` again.
    pub fn forget(&self, subject: &str) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.retain(|(s, _)| s != subject);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.clear();
        }
    }
}
