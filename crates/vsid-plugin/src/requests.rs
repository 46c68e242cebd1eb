//! Pending controller requests, one per callsign.

use std::collections::HashMap;
use std::sync::Mutex;

use vsid_core::{FlightSnapshot, Request};

use crate::lock;

#[derive(Default)]
pub struct RequestBoard {
    requests: Mutex<HashMap<String, Request>>,
}

impl RequestBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. `Request::None` clears the callsign's entry.
    pub fn set(&self, callsign: &str, request: Request) {
        let mut requests = lock(&self.requests);
        if request == Request::None {
            requests.remove(callsign);
        } else {
            requests.insert(callsign.to_string(), request);
        }
    }

    pub fn get(&self, callsign: &str) -> Request {
        lock(&self.requests)
            .get(callsign)
            .copied()
            .unwrap_or_default()
    }

    pub fn clear(&self, callsign: &str) -> Request {
        lock(&self.requests).remove(callsign).unwrap_or_default()
    }

    /// Drop the callsign's request if the controller data shows it was
    /// served. Returns the resolved request.
    pub fn resolve_if_satisfied(&self, flight: &FlightSnapshot) -> Option<Request> {
        let mut requests = lock(&self.requests);
        let request = *requests.get(&flight.callsign)?;
        if request.is_satisfied_by(flight) {
            requests.remove(&flight.callsign);
            Some(request)
        } else {
            None
        }
    }

    /// Callsigns waiting for `request`, sorted.
    pub fn pending(&self, request: Request) -> Vec<String> {
        let mut callsigns: Vec<String> = lock(&self.requests)
            .iter()
            .filter(|(_, r)| **r == request)
            .map(|(callsign, _)| callsign.clone())
            .collect();
        callsigns.sort();
        callsigns
    }

    pub fn clear_all(&self) {
        lock(&self.requests).clear();
    }
}
