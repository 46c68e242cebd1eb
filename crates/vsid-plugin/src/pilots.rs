//! Assignment Cache: one [`Pilot`] per in-scope callsign.
//!
//! Computation runs outside the lock. A caller takes a [`Ticket`] before
//! computing and commits with it afterwards; any invalidation in between
//! bumps the epoch and the commit is dropped, so a result computed from
//! state that was invalidated meanwhile never lands in the cache.

use std::collections::HashMap;
use std::sync::Mutex;

use vsid_core::Pilot;

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Default)]
struct CacheState {
    pilots: HashMap<String, Pilot>,
    epoch: u64,
}

#[derive(Default)]
pub struct AssignmentCache {
    state: Mutex<CacheState>,
}

impl AssignmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, callsign: &str) -> Option<Pilot> {
        lock(&self.state).pilots.get(callsign).cloned()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(lock(&self.state).epoch)
    }

    /// Store `pilot` unless the cache was invalidated since `ticket` was taken.
    pub fn commit(&self, ticket: Ticket, pilot: Pilot) -> bool {
        let mut state = lock(&self.state);
        if state.epoch != ticket.0 {
            tracing::debug!("Dropping stale assignment for {}", pilot.callsign);
            return false;
        }
        state.pilots.insert(pilot.callsign.clone(), pilot);
        true
    }

    pub fn invalidate(&self, callsign: &str) -> Option<Pilot> {
        let mut state = lock(&self.state);
        state.epoch = state.epoch.wrapping_add(1);
        state.pilots.remove(callsign)
    }

    /// Evict every pilot whose origin is `icao`.
    pub fn invalidate_airport(&self, icao: &str) -> usize {
        let mut state = lock(&self.state);
        state.epoch = state.epoch.wrapping_add(1);
        let before = state.pilots.len();
        state.pilots.retain(|_, pilot| pilot.origin != icao);
        before - state.pilots.len()
    }

    pub fn invalidate_all(&self) -> usize {
        let mut state = lock(&self.state);
        state.epoch = state.epoch.wrapping_add(1);
        let evicted = state.pilots.len();
        state.pilots.clear();
        evicted
    }

    /// Evict every pilot not in `keep`.
    pub fn retain(&self, keep: &[String]) -> usize {
        let mut state = lock(&self.state);
        let before = state.pilots.len();
        state.pilots.retain(|callsign, _| keep.contains(callsign));
        let evicted = before - state.pilots.len();
        if evicted > 0 {
            state.epoch = state.epoch.wrapping_add(1);
        }
        evicted
    }

    /// Every cached pilot, sorted by callsign.
    pub fn list(&self) -> Vec<Pilot> {
        let mut pilots: Vec<Pilot> = lock(&self.state).pilots.values().cloned().collect();
        pilots.sort_by(|a, b| a.callsign.cmp(&b.callsign));
        pilots
    }

    pub fn len(&self) -> usize {
        lock(&self.state).pilots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsid_core::Assignment;

    fn pilot(callsign: &str, origin: &str) -> Pilot {
        Pilot::from_assignment(callsign, origin, Assignment::new("27R", "OKIPA9A", 5000))
    }

    #[test]
    fn commit_then_get() {
        let cache = AssignmentCache::new();
        let ticket = cache.begin();
        assert!(cache.commit(ticket, pilot("AFR123", "LFPG")));
        assert_eq!(cache.get("AFR123").unwrap().sid, "OKIPA9A");
    }

    #[test]
    fn commit_after_invalidation_is_dropped() {
        let cache = AssignmentCache::new();
        let ticket = cache.begin();
        cache.invalidate_all();
        assert!(!cache.commit(ticket, pilot("AFR123", "LFPG")));
        assert!(cache.get("AFR123").is_none());
    }

    #[test]
    fn invalidate_airport_only_touches_that_origin() {
        let cache = AssignmentCache::new();
        let ticket = cache.begin();
        cache.commit(ticket, pilot("AFR123", "LFPG"));
        cache.commit(ticket, pilot("EZY45", "LFPO"));
        assert_eq!(cache.invalidate_airport("LFPG"), 1);
        assert_eq!(cache.list().len(), 1);
        assert!(cache.get("EZY45").is_some());
    }

    #[test]
    fn retain_evicts_out_of_scope() {
        let cache = AssignmentCache::new();
        let ticket = cache.begin();
        cache.commit(ticket, pilot("AFR123", "LFPG"));
        cache.commit(ticket, pilot("EZY45", "LFPG"));
        assert_eq!(cache.retain(&["EZY45".to_string()]), 1);
        assert_eq!(cache.len(), 1);
    }
}
