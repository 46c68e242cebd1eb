//! Runtime around the assignment engine: configuration loading, caches,
//! host events and the periodic rescan.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod backoff;
pub mod config;
pub mod host;
pub mod load;
pub mod loops;
pub mod notify;
pub mod pilots;
pub mod plugin;
pub mod registry;
pub mod requests;
pub mod source;
pub mod store;
pub mod tags;

pub use config::PluginConfig;
pub use host::{AirportConfiguration, AirportStatus, Host, Notifier, TagField, TagSink, TagValue, TrafficProvider};
pub use loops::scheduler::Scheduler;
pub use plugin::{OutOfScope, VsidPlugin};
pub use source::{ConfigSource, HttpConfigSource, LocalStore, SourceError};

// A panic while holding one of these locks leaves plain data behind, so the
// guard is recovered rather than propagated.

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
