//! One-second tick driving the periodic rescan.
//!
//! The rescan itself blocks (it may load configuration), so it runs on the
//! blocking pool. The loop awaits it before taking the next tick, which
//! means at most one rescan is in flight and stopping the scheduler waits
//! for it to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::plugin::VsidPlugin;

const TICK_SECS: u64 = 1;

pub struct Scheduler {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the loop on the current runtime.
    pub fn spawn(plugin: Arc<VsidPlugin>) -> Self {
        let (shutdown, rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_scheduler_loop(plugin, rx));
        Self { shutdown, handle }
    }

    /// Signal the loop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            tracing::warn!("Scheduler task ended abnormally: {}", err);
        }
    }
}

pub async fn run_scheduler_loop(plugin: Arc<VsidPlugin>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(Duration::from_secs(TICK_SECS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!("Scheduler started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Scheduler shutting down");
                break;
            }
            _ = ticker.tick() => {
                if !plugin.tick() {
                    continue;
                }
                let worker = plugin.clone();
                match tokio::task::spawn_blocking(move || worker.rescan()).await {
                    Ok(count) => tracing::trace!("Rescanned {} callsigns", count),
                    Err(err) => tracing::warn!("Rescan failed: {}", err),
                }
            }
        }
    }
}
