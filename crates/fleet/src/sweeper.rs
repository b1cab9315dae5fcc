//! Background eviction of stale world records.
//!
//! Enemies stop being reported once they leave view, so nothing else would
//! ever remove them. The sweeper runs on its own cadence, independent of
//! message traffic.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::world::SharedWorld;
use crate::FleetError;

/// Handle to the running sweeper thread.
#[derive(Debug)]
pub struct Sweeper {
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Start sweeping `world` every `interval`.
    pub fn spawn(world: SharedWorld, interval: Duration) -> Result<Self, FleetError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let name = "world-sweeper".to_string();

        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            let removed = world.lock().sweep(Instant::now());
                            if removed > 0 {
                                debug!("Evicted {} stale records", removed);
                            }
                        }
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("World sweeper stopped");
            })
            .map_err(|source| FleetError::ThreadSpawn { name, source })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Stop the sweeper and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
