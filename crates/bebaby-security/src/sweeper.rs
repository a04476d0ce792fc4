use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// In-memory stores that drop expired entries on a timer.
pub trait Sweep: Send + Sync + 'static {
    /// Remove expired entries, returning how many were dropped.
    fn sweep(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Owns the shutdown signal for every sweep task spawned through it.
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
}

impl Sweeper {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { shutdown }
    }

    /// Run `target.sweep()` every `every` until [`Sweeper::shutdown`].
    /// The first sweep happens one full interval after spawning.
    pub fn spawn<T: Sweep>(&self, target: Arc<T>, every: Duration) -> JoinHandle<()> {
        let mut stop = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = stop.changed() => {
                        debug!(store = target.name(), "sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = target.sweep();
                        if removed > 0 {
                            debug!(store = target.name(), removed, "expired entries swept");
                        }
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Default for Sweeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
