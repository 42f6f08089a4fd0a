use crate::router::Router;
use futures::future::{self, Either};
use futures::pin_mut;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{self, JoinError, JoinHandle};
use tokio::time;
use tracing::{info, warn};

/// Background task that calls [`Router::sweep`] every period on tokio's blocking pool:
/// ARP retries, abandoned resolutions and expired bindings all happen there.
pub struct ArpSweeper;

impl ArpSweeper {
    /// Starts sweeping on the current tokio runtime. Must be called from within one.
    pub fn spawn(router: Arc<Router>, period: Duration) -> SweepHandle {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(sweep_loop(router, period, shutdown_rx));
        SweepHandle { shutdown, join }
    }
}

/// Owner of a running [`ArpSweeper`]. Dropping it also stops the task, without waiting.
pub struct SweepHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<u64>,
}

impl SweepHandle {
    /// Asks the task to stop and waits for it. A sweep already underway runs to completion
    /// first. Resolves to the number of sweeps performed.
    pub async fn shutdown(self) -> Result<u64, JoinError> {
        // Fails only if the task is already gone, which the join reports
        let _ = self.shutdown.send(());
        self.join.await
    }
}

async fn sweep_loop(
    router: Arc<Router>,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> u64 {
    info!(?period, "ARP sweeper started");
    let mut interval = time::interval(period);
    let mut sweeps = 0;
    loop {
        let tick = interval.tick();
        pin_mut!(tick);
        match future::select(tick, &mut shutdown).await {
            Either::Left(_) => {
                // Sweeping takes the cache mutex and transmits, keep it off the async workers
                let router = router.clone();
                match task::spawn_blocking(move || router.sweep()).await {
                    Ok(()) => sweeps += 1,
                    Err(e) => warn!("ARP sweep failed: {}", e),
                }
            }
            // Shutdown requested or the handle was dropped
            Either::Right(_) => break,
        }
    }
    info!(sweeps, "ARP sweeper stopped");
    sweeps
}
