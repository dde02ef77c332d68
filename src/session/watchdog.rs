use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Single-shot, restartable silence timer
///
/// The timer task never touches session state: when it expires it sends its
/// generation on `fired_tx` and the session decides what to do. A fire whose
/// generation is no longer current was superseded by a re-arm or cancel.
pub struct SilenceWatchdog {
    timeout: Duration,
    fired_tx: mpsc::UnboundedSender<u64>,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl SilenceWatchdog {
    pub fn new(timeout: Duration, fired_tx: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            timeout,
            fired_tx,
            generation: 0,
            pending: None,
        }
    }

    /// Cancel any pending timer and start a new one
    pub fn arm(&mut self) {
        self.cancel();

        let generation = self.generation;
        let timeout = self.timeout;
        let fired_tx = self.fired_tx.clone();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = fired_tx.send(generation);
        }));
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Accept a fire notification
    ///
    /// Returns true only for the fire of the currently armed timer, and
    /// disarms it so it cannot be accepted twice.
    pub fn accept_fire(&mut self, generation: u64) -> bool {
        if self.pending.is_none() || generation != self.generation {
            debug!("Ignoring stale silence timer (generation {})", generation);
            return false;
        }
        self.pending = None;
        true
    }
}

impl Drop for SilenceWatchdog {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
