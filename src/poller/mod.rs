//! Live view-model poller.
//!
//! A `LivePoller` owns one scheduled task per widget instance. The task
//! runs a reconciliation cycle immediately, then once per interval, and
//! publishes each result through a `watch` channel. Cycles are strictly
//! sequential: the next one starts only after the previous one has been
//! published.

pub mod cycle;

pub use cycle::reconcile;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::backend::OverlayBackend;
use crate::types::ViewModel;

/// Fixed refresh cadence for live widgets.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// State shared between the poller handle and its task.
///
/// The sender sits behind a mutex so that `stop()` and a publishing cycle
/// are serialized: once `stop()` has taken the sender, no later cycle can
/// replace the model.
struct Shared {
    sender: Mutex<Option<watch::Sender<ViewModel>>>,
    cycles: AtomicU64,
}

impl Shared {
    /// Publish a reconciled model. Returns `false` once stopped.
    fn publish(&self, vm: ViewModel) -> bool {
        let guard = self.sender.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_ref() {
            Some(tx) => {
                tx.send_replace(vm);
                self.cycles.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Drop the sender. Returns `true` on the first call only.
    fn close(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .is_some()
    }
}

/// Periodic producer of `ViewModel`s for one bankroll id.
pub struct LivePoller {
    bankroll_id: String,
    shared: Arc<Shared>,
    updates: watch::Receiver<ViewModel>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LivePoller {
    /// Start polling `bankroll_id` every `interval`. Surrounding
    /// whitespace is stripped from the id.
    ///
    /// The first cycle runs immediately. Pass `None` as backend when no
    /// endpoint is configured; cycles then produce demo data.
    /// Must be called from within a tokio runtime.
    pub fn start(
        bankroll_id: impl Into<String>,
        backend: Option<Arc<dyn OverlayBackend>>,
        interval: Duration,
    ) -> Self {
        let bankroll_id = bankroll_id.into().trim().to_string();
        let (tx, rx) = watch::channel(ViewModel::loading(&bankroll_id));
        let shared = Arc::new(Shared {
            sender: Mutex::new(Some(tx)),
            cycles: AtomicU64::new(0),
        });

        info!(
            bankroll_id = %bankroll_id,
            interval_ms = interval.as_millis() as u64,
            live = backend.is_some(),
            "Poller started"
        );

        let task = tokio::spawn(run(
            bankroll_id.clone(),
            backend,
            interval,
            Arc::clone(&shared),
        ));

        Self {
            bankroll_id,
            shared,
            updates: rx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn bankroll_id(&self) -> &str {
        &self.bankroll_id
    }

    /// The current model (cloned).
    pub fn current(&self) -> ViewModel {
        self.updates.borrow().clone()
    }

    /// A receiver notified on every replacement. Its `changed()` errors
    /// once the poller is stopped.
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.updates.clone()
    }

    /// Number of cycles published so far.
    pub fn cycle_count(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared
            .sender
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_none()
    }

    /// Hand every model (the current one first) to `render` until the
    /// poller stops.
    pub fn on_update<F>(&self, mut render: F) -> JoinHandle<()>
    where
        F: FnMut(&ViewModel) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                // Render from a copy so a slow callback never holds the
                // channel's read lock.
                let vm = rx.borrow_and_update().clone();
                render(&vm);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Cancel the schedule. In-flight fetches are abandoned and their
    /// results discarded. Safe to call repeatedly.
    pub fn stop(&self) {
        let first = self.shared.close();
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            task.abort();
        }
        if first {
            info!(bankroll_id = %self.bankroll_id, cycles = self.cycle_count(), "Poller stopped");
        }
    }
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    bankroll_id: String,
    backend: Option<Arc<dyn OverlayBackend>>,
    interval: Duration,
    shared: Arc<Shared>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let vm = reconcile(backend.as_deref(), &bankroll_id).await;
        let source = vm.source;
        if !shared.publish(vm) {
            break;
        }
        debug!(bankroll_id = %bankroll_id, source = %source, "Cycle published");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
