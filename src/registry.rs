//! Poller registry.
//!
//! Widgets for the same bankroll id share one `LivePoller`; different ids
//! get fully independent pollers. Pollers are started lazily on the first
//! request for an id, stopped once no request has asked for them within
//! the idle TTL, and stopped together on shutdown.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::http::HttpBackend;
use crate::backend::OverlayBackend;
use crate::config::AppConfig;
use crate::poller::LivePoller;

#[derive(Debug, thiserror::Error)]
#[error("poller limit of {limit} reached")]
pub struct RegistryFull {
    pub limit: usize,
}

/// How long a poller may go unrequested before it is stopped.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(300);

struct Entry {
    poller: Arc<LivePoller>,
    last_access: Mutex<Instant>,
}

impl Entry {
    fn new(poller: Arc<LivePoller>) -> Self {
        Self {
            poller,
            last_access: Mutex::new(Instant::now()),
        }
    }

    /// Mark as requested now and hand out the poller.
    fn touch(&self) -> Arc<LivePoller> {
        *self.last_access.lock().unwrap_or_else(|p| p.into_inner()) = Instant::now();
        Arc::clone(&self.poller)
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_access.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

pub struct PollerRegistry {
    backend: Option<Arc<dyn OverlayBackend>>,
    interval: Duration,
    max_pollers: usize,
    idle_ttl: Duration,
    pollers: RwLock<HashMap<String, Entry>>,
}

impl PollerRegistry {
    pub fn new(
        backend: Option<Arc<dyn OverlayBackend>>,
        interval: Duration,
        max_pollers: usize,
    ) -> Self {
        Self {
            backend,
            interval,
            max_pollers,
            idle_ttl: DEFAULT_IDLE_TTL,
            pollers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Build a registry from configuration. The backend URL is resolved
    /// here, once; an empty URL means every poller serves demo data.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let base_url = cfg.backend.resolve_base_url();
        let backend: Option<Arc<dyn OverlayBackend>> = if base_url.is_empty() {
            warn!("No backend URL configured, overlays will show demo data");
            None
        } else {
            info!(base_url = %base_url, "Using overlay backend");
            Some(Arc::new(HttpBackend::new(
                base_url,
                cfg.backend.request_timeout(),
            )?))
        };

        Ok(
            Self::new(backend, cfg.poller.interval(), cfg.poller.max_pollers)
                .with_idle_ttl(cfg.poller.idle_ttl()),
        )
    }

    /// The poller for `bankroll_id`, starting one if needed. Every call
    /// refreshes the id's idle timer.
    pub async fn get_or_start(&self, bankroll_id: &str) -> Result<Arc<LivePoller>, RegistryFull> {
        let bankroll_id = bankroll_id.trim();

        if let Some(entry) = self.pollers.read().await.get(bankroll_id) {
            return Ok(entry.touch());
        }

        let mut pollers = self.pollers.write().await;
        if let Some(entry) = pollers.get(bankroll_id) {
            return Ok(entry.touch());
        }
        if pollers.len() >= self.max_pollers {
            self.evict_idle_locked(&mut pollers);
        }
        if pollers.len() >= self.max_pollers {
            warn!(bankroll_id, limit = self.max_pollers, "Poller limit reached");
            return Err(RegistryFull {
                limit: self.max_pollers,
            });
        }

        let poller = Arc::new(LivePoller::start(
            bankroll_id,
            self.backend.clone(),
            self.interval,
        ));
        pollers.insert(bankroll_id.to_string(), Entry::new(Arc::clone(&poller)));
        Ok(poller)
    }

    /// Stop and forget every poller idle for longer than the TTL.
    /// Returns how many were evicted.
    pub async fn evict_idle(&self) -> usize {
        let mut pollers = self.pollers.write().await;
        self.evict_idle_locked(&mut pollers)
    }

    fn evict_idle_locked(&self, pollers: &mut HashMap<String, Entry>) -> usize {
        let now = Instant::now();
        let before = pollers.len();
        pollers.retain(|id, entry| {
            let idle = entry.idle_for(now);
            if idle <= self.idle_ttl {
                return true;
            }
            debug!(bankroll_id = %id, idle_secs = idle.as_secs(), "Evicting idle poller");
            entry.poller.stop();
            false
        });
        let evicted = before - pollers.len();
        if evicted > 0 {
            info!(evicted, remaining = pollers.len(), "Idle pollers stopped");
        }
        evicted
    }

    /// Periodically evict idle pollers. The task ends once the registry
    /// is dropped.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        let period = self.idle_ttl;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle().await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.pollers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pollers.read().await.is_empty()
    }

    /// Stop and forget every poller.
    pub async fn stop_all(&self) {
        let mut pollers = self.pollers.write().await;
        for entry in pollers.values() {
            entry.poller.stop();
        }
        info!(count = pollers.len(), "All pollers stopped");
        pollers.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
