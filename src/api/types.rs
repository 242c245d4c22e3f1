//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use sysinfo::{Disks, System};

use crate::config::ServiceConfig;
use crate::pipeline::assertion::AssertionPipeline;
use crate::pipeline::model::AssertionModel;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<ServiceConfig>,
    pub model: Arc<dyn AssertionModel>,
    pub pipeline: AssertionPipeline<'static>,
    pub api_keys: Arc<ApiKeySet>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub stats: Arc<ServiceStats>,
}

impl ApiContext {
    pub fn new(config: ServiceConfig, model: Arc<dyn AssertionModel>) -> Self {
        let pipeline = AssertionPipeline::with_max_length(config.max_sentence_length);
        let api_keys = ApiKeySet::new(config.api_keys.iter().map(String::as_str));
        let rate_limiter = RateLimiter::new(config.rate_limit_rpm);
        Self {
            config: Arc::new(config),
            model,
            pipeline,
            api_keys: Arc::new(api_keys),
            rate_limiter: Arc::new(Mutex::new(rate_limiter)),
            stats: Arc::new(ServiceStats::new()),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Service counters
// ═══════════════════════════════════════════════════════════

/// Host resource usage at one point in time.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SystemMetrics {
    pub memory_mb: f64,
    pub memory_percent: f64,
    /// Global CPU usage since the previous snapshot (0 on the first one).
    pub cpu_percent: f64,
    pub disk_percent: f64,
}

/// Process-lifetime counters reported by health and metrics endpoints.
pub struct ServiceStats {
    started_at: Instant,
    total_predictions: AtomicU64,
    system: Mutex<System>,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_predictions: AtomicU64::new(0),
            system: Mutex::new(System::new()),
        }
    }

    /// Refresh memory and CPU readings and return a snapshot.
    pub fn system_metrics(&self) -> SystemMetrics {
        let mut sys = match self.system.lock() {
            Ok(sys) => sys,
            Err(_) => {
                tracing::error!("System metrics lock poisoned");
                return SystemMetrics::default();
            }
        };
        sys.refresh_memory();
        sys.refresh_cpu();

        let total = sys.total_memory();
        let used = sys.used_memory();
        let memory_percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let disks = Disks::new_with_refreshed_list();
        let disk_percent = disks
            .list()
            .first()
            .filter(|disk| disk.total_space() > 0)
            .map(|disk| {
                let total = disk.total_space() as f64;
                (total - disk.available_space() as f64) / total * 100.0
            })
            .unwrap_or(0.0);

        SystemMetrics {
            memory_mb: used as f64 / (1024.0 * 1024.0),
            memory_percent,
            cpu_percent: f64::from(sys.global_cpu_info().cpu_usage()),
            disk_percent,
        }
    }

    pub fn record_predictions(&self, count: usize) {
        self.total_predictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn total_predictions(&self) -> u64 {
        self.total_predictions.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// API keys
// ═══════════════════════════════════════════════════════════

/// Hash an API key using SHA-256.
pub fn hash_key(key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

/// Configured API keys, stored as hashes. An empty set disables authentication.
#[derive(Debug, Default)]
pub struct ApiKeySet {
    hashes: Vec<[u8; 32]>,
}

impl ApiKeySet {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            hashes: keys.into_iter().map(hash_key).collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.hashes.is_empty()
    }

    /// Constant-time check against every configured key.
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate = hash_key(candidate);
        self.hashes
            .iter()
            .fold(subtle::Choice::from(0u8), |found, h| {
                found | h.as_slice().ct_eq(candidate.as_slice())
            })
            .into()
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter, per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client rate limiter with a one-minute sliding window.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
        }
    }

    /// Check if a client is within its limit. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        let window = Duration::from_secs(60);

        // Periodic cleanup when many clients have been seen
        if self.windows.len() > 1000 {
            self.windows
                .retain(|_, entries| entries.iter().any(|ts| now.duration_since(*ts) < window));
        }

        let entries = self.windows.entry(client.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < window);

        if entries.len() as u32 >= self.per_minute {
            let oldest = entries.first().copied().unwrap_or(now);
            let retry_after = window.saturating_sub(now.duration_since(oldest)).as_secs().max(1);
            return Err(retry_after);
        }

        entries.push(now);
        Ok(())
    }
}
