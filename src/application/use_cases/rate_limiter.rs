//! Per-client sliding-window rate limiter.
//!
//! - Each client key keeps the timestamps of its accepted requests
//! - Timestamps older than the window are pruned on every access
//! - Rejected requests are not recorded
//! - The number of tracked keys is bounded; stale keys are swept periodically

use crate::domain::app_config::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Rate limit check result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Exceeded { retry_after_seconds: u64 },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// Rate limit status for a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub client: String,
    pub requests_in_window: usize,
    pub max_requests: usize,
    pub is_rate_limited: bool,
    pub retry_after_seconds: Option<u64>,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    ledger: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            ledger: Mutex::new(HashMap::new()),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.config.sweep_interval_secs.max(1))
    }

    /// Check and, when allowed, record a request for `client`.
    pub fn check(&self, client: &str) -> RateLimitResult {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> RateLimitResult {
        let window = self.window();
        let mut ledger = self.lock();

        if !ledger.contains_key(client) && ledger.len() >= self.config.max_clients.max(1) {
            Self::make_room(&mut ledger, now, window, self.config.max_clients.max(1));
        }

        let timestamps = ledger.entry(client.to_string()).or_default();
        prune(timestamps, now, window);

        if timestamps.len() >= self.config.max_requests {
            let retry_after = retry_after_seconds(timestamps, now, window);
            debug!(
                "Rate limit exceeded for {}, retry after {}s",
                client, retry_after
            );
            return RateLimitResult::Exceeded {
                retry_after_seconds: retry_after,
            };
        }

        timestamps.push_back(now);
        RateLimitResult::Allowed
    }

    /// Current status without recording a request.
    pub fn status(&self, client: &str) -> RateLimitStatus {
        self.status_at(client, Instant::now())
    }

    pub fn status_at(&self, client: &str, now: Instant) -> RateLimitStatus {
        let window = self.window();
        let mut ledger = self.lock();
        let requests_in_window = ledger
            .get_mut(client)
            .map(|timestamps| {
                prune(timestamps, now, window);
                timestamps.len()
            })
            .unwrap_or(0);
        let is_rate_limited = requests_in_window >= self.config.max_requests;
        let retry_after_seconds = if is_rate_limited {
            ledger
                .get(client)
                .map(|timestamps| retry_after_seconds(timestamps, now, window))
        } else {
            None
        };

        RateLimitStatus {
            client: client.to_string(),
            requests_in_window,
            max_requests: self.config.max_requests,
            is_rate_limited,
            retry_after_seconds,
        }
    }

    /// Drop clients with no request inside the window. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Instant::now())
    }

    pub fn cleanup_expired_at(&self, now: Instant) -> usize {
        let window = self.window();
        let mut ledger = self.lock();
        let removed = sweep(&mut ledger, now, window);
        if removed > 0 {
            info!("Cleaned up {} idle rate limit entries", removed);
        }
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn make_room(
        ledger: &mut HashMap<String, VecDeque<Instant>>,
        now: Instant,
        window: Duration,
        max_clients: usize,
    ) {
        sweep(ledger, now, window);
        while ledger.len() >= max_clients {
            let oldest = ledger
                .iter()
                .min_by_key(|(_, timestamps)| timestamps.back().copied())
                .map(|(client, _)| client.clone());
            match oldest {
                Some(client) => {
                    warn!("Rate limiter at capacity, evicting {}", client);
                    ledger.remove(&client);
                }
                None => break,
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

fn sweep(ledger: &mut HashMap<String, VecDeque<Instant>>, now: Instant, window: Duration) -> usize {
    let before = ledger.len();
    ledger.retain(|_, timestamps| {
        prune(timestamps, now, window);
        !timestamps.is_empty()
    });
    before - ledger.len()
}

fn retry_after_seconds(timestamps: &VecDeque<Instant>, now: Instant, window: Duration) -> u64 {
    timestamps
        .front()
        .map(|oldest| {
            let elapsed = now.saturating_duration_since(*oldest);
            let remaining = window.saturating_sub(elapsed);
            // Round up so the client never retries a moment too early.
            remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
        })
        .unwrap_or(0)
        .max(1)
}
