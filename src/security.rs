//! Password hashing, credential matching and login throttling.
//!
//! Passwords are stored as Argon2 PHC strings with a random per-user salt. The
//! session layer never sees a password; it is handed the [`Subject`] that
//! [`authenticate`] resolves.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use password_hash::{PasswordHash, SaltString};
use tracing::debug;

use crate::error::AppResult;
use crate::identity::Subject;
use crate::storage::SharedStore;

// Compared against when the username is unknown so both failure paths cost one hash
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("waypoint-unknown-user").ok());

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Match a username/password pair against the user table.
///
/// Unknown users and wrong passwords both come back as `Ok(None)`.
pub fn authenticate(store: &SharedStore, username: &str, password: &str) -> AppResult<Option<Subject>> {
    // Release the store before hashing
    let creds = store.0.lock().find_credentials(username)?;
    match creds {
        Some(c) if verify_password(&c.password_hash, password) => Ok(Some(Subject::new(c.id, c.username))),
        Some(_) => {
            debug!(target: "waypoint::auth", "password mismatch for existing user");
            Ok(None)
        }
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(dummy, password);
            }
            Ok(None)
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
struct Buckets {
    map: HashMap<String, Bucket>,
    last_sweep: Instant,
}

/// Token bucket per key (login name, client address). Each attempt spends a
/// token; tokens refill continuously over the window.
///
/// Buckets that have refilled completely carry no state worth keeping and are
/// dropped by a sweep that runs at most once per window.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    window: Duration,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    /// Allow `attempts` per `window`, refilled continuously.
    pub fn new(attempts: u32, window: Duration) -> Self {
        let capacity = f64::from(attempts.max(1));
        let window = window.max(Duration::from_secs(1));
        Self {
            capacity,
            refill_per_sec: capacity / window.as_secs_f64(),
            window,
            buckets: Mutex::new(Buckets { map: HashMap::new(), last_sweep: Instant::now() }),
        }
    }

    /// Login attempts per username: 5 per hour.
    pub fn login() -> Self { Self::new(5, Duration::from_secs(60 * 60)) }

    /// Requests per client address: 100 per 15 minutes.
    pub fn requests() -> Self { Self::new(100, Duration::from_secs(15 * 60)) }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut lock = self.buckets.lock();
        if now.saturating_duration_since(lock.last_sweep) >= self.window {
            self.sweep(&mut lock, now);
        }
        let bucket = lock.map.entry(key.to_ascii_lowercase()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        bucket.tokens = self.refilled(bucket, now);
        bucket.last_refill = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&self, key: &str) {
        self.buckets.lock().map.remove(&key.to_ascii_lowercase());
    }

    /// Number of keys currently holding a bucket.
    pub fn tracked(&self) -> usize {
        self.buckets.lock().map.len()
    }

    fn refilled(&self, bucket: &Bucket, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity)
    }

    fn sweep(&self, buckets: &mut Buckets, now: Instant) {
        let before = buckets.map.len();
        buckets.map.retain(|_, b| self.refilled(b, now) < self.capacity);
        buckets.last_sweep = now;
        let dropped = before - buckets.map.len();
        if dropped > 0 {
            debug!(target: "waypoint::auth", dropped, kept = buckets.map.len(), "rate limiter swept");
        }
    }
}
