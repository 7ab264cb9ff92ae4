use crate::Credential;
use chrono::TimeDelta;
use log::debug;
use sagemaker_mlflow_core::time::{now, DateTime};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Clock = Arc<dyn Fn() -> DateTime + Send + Sync>;

/// Thread safe TTL cache of assumed role credentials, keyed by role ARN.
///
/// Expired entries are never returned. They are dropped on the next `get` of
/// their key, or by the sweep every `put` runs.
///
/// Share one cache between providers by wrapping it in an `Arc`.
pub struct CredentialCache {
    entries: Mutex<HashMap<String, CachedCredential>>,
    clock: Clock,
}

#[derive(Clone)]
struct CachedCredential {
    credential: Credential,
    expires_at: DateTime,
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for CredentialCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl CredentialCache {
    /// Create an empty cache reading the system clock.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock: Arc::new(now),
        }
    }

    /// Replace the clock used for expiry.
    ///
    /// # Note
    ///
    /// Only use this function for testing.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Get the credential of `role_arn` if present and not yet expired.
    pub fn get(&self, role_arn: &str) -> Option<Credential> {
        let now = (self.clock)();
        let mut entries = self.entries.lock().expect("lock poisoned");

        let entry = entries.get(role_arn)?;
        if now >= entry.expires_at {
            debug!("cached credential for {role_arn} expired at {}", entry.expires_at);
            entries.remove(role_arn);
            return None;
        }

        Some(entry.credential.clone())
    }

    /// Store the credential of `role_arn` for `ttl`, then drop every expired
    /// entry.
    ///
    /// `ttl` is taken as is.
    pub fn put(&self, role_arn: &str, credential: Credential, ttl: Duration) {
        let now = (self.clock)();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::MAX_UTC);

        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.insert(
            role_arn.to_string(),
            CachedCredential {
                credential,
                expires_at,
            },
        );
        entries.retain(|_, entry| now < entry.expires_at);
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.lock().expect("lock poisoned").clear();
    }

    /// Number of entries, expired ones included until they are swept.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
