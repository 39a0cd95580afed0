//! Process-local lock backend built on `DashMap`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use uuid::Uuid;

use crate::lock::{DistributedLock, LockError, LockManager};

#[derive(Debug, Clone)]
struct Holder {
    token: String,
    expires_at: Instant,
}

/// In-memory lock manager with TTL expiry.
///
/// Only coordinates callers inside one process; multi-process deployments
/// need the Redis backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockManager {
    locks: Arc<DashMap<String, Holder>>,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held by an unexpired lock.
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .is_some_and(|holder| holder.expires_at > Instant::now())
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn try_lock(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn DistributedLock>>, LockError> {
        let now = Instant::now();
        let holder = Holder {
            token: Uuid::new_v4().to_string(),
            expires_at: now + ttl.max(Duration::from_millis(1)),
        };
        let token = holder.token.clone();

        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at > now {
                    return Ok(None);
                }
                entry.insert(holder);
            }
            Entry::Vacant(entry) => {
                entry.insert(holder);
            }
        }

        Ok(Some(Box::new(MemoryLock {
            key: key.to_string(),
            token,
            locks: Arc::clone(&self.locks),
            released: AtomicBool::new(false),
        })))
    }
}

struct MemoryLock {
    key: String,
    token: String,
    locks: Arc<DashMap<String, Holder>>,
    released: AtomicBool,
}

#[async_trait]
impl DistributedLock for MemoryLock {
    fn key(&self) -> &str {
        &self.key
    }

    fn token(&self) -> &str {
        &self.token
    }

    async fn release(&self) -> Result<bool, LockError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self
            .locks
            .remove_if(&self.key, |_, holder| holder.token == self.token)
            .is_some())
    }
}
