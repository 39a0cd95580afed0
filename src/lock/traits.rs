//! LockManager and DistributedLock trait definitions.

use std::time::Duration;

use async_trait::async_trait;

use crate::lock::LockError;

/// Non-blocking mutual exclusion shared by cooperating processes.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Try to take `key` for at most `ttl`.
    ///
    /// Never waits for a current holder: returns `Ok(None)` immediately when
    /// the lock is held elsewhere.
    async fn try_lock(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn DistributedLock>>, LockError>;
}

/// Handle to an acquired lock.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Key the lock was acquired for, without backend prefixes.
    fn key(&self) -> &str;

    /// Unique token identifying this holder.
    fn token(&self) -> &str;

    /// Release the lock if this handle still owns it.
    ///
    /// Returns `true` when this call released it. Calling again, or after the
    /// TTL handed the key to another holder, returns `false` and leaves the
    /// other holder untouched.
    async fn release(&self) -> Result<bool, LockError>;
}
