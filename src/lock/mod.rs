//! Distributed lock port and its backends.
//!
//! `SINGLE_NODE` jobs take a lock named `job:<id>` before each execution so
//! that one process in a cluster runs a given tick. Backends:
//! - memory (process-local, for single instance deployments and tests)
//! - redis (shared by every process pointing at the same server)
//!
//! # Configuration
//!
//! ```toml
//! [lock]
//! backend = "redis"   # or "memory" or "none"
//! key_prefix = "fusion"
//!
//! [lock.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 4
//! connection_timeout = 5
//! ```

mod error;
mod memory;
mod redis;
mod traits;

use std::sync::Arc;

pub use error::LockError;
pub use memory::MemoryLockManager;
pub use self::redis::RedisLockManager;
pub use traits::{DistributedLock, LockManager};

use crate::config::settings::{LockBackend, LockSettings};

/// Build the lock manager selected by `settings`.
///
/// Returns `None` for the `none` backend; hosts without a lock manager can
/// still run `ALL_NODES` jobs.
pub async fn build_lock_manager(
    settings: &LockSettings,
) -> Result<Option<Arc<dyn LockManager>>, LockError> {
    let manager: Arc<dyn LockManager> = match settings.backend {
        LockBackend::None => return Ok(None),
        LockBackend::Memory => Arc::new(MemoryLockManager::new()),
        LockBackend::Redis => {
            Arc::new(RedisLockManager::new(&settings.redis, &settings.key_prefix).await?)
        }
    };
    Ok(Some(manager))
}
