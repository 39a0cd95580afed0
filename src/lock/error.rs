//! Lock backend error types.

use thiserror::Error;

/// Errors raised by a lock backend. Contention is not an error: a busy
/// lock is reported as `Ok(None)` by [`LockManager::try_lock`](crate::lock::LockManager::try_lock).
#[derive(Error, Debug)]
pub enum LockError {
    #[error("Lock operation failed: {0}")]
    Operation(String),

    #[error("Lock backend connection failed: {0}")]
    Connection(String),
}
