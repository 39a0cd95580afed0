//! Redis lock backend using a bb8 connection pool.
//!
//! Acquisition is `SET key token NX PX ttl`; release runs a Lua script that
//! deletes the key only while it still holds this handle's token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, Script};
use uuid::Uuid;

use crate::config::settings::RedisLockConfig;
use crate::lock::{DistributedLock, LockError, LockManager};

type RedisPool = Pool<Client>;

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Redis-based lock manager with bb8 connection pool.
pub struct RedisLockManager {
    pool: RedisPool,
    key_prefix: String,
    release_script: Arc<Script>,
}

impl RedisLockManager {
    pub async fn new(config: &RedisLockConfig, key_prefix: &str) -> Result<Self, LockError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| LockError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout))
            .build(client)
            .await
            .map_err(|e| LockError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            key_prefix: key_prefix.to_string(),
            release_script: Arc::new(Script::new(RELEASE_SCRIPT)),
        })
    }

    fn redis_key(&self, key: &str) -> String {
        lock_key(&self.key_prefix, key)
    }
}

fn lock_key(prefix: &str, key: &str) -> String {
    format!("{prefix}:lock:{key}")
}

async fn get_conn(pool: &RedisPool) -> Result<PooledConnection<'_, Client>, LockError> {
    pool.get()
        .await
        .map_err(|e| LockError::Connection(e.to_string()))
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn try_lock(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn DistributedLock>>, LockError> {
        let mut conn = get_conn(&self.pool).await?;
        let redis_key = self.redis_key(key);
        let token = Uuid::new_v4().simple().to_string();
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let reply: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(conn_ref)
            .await
            .map_err(|e: RedisError| LockError::Operation(e.to_string()))?;

        if reply.is_none() {
            return Ok(None);
        }

        Ok(Some(Box::new(RedisLock {
            key: key.to_string(),
            redis_key,
            token,
            pool: self.pool.clone(),
            release_script: Arc::clone(&self.release_script),
            released: AtomicBool::new(false),
        })))
    }
}

struct RedisLock {
    key: String,
    redis_key: String,
    token: String,
    pool: RedisPool,
    release_script: Arc<Script>,
    released: AtomicBool,
}

#[async_trait]
impl DistributedLock for RedisLock {
    fn key(&self) -> &str {
        &self.key
    }

    fn token(&self) -> &str {
        &self.token
    }

    async fn release(&self) -> Result<bool, LockError> {
        if self.released.load(Ordering::SeqCst) {
            return Ok(false);
        }

        // A failed round trip leaves the handle unreleased so the caller can retry.
        let mut conn = get_conn(&self.pool).await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let deleted: i64 = self
            .release_script
            .key(&self.redis_key)
            .arg(&self.token)
            .invoke_async(conn_ref)
            .await
            .map_err(|e: RedisError| LockError::Operation(e.to_string()))?;

        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(deleted == 1)
    }
}
