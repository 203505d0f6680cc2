use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use super::KvStore;
use crate::error::KvError;

/// Redis-backed store. The connection manager multiplexes one connection
/// and transparently reconnects, so this handle is cheap to clone and share
/// across workers.
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(url).map_err(KvError::from)?;
        let conn = ConnectionManager::new(client).await.map_err(KvError::from)?;
        info!("Connected to key-value store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), KvError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, KvError> {
        let mut conn = self.conn.clone();
        // TTL returns -2 for a missing key and -1 for a key without expiry.
        let remaining: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        if remaining < 0 {
            Ok(None)
        } else {
            Ok(Some(remaining as u64))
        }
    }
}
