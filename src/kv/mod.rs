//! Shared key-value store client.
//!
//! All ephemeral authentication state (OTP codes, cooldowns, lockout flags,
//! issuance counters) lives in one TTL-capable store shared by every service
//! instance. Nothing is cached in process memory beyond a single request.
//!
//! Key patterns:
//!
//! ```text
//! otp:{email}               → 4-digit code (300 s)
//! otp_countdown:{email}     → re-send cooldown flag (60 s)
//! otp_request_count:{email} → rolling issuance counter (3600 s)
//! otp_spam_lock:{email}     → issuance spam lock (3600 s)
//! otp_lock:{email}          → failed-verification lockout (1800 s)
//! otp_attempts:{email}      → failed-attempt counter (300 s)
//! ```

mod memory;
mod redis;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;

use async_trait::async_trait;

use crate::error::KvError;

/// Single-key atomic operations against the shared store.
///
/// No multi-key transaction is offered: every policy in this service is
/// expressed as independent per-key reads and writes, and TTL expiry is
/// enforced by the store itself. A failed operation must abort the caller's
/// whole flow rather than be treated as "no restriction found".
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Sets `key` to `value`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), KvError>;

    async fn delete(&self, keys: &[&str]) -> Result<(), KvError>;

    /// Remaining lifetime of a live key, `None` if absent or expired.
    async fn ttl(&self, key: &str) -> Result<Option<u64>, KvError>;
}
