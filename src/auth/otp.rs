use std::sync::Arc;

use rand::Rng;
use serde_json::json;
use tracing::{info, warn};

use crate::email::EmailSender;
use crate::error::AppError;
use crate::kv::KvStore;

pub const OTP_TTL_SECONDS: u64 = 300;
pub const COOLDOWN_TTL_SECONDS: u64 = 60;
pub const REQUEST_WINDOW_SECONDS: u64 = 3600;
pub const SPAM_LOCK_TTL_SECONDS: u64 = 3600;
pub const FAILED_LOCK_TTL_SECONDS: u64 = 1800;
pub const ATTEMPT_TTL_SECONDS: u64 = 300;

/// The 3rd request within the window trips the spam lock.
const MAX_REQUESTS_PER_WINDOW: u32 = 2;
/// The 3rd mismatched code trips the hard lockout.
const MAX_FAILED_ATTEMPTS: u32 = 2;

fn otp_key(email: &str) -> String {
    format!("otp:{}", email)
}

fn lock_key(email: &str) -> String {
    format!("otp_lock:{}", email)
}

fn spam_lock_key(email: &str) -> String {
    format!("otp_spam_lock:{}", email)
}

fn countdown_key(email: &str) -> String {
    format!("otp_countdown:{}", email)
}

fn request_count_key(email: &str) -> String {
    format!("otp_request_count:{}", email)
}

fn attempts_key(email: &str) -> String {
    format!("otp_attempts:{}", email)
}

/// Issues and verifies one-time passwords, enforcing the per-email
/// cooldown, spam-lock and lockout policy through the shared store.
pub struct OtpService {
    kv: Arc<dyn KvStore>,
    mailer: Arc<dyn EmailSender>,
    platform_name: String,
}

impl OtpService {
    pub fn new(kv: Arc<dyn KvStore>, mailer: Arc<dyn EmailSender>, platform_name: String) -> Self {
        Self {
            kv,
            mailer,
            platform_name,
        }
    }

    /// Refuses issuance while a restriction flag is live. Lockout dominates
    /// spam lock dominates cooldown; the harsher state wins.
    pub async fn check_restrictions(&self, email: &str) -> Result<(), AppError> {
        if self.kv.get(&lock_key(email)).await?.is_some() {
            return Err(AppError::Validation(
                "Account locked due to multiple failed attempts! Try again after 30 minutes"
                    .to_string(),
            ));
        }

        if self.kv.get(&spam_lock_key(email)).await?.is_some() {
            return Err(AppError::Validation(
                "Too many OTP requests! Please wait 1 hour before requesting again".to_string(),
            ));
        }

        if self.kv.get(&countdown_key(email)).await?.is_some() {
            return Err(AppError::Validation(
                "Please wait 1 minute before requesting a new OTP".to_string(),
            ));
        }

        Ok(())
    }

    /// Counts this issuance request against the rolling window, tripping the
    /// spam lock on the 3rd request. The counter read and write are two
    /// separate store operations; concurrent requests can slip one extra
    /// issuance past the cap, which is an accepted bound.
    pub async fn track_request(&self, email: &str) -> Result<(), AppError> {
        let count: u32 = self
            .kv
            .get(&request_count_key(email))
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        if count >= MAX_REQUESTS_PER_WINDOW {
            self.kv
                .set(&spam_lock_key(email), "locked", SPAM_LOCK_TTL_SECONDS)
                .await?;
            warn!("OTP spam lock set for {}", email);
            return Err(AppError::Validation(
                "Too many OTP requests! Please wait 1 hour before requesting again".to_string(),
            ));
        }

        // Rewriting the counter starts a fresh hour; the original window's
        // expiry is not preserved.
        self.kv
            .set(
                &request_count_key(email),
                &(count + 1).to_string(),
                REQUEST_WINDOW_SECONDS,
            )
            .await?;

        Ok(())
    }

    /// Generates a 4-digit code, mails it, then stores the code and the
    /// re-send cooldown flag. A failed send aborts before anything is stored.
    pub async fn send_otp(&self, name: &str, email: &str, template: &str) -> Result<(), AppError> {
        let otp = rand::thread_rng().gen_range(1000..9999).to_string();

        let data = json!({
            "name": name,
            "otp": otp,
            "platform_name": self.platform_name,
        });
        self.mailer
            .send(email, "Verify Your Email", template, &data)
            .await?;

        self.kv.set(&otp_key(email), &otp, OTP_TTL_SECONDS).await?;
        self.kv
            .set(&countdown_key(email), "true", COOLDOWN_TTL_SECONDS)
            .await?;

        info!("OTP issued for {}", email);
        Ok(())
    }

    /// Compares the submitted code against the stored one. Terminal outcomes
    /// (success or lockout) always delete the code and the attempt counter,
    /// so a code is consumed at most once.
    pub async fn verify_otp(&self, email: &str, submitted: &str) -> Result<(), AppError> {
        let stored = match self.kv.get(&otp_key(email)).await? {
            Some(code) => code,
            None => {
                return Err(AppError::Validation("Invalid or expired OTP".to_string()));
            }
        };

        if stored != submitted.trim() {
            let attempts: u32 = self
                .kv
                .get(&attempts_key(email))
                .await?
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);

            if attempts >= MAX_FAILED_ATTEMPTS {
                self.kv
                    .set(&lock_key(email), "locked", FAILED_LOCK_TTL_SECONDS)
                    .await?;
                self.kv
                    .delete(&[otp_key(email).as_str(), attempts_key(email).as_str()])
                    .await?;
                warn!("OTP verification lockout for {}", email);
                return Err(AppError::Validation(
                    "Account locked due to multiple failed attempts! Try again after 30 minutes"
                        .to_string(),
                ));
            }

            self.kv
                .set(
                    &attempts_key(email),
                    &(attempts + 1).to_string(),
                    ATTEMPT_TTL_SECONDS,
                )
                .await?;
            return Err(AppError::Validation(format!(
                "Incorrect OTP. {} attempts left",
                MAX_FAILED_ATTEMPTS - attempts
            )));
        }

        self.kv
            .delete(&[otp_key(email).as_str(), attempts_key(email).as_str()])
            .await?;
        Ok(())
    }
}
