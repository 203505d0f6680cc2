use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password;
use crate::config::AuthConfig;
use crate::db::{AccountStore, Identity, Role};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Account ID
    pub role: Role,
    pub iat: i64, // Issued at
    pub exp: i64, // Expiration time
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and validates the dual-token session credentials.
///
/// Tokens are not persisted: validity is purely a function of signature and
/// expiry, so there is no server-side revocation before a token runs out.
/// Access and refresh tokens are signed with separate secrets so one can
/// never be presented in place of the other.
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(accounts: Arc<dyn AccountStore>, config: &AuthConfig) -> Self {
        Self {
            accounts,
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    /// Password login. Resolves the account within the given role partition
    /// and issues a fresh access/refresh pair on success.
    pub async fn login(
        &self,
        role: Role,
        email: &str,
        password_input: &str,
    ) -> Result<(Identity, TokenPair), AppError> {
        let account = self
            .accounts
            .find_by_email(role, email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !password::verify_password(password_input, &account.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        let tokens = self.issue_tokens(&account)?;
        Ok((account, tokens))
    }

    pub fn issue_tokens(&self, account: &Identity) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.sign(account, self.access_ttl, &self.access_secret)?,
            refresh_token: self.sign(account, self.refresh_ttl, &self.refresh_secret)?,
        })
    }

    /// Exchanges a valid refresh token for a new access token bound to the
    /// same account and role. The refresh token itself is not rotated and
    /// stays valid until its own expiry.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Identity, String), AppError> {
        let claims = Self::decode_token(refresh_token, &self.refresh_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        let account = self.lookup(&claims).await?;
        let access_token = self.sign(&account, self.access_ttl, &self.access_secret)?;

        Ok((account, access_token))
    }

    /// Validates an access token and re-resolves its account.
    pub async fn authenticate(&self, access_token: &str) -> Result<Identity, AppError> {
        let claims = Self::decode_token(access_token, &self.access_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired access token".to_string()))?;

        self.lookup(&claims).await
    }

    async fn lookup(&self, claims: &Claims) -> Result<Identity, AppError> {
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

        self.accounts
            .find_by_id(claims.role, id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
    }

    fn sign(&self, account: &Identity, ttl: Duration, secret: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            role: account.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
    }
}
