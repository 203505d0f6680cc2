use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account kind. The role is carried in session tokens and selects which
/// table a lookup goes against and which cookie pair a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }

    /// Cookie names are scoped per role so a buyer and a seller session can
    /// coexist in one browser.
    pub fn access_cookie(&self) -> &'static str {
        match self {
            Role::Buyer => "access_token",
            Role::Seller => "seller_access_token",
        }
    }

    pub fn refresh_cookie(&self) -> &'static str {
        match self {
            Role::Buyer => "refresh_token",
            Role::Seller => "seller_refresh_token",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved buyer or seller account. The password hash never leaves the
/// service, and the seller-only profile fields stay `None` for buyers.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for account creation, produced by a successful OTP verification.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
}
