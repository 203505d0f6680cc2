use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::models::{Identity, NewAccount, Role};
use crate::error::DatabaseError;

/// Lookup/write interface for buyer and seller accounts.
///
/// The relational store is an external collaborator; the auth core only
/// needs these four operations, keyed by email or id within one role
/// partition.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, role: Role, email: &str)
        -> Result<Option<Identity>, DatabaseError>;

    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<Identity>, DatabaseError>;

    async fn create(&self, account: NewAccount) -> Result<Identity, DatabaseError>;

    async fn update_password(
        &self,
        role: Role,
        email: &str,
        password_hash: &str,
    ) -> Result<(), DatabaseError>;
}

pub struct PgAccountStore {
    pool: Arc<PgPool>,
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    phone_number: Option<String>,
    country: Option<String>,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_identity(self, role: Role) -> Identity {
        Identity {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            phone_number: self.phone_number,
            country: self.country,
            created_at: self.created_at,
        }
    }
}

impl PgAccountStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(Self { pool: Arc::new(pool) })
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<Identity>, DatabaseError> {
        let query = match role {
            Role::Buyer => {
                "SELECT id, name, email, password_hash, \
                 NULL::text AS phone_number, NULL::text AS country, created_at \
                 FROM buyers WHERE email = $1"
            }
            Role::Seller => {
                "SELECT id, name, email, password_hash, phone_number, country, created_at \
                 FROM sellers WHERE email = $1"
            }
        };

        let row = sqlx::query_as::<_, AccountRow>(query)
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|r| r.into_identity(role)))
    }

    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<Identity>, DatabaseError> {
        let query = match role {
            Role::Buyer => {
                "SELECT id, name, email, password_hash, \
                 NULL::text AS phone_number, NULL::text AS country, created_at \
                 FROM buyers WHERE id = $1"
            }
            Role::Seller => {
                "SELECT id, name, email, password_hash, phone_number, country, created_at \
                 FROM sellers WHERE id = $1"
            }
        };

        let row = sqlx::query_as::<_, AccountRow>(query)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|r| r.into_identity(role)))
    }

    async fn create(&self, account: NewAccount) -> Result<Identity, DatabaseError> {
        let role = account.role;
        let row = match role {
            Role::Buyer => {
                sqlx::query_as::<_, AccountRow>(
                    "INSERT INTO buyers (id, name, email, password_hash, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, NOW(), NOW()) \
                     RETURNING id, name, email, password_hash, \
                     NULL::text AS phone_number, NULL::text AS country, created_at",
                )
                .bind(Uuid::new_v4())
                .bind(&account.name)
                .bind(&account.email)
                .bind(&account.password_hash)
                .fetch_one(self.pool.as_ref())
                .await?
            }
            Role::Seller => {
                sqlx::query_as::<_, AccountRow>(
                    "INSERT INTO sellers \
                     (id, name, email, password_hash, phone_number, country, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
                     RETURNING id, name, email, password_hash, phone_number, country, created_at",
                )
                .bind(Uuid::new_v4())
                .bind(&account.name)
                .bind(&account.email)
                .bind(&account.password_hash)
                .bind(&account.phone_number)
                .bind(&account.country)
                .fetch_one(self.pool.as_ref())
                .await?
            }
        };

        Ok(row.into_identity(role))
    }

    async fn update_password(
        &self,
        role: Role,
        email: &str,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let query = match role {
            Role::Buyer => "UPDATE buyers SET password_hash = $1, updated_at = NOW() WHERE email = $2",
            Role::Seller => "UPDATE sellers SET password_hash = $1, updated_at = NOW() WHERE email = $2",
        };

        let result = sqlx::query(query)
            .bind(password_hash)
            .bind(email)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }

        Ok(())
    }
}
