#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use bazaar_auth_server::error::{DatabaseError, EmailError};
use bazaar_auth_server::{
    AccountStore, AppState, EmailSender, Identity, KvStore, MemoryKv, NewAccount, Role, Settings,
};

/// In-memory account store keyed by `(role, email)`, matching the per-role
/// partitioning of the two Postgres tables.
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: RwLock<HashMap<(Role, String), Identity>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn find_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<Identity>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&(role, email.to_string())).cloned())
    }

    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<Identity>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.role == role && a.id == id)
            .cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Identity, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        let key = (account.role, account.email.clone());
        if accounts.contains_key(&key) {
            return Err(DatabaseError::Duplicate);
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            phone_number: account.phone_number,
            country: account.country,
            created_at: Utc::now(),
        };
        accounts.insert(key, identity.clone());
        Ok(identity)
    }

    async fn update_password(
        &self,
        role: Role,
        email: &str,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&(role, email.to_string())) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(DatabaseError::NotFound),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub template: String,
    pub otp: Option<String>,
}

/// Mailer fake that records every send so tests can read the issued code
/// back out of the "inbox".
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_otp_for(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|mail| mail.to == to)
            .and_then(|mail| mail.otp.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        data: &Value,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            template: template.to_string(),
            otp: data["otp"].as_str().map(str::to_string),
        });
        Ok(())
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub kv: MemoryKv,
    pub mailer: Arc<RecordingMailer>,
}

/// App state wired entirely over in-memory fakes.
pub fn test_state() -> TestHarness {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let kv = MemoryKv::new();
    let mailer = Arc::new(RecordingMailer::new());
    let accounts: Arc<dyn AccountStore> = Arc::new(MemoryAccounts::new());

    let state = AppState::with_components(
        config,
        accounts,
        Arc::new(kv.clone()) as Arc<dyn KvStore>,
        mailer.clone() as Arc<dyn EmailSender>,
    );

    TestHarness { state, kv, mailer }
}
