//! Account storage for the auth service
//!
//! Buyers and sellers live in separate tables with independent unique-email
//! indexes, so one email may hold both account kinds. Lookups are strongly
//! consistent with the most recent create.

pub mod models;
pub mod operations;

pub use models::{Identity, NewAccount, Role};
pub use operations::{AccountStore, PgAccountStore};
