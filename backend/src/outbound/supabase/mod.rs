//! Hosted backend adapters.
//!
//! Thin reqwest implementations of the auth, repository and object storage
//! ports against a Supabase project. Auth calls use the public key; table
//! and storage writes use the service key.

mod auth;
mod config;
mod dto;
mod http;
mod storage;
mod store;

pub use auth::SupabaseAuthProvider;
pub use config::{SupabaseConfigError, SupabaseConnection, SupabaseSettings};
pub use storage::SupabaseObjectStorage;
pub use store::SupabaseStore;
