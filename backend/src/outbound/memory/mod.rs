//! In-process adapters for every driven port.
//!
//! Used when no hosted backend is configured and by the HTTP integration
//! tests. State lives behind mutexes for the lifetime of the process; nothing
//! is persisted.

mod auth;
mod storage;
mod store;

pub use auth::MemoryAuthProvider;
pub use storage::MemoryObjectStorage;
pub use store::MemoryStore;

/// Message used when a mutex was poisoned by a panicking holder.
const POISONED: &str = "in-memory state poisoned";
