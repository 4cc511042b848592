//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **supabase**: reqwest clients for the hosted auth, REST and storage APIs
//! - **memory**: in-process stand-ins used locally and in tests
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod memory;
pub mod supabase;
