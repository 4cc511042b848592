//! Request middleware.
//!
//! Request correlation (`Trace`). The dashboard gate lives with the HTTP
//! adapter because it reads the session cookie.

pub mod trace;

pub use trace::Trace;
