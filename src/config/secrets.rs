//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for the database URL so callers
//! don't need a direct secrecy dependency.

pub use secrecy::{ExposeSecret, SecretString};
