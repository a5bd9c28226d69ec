//! Shared domain types for Parley.
//!
//! This crate contains the types every other crate speaks: chat identities,
//! messages, the records each store persists, the error taxonomy the store
//! adapters report through, and the service configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
