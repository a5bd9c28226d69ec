//! Infrastructure layer for Parley.
//!
//! Implementations of the store traits defined in `parley-core`: the SQLite
//! graph store, the MongoDB durable store, the Redis volatile store, and
//! in-memory versions of all three. Also the config loader and the wiring
//! that turns a `ServiceConfig` into a connected coordinator.

pub mod backend;
pub mod cache;
pub mod config;
pub mod memory;
pub mod mongo;
pub mod sqlite;
