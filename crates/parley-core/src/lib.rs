//! Store traits and multi-store coordination for Parley.
//!
//! This crate defines the "ports" (store traits) that the infrastructure
//! layer implements, the sync merge algorithm, and the `ChatCoordinator`
//! that every caller goes through. It depends only on `parley-types` --
//! never on `parley-infra` or any database/IO crate.

pub mod chat;
pub mod repository;
