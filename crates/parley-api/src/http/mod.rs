//! HTTP/REST API layer for Parley.
//!
//! Axum-based REST API at `/api/v1/` with envelope responses, plus the
//! `/ws` live session endpoint and `/health`.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
