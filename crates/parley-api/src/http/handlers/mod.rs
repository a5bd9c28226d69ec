//! HTTP request handlers for the REST API and the live channel.

pub mod chat;
pub mod participant;
pub mod ws;
