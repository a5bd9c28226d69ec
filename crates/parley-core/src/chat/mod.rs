//! Chat coordination for Parley.
//!
//! `coordinator` sequences every multi-store operation, `merge` holds the
//! pure sync merge, `live` tracks open sessions per chat, and `scheduler`
//! periodically syncs the chats that have sessions open.

pub mod coordinator;
pub mod live;
pub mod merge;
pub mod scheduler;
