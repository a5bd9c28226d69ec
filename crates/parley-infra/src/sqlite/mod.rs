//! SQLite graph store.
//!
//! Chats, persons, and `participates_in` edges as relational tables, with
//! WAL mode and split read/write connection pools.

pub mod pool;
pub mod relationship;
