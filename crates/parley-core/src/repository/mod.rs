//! Store trait definitions (ports).
//!
//! One trait per backend role. The infrastructure layer (parley-infra)
//! implements them; the coordinator only ever sees these traits.

pub mod boxed;
pub mod durable;
pub mod relationship;
pub mod volatile;
