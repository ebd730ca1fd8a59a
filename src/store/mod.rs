//! Persistence for users, learning sessions, study contexts and communities.
//!
//! [`Store`] is the keyed-access contract the services use. [`MemoryStore`]
//! backs tests and database-less runs, [`PgStore`] backs production.

mod error;
pub mod memory;
pub mod postgres;
mod traits;

pub use error::*;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::*;
