//! Database module exports.

mod error;
mod matcher;
mod memory;
pub mod models;
mod mongo;
mod query;
mod store;
#[cfg(test)]
pub mod testing;

use std::str::FromStr;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::*;
pub use mongo::MongoStore;
pub use query::{FindOptions, Query, QueryOutput};
pub use store::DocumentStore;

/// Which document store backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown store backend '{other}'"),
        }
    }
}
