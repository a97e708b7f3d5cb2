//! Storage adapters for the [`crate::ports`] interfaces.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryStore, MemorySession};
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::ports::SessionStore;
use crate::{Error, Result};

#[async_trait]
impl SessionStore for tower_sessions::Session {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        tower_sessions::Session::get::<String>(self, key).await.map_err(|e| Error::Session(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value).await.map_err(|e| Error::Session(e.to_string()))
    }
}
