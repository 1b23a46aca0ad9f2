use std::sync::Arc;

use crate::bookings::repo::BookingRecord;
use crate::cars::repo::CarRecord;
use crate::config::AppConfig;
use crate::groups::repo::GroupRecord;
use crate::store::{Collection, DocumentStore, MemoryStore, PgDocumentStore};
use crate::users::repo::UserRecord;

/// Shared state of the resource services: one handle on the persistence store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let store = match &config.database_url {
            Some(url) => Arc::new(PgDocumentStore::connect(url).await?) as Arc<dyn DocumentStore>,
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data will not persist");
                Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>
            }
        };
        let state = Self::from_parts(store);
        state.ensure_indexes().await?;
        Ok(state)
    }

    pub fn from_parts(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        self.users().ensure_indexes().await?;
        self.cars().ensure_indexes().await?;
        self.bookings().ensure_indexes().await?;
        self.groups().ensure_indexes().await?;
        Ok(())
    }

    pub fn users(&self) -> Collection<UserRecord> {
        Collection::new(self.store.clone())
    }

    pub fn cars(&self) -> Collection<CarRecord> {
        Collection::new(self.store.clone())
    }

    pub fn bookings(&self) -> Collection<BookingRecord> {
        Collection::new(self.store.clone())
    }

    pub fn groups(&self) -> Collection<GroupRecord> {
        Collection::new(self.store.clone())
    }

    /// Memory-backed state with indexes in place, for tests.
    #[cfg(test)]
    pub async fn fake() -> Self {
        let state = Self::from_parts(Arc::new(MemoryStore::new()));
        state.ensure_indexes().await.expect("memory indexes");
        state
    }
}
