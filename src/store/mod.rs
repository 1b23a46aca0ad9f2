//! Document persistence.
//!
//! Every entity lives as a JSON document in a named collection. The store
//! assigns the identifier on insert and keeps it in the document's `id` field;
//! nothing else may write that field. Services never talk to a backend
//! directly, they go through the typed [`Collection`] facade.

mod memory;
mod postgres;

use std::marker::PhantomData;
use std::sync::Arc;

use axum::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

pub const ID_FIELD: &str = "id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate {field} in {collection}")]
    Duplicate { collection: String, field: String },

    #[error("document in {collection} is malformed: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("document must be a JSON object")]
    NotAnObject,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Field-equality conjunction; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    pub fn as_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Modification applied to one document as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Map<String, Value>,
    add_to_set: Vec<(String, Value)>,
    pull: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    /// Set every field of a serialized patch object. Absent fields are left alone.
    pub fn merge(mut self, patch: Value) -> Result<Self, StoreError> {
        match patch {
            Value::Object(fields) => {
                self.set.extend(fields);
                Ok(self)
            }
            _ => Err(StoreError::NotAnObject),
        }
    }

    /// Append `value` to the array `field` unless it is already present.
    pub fn add_to_set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.add_to_set.push((field.to_string(), value.into()));
        self
    }

    /// Remove every occurrence of `value` from the array `field`.
    pub fn pull(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.pull.push((field.to_string(), value.into()));
        self
    }

    /// Stamp `updatedAt` with the current time.
    pub fn touch(self) -> Self {
        match OffsetDateTime::now_utc().format(&Rfc3339) {
            Ok(now) => self.set("updatedAt", now),
            Err(_) => self,
        }
    }

    pub fn apply(&self, doc: &mut Value) -> Result<(), StoreError> {
        let fields = doc.as_object_mut().ok_or(StoreError::NotAnObject)?;

        for (field, value) in &self.set {
            if field != ID_FIELD {
                fields.insert(field.clone(), value.clone());
            }
        }

        for (field, value) in &self.add_to_set {
            let slot = fields
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
        }

        for (field, value) in &self.pull {
            if let Some(Value::Array(items)) = fields.get_mut(field) {
                items.retain(|item| item != value);
            }
        }

        Ok(())
    }
}

/// Raw document backend. Implementations must apply each update atomically
/// with respect to other writes to the same document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError>;

    /// Store `doc` under a freshly generated id and return the stored document.
    async fn insert(&self, collection: &str, doc: Value) -> Result<Value, StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError>;

    /// Matching documents in insertion order.
    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Returns the updated document, or `None` when `id` is absent.
    async fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        update: &Update,
    ) -> Result<Option<Value>, StoreError>;

    /// Returns the deleted document, or `None` when `id` is absent.
    async fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError>;
}

/// A persisted entity type.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    const UNIQUE_FIELDS: &'static [&'static str] = &[];
}

/// Typed view of one collection.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _doc: PhantomData<fn() -> T>,
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _doc: PhantomData,
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for field in T::UNIQUE_FIELDS {
            self.store.ensure_unique_index(T::COLLECTION, field).await?;
        }
        Ok(())
    }

    pub async fn insert<N: Serialize + Sync>(&self, new: &N) -> Result<T, StoreError> {
        let doc = serde_json::to_value(new).map_err(|source| StoreError::Decode {
            collection: T::COLLECTION,
            source,
        })?;
        let stored = self.store.insert(T::COLLECTION, doc).await?;
        decode(stored)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(decode::<T>)
            .transpose()
    }

    pub async fn find_all(&self) -> Result<Vec<T>, StoreError> {
        self.find_many(&Filter::all()).await
    }

    pub async fn find_many(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        self.store
            .find_many(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(decode::<T>)
            .collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        Ok(self.find_many(filter).await?.into_iter().next())
    }

    pub async fn update_by_id(&self, id: Uuid, update: &Update) -> Result<Option<T>, StoreError> {
        self.store
            .update_by_id(T::COLLECTION, id, update)
            .await?
            .map(decode::<T>)
            .transpose()
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store
            .delete_by_id(T::COLLECTION, id)
            .await?
            .map(decode::<T>)
            .transpose()
    }
}

fn decode<T: Document>(doc: Value) -> Result<T, StoreError> {
    serde_json::from_value(doc).map_err(|source| StoreError::Decode {
        collection: T::COLLECTION,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_never_touches_the_identifier() {
        let mut doc = json!({"id": "a", "name": "old"});
        Update::new()
            .set("id", "b")
            .set("name", "new")
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc, json!({"id": "a", "name": "new"}));
    }

    #[test]
    fn add_to_set_is_idempotent() {
        let mut doc = json!({"users": ["u1"]});
        let update = Update::new().add_to_set("users", "u2");
        update.apply(&mut doc).unwrap();
        update.apply(&mut doc).unwrap();
        assert_eq!(doc["users"], json!(["u1", "u2"]));
    }

    #[test]
    fn add_to_set_creates_missing_array() {
        let mut doc = json!({});
        Update::new().add_to_set("users", "u1").apply(&mut doc).unwrap();
        assert_eq!(doc["users"], json!(["u1"]));
    }

    #[test]
    fn pull_removes_every_occurrence() {
        let mut doc = json!({"users": ["u1", "u2", "u1"]});
        Update::new().pull("users", "u1").apply(&mut doc).unwrap();
        assert_eq!(doc["users"], json!(["u2"]));
    }

    #[test]
    fn merge_rejects_non_objects() {
        assert!(matches!(
            Update::new().merge(json!([1, 2])),
            Err(StoreError::NotAnObject)
        ));
    }

    #[test]
    fn touch_stamps_updated_at() {
        let mut doc = json!({"name": "x"});
        Update::new().touch().apply(&mut doc).unwrap();
        let stamp = doc["updatedAt"].as_str().unwrap();
        assert!(OffsetDateTime::parse(stamp, &Rfc3339).is_ok());
    }

    #[test]
    fn filter_matches_on_every_field() {
        let doc = json!({"type": "SUV", "active": true});
        assert!(Filter::all().matches(&doc));
        assert!(Filter::all().eq("type", "SUV").matches(&doc));
        assert!(!Filter::all().eq("type", "SUV").eq("active", false).matches(&doc));
        assert!(!Filter::all().eq("missing", 1).matches(&doc));
    }
}
