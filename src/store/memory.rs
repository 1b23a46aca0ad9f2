use std::collections::HashMap;

use axum::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, Filter, StoreError, Update, ID_FIELD};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Value>>,
    unique: HashMap<String, Vec<String>>,
}

impl Inner {
    /// Field of `doc` that collides with another document of the collection.
    fn collision(&self, collection: &str, doc: &Value, own_id: &Value) -> Option<String> {
        let fields = self.unique.get(collection)?;
        let docs = self.collections.get(collection)?;
        fields
            .iter()
            .find(|field| match doc.get(field.as_str()) {
                None | Some(Value::Null) => false,
                Some(value) => docs.iter().any(|other| {
                    other.get(ID_FIELD) != Some(own_id) && other.get(field.as_str()) == Some(value)
                }),
            })
            .cloned()
    }
}

/// In-process store with the same semantics as the Postgres backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn id_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let fields = inner.unique.entry(collection.to_string()).or_default();
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, mut doc: Value) -> Result<Value, StoreError> {
        let id = id_value(Uuid::new_v4());
        doc.as_object_mut()
            .ok_or(StoreError::NotAnObject)?
            .insert(ID_FIELD.to_string(), id.clone());

        let mut inner = self.inner.write().await;
        if let Some(field) = inner.collision(collection, &doc, &id) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field,
            });
        }
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let id = id_value(id);
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.get(ID_FIELD) == Some(&id)))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        update: &Update,
    ) -> Result<Option<Value>, StoreError> {
        let id = id_value(id);
        let mut inner = self.inner.write().await;
        let Some(position) = inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().position(|d| d.get(ID_FIELD) == Some(&id)))
        else {
            return Ok(None);
        };

        let mut updated = inner.collections[collection][position].clone();
        update.apply(&mut updated)?;
        if let Some(field) = inner.collision(collection, &updated, &id) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field,
            });
        }

        if let Some(docs) = inner.collections.get_mut(collection) {
            docs[position] = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let id = id_value(id);
        let mut inner = self.inner.write().await;
        Ok(inner.collections.get_mut(collection).and_then(|docs| {
            docs.iter()
                .position(|d| d.get(ID_FIELD) == Some(&id))
                .map(|position| docs.remove(position))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id_of(doc: &Value) -> Uuid {
        doc["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_a_fresh_identifier() {
        let store = MemoryStore::new();
        let a = store.insert("cars", json!({"name": "a"})).await.unwrap();
        let b = store.insert("cars", json!({"name": "b"})).await.unwrap();
        assert_ne!(id_of(&a), id_of(&b));
        assert_eq!(store.find_by_id("cars", id_of(&a)).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn insert_overrides_caller_identifier() {
        let store = MemoryStore::new();
        let doc = store.insert("cars", json!({"id": "mine"})).await.unwrap();
        assert_ne!(doc["id"], json!("mine"));
        assert!(doc["id"].as_str().unwrap().parse::<Uuid>().is_ok());
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates_on_insert_and_update() {
        let store = MemoryStore::new();
        store.ensure_unique_index("users", "email").await.unwrap();
        store.insert("users", json!({"email": "a@x.io"})).await.unwrap();
        let b = store.insert("users", json!({"email": "b@x.io"})).await.unwrap();

        let err = store.insert("users", json!({"email": "a@x.io"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "email"));

        let err = store
            .update_by_id("users", id_of(&b), &Update::new().set("email", "a@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));

        // Rewriting its own value is not a collision.
        let same = store
            .update_by_id("users", id_of(&b), &Update::new().set("email", "b@x.io"))
            .await
            .unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn find_many_filters_in_insertion_order() {
        let store = MemoryStore::new();
        for (name, kind) in [("a", "SUV"), ("b", "VAN"), ("c", "SUV")] {
            store.insert("cars", json!({"name": name, "type": kind})).await.unwrap();
        }
        let suvs = store
            .find_many("cars", &Filter::all().eq("type", "SUV"))
            .await
            .unwrap();
        let names: Vec<_> = suvs.iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("c")]);
        assert!(store.find_many("bookings", &Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_report_absent_documents() {
        let store = MemoryStore::new();
        let missing = Uuid::new_v4();
        assert!(store
            .update_by_id("cars", missing, &Update::new().set("active", false))
            .await
            .unwrap()
            .is_none());
        assert!(store.delete_by_id("cars", missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_returns_the_document_once() {
        let store = MemoryStore::new();
        let doc = store.insert("cars", json!({"name": "a"})).await.unwrap();
        let id = id_of(&doc);
        assert_eq!(store.delete_by_id("cars", id).await.unwrap(), Some(doc));
        assert_eq!(store.delete_by_id("cars", id).await.unwrap(), None);
        assert_eq!(store.find_by_id("cars", id).await.unwrap(), None);
    }
}
