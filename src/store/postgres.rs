use anyhow::Context;
use axum::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DocumentStore, Filter, StoreError, Update, ID_FIELD};

/// Documents kept as JSONB rows of a single `documents` table, partitioned by
/// the `collection` column.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;
        Ok(Self { pool })
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn index_name(collection: &str, field: &str) -> String {
    format!("{collection}_{}_key", field.to_ascii_lowercase())
}

/// Map a unique violation on one of our partial indexes back to its field.
fn map_write_error(err: sqlx::Error, collection: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default();
            let field = constraint
                .strip_prefix(&format!("{collection}_"))
                .and_then(|rest| rest.strip_suffix("_key"))
                .unwrap_or(constraint)
                .to_string();
            return StoreError::Duplicate {
                collection: collection.to_string(),
                field,
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        // DDL cannot take bind parameters; both names come from `Document` constants.
        if !is_identifier(collection) || !field.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "refusing to index {collection}.{field}"
            ))));
        }
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON documents ((doc->>'{field}')) \
             WHERE collection = '{collection}'",
            name = index_name(collection, field),
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        info!(collection, field, "unique index ensured");
        Ok(())
    }

    async fn insert(&self, collection: &str, mut doc: Value) -> Result<Value, StoreError> {
        let id = Uuid::new_v4();
        doc.as_object_mut()
            .ok_or(StoreError::NotAnObject)?
            .insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let stored = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            INSERT INTO documents (id, collection, doc)
            VALUES ($1, $2, $3)
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(collection)
        .bind(Json(&doc))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, collection))?;

        debug!(collection, %id, "document inserted");
        Ok(stored.0)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            SELECT doc
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|d| d.0))
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            SELECT doc
            FROM documents
            WHERE collection = $1 AND doc @> $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(collection)
        .bind(Json(filter.as_json()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|d| d.0).collect())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        update: &Update,
    ) -> Result<Option<Value>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            SELECT doc
            FROM documents
            WHERE collection = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(Json(mut doc)) = current else {
            tx.rollback().await?;
            return Ok(None);
        };
        update.apply(&mut doc)?;

        sqlx::query(
            r#"
            UPDATE documents
            SET doc = $3
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&doc))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, collection))?;

        tx.commit().await?;
        Ok(Some(doc))
    }

    async fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND id = $2
            RETURNING doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|d| d.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_names_round_trip_to_fields() {
        assert_eq!(index_name("users", "email"), "users_email_key");
        assert!(is_identifier("users"));
        assert!(!is_identifier("users; drop table documents"));
    }
}
