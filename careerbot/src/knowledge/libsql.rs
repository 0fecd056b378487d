use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, params_from_iter, Connection, Value};

use super::{check_dimensions, KnowledgeStore};
use crate::db::Database;
use crate::error::{CareerError, Result};
use crate::models::{
    CollectionHandle, KnowledgeRecord, Metadata, MetadataFilter, MetadataValue, ScoredRecord,
};

/// Knowledge store inside the relational database, using libsql's native
/// vector columns. Batches and replacements run in a single transaction.
pub struct LibSqlKnowledgeStore {
    db: Database,
    dimensions: usize,
}

impl LibSqlKnowledgeStore {
    pub async fn new(db: Database, dimensions: usize) -> Result<Self> {
        let store = Self { db, dimensions };
        store.create_tables(&store.db.connect()?).await?;
        Ok(store)
    }

    /// Drop every record and recreate the vector table for `dimensions`.
    pub async fn recreate(db: Database, dimensions: usize) -> Result<Self> {
        let conn = db.connect()?;
        conn.execute("DROP TABLE IF EXISTS knowledge_records", ())
            .await?;
        tracing::warn!(dimensions, "Knowledge records dropped for re-embedding");
        Self::new(db, dimensions).await
    }

    async fn create_tables(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_collections (
                owner_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS knowledge_records (
                owner_id TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{{}}',
                embedding F32_BLOB({dims}) NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (owner_id, id)
            );
            "#,
            dims = self.dimensions
        ))
        .await?;
        Ok(())
    }

    async fn touch_collection(conn: &Connection, owner_id: &str) -> Result<bool> {
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO knowledge_collections (owner_id, created_at) VALUES (?1, ?2)",
                params![owner_id, Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(inserted > 0)
    }

    async fn insert_records(
        &self,
        conn: &Connection,
        owner_id: &str,
        records: &[KnowledgeRecord],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        for record in records {
            conn.execute(
                r#"
                INSERT INTO knowledge_records (owner_id, id, text, metadata, embedding, updated_at)
                VALUES (?1, ?2, ?3, ?4, vector32(?5), ?6)
                ON CONFLICT(owner_id, id) DO UPDATE SET
                    text = excluded.text,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
                params![
                    owner_id,
                    record.id.clone(),
                    record.text.clone(),
                    serde_json::to_string(&record.metadata)?,
                    serde_json::to_string(&record.vector)?,
                    now.clone(),
                ],
            )
            .await?;
        }
        Ok(())
    }

    async fn select_where(
        conn: &Connection,
        owner_id: &str,
        filter: &MetadataFilter,
    ) -> Result<Vec<KnowledgeRecord>> {
        let (clause, mut values) = filter_clause(filter, 2)?;
        values.insert(0, Value::from(owner_id.to_string()));

        let sql = format!(
            "SELECT id, text, metadata, vector_extract(embedding) FROM knowledge_records
             WHERE owner_id = ?1{clause}
             ORDER BY id"
        );
        let mut rows = conn.query(&sql, params_from_iter(values)).await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn remove_where(
        conn: &Connection,
        owner_id: &str,
        filter: &MetadataFilter,
    ) -> Result<usize> {
        let (clause, mut values) = filter_clause(filter, 2)?;
        values.insert(0, Value::from(owner_id.to_string()));

        let deleted = conn
            .execute(
                &format!("DELETE FROM knowledge_records WHERE owner_id = ?1{clause}"),
                params_from_iter(values),
            )
            .await?;
        Ok(deleted as usize)
    }

    fn check_batch(&self, records: &[KnowledgeRecord]) -> Result<()> {
        records
            .iter()
            .try_for_each(|r| check_dimensions(self.dimensions, &r.vector))
    }
}

/// ` AND json_extract(...) = ?n` clauses for `filter`, with placeholders
/// numbered from `start`.
fn filter_clause(filter: &MetadataFilter, start: usize) -> Result<(String, Vec<Value>)> {
    filter.validate()?;

    let mut sql = String::new();
    let mut values = Vec::with_capacity(filter.clauses().len());
    for (i, (key, value)) in filter.clauses().iter().enumerate() {
        sql.push_str(&format!(
            " AND json_extract(metadata, '$.{key}') = ?{}",
            start + i
        ));
        values.push(match value {
            MetadataValue::Bool(b) => Value::from(i64::from(*b)),
            MetadataValue::Integer(n) => Value::from(*n),
            MetadataValue::Float(f) => Value::from(*f),
            MetadataValue::Text(s) => Value::from(s.clone()),
        });
    }
    Ok((sql, values))
}

fn row_to_record(row: &libsql::Row) -> Result<KnowledgeRecord> {
    let metadata: Metadata = serde_json::from_str(&row.get::<String>(2)?)?;
    let vector: Vec<f32> = serde_json::from_str(&row.get::<String>(3)?)?;
    Ok(KnowledgeRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        metadata,
        vector,
    })
}

#[async_trait]
impl KnowledgeStore for LibSqlKnowledgeStore {
    async fn ensure_collection(&self, owner_id: &str) -> Result<CollectionHandle> {
        let conn = self.db.connect()?;
        let created = Self::touch_collection(&conn, owner_id).await?;
        Ok(CollectionHandle {
            owner_id: owner_id.to_string(),
            created,
        })
    }

    async fn upsert(&self, owner_id: &str, records: &[KnowledgeRecord]) -> Result<()> {
        self.check_batch(records)?;
        let conn = self.db.connect()?;
        let tx = conn.transaction().await?;

        let written = async {
            Self::touch_collection(&tx, owner_id).await?;
            self.insert_records(&tx, owner_id, records).await
        }
        .await;

        match written {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    async fn delete_where(&self, owner_id: &str, filter: &MetadataFilter) -> Result<usize> {
        let conn = self.db.connect()?;
        Self::touch_collection(&conn, owner_id).await?;
        Self::remove_where(&conn, owner_id, filter).await
    }

    async fn delete_by_id(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.db.connect()?;
        Self::touch_collection(&conn, owner_id).await?;

        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let mut values = vec![Value::from(owner_id.to_string())];
        values.extend(ids.iter().map(|id| Value::from(id.clone())));

        conn.execute(
            &format!(
                "DELETE FROM knowledge_records WHERE owner_id = ?1 AND id IN ({})",
                placeholders.join(", ")
            ),
            params_from_iter(values),
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        owner_id: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredRecord>> {
        check_dimensions(self.dimensions, vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let conn = self.db.connect()?;
        Self::touch_collection(&conn, owner_id).await?;

        // ?1 owner, ?2 query vector, ?3 limit; filter values from ?4
        let (clause, filter_values) = filter_clause(filter, 4)?;
        let sql = format!(
            r#"
            SELECT id, text, metadata, vector_extract(embedding),
                   1 - vector_distance_cos(embedding, vector32(?2)) AS score
            FROM knowledge_records
            WHERE owner_id = ?1{clause}
            ORDER BY score DESC, id ASC
            LIMIT ?3
            "#
        );

        let mut values = vec![
            Value::from(owner_id.to_string()),
            Value::from(serde_json::to_string(vector)?),
            Value::from(top_k as i64),
        ];
        values.extend(filter_values);

        let mut rows = conn.query(&sql, params_from_iter(values)).await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(ScoredRecord {
                record: row_to_record(&row)?,
                score: row.get::<f64>(4)? as f32,
            });
        }
        Ok(results)
    }

    async fn get_where(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
    ) -> Result<Vec<KnowledgeRecord>> {
        let conn = self.db.connect()?;
        Self::select_where(&conn, owner_id, filter).await
    }

    async fn replace_where(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
        records: &[KnowledgeRecord],
    ) -> Result<Vec<KnowledgeRecord>> {
        self.check_batch(records)?;
        let conn = self.db.connect()?;
        let tx = conn.transaction().await?;

        let replaced = async {
            Self::touch_collection(&tx, owner_id).await?;
            let displaced = Self::select_where(&tx, owner_id, filter).await?;
            Self::remove_where(&tx, owner_id, filter).await?;
            self.insert_records(&tx, owner_id, records).await?;
            Ok::<_, CareerError>(displaced)
        }
        .await;

        match replaced {
            Ok(displaced) => {
                tx.commit().await?;
                Ok(displaced)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }
}
