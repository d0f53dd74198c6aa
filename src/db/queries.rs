// Shared query helpers for SurrealDB.

use crate::db::Db;
use crate::db::schema::SequenceRecord;
use anyhow::{Result, anyhow};

pub struct QueryBuilder;

impl QueryBuilder {
    /// Allocate the next id for `table`.
    ///
    /// The increment is a single UPSERT statement, so concurrent callers never
    /// receive the same value and values grow with allocation order.
    pub async fn next_id(db: &Db, table: &str) -> Result<i64> {
        let mut res = db
            .query(
                r#"
                UPSERT type::thing('sequence', $table)
                SET last_value = (last_value OR 0) + 1
                RETURN AFTER
                "#,
            )
            .bind(("table", table.to_string()))
            .await?;

        let seq: Option<SequenceRecord> = res.take(0)?;
        seq.map(|s| s.last_value)
            .ok_or_else(|| anyhow!("failed to allocate id for {}", table))
    }

    /// Whether a store error reports a violated UNIQUE index.
    pub fn is_unique_violation(err: &surrealdb::Error) -> bool {
        matches!(
            err,
            surrealdb::Error::Db(surrealdb::error::Db::IndexExists { .. })
        )
    }
}
