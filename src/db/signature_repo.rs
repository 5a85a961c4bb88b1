use sqlx::PgPool;

use crate::models::SignatureRecord;

/// Insert a signature, or refresh its block time if already known.
pub async fn upsert_signature(pool: &PgPool, record: &SignatureRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO signatures (signature, block_time)
        VALUES ($1, $2)
        ON CONFLICT (signature) DO UPDATE SET block_time = EXCLUDED.block_time
        "#,
    )
    .bind(&record.signature)
    .bind(record.block_time)
    .execute(pool)
    .await?;

    Ok(())
}

/// The newest stored signature by block time.
pub async fn get_latest_signature(pool: &PgPool) -> Result<Option<SignatureRecord>, sqlx::Error> {
    sqlx::query_as::<_, SignatureRecord>(
        "SELECT signature, block_time FROM signatures ORDER BY block_time DESC, signature DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

/// Signatures at or after `block_time` that have no decoded event row yet.
pub async fn get_undecoded_since(
    pool: &PgPool,
    block_time: i64,
) -> Result<Vec<SignatureRecord>, sqlx::Error> {
    sqlx::query_as::<_, SignatureRecord>(
        r#"
        SELECT s.signature, s.block_time
        FROM signatures s
        WHERE s.block_time >= $1
          AND NOT EXISTS (SELECT 1 FROM settled_games g WHERE g.signature = s.signature)
          AND NOT EXISTS (SELECT 1 FROM pool_changes p WHERE p.signature = s.signature)
        ORDER BY s.block_time ASC, s.signature ASC
        "#,
    )
    .bind(block_time)
    .fetch_all(pool)
    .await
}

pub async fn count_signatures(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signatures")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
