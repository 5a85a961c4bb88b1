use sqlx::PgPool;

use crate::models::PoolChange;

/// Insert or overwrite a pool change keyed by signature, keeping the
/// first recorded `usd_per_unit`.
pub async fn upsert_pool_change(pool: &PgPool, change: &PoolChange) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pool_changes (
            signature, block_time, action, token, pool, user_address,
            amount, lp_supply, post_liquidity, usd_per_unit
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (signature) DO UPDATE SET
            block_time = EXCLUDED.block_time,
            action = EXCLUDED.action,
            token = EXCLUDED.token,
            pool = EXCLUDED.pool,
            user_address = EXCLUDED.user_address,
            amount = EXCLUDED.amount,
            lp_supply = EXCLUDED.lp_supply,
            post_liquidity = EXCLUDED.post_liquidity
        "#,
    )
    .bind(&change.signature)
    .bind(change.block_time)
    .bind(&change.action)
    .bind(&change.token)
    .bind(&change.pool)
    .bind(&change.user_address)
    .bind(&change.amount)
    .bind(&change.lp_supply)
    .bind(&change.post_liquidity)
    .bind(change.usd_per_unit)
    .execute(pool)
    .await?;

    Ok(())
}

/// Block time of the newest pool change, if any.
pub async fn get_latest_block_time(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(block_time) FROM pool_changes")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

pub async fn get_pool_change(
    pool: &PgPool,
    signature: &str,
) -> Result<Option<PoolChange>, sqlx::Error> {
    sqlx::query_as::<_, PoolChange>(
        r#"
        SELECT signature, block_time, action, token, pool, user_address,
               amount, lp_supply, post_liquidity, usd_per_unit
        FROM pool_changes
        WHERE signature = $1
        "#,
    )
    .bind(signature)
    .fetch_optional(pool)
    .await
}

pub async fn count_pool_changes(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pool_changes")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
