use sqlx::PgPool;

use crate::models::SettledGame;

/// Insert or overwrite a settled game keyed by signature.
///
/// `usd_per_unit` is left untouched on conflict so re-ingestion never
/// replaces the price at settlement with a later one.
pub async fn upsert_settled_game(pool: &PgPool, game: &SettledGame) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO settled_games (
            signature, block_time, metadata, nonce, client_seed, rng_seed,
            next_rng_seed_hashed, bet, bet_length, result_number, creator,
            user_address, token, pool, wager, payout, multiplier_bps, creator_fee,
            pool_fee, whisky_fee, jackpot_fee, jackpot, pool_liquidity, usd_per_unit
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
        ON CONFLICT (signature) DO UPDATE SET
            block_time = EXCLUDED.block_time,
            metadata = EXCLUDED.metadata,
            nonce = EXCLUDED.nonce,
            client_seed = EXCLUDED.client_seed,
            rng_seed = EXCLUDED.rng_seed,
            next_rng_seed_hashed = EXCLUDED.next_rng_seed_hashed,
            bet = EXCLUDED.bet,
            bet_length = EXCLUDED.bet_length,
            result_number = EXCLUDED.result_number,
            creator = EXCLUDED.creator,
            user_address = EXCLUDED.user_address,
            token = EXCLUDED.token,
            pool = EXCLUDED.pool,
            wager = EXCLUDED.wager,
            payout = EXCLUDED.payout,
            multiplier_bps = EXCLUDED.multiplier_bps,
            creator_fee = EXCLUDED.creator_fee,
            pool_fee = EXCLUDED.pool_fee,
            whisky_fee = EXCLUDED.whisky_fee,
            jackpot_fee = EXCLUDED.jackpot_fee,
            jackpot = EXCLUDED.jackpot,
            pool_liquidity = EXCLUDED.pool_liquidity
        "#,
    )
    .bind(&game.signature)
    .bind(game.block_time)
    .bind(&game.metadata)
    .bind(&game.nonce)
    .bind(&game.client_seed)
    .bind(&game.rng_seed)
    .bind(&game.next_rng_seed_hashed)
    .bind(&game.bet)
    .bind(game.bet_length)
    .bind(game.result_number)
    .bind(&game.creator)
    .bind(&game.user_address)
    .bind(&game.token)
    .bind(&game.pool)
    .bind(&game.wager)
    .bind(&game.payout)
    .bind(&game.multiplier_bps)
    .bind(&game.creator_fee)
    .bind(&game.pool_fee)
    .bind(&game.whisky_fee)
    .bind(&game.jackpot_fee)
    .bind(&game.jackpot)
    .bind(&game.pool_liquidity)
    .bind(game.usd_per_unit)
    .execute(pool)
    .await?;

    Ok(())
}

/// Block time of the newest settled game, if any.
pub async fn get_latest_block_time(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(block_time) FROM settled_games")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

pub async fn get_settled_game(
    pool: &PgPool,
    signature: &str,
) -> Result<Option<SettledGame>, sqlx::Error> {
    sqlx::query_as::<_, SettledGame>(
        r#"
        SELECT signature, block_time, metadata, nonce, client_seed, rng_seed,
               next_rng_seed_hashed, bet, bet_length, result_number, creator,
               user_address, token, pool, wager, payout, multiplier_bps, creator_fee,
               pool_fee, whisky_fee, jackpot_fee, jackpot, pool_liquidity, usd_per_unit
        FROM settled_games
        WHERE signature = $1
        "#,
    )
    .bind(signature)
    .fetch_optional(pool)
    .await
}

pub async fn count_settled_games(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settled_games")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
