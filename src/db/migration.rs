use sqlx::SqlitePool;
use tracing::info;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS addresses (
            public_key TEXT PRIMARY KEY,
            balance REAL NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            last_txn_hash TEXT
        )",
    )
    .execute(pool)
    .await?;

    // One on-chain transaction may touch several tracked addresses
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS transactions (
            txn_hash TEXT NOT NULL,
            public_key TEXT NOT NULL,
            amount REAL NOT NULL,
            fee REAL NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            txn_timestamp INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (txn_hash, public_key),
            FOREIGN KEY (public_key) REFERENCES addresses(public_key)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_public_key_time
         ON transactions(public_key, txn_timestamp)",
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
