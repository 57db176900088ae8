//! Settings persistence (key/value)

use matcat_common::Result;
use sqlx::SqlitePool;

/// Read a setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Write a setting value (insert or replace)
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Maximum time to retry a locked database write, from settings (default 5000ms)
pub async fn max_lock_wait_ms(pool: &SqlitePool) -> Result<u64> {
    let value: Option<i64> = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'ingest_database_max_lock_wait_ms'",
    )
    .fetch_optional(pool)
    .await?;

    Ok(value.unwrap_or(5000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        crate::db::schema::initialize_schema(&pool)
            .await
            .expect("Schema initialization failed");

        set_setting(&pool, "ingest_match_threshold_import", "0.65")
            .await
            .unwrap();

        let value = get_setting(&pool, "ingest_match_threshold_import")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("0.65"));

        set_setting(&pool, "ingest_match_threshold_import", "0.7")
            .await
            .unwrap();
        let value = get_setting(&pool, "ingest_match_threshold_import")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("0.7"));
    }

    #[tokio::test]
    async fn lock_wait_defaults_when_unset() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::schema::initialize_schema(&pool).await.unwrap();

        assert_eq!(max_lock_wait_ms(&pool).await.unwrap(), 5000);
    }
}
