//! Keyed JSON store
//!
//! Read/write JSON values from the kiosk_store table (key-value store).
//! The attendance log is persisted here as a single keyed array entry.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

/// Generic keyed value getter
pub async fn get_value<T: DeserializeOwned>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM kiosk_store WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match serde_json::from_str::<T>(&s) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => Err(Error::Internal(format!(
                "Failed to decode stored value '{key}': {e}"
            ))),
        },
        None => Ok(None),
    }
}

/// Generic keyed value setter
///
/// Inserts or updates the entry.
pub async fn set_value<T: Serialize>(db: &Pool<Sqlite>, key: &str, value: &T) -> Result<()> {
    let value_str = serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to encode value '{key}': {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO kiosk_store (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::initialize_database(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let pool = setup_test_db().await;
        let value: Option<Vec<String>> = get_value(&pool, "attendance_log").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let pool = setup_test_db().await;

        set_value(&pool, "attendance_log", &vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        let value: Option<Vec<String>> = get_value(&pool, "attendance_log").await.unwrap();
        assert_eq!(value.unwrap(), vec!["a", "b"]);

        // Overwrite replaces, not appends
        set_value(&pool, "attendance_log", &vec!["c".to_string()])
            .await
            .unwrap();
        let value: Option<Vec<String>> = get_value(&pool, "attendance_log").await.unwrap();
        assert_eq!(value.unwrap(), vec!["c"]);
    }
}
