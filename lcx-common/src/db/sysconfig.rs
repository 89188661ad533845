//! System configuration values stored in the database

use crate::Result;
use sqlx::SqlitePool;
use tracing::warn;

/// Key holding the maximum number of export lines shown in the browser
pub const LIST_ROW_LIMIT_KEY: &str = "NomostListNum";

/// Value of a system configuration variable
pub async fn get_sysconfig(pool: &SqlitePool, name: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT conf_value FROM sysconfig WHERE variablename = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Insert or replace a system configuration variable
pub async fn set_sysconfig(pool: &SqlitePool, name: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sysconfig (variablename, conf_value) VALUES (?, ?)
        ON CONFLICT(variablename) DO UPDATE SET conf_value = excluded.conf_value
        "#,
    )
    .bind(name)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Row cap stored in the database
///
/// `None` when the key is absent, `-1`, or not a number; the caller then
/// falls back to its own configuration.
pub async fn list_row_limit(pool: &SqlitePool) -> Result<Option<i64>> {
    let Some(raw) = get_sysconfig(pool, LIST_ROW_LIMIT_KEY).await? else {
        return Ok(None);
    };

    match raw.trim().parse::<i64>() {
        Ok(-1) => Ok(None),
        Ok(limit) => Ok(Some(limit)),
        Err(_) => {
            warn!("Ignoring non-numeric {} value: {:?}", LIST_ROW_LIMIT_KEY, raw);
            Ok(None)
        }
    }
}
