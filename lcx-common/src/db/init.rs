//! Database initialization
//!
//! Creates the database file on first run and the export schema on every
//! start (all statements are idempotent).

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // Readers never block the Software Heritage writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table used by the export services
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_upload_tables(pool).await?;
    create_upload_tree_table(pool).await?;
    create_agent_tables(pool).await?;
    create_license_tables(pool).await?;
    create_clearing_tables(pool).await?;
    create_copyright_tables(pool).await?;
    create_software_heritage_table(pool).await?;
    create_sysconfig_table(pool).await?;
    Ok(())
}

async fn create_upload_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload (
            upload_pk INTEGER PRIMARY KEY,
            upload_filename TEXT NOT NULL,
            public_perm INTEGER NOT NULL DEFAULT 0,
            upload_ts TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS perm_upload (
            perm_upload_pk INTEGER PRIMARY KEY,
            upload_fk INTEGER NOT NULL REFERENCES upload(upload_pk) ON DELETE CASCADE,
            group_fk INTEGER NOT NULL,
            perm INTEGER NOT NULL,
            UNIQUE(upload_fk, group_fk)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pfile (
            pfile_pk INTEGER PRIMARY KEY,
            pfile_sha1 TEXT NOT NULL,
            pfile_md5 TEXT,
            pfile_size INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_upload_tree_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload_tree (
            uploadtree_pk INTEGER PRIMARY KEY,
            upload_fk INTEGER NOT NULL REFERENCES upload(upload_pk) ON DELETE CASCADE,
            parent INTEGER,
            pfile_fk INTEGER REFERENCES pfile(pfile_pk),
            ufile_mode INTEGER NOT NULL DEFAULT 0,
            lft INTEGER NOT NULL,
            rgt INTEGER NOT NULL,
            ufile_name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_upload_tree_upload_lft ON upload_tree(upload_fk, lft)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_upload_tree_pfile ON upload_tree(pfile_fk)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_agent_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agent (
            agent_pk INTEGER PRIMARY KEY,
            agent_name TEXT NOT NULL,
            agent_rev TEXT NOT NULL DEFAULT '',
            agent_enabled INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per agent run on an upload (agent run status)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agent_run (
            ars_pk INTEGER PRIMARY KEY,
            agent_fk INTEGER NOT NULL REFERENCES agent(agent_pk),
            upload_fk INTEGER NOT NULL REFERENCES upload(upload_pk) ON DELETE CASCADE,
            ars_success INTEGER NOT NULL DEFAULT 0,
            ars_starttime TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_license_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS license_ref (
            rf_pk INTEGER PRIMARY KEY,
            rf_shortname TEXT NOT NULL UNIQUE,
            rf_fullname TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // rf_fk is NULL when the scanner processed the file without a match
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS license_file (
            fl_pk INTEGER PRIMARY KEY,
            rf_fk INTEGER REFERENCES license_ref(rf_pk),
            agent_fk INTEGER NOT NULL REFERENCES agent(agent_pk),
            pfile_fk INTEGER NOT NULL REFERENCES pfile(pfile_pk)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_license_file_pfile ON license_file(pfile_fk)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_clearing_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clearing_decision (
            clearing_decision_pk INTEGER PRIMARY KEY,
            uploadtree_fk INTEGER NOT NULL REFERENCES upload_tree(uploadtree_pk),
            pfile_fk INTEGER NOT NULL REFERENCES pfile(pfile_pk),
            group_fk INTEGER NOT NULL,
            decision_type INTEGER NOT NULL,
            scope INTEGER NOT NULL DEFAULT 0,
            date_added TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clearing_event (
            clearing_event_pk INTEGER PRIMARY KEY,
            clearing_decision_fk INTEGER NOT NULL
                REFERENCES clearing_decision(clearing_decision_pk) ON DELETE CASCADE,
            rf_fk INTEGER NOT NULL REFERENCES license_ref(rf_pk),
            removed INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_copyright_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS copyright (
            ct_pk INTEGER PRIMARY KEY,
            agent_fk INTEGER NOT NULL REFERENCES agent(agent_pk),
            pfile_fk INTEGER NOT NULL REFERENCES pfile(pfile_pk),
            content TEXT,
            hash TEXT,
            type TEXT NOT NULL DEFAULT 'statement',
            is_enabled INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS copyright_decision (
            copyright_decision_pk INTEGER PRIMARY KEY,
            user_fk INTEGER,
            pfile_fk INTEGER NOT NULL REFERENCES pfile(pfile_pk),
            clearing_decision_type_fk INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            textfinding TEXT NOT NULL,
            comment TEXT,
            is_enabled INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_software_heritage_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software_heritage (
            software_heritage_pk INTEGER PRIMARY KEY,
            pfile_fk INTEGER NOT NULL UNIQUE REFERENCES pfile(pfile_pk),
            swh_shortnames TEXT,
            swh_status INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sysconfig_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sysconfig (
            sysconfig_pk INTEGER PRIMARY KEY,
            variablename TEXT NOT NULL UNIQUE,
            conf_value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
