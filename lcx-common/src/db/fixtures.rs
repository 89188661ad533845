//! Seeded in-memory databases for tests
//!
//! Sample upload layout (nested set bounds in brackets):
//!
//! ```text
//! 1 sample.tar            container      [1, 16]
//! 2   artifact.dir        artifact       [2, 15]
//! 3     src               directory      [3, 10]
//! 4       a.c             nomos+monk: MIT                    [4, 5]
//! 5       b.c             no finding, concluded GPL-2.0      [6, 7]
//! 6       c.c             nothing                            [8, 9]
//! 7     README            nomos: No_license_found            [11, 12]
//! 8     empty.h           nomos ran, recorded no license     [13, 14]
//! ```

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use super::init::create_schema;

pub const SAMPLE_UPLOAD: i64 = 1;
/// Group with read permission on the sample upload
pub const SAMPLE_GROUP: i64 = 2;

pub const ITEM_ROOT: i64 = 1;
pub const ITEM_SRC: i64 = 3;
pub const ITEM_A: i64 = 4;
pub const ITEM_B: i64 = 5;
pub const ITEM_C: i64 = 6;
pub const ITEM_README: i64 = 7;
pub const ITEM_EMPTY: i64 = 8;

pub const AGENT_NOMOS: i64 = 10;
pub const AGENT_MONK: i64 = 11;
pub const AGENT_OJO: i64 = 12;
pub const AGENT_COPYRIGHT: i64 = 20;

/// Fresh single-connection in-memory database with the schema applied
///
/// A single connection is required: every SQLite in-memory connection is
/// its own database.
pub async fn empty_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    create_schema(&pool).await.expect("schema");
    pool
}

/// In-memory database holding the sample upload
pub async fn sample_pool() -> SqlitePool {
    let pool = empty_pool().await;
    seed_sample_upload(&pool).await;
    pool
}

/// Insert the sample upload into an existing database
pub async fn seed_sample_upload(pool: &SqlitePool) {
    sqlx::raw_sql(
        r#"
        INSERT INTO upload (upload_pk, upload_filename, public_perm) VALUES (1, 'sample.tar', 0);
        INSERT INTO perm_upload (upload_fk, group_fk, perm) VALUES (1, 2, 1);

        INSERT INTO pfile (pfile_pk, pfile_sha1) VALUES
            (1, 'a1'), (2, 'b2'), (3, 'c3'), (4, 'd4'), (5, 'e5'), (100, 'f100');

        INSERT INTO upload_tree (uploadtree_pk, upload_fk, parent, pfile_fk, ufile_mode, lft, rgt, ufile_name) VALUES
            (1, 1, NULL, 100, 536870912, 1, 16, 'sample.tar'),
            (2, 1, 1, NULL, 268697600, 2, 15, 'artifact.dir'),
            (3, 1, 2, NULL, 262144, 3, 10, 'src'),
            (4, 1, 3, 1, 0, 4, 5, 'a.c'),
            (5, 1, 3, 2, 0, 6, 7, 'b.c'),
            (6, 1, 3, 3, 0, 8, 9, 'c.c'),
            (7, 1, 2, 4, 0, 11, 12, 'README'),
            (8, 1, 2, 5, 0, 13, 14, 'empty.h');

        INSERT INTO agent (agent_pk, agent_name) VALUES
            (10, 'nomos'), (11, 'monk'), (12, 'ojo'), (20, 'copyright');

        INSERT INTO agent_run (ars_pk, agent_fk, upload_fk, ars_success) VALUES
            (1, 10, 1, 1),
            (2, 11, 1, 1),
            (3, 12, 1, 0),
            (4, 20, 1, 1);

        INSERT INTO license_ref (rf_pk, rf_shortname, rf_fullname) VALUES
            (1, 'MIT', 'MIT License'),
            (2, 'GPL-2.0', 'GNU General Public License v2.0 only'),
            (3, 'No_license_found', NULL),
            (4, 'Apache-2.0', 'Apache License 2.0'),
            (5, 'Void', NULL);

        INSERT INTO license_file (rf_fk, agent_fk, pfile_fk) VALUES
            (1, 10, 1),
            (1, 11, 1),
            (3, 10, 4),
            (NULL, 10, 5);

        INSERT INTO clearing_decision
            (clearing_decision_pk, uploadtree_fk, pfile_fk, group_fk, decision_type, scope, date_added)
        VALUES (1, 5, 2, 2, 5, 0, '2024-01-01 10:00:00');
        INSERT INTO clearing_event (clearing_decision_fk, rf_fk, removed) VALUES (1, 2, 0);

        INSERT INTO copyright (agent_fk, pfile_fk, content, is_enabled) VALUES
            (20, 1, 'Copyright (c) 2020 Alice', 1),
            (20, 2, 'Copyright Carol & Co', 1),
            (20, 4, 'Copyright (C) Bob <bob@example.com>', 1),
            (20, 3, 'disabled statement', 0);

        INSERT INTO copyright_decision (pfile_fk, textfinding) VALUES (3, 'Copyright Dave');
        "#,
    )
    .execute(pool)
    .await
    .expect("seed sample upload");
}
