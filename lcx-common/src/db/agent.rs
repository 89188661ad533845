//! Agent run lookups

use crate::Result;
use sqlx::SqlitePool;

use super::models::AgentId;

/// Agent id of the latest successful run of `agent_name` on an upload
///
/// "Latest" is the run with the highest id; failed runs are ignored.
pub async fn latest_successful_agent(
    pool: &SqlitePool,
    agent_name: &str,
    upload_id: i64,
) -> Result<Option<AgentId>> {
    let agent_id = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT R.agent_fk
        FROM agent_run R
        INNER JOIN agent A ON A.agent_pk = R.agent_fk
        WHERE A.agent_name = ? AND R.upload_fk = ? AND R.ars_success = 1
        ORDER BY R.ars_pk DESC
        LIMIT 1
        "#,
    )
    .bind(agent_name)
    .bind(upload_id)
    .fetch_optional(pool)
    .await?;

    Ok(agent_id)
}
