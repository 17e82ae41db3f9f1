//! Table layout of one tenant schema.

use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};

use crate::error::ProjectionError;
use crate::tenant::TenantSchema;

/// SQL migration for the CD reporting tables.
///
/// Runs inside the current `search_path`; the schema itself is provisioned
/// elsewhere.
pub const MIGRATION_SQL: &str = r#"
-- ================================================================
-- Delivery tooling
-- ================================================================

CREATE TABLE IF NOT EXISTS git_server (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    hostname        VARCHAR(255) NOT NULL DEFAULT '',
    available       BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS jira_server (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    available       BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS perf_server (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    available       BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS jenkins_slave (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS job_provisioning (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS perf_data_sources (
    id              BIGSERIAL PRIMARY KEY,
    type            VARCHAR(64) NOT NULL UNIQUE
);

-- ================================================================
-- Codebases, branches and docker image streams
-- ================================================================

CREATE TABLE IF NOT EXISTS codebase (
    id                  BIGSERIAL PRIMARY KEY,
    name                VARCHAR(255) NOT NULL UNIQUE,
    type                VARCHAR(32) NOT NULL,
    status              VARCHAR(64) NOT NULL DEFAULT '',
    git_server_id       BIGINT REFERENCES git_server(id),
    jenkins_slave_id    BIGINT REFERENCES jenkins_slave(id),
    job_provisioning_id BIGINT REFERENCES job_provisioning(id)
);

CREATE TABLE IF NOT EXISTS codebase_perf_data_sources (
    codebase_id     BIGINT NOT NULL REFERENCES codebase(id) ON DELETE CASCADE,
    data_source_id  BIGINT NOT NULL REFERENCES perf_data_sources(id) ON DELETE CASCADE,
    PRIMARY KEY (codebase_id, data_source_id)
);

CREATE TABLE IF NOT EXISTS codebase_docker_stream (
    id                   BIGSERIAL PRIMARY KEY,
    codebase_id          BIGINT NOT NULL REFERENCES codebase(id) ON DELETE CASCADE,
    codebase_branch_id   BIGINT,
    oc_image_stream_name VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS codebase_branch (
    id                               BIGSERIAL PRIMARY KEY,
    name                             VARCHAR(255) NOT NULL,
    codebase_id                      BIGINT NOT NULL REFERENCES codebase(id) ON DELETE CASCADE,
    from_commit                      VARCHAR(255) NOT NULL DEFAULT '',
    status                           VARCHAR(64) NOT NULL DEFAULT '',
    output_codebase_docker_stream_id BIGINT REFERENCES codebase_docker_stream(id),
    UNIQUE (codebase_id, name)
);

CREATE INDEX IF NOT EXISTS idx_codebase_docker_stream_branch
    ON codebase_docker_stream (codebase_branch_id);

-- ================================================================
-- Pipelines and their declared inputs
-- ================================================================

CREATE TABLE IF NOT EXISTS cd_pipeline (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    status          VARCHAR(64) NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS cd_pipeline_codebase_branch (
    cd_pipeline_id     BIGINT NOT NULL REFERENCES cd_pipeline(id) ON DELETE CASCADE,
    codebase_branch_id BIGINT NOT NULL REFERENCES codebase_branch(id) ON DELETE CASCADE,
    PRIMARY KEY (cd_pipeline_id, codebase_branch_id)
);

CREATE TABLE IF NOT EXISTS third_party_service (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    description     VARCHAR(1024) NOT NULL DEFAULT '',
    version         VARCHAR(64) NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS cd_pipeline_third_party_service (
    cd_pipeline_id         BIGINT NOT NULL REFERENCES cd_pipeline(id) ON DELETE CASCADE,
    third_party_service_id BIGINT NOT NULL REFERENCES third_party_service(id) ON DELETE CASCADE,
    PRIMARY KEY (cd_pipeline_id, third_party_service_id)
);

CREATE TABLE IF NOT EXISTS applications_to_promote (
    cd_pipeline_id  BIGINT NOT NULL REFERENCES cd_pipeline(id) ON DELETE CASCADE,
    codebase_id     BIGINT NOT NULL REFERENCES codebase(id) ON DELETE CASCADE,
    PRIMARY KEY (cd_pipeline_id, codebase_id)
);

-- ================================================================
-- Stages, stream edges and quality gates
-- ================================================================

CREATE TABLE IF NOT EXISTS cd_stage (
    id                 BIGSERIAL PRIMARY KEY,
    name               VARCHAR(255) NOT NULL,
    cd_pipeline_id     BIGINT NOT NULL REFERENCES cd_pipeline(id) ON DELETE CASCADE,
    description        VARCHAR(1024) NOT NULL DEFAULT '',
    trigger_type       VARCHAR(32) NOT NULL DEFAULT 'manual',
    "order"            INTEGER NOT NULL CHECK ("order" >= 0),
    status             VARCHAR(64) NOT NULL DEFAULT '',
    codebase_branch_id BIGINT REFERENCES codebase_branch(id),
    UNIQUE (cd_pipeline_id, name),
    UNIQUE (cd_pipeline_id, "order")
);

CREATE TABLE IF NOT EXISTS stage_codebase_docker_stream (
    cd_stage_id                      BIGINT NOT NULL REFERENCES cd_stage(id) ON DELETE CASCADE,
    input_codebase_docker_stream_id  BIGINT NOT NULL REFERENCES codebase_docker_stream(id),
    output_codebase_docker_stream_id BIGINT NOT NULL REFERENCES codebase_docker_stream(id),
    PRIMARY KEY (cd_stage_id, output_codebase_docker_stream_id)
);

CREATE INDEX IF NOT EXISTS idx_stage_stream_input
    ON stage_codebase_docker_stream (input_codebase_docker_stream_id);

CREATE TABLE IF NOT EXISTS quality_gate_stage (
    id                 BIGSERIAL PRIMARY KEY,
    quality_gate       VARCHAR(32) NOT NULL,
    step_name          VARCHAR(255) NOT NULL,
    cd_stage_id        BIGINT NOT NULL REFERENCES cd_stage(id) ON DELETE CASCADE,
    codebase_id        BIGINT REFERENCES codebase(id),
    codebase_branch_id BIGINT REFERENCES codebase_branch(id),
    CHECK (
        (quality_gate = 'autotests' AND codebase_id IS NOT NULL AND codebase_branch_id IS NOT NULL)
        OR (quality_gate <> 'autotests' AND codebase_id IS NULL AND codebase_branch_id IS NULL)
    )
);

-- ================================================================
-- Action log
-- ================================================================

CREATE TABLE IF NOT EXISTS action_log (
    id               BIGSERIAL PRIMARY KEY,
    event            VARCHAR(64) NOT NULL,
    detailed_message TEXT NOT NULL DEFAULT '',
    username         VARCHAR(255) NOT NULL DEFAULT '',
    updated_at       TIMESTAMPTZ NOT NULL,
    action           VARCHAR(128) NOT NULL DEFAULT '',
    result           VARCHAR(32) NOT NULL DEFAULT '',
    action_message   TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS cd_pipeline_action_log (
    cd_pipeline_id  BIGINT NOT NULL REFERENCES cd_pipeline(id) ON DELETE CASCADE,
    action_log_id   BIGINT NOT NULL REFERENCES action_log(id) ON DELETE CASCADE,
    PRIMARY KEY (cd_pipeline_id, action_log_id)
);

CREATE TABLE IF NOT EXISTS cd_stage_action_log (
    cd_stage_id     BIGINT NOT NULL REFERENCES cd_stage(id) ON DELETE CASCADE,
    action_log_id   BIGINT NOT NULL REFERENCES action_log(id) ON DELETE CASCADE,
    PRIMARY KEY (cd_stage_id, action_log_id)
);

CREATE TABLE IF NOT EXISTS codebase_action_log (
    codebase_id     BIGINT NOT NULL REFERENCES codebase(id) ON DELETE CASCADE,
    action_log_id   BIGINT NOT NULL REFERENCES action_log(id) ON DELETE CASCADE,
    PRIMARY KEY (codebase_id, action_log_id)
);

CREATE TABLE IF NOT EXISTS codebase_branch_action_log (
    codebase_branch_id BIGINT NOT NULL REFERENCES codebase_branch(id) ON DELETE CASCADE,
    action_log_id      BIGINT NOT NULL REFERENCES action_log(id) ON DELETE CASCADE,
    PRIMARY KEY (codebase_branch_id, action_log_id)
);

CREATE INDEX IF NOT EXISTS idx_action_log_event ON action_log (event, updated_at);
"#;

/// Apply the table layout inside `tenant`'s existing schema.
pub async fn run_migration(
    conn: &mut AsyncPgConnection,
    tenant: &TenantSchema,
) -> Result<(), ProjectionError> {
    let search_path = tenant.search_path_statement();
    conn.transaction(|conn| {
        async move {
            diesel::sql_query(search_path).execute(conn).await?;
            conn.batch_execute(MIGRATION_SQL).await?;
            Ok::<_, ProjectionError>(())
        }
        .scope_boxed()
    })
    .await?;
    tracing::info!(tenant = %tenant, "CD projection migration applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::MIGRATION_SQL;

    #[test]
    fn stage_order_is_unique_per_pipeline() {
        assert!(MIGRATION_SQL.contains(r#"UNIQUE (cd_pipeline_id, "order")"#));
    }

    #[test]
    fn tooling_tables_precede_codebase() {
        let codebase = MIGRATION_SQL
            .find("CREATE TABLE IF NOT EXISTS codebase (")
            .unwrap();
        for table in ["git_server", "jenkins_slave", "job_provisioning"] {
            let at = MIGRATION_SQL
                .find(&format!("CREATE TABLE IF NOT EXISTS {table} ("))
                .unwrap();
            assert!(at < codebase, "{table} must be created before codebase");
        }
    }

    #[test]
    fn migration_never_creates_schemas() {
        assert!(!MIGRATION_SQL.to_uppercase().contains("CREATE SCHEMA"));
        assert!(!MIGRATION_SQL.contains("search_path"));
    }
}
