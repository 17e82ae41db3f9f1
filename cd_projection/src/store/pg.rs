//! Postgres gateway on diesel-async, pooled with deadpool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use super::{Gateway, Store, StoreFuture, StoreResult};
use crate::config::ProjectionConfig;
use crate::error::ProjectionError;
use crate::models::action_log::{ActionLogOwner, NewActionLog};
use crate::models::codebase::{Codebase, CodebaseBranch, NewCodebase, NewCodebaseBranch};
use crate::models::docker_stream::{
    CodebaseDockerStream, NewCodebaseDockerStream, StageStreamLink, StreamSource,
};
use crate::models::pipeline::{
    CdPipeline, NewCdPipeline, PipelineBranch, PipelinePromotion, PipelineService,
};
use crate::models::quality_gate::NewQualityGate;
use crate::models::stage::{CdStage, NewCdStage};
use crate::models::git_server::{GitServer, NewGitServer};
use crate::models::third_party_service::{NewThirdPartyService, ThirdPartyService};
use crate::models::tooling::{
    CodebasePerfDataSource, JenkinsResourceKind, PerfDataSource, ToolServer, ToolServerKind,
};
use crate::schema::{
    action_log, applications_to_promote, cd_pipeline, cd_pipeline_action_log,
    cd_pipeline_codebase_branch, cd_pipeline_third_party_service, cd_stage, cd_stage_action_log,
    codebase, codebase_action_log, codebase_branch, codebase_branch_action_log,
    codebase_docker_stream, codebase_perf_data_sources, git_server, jenkins_slave, jira_server,
    job_provisioning, perf_data_sources, perf_server, quality_gate_stage,
    stage_codebase_docker_stream, third_party_service,
};
use crate::tenant::TenantSchema;

pub type PgPool = Pool<AsyncPgConnection>;

/// Store backed by a shared Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn connect(config: &ProjectionConfig) -> Result<Self, ProjectionError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| ProjectionError::Pool(e.to_string()))?;
        tracing::info!(pool_size = config.pool_size, "Postgres pool created");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Store for PgStore {
    fn transaction<'a, T, F>(&'a self, tenant: &'a TenantSchema, work: F) -> StoreFuture<'a, T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn Gateway) -> StoreFuture<'t, T> + Send + 'a,
    {
        Box::pin(async move {
            let mut conn = self
                .pool
                .get()
                .await
                .map_err(|e| ProjectionError::Pool(e.to_string()))?;
            let search_path = tenant.search_path_statement();

            conn.transaction(|conn| {
                async move {
                    diesel::sql_query(search_path).execute(conn).await?;
                    let mut gateway = PgGateway { conn };
                    work(&mut gateway).await
                }
                .scope_boxed()
            })
            .await
        })
    }
}

/// Gateway bound to one open transaction.
pub struct PgGateway<'c> {
    conn: &'c mut AsyncPgConnection,
}

fn stream_source_columns() -> (
    codebase_docker_stream::id,
    codebase_docker_stream::codebase_id,
    codebase::name,
    codebase_docker_stream::codebase_branch_id,
) {
    (
        codebase_docker_stream::id,
        codebase_docker_stream::codebase_id,
        codebase::name,
        codebase_docker_stream::codebase_branch_id,
    )
}

#[async_trait]
impl Gateway for PgGateway<'_> {
    async fn find_codebase(&mut self, name: &str) -> StoreResult<Option<Codebase>> {
        let result = codebase::table
            .filter(codebase::name.eq(name))
            .select(Codebase::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_codebase(&mut self, new_codebase: NewCodebase) -> StoreResult<i64> {
        let id = diesel::insert_into(codebase::table)
            .values(&new_codebase)
            .returning(codebase::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn update_codebase_status(&mut self, codebase_id: i64, status: &str) -> StoreResult<()> {
        diesel::update(codebase::table.find(codebase_id))
            .set(codebase::status.eq(status))
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn find_branch(
        &mut self,
        codebase_id: i64,
        name: &str,
    ) -> StoreResult<Option<CodebaseBranch>> {
        let result = codebase_branch::table
            .filter(codebase_branch::codebase_id.eq(codebase_id))
            .filter(codebase_branch::name.eq(name))
            .select(CodebaseBranch::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_branch(&mut self, new_branch: NewCodebaseBranch) -> StoreResult<i64> {
        let id = diesel::insert_into(codebase_branch::table)
            .values(&new_branch)
            .returning(codebase_branch::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn set_branch_output_stream(
        &mut self,
        branch_id: i64,
        stream_id: i64,
    ) -> StoreResult<()> {
        diesel::update(codebase_branch::table.find(branch_id))
            .set(codebase_branch::output_codebase_docker_stream_id.eq(Some(stream_id)))
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn update_branch_status(&mut self, branch_id: i64, status: &str) -> StoreResult<()> {
        diesel::update(codebase_branch::table.find(branch_id))
            .set(codebase_branch::status.eq(status))
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn find_autotest_branch(
        &mut self,
        codebase_name: &str,
        branch: &str,
    ) -> StoreResult<Option<(i64, i64)>> {
        let result = codebase::table
            .inner_join(codebase_branch::table.on(codebase_branch::codebase_id.eq(codebase::id)))
            .filter(codebase::codebase_type.eq("autotests"))
            .filter(codebase::name.eq(codebase_name))
            .filter(codebase_branch::name.eq(branch))
            .select((codebase::id, codebase_branch::id))
            .first::<(i64, i64)>(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_docker_stream(
        &mut self,
        new_stream: NewCodebaseDockerStream,
    ) -> StoreResult<i64> {
        let id = diesel::insert_into(codebase_docker_stream::table)
            .values(&new_stream)
            .returning(codebase_docker_stream::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn find_docker_stream_by_name(
        &mut self,
        name: &str,
    ) -> StoreResult<Option<CodebaseDockerStream>> {
        let result = codebase_docker_stream::table
            .filter(codebase_docker_stream::oc_image_stream_name.eq(name))
            .select(CodebaseDockerStream::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn delete_docker_stream(&mut self, stream_id: i64) -> StoreResult<()> {
        diesel::delete(codebase_docker_stream::table.find(stream_id))
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn docker_stream_in_use(&mut self, stream_id: i64) -> StoreResult<bool> {
        let edges: i64 = stage_codebase_docker_stream::table
            .filter(
                stage_codebase_docker_stream::input_codebase_docker_stream_id
                    .eq(stream_id)
                    .or(stage_codebase_docker_stream::output_codebase_docker_stream_id
                        .eq(stream_id)),
            )
            .count()
            .get_result(self.conn)
            .await?;
        let branches: i64 = codebase_branch::table
            .filter(codebase_branch::output_codebase_docker_stream_id.eq(Some(stream_id)))
            .count()
            .get_result(self.conn)
            .await?;
        Ok(edges + branches > 0)
    }

    async fn pipeline_source_streams(
        &mut self,
        pipeline_id: i64,
    ) -> StoreResult<Vec<StreamSource>> {
        let results = codebase_docker_stream::table
            .inner_join(codebase::table.on(codebase::id.eq(codebase_docker_stream::codebase_id)))
            .inner_join(
                codebase_branch::table.on(codebase_branch::output_codebase_docker_stream_id
                    .eq(codebase_docker_stream::id.nullable())),
            )
            .inner_join(
                cd_pipeline_codebase_branch::table
                    .on(cd_pipeline_codebase_branch::codebase_branch_id.eq(codebase_branch::id)),
            )
            .filter(cd_pipeline_codebase_branch::cd_pipeline_id.eq(pipeline_id))
            .order(codebase::name.asc())
            .select(stream_source_columns())
            .load::<StreamSource>(self.conn)
            .await?;
        Ok(results)
    }

    async fn stage_output_streams(
        &mut self,
        pipeline_id: i64,
        order: i32,
    ) -> StoreResult<Vec<StreamSource>> {
        let results = codebase_docker_stream::table
            .inner_join(codebase::table.on(codebase::id.eq(codebase_docker_stream::codebase_id)))
            .inner_join(
                stage_codebase_docker_stream::table.on(
                    stage_codebase_docker_stream::output_codebase_docker_stream_id
                        .eq(codebase_docker_stream::id),
                ),
            )
            .inner_join(
                cd_stage::table.on(cd_stage::id.eq(stage_codebase_docker_stream::cd_stage_id)),
            )
            .filter(cd_stage::cd_pipeline_id.eq(pipeline_id))
            .filter(cd_stage::stage_order.eq(order))
            .order(codebase::name.asc())
            .select(stream_source_columns())
            .load::<StreamSource>(self.conn)
            .await?;
        Ok(results)
    }

    async fn insert_stage_stream_link(&mut self, link: StageStreamLink) -> StoreResult<()> {
        diesel::insert_into(stage_codebase_docker_stream::table)
            .values(&link)
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn delete_stage_stream_links(&mut self, stage_id: i64) -> StoreResult<Vec<i64>> {
        let outputs = diesel::delete(
            stage_codebase_docker_stream::table
                .filter(stage_codebase_docker_stream::cd_stage_id.eq(stage_id)),
        )
        .returning(stage_codebase_docker_stream::output_codebase_docker_stream_id)
        .get_results(self.conn)
        .await?;
        Ok(outputs)
    }

    async fn stage_stream_links(&mut self, stage_id: i64) -> StoreResult<Vec<StageStreamLink>> {
        let results = stage_codebase_docker_stream::table
            .filter(stage_codebase_docker_stream::cd_stage_id.eq(stage_id))
            .select(StageStreamLink::as_select())
            .load(self.conn)
            .await?;
        Ok(results)
    }

    async fn find_pipeline(&mut self, name: &str) -> StoreResult<Option<CdPipeline>> {
        let result = cd_pipeline::table
            .filter(cd_pipeline::name.eq(name))
            .select(CdPipeline::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_pipeline(&mut self, new_pipeline: NewCdPipeline) -> StoreResult<CdPipeline> {
        let result = diesel::insert_into(cd_pipeline::table)
            .values(&new_pipeline)
            .returning(CdPipeline::as_returning())
            .get_result(self.conn)
            .await?;
        Ok(result)
    }

    async fn update_pipeline_status(&mut self, pipeline_id: i64, status: &str) -> StoreResult<()> {
        diesel::update(cd_pipeline::table.find(pipeline_id))
            .set(cd_pipeline::status.eq(status))
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn lock_pipeline(&mut self, pipeline_id: i64) -> StoreResult<()> {
        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(pipeline_id)
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn delete_pipeline_branches(&mut self, pipeline_id: i64) -> StoreResult<usize> {
        let deleted = diesel::delete(
            cd_pipeline_codebase_branch::table
                .filter(cd_pipeline_codebase_branch::cd_pipeline_id.eq(pipeline_id)),
        )
        .execute(self.conn)
        .await?;
        Ok(deleted)
    }

    async fn insert_pipeline_branches(&mut self, rows: Vec<PipelineBranch>) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        diesel::insert_into(cd_pipeline_codebase_branch::table)
            .values(&rows)
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn delete_pipeline_services(&mut self, pipeline_id: i64) -> StoreResult<usize> {
        let deleted = diesel::delete(
            cd_pipeline_third_party_service::table
                .filter(cd_pipeline_third_party_service::cd_pipeline_id.eq(pipeline_id)),
        )
        .execute(self.conn)
        .await?;
        Ok(deleted)
    }

    async fn insert_pipeline_services(&mut self, rows: Vec<PipelineService>) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        diesel::insert_into(cd_pipeline_third_party_service::table)
            .values(&rows)
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn delete_pipeline_promotions(&mut self, pipeline_id: i64) -> StoreResult<usize> {
        let deleted = diesel::delete(
            applications_to_promote::table
                .filter(applications_to_promote::cd_pipeline_id.eq(pipeline_id)),
        )
        .execute(self.conn)
        .await?;
        Ok(deleted)
    }

    async fn insert_pipeline_promotions(
        &mut self,
        rows: Vec<PipelinePromotion>,
    ) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        diesel::insert_into(applications_to_promote::table)
            .values(&rows)
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn promoted_codebases(&mut self, pipeline_id: i64) -> StoreResult<Vec<String>> {
        let names = applications_to_promote::table
            .inner_join(codebase::table.on(codebase::id.eq(applications_to_promote::codebase_id)))
            .filter(applications_to_promote::cd_pipeline_id.eq(pipeline_id))
            .order(codebase::name.asc())
            .select(codebase::name)
            .load::<String>(self.conn)
            .await?;
        Ok(names)
    }

    async fn find_third_party_service(
        &mut self,
        name: &str,
    ) -> StoreResult<Option<ThirdPartyService>> {
        let result = third_party_service::table
            .filter(third_party_service::name.eq(name))
            .select(ThirdPartyService::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_third_party_service(
        &mut self,
        new_service: NewThirdPartyService,
    ) -> StoreResult<i64> {
        let id = diesel::insert_into(third_party_service::table)
            .values(&new_service)
            .returning(third_party_service::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn find_git_server(&mut self, name: &str) -> StoreResult<Option<GitServer>> {
        let result = git_server::table
            .filter(git_server::name.eq(name))
            .select(GitServer::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_git_server(&mut self, new_server: NewGitServer) -> StoreResult<i64> {
        let id = diesel::insert_into(git_server::table)
            .values(&new_server)
            .returning(git_server::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn update_git_server_availability(
        &mut self,
        server_id: i64,
        available: bool,
    ) -> StoreResult<()> {
        diesel::update(git_server::table.find(server_id))
            .set(git_server::available.eq(available))
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn find_tool_server(
        &mut self,
        kind: ToolServerKind,
        name: &str,
    ) -> StoreResult<Option<ToolServer>> {
        let result = match kind {
            ToolServerKind::Jira => {
                jira_server::table
                    .filter(jira_server::name.eq(name))
                    .select((jira_server::id, jira_server::name, jira_server::available))
                    .first::<ToolServer>(self.conn)
                    .await
            }
            ToolServerKind::Perf => {
                perf_server::table
                    .filter(perf_server::name.eq(name))
                    .select((perf_server::id, perf_server::name, perf_server::available))
                    .first::<ToolServer>(self.conn)
                    .await
            }
        };
        Ok(result.optional()?)
    }

    async fn insert_tool_server(
        &mut self,
        kind: ToolServerKind,
        name: &str,
        available: bool,
    ) -> StoreResult<i64> {
        let id = match kind {
            ToolServerKind::Jira => {
                diesel::insert_into(jira_server::table)
                    .values((jira_server::name.eq(name), jira_server::available.eq(available)))
                    .returning(jira_server::id)
                    .get_result(self.conn)
                    .await?
            }
            ToolServerKind::Perf => {
                diesel::insert_into(perf_server::table)
                    .values((perf_server::name.eq(name), perf_server::available.eq(available)))
                    .returning(perf_server::id)
                    .get_result(self.conn)
                    .await?
            }
        };
        Ok(id)
    }

    async fn update_tool_server_availability(
        &mut self,
        kind: ToolServerKind,
        server_id: i64,
        available: bool,
    ) -> StoreResult<()> {
        match kind {
            ToolServerKind::Jira => {
                diesel::update(jira_server::table.find(server_id))
                    .set(jira_server::available.eq(available))
                    .execute(self.conn)
                    .await?;
            }
            ToolServerKind::Perf => {
                diesel::update(perf_server::table.find(server_id))
                    .set(perf_server::available.eq(available))
                    .execute(self.conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn find_jenkins_resource(
        &mut self,
        kind: JenkinsResourceKind,
        name: &str,
    ) -> StoreResult<Option<i64>> {
        let result = match kind {
            JenkinsResourceKind::Slave => {
                jenkins_slave::table
                    .filter(jenkins_slave::name.eq(name))
                    .select(jenkins_slave::id)
                    .first::<i64>(self.conn)
                    .await
            }
            JenkinsResourceKind::JobProvisioning => {
                job_provisioning::table
                    .filter(job_provisioning::name.eq(name))
                    .select(job_provisioning::id)
                    .first::<i64>(self.conn)
                    .await
            }
        };
        Ok(result.optional()?)
    }

    async fn insert_jenkins_resource(
        &mut self,
        kind: JenkinsResourceKind,
        name: &str,
    ) -> StoreResult<i64> {
        let id = match kind {
            JenkinsResourceKind::Slave => {
                diesel::insert_into(jenkins_slave::table)
                    .values(jenkins_slave::name.eq(name))
                    .returning(jenkins_slave::id)
                    .get_result(self.conn)
                    .await?
            }
            JenkinsResourceKind::JobProvisioning => {
                diesel::insert_into(job_provisioning::table)
                    .values(job_provisioning::name.eq(name))
                    .returning(job_provisioning::id)
                    .get_result(self.conn)
                    .await?
            }
        };
        Ok(id)
    }

    async fn find_perf_data_source(
        &mut self,
        source_type: &str,
    ) -> StoreResult<Option<PerfDataSource>> {
        let result = perf_data_sources::table
            .filter(perf_data_sources::source_type.eq(source_type))
            .select(PerfDataSource::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_perf_data_source(&mut self, source_type: &str) -> StoreResult<i64> {
        let id = diesel::insert_into(perf_data_sources::table)
            .values(perf_data_sources::source_type.eq(source_type))
            .returning(perf_data_sources::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn codebase_perf_data_source_exists(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<bool> {
        let count: i64 = codebase_perf_data_sources::table
            .filter(codebase_perf_data_sources::codebase_id.eq(codebase_id))
            .filter(codebase_perf_data_sources::data_source_id.eq(data_source_id))
            .count()
            .get_result(self.conn)
            .await?;
        Ok(count > 0)
    }

    async fn insert_codebase_perf_data_source(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<()> {
        diesel::insert_into(codebase_perf_data_sources::table)
            .values(&CodebasePerfDataSource {
                codebase_id,
                data_source_id,
            })
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn delete_codebase_perf_data_source(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<bool> {
        let deleted = diesel::delete(
            codebase_perf_data_sources::table
                .filter(codebase_perf_data_sources::codebase_id.eq(codebase_id))
                .filter(codebase_perf_data_sources::data_source_id.eq(data_source_id)),
        )
        .execute(self.conn)
        .await?;
        Ok(deleted > 0)
    }

    async fn find_stage(&mut self, pipeline_id: i64, name: &str) -> StoreResult<Option<CdStage>> {
        let result = cd_stage::table
            .filter(cd_stage::cd_pipeline_id.eq(pipeline_id))
            .filter(cd_stage::name.eq(name))
            .select(CdStage::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn find_stage_by_order(
        &mut self,
        pipeline_id: i64,
        order: i32,
    ) -> StoreResult<Option<CdStage>> {
        let result = cd_stage::table
            .filter(cd_stage::cd_pipeline_id.eq(pipeline_id))
            .filter(cd_stage::stage_order.eq(order))
            .select(CdStage::as_select())
            .first(self.conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_stage(&mut self, new_stage: NewCdStage) -> StoreResult<i64> {
        let id = diesel::insert_into(cd_stage::table)
            .values(&new_stage)
            .returning(cd_stage::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn update_stage_status(&mut self, stage_id: i64, status: &str) -> StoreResult<()> {
        diesel::update(cd_stage::table.find(stage_id))
            .set(cd_stage::status.eq(status))
            .execute(self.conn)
            .await?;
        Ok(())
    }

    async fn insert_quality_gate(&mut self, new_gate: NewQualityGate) -> StoreResult<i64> {
        let id = diesel::insert_into(quality_gate_stage::table)
            .values(&new_gate)
            .returning(quality_gate_stage::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn insert_action_log(&mut self, new_log: NewActionLog) -> StoreResult<i64> {
        let id = diesel::insert_into(action_log::table)
            .values(&new_log)
            .returning(action_log::id)
            .get_result(self.conn)
            .await?;
        Ok(id)
    }

    async fn link_action_log(&mut self, owner: ActionLogOwner, log_id: i64) -> StoreResult<()> {
        match owner {
            ActionLogOwner::Pipeline(id) => {
                diesel::insert_into(cd_pipeline_action_log::table)
                    .values((
                        cd_pipeline_action_log::cd_pipeline_id.eq(id),
                        cd_pipeline_action_log::action_log_id.eq(log_id),
                    ))
                    .execute(self.conn)
                    .await?;
            }
            ActionLogOwner::Stage(id) => {
                diesel::insert_into(cd_stage_action_log::table)
                    .values((
                        cd_stage_action_log::cd_stage_id.eq(id),
                        cd_stage_action_log::action_log_id.eq(log_id),
                    ))
                    .execute(self.conn)
                    .await?;
            }
            ActionLogOwner::Codebase(id) => {
                diesel::insert_into(codebase_action_log::table)
                    .values((
                        codebase_action_log::codebase_id.eq(id),
                        codebase_action_log::action_log_id.eq(log_id),
                    ))
                    .execute(self.conn)
                    .await?;
            }
            ActionLogOwner::Branch(id) => {
                diesel::insert_into(codebase_branch_action_log::table)
                    .values((
                        codebase_branch_action_log::codebase_branch_id.eq(id),
                        codebase_branch_action_log::action_log_id.eq(log_id),
                    ))
                    .execute(self.conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn action_log_exists(
        &mut self,
        owner: ActionLogOwner,
        event: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let count: i64 = match owner {
            ActionLogOwner::Pipeline(id) => {
                cd_pipeline_action_log::table
                    .inner_join(
                        action_log::table
                            .on(action_log::id.eq(cd_pipeline_action_log::action_log_id)),
                    )
                    .filter(cd_pipeline_action_log::cd_pipeline_id.eq(id))
                    .filter(action_log::event.eq(event))
                    .filter(action_log::updated_at.eq(updated_at))
                    .count()
                    .get_result(self.conn)
                    .await?
            }
            ActionLogOwner::Stage(id) => {
                cd_stage_action_log::table
                    .inner_join(
                        action_log::table.on(action_log::id.eq(cd_stage_action_log::action_log_id)),
                    )
                    .filter(cd_stage_action_log::cd_stage_id.eq(id))
                    .filter(action_log::event.eq(event))
                    .filter(action_log::updated_at.eq(updated_at))
                    .count()
                    .get_result(self.conn)
                    .await?
            }
            ActionLogOwner::Codebase(id) => {
                codebase_action_log::table
                    .inner_join(
                        action_log::table.on(action_log::id.eq(codebase_action_log::action_log_id)),
                    )
                    .filter(codebase_action_log::codebase_id.eq(id))
                    .filter(action_log::event.eq(event))
                    .filter(action_log::updated_at.eq(updated_at))
                    .count()
                    .get_result(self.conn)
                    .await?
            }
            ActionLogOwner::Branch(id) => {
                codebase_branch_action_log::table
                    .inner_join(
                        action_log::table
                            .on(action_log::id.eq(codebase_branch_action_log::action_log_id)),
                    )
                    .filter(codebase_branch_action_log::codebase_branch_id.eq(id))
                    .filter(action_log::event.eq(event))
                    .filter(action_log::updated_at.eq(updated_at))
                    .count()
                    .get_result(self.conn)
                    .await?
            }
        };
        Ok(count > 0)
    }
}
