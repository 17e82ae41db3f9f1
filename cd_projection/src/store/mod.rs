//! Relational store gateway.
//!
//! `Gateway` is the set of typed CRUD primitives the services are written
//! against; it is always bound to one open transaction in one tenant schema.
//! `Store` hands out gateways: it borrows a connection, opens the
//! transaction, selects the schema, runs the work and then commits on `Ok` or
//! rolls back on `Err`. Lookups return `Option` and never surface "no rows"
//! as an error, so get-or-create needs no error-kind branching.

pub mod memory;
pub mod pg;

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

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
use crate::models::tooling::{JenkinsResourceKind, PerfDataSource, ToolServer, ToolServerKind};
use crate::tenant::TenantSchema;

pub use memory::{MemoryStore, MemoryTables};
pub use pg::PgStore;

pub type StoreResult<T> = Result<T, ProjectionError>;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

#[async_trait]
pub trait Gateway: Send {
    // ── Codebases and branches ──

    async fn find_codebase(&mut self, name: &str) -> StoreResult<Option<Codebase>>;

    async fn insert_codebase(&mut self, new_codebase: NewCodebase) -> StoreResult<i64>;

    async fn update_codebase_status(&mut self, codebase_id: i64, status: &str) -> StoreResult<()>;

    async fn find_branch(
        &mut self,
        codebase_id: i64,
        name: &str,
    ) -> StoreResult<Option<CodebaseBranch>>;

    async fn insert_branch(&mut self, new_branch: NewCodebaseBranch) -> StoreResult<i64>;

    async fn set_branch_output_stream(&mut self, branch_id: i64, stream_id: i64)
        -> StoreResult<()>;

    async fn update_branch_status(&mut self, branch_id: i64, status: &str) -> StoreResult<()>;

    /// `(codebase_id, branch_id)` of a branch owned by an autotests codebase.
    async fn find_autotest_branch(
        &mut self,
        codebase: &str,
        branch: &str,
    ) -> StoreResult<Option<(i64, i64)>>;

    // ── Docker streams ──

    async fn insert_docker_stream(&mut self, new_stream: NewCodebaseDockerStream)
        -> StoreResult<i64>;

    async fn find_docker_stream_by_name(
        &mut self,
        name: &str,
    ) -> StoreResult<Option<CodebaseDockerStream>>;

    async fn delete_docker_stream(&mut self, stream_id: i64) -> StoreResult<()>;

    /// Whether any stage edge or branch still references the stream.
    async fn docker_stream_in_use(&mut self, stream_id: i64) -> StoreResult<bool>;

    /// Streams produced by the branches the pipeline declares as inputs.
    async fn pipeline_source_streams(&mut self, pipeline_id: i64)
        -> StoreResult<Vec<StreamSource>>;

    /// Output streams of the pipeline's stage at `order`.
    async fn stage_output_streams(
        &mut self,
        pipeline_id: i64,
        order: i32,
    ) -> StoreResult<Vec<StreamSource>>;

    async fn insert_stage_stream_link(&mut self, link: StageStreamLink) -> StoreResult<()>;

    /// Delete every edge of the stage, returning their output stream ids.
    async fn delete_stage_stream_links(&mut self, stage_id: i64) -> StoreResult<Vec<i64>>;

    async fn stage_stream_links(&mut self, stage_id: i64) -> StoreResult<Vec<StageStreamLink>>;

    // ── Pipelines ──

    async fn find_pipeline(&mut self, name: &str) -> StoreResult<Option<CdPipeline>>;

    async fn insert_pipeline(&mut self, new_pipeline: NewCdPipeline) -> StoreResult<CdPipeline>;

    async fn update_pipeline_status(&mut self, pipeline_id: i64, status: &str) -> StoreResult<()>;

    /// Serialize stage creation for one pipeline until the transaction ends.
    async fn lock_pipeline(&mut self, pipeline_id: i64) -> StoreResult<()>;

    async fn delete_pipeline_branches(&mut self, pipeline_id: i64) -> StoreResult<usize>;

    async fn insert_pipeline_branches(&mut self, rows: Vec<PipelineBranch>) -> StoreResult<()>;

    async fn delete_pipeline_services(&mut self, pipeline_id: i64) -> StoreResult<usize>;

    async fn insert_pipeline_services(&mut self, rows: Vec<PipelineService>) -> StoreResult<()>;

    async fn delete_pipeline_promotions(&mut self, pipeline_id: i64) -> StoreResult<usize>;

    async fn insert_pipeline_promotions(&mut self, rows: Vec<PipelinePromotion>)
        -> StoreResult<()>;

    /// Names of the codebases promoted stage to stage in this pipeline.
    async fn promoted_codebases(&mut self, pipeline_id: i64) -> StoreResult<Vec<String>>;

    // ── Third-party services ──

    async fn find_third_party_service(
        &mut self,
        name: &str,
    ) -> StoreResult<Option<ThirdPartyService>>;

    async fn insert_third_party_service(
        &mut self,
        new_service: NewThirdPartyService,
    ) -> StoreResult<i64>;

    // ── Delivery tooling ──

    async fn find_git_server(&mut self, name: &str) -> StoreResult<Option<GitServer>>;

    async fn insert_git_server(&mut self, new_server: NewGitServer) -> StoreResult<i64>;

    async fn update_git_server_availability(
        &mut self,
        server_id: i64,
        available: bool,
    ) -> StoreResult<()>;

    async fn find_tool_server(
        &mut self,
        kind: ToolServerKind,
        name: &str,
    ) -> StoreResult<Option<ToolServer>>;

    async fn insert_tool_server(
        &mut self,
        kind: ToolServerKind,
        name: &str,
        available: bool,
    ) -> StoreResult<i64>;

    async fn update_tool_server_availability(
        &mut self,
        kind: ToolServerKind,
        server_id: i64,
        available: bool,
    ) -> StoreResult<()>;

    /// Id of the named Jenkins slave or job provisioner.
    async fn find_jenkins_resource(
        &mut self,
        kind: JenkinsResourceKind,
        name: &str,
    ) -> StoreResult<Option<i64>>;

    async fn insert_jenkins_resource(
        &mut self,
        kind: JenkinsResourceKind,
        name: &str,
    ) -> StoreResult<i64>;

    async fn find_perf_data_source(
        &mut self,
        source_type: &str,
    ) -> StoreResult<Option<PerfDataSource>>;

    async fn insert_perf_data_source(&mut self, source_type: &str) -> StoreResult<i64>;

    async fn codebase_perf_data_source_exists(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<bool>;

    async fn insert_codebase_perf_data_source(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<()>;

    /// Returns whether a row was removed.
    async fn delete_codebase_perf_data_source(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<bool>;

    // ── Stages and quality gates ──

    async fn find_stage(&mut self, pipeline_id: i64, name: &str) -> StoreResult<Option<CdStage>>;

    async fn find_stage_by_order(
        &mut self,
        pipeline_id: i64,
        order: i32,
    ) -> StoreResult<Option<CdStage>>;

    async fn insert_stage(&mut self, new_stage: NewCdStage) -> StoreResult<i64>;

    async fn update_stage_status(&mut self, stage_id: i64, status: &str) -> StoreResult<()>;

    async fn insert_quality_gate(&mut self, new_gate: NewQualityGate) -> StoreResult<i64>;

    // ── Action log ──

    async fn insert_action_log(&mut self, new_log: NewActionLog) -> StoreResult<i64>;

    async fn link_action_log(&mut self, owner: ActionLogOwner, log_id: i64) -> StoreResult<()>;

    async fn action_log_exists(
        &mut self,
        owner: ActionLogOwner,
        event: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

/// Source of transaction-scoped gateways.
pub trait Store: Send + Sync {
    /// Run `work` inside one transaction in `tenant`'s schema. The transaction
    /// commits only if `work` returns `Ok`.
    fn transaction<'a, T, F>(&'a self, tenant: &'a TenantSchema, work: F) -> StoreFuture<'a, T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn Gateway) -> StoreFuture<'t, T> + Send + 'a;
}
