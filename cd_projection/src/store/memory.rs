//! In-memory gateway with the same transactional contract as Postgres.
//!
//! Each tenant owns a set of tables. A transaction works on a staged copy of
//! the tenant's tables and publishes it only when the work succeeds, so a
//! failed sync leaves no trace. Transactions are serialized by one mutex.
//! Unique keys of the relational layout are enforced on insert.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tokio::sync::Mutex;

use super::{Gateway, Store, StoreFuture, StoreResult};
use crate::error::ProjectionError;
use crate::models::action_log::{ActionLogOwner, ActionLogRow, NewActionLog};
use crate::models::codebase::{Codebase, CodebaseBranch, NewCodebase, NewCodebaseBranch};
use crate::models::docker_stream::{
    CodebaseDockerStream, NewCodebaseDockerStream, StageStreamLink, StreamSource,
};
use crate::models::pipeline::{
    CdPipeline, NewCdPipeline, PipelineBranch, PipelinePromotion, PipelineService,
};
use crate::models::quality_gate::{NewQualityGate, QualityGateRow};
use crate::models::stage::{CdStage, NewCdStage};
use crate::models::git_server::{GitServer, NewGitServer};
use crate::models::third_party_service::{NewThirdPartyService, ThirdPartyService};
use crate::models::tooling::{
    CodebasePerfDataSource, JenkinsResourceKind, PerfDataSource, ToolServer, ToolServerKind,
};
use crate::tenant::TenantSchema;

/// Committed rows of one tenant schema.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    next_id: i64,
    pub codebases: Vec<Codebase>,
    pub branches: Vec<CodebaseBranch>,
    pub docker_streams: Vec<CodebaseDockerStream>,
    pub pipelines: Vec<CdPipeline>,
    pub pipeline_branches: Vec<PipelineBranch>,
    pub pipeline_services: Vec<PipelineService>,
    pub pipeline_promotions: Vec<PipelinePromotion>,
    pub third_party_services: Vec<ThirdPartyService>,
    pub git_servers: Vec<GitServer>,
    pub tool_servers: Vec<(ToolServerKind, ToolServer)>,
    pub jenkins_resources: Vec<(JenkinsResourceKind, i64, String)>,
    pub perf_data_sources: Vec<PerfDataSource>,
    pub codebase_perf_data_sources: Vec<CodebasePerfDataSource>,
    pub stages: Vec<CdStage>,
    pub stage_links: Vec<StageStreamLink>,
    pub quality_gates: Vec<QualityGateRow>,
    pub action_logs: Vec<ActionLogRow>,
    pub action_log_links: Vec<(ActionLogOwner, i64)>,
}

impl MemoryTables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn pipeline(&self, name: &str) -> Option<&CdPipeline> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    pub fn stage(&self, pipeline: &str, name: &str) -> Option<&CdStage> {
        let pipeline_id = self.pipeline(pipeline)?.id;
        self.stages
            .iter()
            .find(|s| s.cd_pipeline_id == pipeline_id && s.name == name)
    }

    pub fn codebase(&self, name: &str) -> Option<&Codebase> {
        self.codebases.iter().find(|c| c.name == name)
    }

    pub fn git_server(&self, name: &str) -> Option<&GitServer> {
        self.git_servers.iter().find(|g| g.name == name)
    }

    pub fn tool_server(&self, kind: ToolServerKind, name: &str) -> Option<&ToolServer> {
        self.tool_servers
            .iter()
            .find(|(k, server)| *k == kind && server.name == name)
            .map(|(_, server)| server)
    }

    pub fn jenkins_resource(&self, kind: JenkinsResourceKind, name: &str) -> Option<i64> {
        self.jenkins_resources
            .iter()
            .find(|(k, _, n)| *k == kind && n == name)
            .map(|(_, id, _)| *id)
    }

    /// Perf data source types attached to the codebase, sorted.
    pub fn perf_data_sources_of(&self, codebase_id: i64) -> Vec<String> {
        let mut types: Vec<String> = self
            .codebase_perf_data_sources
            .iter()
            .filter(|r| r.codebase_id == codebase_id)
            .filter_map(|r| {
                self.perf_data_sources
                    .iter()
                    .find(|d| d.id == r.data_source_id)
                    .map(|d| d.source_type.clone())
            })
            .collect();
        types.sort();
        types
    }

    pub fn stream(&self, stream_id: i64) -> Option<&CodebaseDockerStream> {
        self.docker_streams.iter().find(|s| s.id == stream_id)
    }

    pub fn stream_by_name(&self, name: &str) -> Option<&CodebaseDockerStream> {
        self.docker_streams
            .iter()
            .find(|s| s.oc_image_stream_name == name)
    }

    pub fn links_of(&self, stage_id: i64) -> Vec<&StageStreamLink> {
        self.stage_links
            .iter()
            .filter(|l| l.cd_stage_id == stage_id)
            .collect()
    }

    pub fn gates_of(&self, stage_id: i64) -> Vec<&QualityGateRow> {
        self.quality_gates
            .iter()
            .filter(|g| g.cd_stage_id == stage_id)
            .collect()
    }

    pub fn logs_of(&self, owner: ActionLogOwner) -> Vec<&ActionLogRow> {
        self.action_log_links
            .iter()
            .filter(|(o, _)| *o == owner)
            .filter_map(|(_, log_id)| self.action_logs.iter().find(|l| l.id == *log_id))
            .collect()
    }

    fn codebase_name(&self, codebase_id: i64) -> String {
        self.codebases
            .iter()
            .find(|c| c.id == codebase_id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn source_of(&self, stream: &CodebaseDockerStream) -> StreamSource {
        StreamSource {
            stream_id: stream.id,
            codebase_id: stream.codebase_id,
            codebase_name: self.codebase_name(stream.codebase_id),
            codebase_branch_id: stream.codebase_branch_id,
        }
    }
}

fn unique_violation(constraint: &str) -> ProjectionError {
    ProjectionError::Database(DieselError::DatabaseError(
        DatabaseErrorKind::UniqueViolation,
        Box::new(format!("duplicate key value violates unique constraint \"{constraint}\"")),
    ))
}

fn sorted_by_codebase(mut sources: Vec<StreamSource>) -> Vec<StreamSource> {
    sources.sort_by(|a, b| a.codebase_name.cmp(&b.codebase_name));
    sources
}

/// Store keeping every tenant's tables in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tenants: Arc<Mutex<HashMap<TenantSchema, MemoryTables>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed tables of `tenant`.
    pub async fn snapshot(&self, tenant: &TenantSchema) -> MemoryTables {
        self.tenants
            .lock()
            .await
            .get(tenant)
            .cloned()
            .unwrap_or_default()
    }
}

impl Store for MemoryStore {
    fn transaction<'a, T, F>(&'a self, tenant: &'a TenantSchema, work: F) -> StoreFuture<'a, T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn Gateway) -> StoreFuture<'t, T> + Send + 'a,
    {
        Box::pin(async move {
            let mut tenants = self.tenants.lock().await;
            let mut gateway = MemoryGateway {
                tables: tenants.get(tenant).cloned().unwrap_or_default(),
            };
            let result = work(&mut gateway).await;
            if result.is_ok() {
                tenants.insert(tenant.clone(), gateway.tables);
            }
            result
        })
    }
}

/// Gateway over a staged copy of one tenant's tables.
pub struct MemoryGateway {
    tables: MemoryTables,
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn find_codebase(&mut self, name: &str) -> StoreResult<Option<Codebase>> {
        Ok(self.tables.codebases.iter().find(|c| c.name == name).cloned())
    }

    async fn insert_codebase(&mut self, new_codebase: NewCodebase) -> StoreResult<i64> {
        if self.tables.codebases.iter().any(|c| c.name == new_codebase.name) {
            return Err(unique_violation("codebase_name_key"));
        }
        let id = self.tables.next_id();
        self.tables.codebases.push(Codebase {
            id,
            name: new_codebase.name,
            codebase_type: new_codebase.codebase_type,
            status: new_codebase.status,
            git_server_id: new_codebase.git_server_id,
            jenkins_slave_id: new_codebase.jenkins_slave_id,
            job_provisioning_id: new_codebase.job_provisioning_id,
        });
        Ok(id)
    }

    async fn update_codebase_status(&mut self, codebase_id: i64, status: &str) -> StoreResult<()> {
        if let Some(row) = self.tables.codebases.iter_mut().find(|c| c.id == codebase_id) {
            row.status = status.to_string();
        }
        Ok(())
    }

    async fn find_branch(
        &mut self,
        codebase_id: i64,
        name: &str,
    ) -> StoreResult<Option<CodebaseBranch>> {
        Ok(self
            .tables
            .branches
            .iter()
            .find(|b| b.codebase_id == codebase_id && b.name == name)
            .cloned())
    }

    async fn insert_branch(&mut self, new_branch: NewCodebaseBranch) -> StoreResult<i64> {
        let duplicate = self
            .tables
            .branches
            .iter()
            .any(|b| b.codebase_id == new_branch.codebase_id && b.name == new_branch.name);
        if duplicate {
            return Err(unique_violation("codebase_branch_codebase_id_name_key"));
        }
        let id = self.tables.next_id();
        self.tables.branches.push(CodebaseBranch {
            id,
            name: new_branch.name,
            codebase_id: new_branch.codebase_id,
            from_commit: new_branch.from_commit,
            status: new_branch.status,
            output_codebase_docker_stream_id: None,
        });
        Ok(id)
    }

    async fn set_branch_output_stream(
        &mut self,
        branch_id: i64,
        stream_id: i64,
    ) -> StoreResult<()> {
        if let Some(row) = self.tables.branches.iter_mut().find(|b| b.id == branch_id) {
            row.output_codebase_docker_stream_id = Some(stream_id);
        }
        Ok(())
    }

    async fn update_branch_status(&mut self, branch_id: i64, status: &str) -> StoreResult<()> {
        if let Some(row) = self.tables.branches.iter_mut().find(|b| b.id == branch_id) {
            row.status = status.to_string();
        }
        Ok(())
    }

    async fn find_autotest_branch(
        &mut self,
        codebase_name: &str,
        branch: &str,
    ) -> StoreResult<Option<(i64, i64)>> {
        let tables = &self.tables;
        Ok(tables
            .codebases
            .iter()
            .filter(|c| c.name == codebase_name && c.codebase_type == "autotests")
            .find_map(|c| {
                tables
                    .branches
                    .iter()
                    .find(|b| b.codebase_id == c.id && b.name == branch)
                    .map(|b| (c.id, b.id))
            }))
    }

    async fn insert_docker_stream(
        &mut self,
        new_stream: NewCodebaseDockerStream,
    ) -> StoreResult<i64> {
        if self
            .tables
            .stream_by_name(&new_stream.oc_image_stream_name)
            .is_some()
        {
            return Err(unique_violation("codebase_docker_stream_oc_image_stream_name_key"));
        }
        let id = self.tables.next_id();
        self.tables.docker_streams.push(CodebaseDockerStream {
            id,
            codebase_id: new_stream.codebase_id,
            codebase_branch_id: new_stream.codebase_branch_id,
            oc_image_stream_name: new_stream.oc_image_stream_name,
        });
        Ok(id)
    }

    async fn find_docker_stream_by_name(
        &mut self,
        name: &str,
    ) -> StoreResult<Option<CodebaseDockerStream>> {
        Ok(self.tables.stream_by_name(name).cloned())
    }

    async fn delete_docker_stream(&mut self, stream_id: i64) -> StoreResult<()> {
        self.tables.docker_streams.retain(|s| s.id != stream_id);
        Ok(())
    }

    async fn docker_stream_in_use(&mut self, stream_id: i64) -> StoreResult<bool> {
        let edges = self.tables.stage_links.iter().any(|l| {
            l.input_codebase_docker_stream_id == stream_id
                || l.output_codebase_docker_stream_id == stream_id
        });
        let branches = self
            .tables
            .branches
            .iter()
            .any(|b| b.output_codebase_docker_stream_id == Some(stream_id));
        Ok(edges || branches)
    }

    async fn pipeline_source_streams(
        &mut self,
        pipeline_id: i64,
    ) -> StoreResult<Vec<StreamSource>> {
        let tables = &self.tables;
        let sources = tables
            .pipeline_branches
            .iter()
            .filter(|pb| pb.cd_pipeline_id == pipeline_id)
            .filter_map(|pb| tables.branches.iter().find(|b| b.id == pb.codebase_branch_id))
            .filter_map(|b| b.output_codebase_docker_stream_id)
            .filter_map(|stream_id| tables.stream(stream_id))
            .map(|stream| tables.source_of(stream))
            .collect();
        Ok(sorted_by_codebase(sources))
    }

    async fn stage_output_streams(
        &mut self,
        pipeline_id: i64,
        order: i32,
    ) -> StoreResult<Vec<StreamSource>> {
        let tables = &self.tables;
        let sources = tables
            .stages
            .iter()
            .filter(|s| s.cd_pipeline_id == pipeline_id && s.stage_order == order)
            .flat_map(|s| tables.links_of(s.id))
            .filter_map(|l| tables.stream(l.output_codebase_docker_stream_id))
            .map(|stream| tables.source_of(stream))
            .collect();
        Ok(sorted_by_codebase(sources))
    }

    async fn insert_stage_stream_link(&mut self, link: StageStreamLink) -> StoreResult<()> {
        let duplicate = self.tables.stage_links.iter().any(|l| {
            l.cd_stage_id == link.cd_stage_id
                && l.output_codebase_docker_stream_id == link.output_codebase_docker_stream_id
        });
        if duplicate {
            return Err(unique_violation("stage_codebase_docker_stream_pkey"));
        }
        self.tables.stage_links.push(link);
        Ok(())
    }

    async fn delete_stage_stream_links(&mut self, stage_id: i64) -> StoreResult<Vec<i64>> {
        let outputs: Vec<i64> = self
            .tables
            .links_of(stage_id)
            .iter()
            .map(|l| l.output_codebase_docker_stream_id)
            .collect();
        self.tables.stage_links.retain(|l| l.cd_stage_id != stage_id);
        Ok(outputs)
    }

    async fn stage_stream_links(&mut self, stage_id: i64) -> StoreResult<Vec<StageStreamLink>> {
        Ok(self.tables.links_of(stage_id).into_iter().cloned().collect())
    }

    async fn find_pipeline(&mut self, name: &str) -> StoreResult<Option<CdPipeline>> {
        Ok(self.tables.pipeline(name).cloned())
    }

    async fn insert_pipeline(&mut self, new_pipeline: NewCdPipeline) -> StoreResult<CdPipeline> {
        if self.tables.pipeline(&new_pipeline.name).is_some() {
            return Err(unique_violation("cd_pipeline_name_key"));
        }
        let row = CdPipeline {
            id: self.tables.next_id(),
            name: new_pipeline.name,
            status: new_pipeline.status,
        };
        self.tables.pipelines.push(row.clone());
        Ok(row)
    }

    async fn update_pipeline_status(&mut self, pipeline_id: i64, status: &str) -> StoreResult<()> {
        if let Some(row) = self.tables.pipelines.iter_mut().find(|p| p.id == pipeline_id) {
            row.status = status.to_string();
        }
        Ok(())
    }

    async fn lock_pipeline(&mut self, _pipeline_id: i64) -> StoreResult<()> {
        // Transactions are already serialized by the store mutex.
        Ok(())
    }

    async fn delete_pipeline_branches(&mut self, pipeline_id: i64) -> StoreResult<usize> {
        let before = self.tables.pipeline_branches.len();
        self.tables
            .pipeline_branches
            .retain(|r| r.cd_pipeline_id != pipeline_id);
        Ok(before - self.tables.pipeline_branches.len())
    }

    async fn insert_pipeline_branches(&mut self, rows: Vec<PipelineBranch>) -> StoreResult<()> {
        for row in rows {
            if self.tables.pipeline_branches.contains(&row) {
                return Err(unique_violation("cd_pipeline_codebase_branch_pkey"));
            }
            self.tables.pipeline_branches.push(row);
        }
        Ok(())
    }

    async fn delete_pipeline_services(&mut self, pipeline_id: i64) -> StoreResult<usize> {
        let before = self.tables.pipeline_services.len();
        self.tables
            .pipeline_services
            .retain(|r| r.cd_pipeline_id != pipeline_id);
        Ok(before - self.tables.pipeline_services.len())
    }

    async fn insert_pipeline_services(&mut self, rows: Vec<PipelineService>) -> StoreResult<()> {
        for row in rows {
            if self.tables.pipeline_services.contains(&row) {
                return Err(unique_violation("cd_pipeline_third_party_service_pkey"));
            }
            self.tables.pipeline_services.push(row);
        }
        Ok(())
    }

    async fn delete_pipeline_promotions(&mut self, pipeline_id: i64) -> StoreResult<usize> {
        let before = self.tables.pipeline_promotions.len();
        self.tables
            .pipeline_promotions
            .retain(|r| r.cd_pipeline_id != pipeline_id);
        Ok(before - self.tables.pipeline_promotions.len())
    }

    async fn insert_pipeline_promotions(
        &mut self,
        rows: Vec<PipelinePromotion>,
    ) -> StoreResult<()> {
        for row in rows {
            if self.tables.pipeline_promotions.contains(&row) {
                return Err(unique_violation("applications_to_promote_pkey"));
            }
            self.tables.pipeline_promotions.push(row);
        }
        Ok(())
    }

    async fn promoted_codebases(&mut self, pipeline_id: i64) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .tables
            .pipeline_promotions
            .iter()
            .filter(|r| r.cd_pipeline_id == pipeline_id)
            .map(|r| self.tables.codebase_name(r.codebase_id))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn find_third_party_service(
        &mut self,
        name: &str,
    ) -> StoreResult<Option<ThirdPartyService>> {
        Ok(self
            .tables
            .third_party_services
            .iter()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn insert_third_party_service(
        &mut self,
        new_service: NewThirdPartyService,
    ) -> StoreResult<i64> {
        if self
            .tables
            .third_party_services
            .iter()
            .any(|s| s.name == new_service.name)
        {
            return Err(unique_violation("third_party_service_name_key"));
        }
        let id = self.tables.next_id();
        self.tables.third_party_services.push(ThirdPartyService {
            id,
            name: new_service.name,
            description: new_service.description,
            version: new_service.version,
        });
        Ok(id)
    }

    async fn find_git_server(&mut self, name: &str) -> StoreResult<Option<GitServer>> {
        Ok(self.tables.git_server(name).cloned())
    }

    async fn insert_git_server(&mut self, new_server: NewGitServer) -> StoreResult<i64> {
        if self.tables.git_server(&new_server.name).is_some() {
            return Err(unique_violation("git_server_name_key"));
        }
        let id = self.tables.next_id();
        self.tables.git_servers.push(GitServer {
            id,
            name: new_server.name,
            hostname: new_server.hostname,
            available: new_server.available,
        });
        Ok(id)
    }

    async fn update_git_server_availability(
        &mut self,
        server_id: i64,
        available: bool,
    ) -> StoreResult<()> {
        if let Some(row) = self.tables.git_servers.iter_mut().find(|g| g.id == server_id) {
            row.available = available;
        }
        Ok(())
    }

    async fn find_tool_server(
        &mut self,
        kind: ToolServerKind,
        name: &str,
    ) -> StoreResult<Option<ToolServer>> {
        Ok(self.tables.tool_server(kind, name).cloned())
    }

    async fn insert_tool_server(
        &mut self,
        kind: ToolServerKind,
        name: &str,
        available: bool,
    ) -> StoreResult<i64> {
        if self.tables.tool_server(kind, name).is_some() {
            return Err(unique_violation(&format!("{}_name_key", kind.table())));
        }
        let id = self.tables.next_id();
        self.tables.tool_servers.push((
            kind,
            ToolServer {
                id,
                name: name.to_string(),
                available,
            },
        ));
        Ok(id)
    }

    async fn update_tool_server_availability(
        &mut self,
        kind: ToolServerKind,
        server_id: i64,
        available: bool,
    ) -> StoreResult<()> {
        let row = self
            .tables
            .tool_servers
            .iter_mut()
            .find(|(k, server)| *k == kind && server.id == server_id);
        if let Some((_, server)) = row {
            server.available = available;
        }
        Ok(())
    }

    async fn find_jenkins_resource(
        &mut self,
        kind: JenkinsResourceKind,
        name: &str,
    ) -> StoreResult<Option<i64>> {
        Ok(self.tables.jenkins_resource(kind, name))
    }

    async fn insert_jenkins_resource(
        &mut self,
        kind: JenkinsResourceKind,
        name: &str,
    ) -> StoreResult<i64> {
        if self.tables.jenkins_resource(kind, name).is_some() {
            return Err(unique_violation(&format!("{}_name_key", kind.table())));
        }
        let id = self.tables.next_id();
        self.tables
            .jenkins_resources
            .push((kind, id, name.to_string()));
        Ok(id)
    }

    async fn find_perf_data_source(
        &mut self,
        source_type: &str,
    ) -> StoreResult<Option<PerfDataSource>> {
        Ok(self
            .tables
            .perf_data_sources
            .iter()
            .find(|d| d.source_type == source_type)
            .cloned())
    }

    async fn insert_perf_data_source(&mut self, source_type: &str) -> StoreResult<i64> {
        if self
            .tables
            .perf_data_sources
            .iter()
            .any(|d| d.source_type == source_type)
        {
            return Err(unique_violation("perf_data_sources_type_key"));
        }
        let id = self.tables.next_id();
        self.tables.perf_data_sources.push(PerfDataSource {
            id,
            source_type: source_type.to_string(),
        });
        Ok(id)
    }

    async fn codebase_perf_data_source_exists(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<bool> {
        let row = CodebasePerfDataSource {
            codebase_id,
            data_source_id,
        };
        Ok(self.tables.codebase_perf_data_sources.contains(&row))
    }

    async fn insert_codebase_perf_data_source(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<()> {
        let row = CodebasePerfDataSource {
            codebase_id,
            data_source_id,
        };
        if self.tables.codebase_perf_data_sources.contains(&row) {
            return Err(unique_violation("codebase_perf_data_sources_pkey"));
        }
        self.tables.codebase_perf_data_sources.push(row);
        Ok(())
    }

    async fn delete_codebase_perf_data_source(
        &mut self,
        codebase_id: i64,
        data_source_id: i64,
    ) -> StoreResult<bool> {
        let before = self.tables.codebase_perf_data_sources.len();
        self.tables
            .codebase_perf_data_sources
            .retain(|r| !(r.codebase_id == codebase_id && r.data_source_id == data_source_id));
        Ok(before != self.tables.codebase_perf_data_sources.len())
    }

    async fn find_stage(&mut self, pipeline_id: i64, name: &str) -> StoreResult<Option<CdStage>> {
        Ok(self
            .tables
            .stages
            .iter()
            .find(|s| s.cd_pipeline_id == pipeline_id && s.name == name)
            .cloned())
    }

    async fn find_stage_by_order(
        &mut self,
        pipeline_id: i64,
        order: i32,
    ) -> StoreResult<Option<CdStage>> {
        Ok(self
            .tables
            .stages
            .iter()
            .find(|s| s.cd_pipeline_id == pipeline_id && s.stage_order == order)
            .cloned())
    }

    async fn insert_stage(&mut self, new_stage: NewCdStage) -> StoreResult<i64> {
        let same_pipeline = self
            .tables
            .stages
            .iter()
            .filter(|s| s.cd_pipeline_id == new_stage.cd_pipeline_id);
        for stage in same_pipeline {
            if stage.name == new_stage.name {
                return Err(unique_violation("cd_stage_cd_pipeline_id_name_key"));
            }
            if stage.stage_order == new_stage.stage_order {
                return Err(unique_violation("cd_stage_cd_pipeline_id_order_key"));
            }
        }
        let id = self.tables.next_id();
        self.tables.stages.push(CdStage {
            id,
            name: new_stage.name,
            cd_pipeline_id: new_stage.cd_pipeline_id,
            description: new_stage.description,
            trigger_type: new_stage.trigger_type,
            stage_order: new_stage.stage_order,
            status: new_stage.status,
            codebase_branch_id: new_stage.codebase_branch_id,
        });
        Ok(id)
    }

    async fn update_stage_status(&mut self, stage_id: i64, status: &str) -> StoreResult<()> {
        if let Some(row) = self.tables.stages.iter_mut().find(|s| s.id == stage_id) {
            row.status = status.to_string();
        }
        Ok(())
    }

    async fn insert_quality_gate(&mut self, new_gate: NewQualityGate) -> StoreResult<i64> {
        let id = self.tables.next_id();
        self.tables.quality_gates.push(QualityGateRow {
            id,
            quality_gate: new_gate.quality_gate,
            step_name: new_gate.step_name,
            cd_stage_id: new_gate.cd_stage_id,
            codebase_id: new_gate.codebase_id,
            codebase_branch_id: new_gate.codebase_branch_id,
        });
        Ok(id)
    }

    async fn insert_action_log(&mut self, new_log: NewActionLog) -> StoreResult<i64> {
        let id = self.tables.next_id();
        self.tables.action_logs.push(ActionLogRow {
            id,
            event: new_log.event,
            detailed_message: new_log.detailed_message,
            username: new_log.username,
            updated_at: new_log.updated_at,
            action: new_log.action,
            result: new_log.result,
            action_message: new_log.action_message,
        });
        Ok(id)
    }

    async fn link_action_log(&mut self, owner: ActionLogOwner, log_id: i64) -> StoreResult<()> {
        if self.tables.action_log_links.contains(&(owner, log_id)) {
            return Err(unique_violation("action_log_link_pkey"));
        }
        self.tables.action_log_links.push((owner, log_id));
        Ok(())
    }

    async fn action_log_exists(
        &mut self,
        owner: ActionLogOwner,
        event: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self
            .tables
            .logs_of(owner)
            .iter()
            .any(|l| l.event == event && l.updated_at == updated_at))
    }
}
