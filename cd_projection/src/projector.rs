//! Entry points for every synchronization request.
//!
//! `Projector` receives its store at construction and runs each request in
//! exactly one transaction of the request's tenant. Nothing is written unless
//! the whole pass succeeds.

use std::time::Instant;

use tracing::Instrument;

use crate::error::{ErrorKind, ProjectionError};
use crate::models::pipeline::CdPipeline;
use crate::requests::{
    BranchSync, CodebaseSync, GitServerSync, JenkinsSync, PerfDataSourceRemoval, PipelineSync,
    StageSync, ThirdPartyServiceSync, ToolServerSync,
};
use crate::services::{
    branch_service, codebase_service, git_server_service, jenkins_service,
    perf_data_source_service, pipeline_service, stage_service, third_party_service,
    tool_server_service,
};
use crate::store::{Gateway, Store, StoreFuture};
use crate::tenant::TenantSchema;

fn outcome(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Transient => "transient",
        ErrorKind::Structural => "structural",
        ErrorKind::Invalid => "invalid",
    }
}

pub struct Projector<S> {
    store: S,
}

impl<S: Store> Projector<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn run<T, F>(
        &self,
        entity: &'static str,
        tenant: &TenantSchema,
        name: &str,
        work: F,
    ) -> Result<T, ProjectionError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn Gateway) -> StoreFuture<'t, T> + Send,
    {
        let started = Instant::now();
        let span = tracing::info_span!("sync", entity, tenant = %tenant, name = %name);
        let result = self
            .store
            .transaction(tenant, work)
            .instrument(span)
            .await;
        crate::metrics::sync_duration(entity, started.elapsed().as_millis() as u64);

        match &result {
            Ok(_) => {
                crate::metrics::sync_finished(entity, "ok");
                tracing::info!(entity, tenant = %tenant, name = %name, "Synchronization committed");
            }
            Err(err) => {
                crate::metrics::sync_finished(entity, outcome(err.kind()));
                tracing::error!(
                    entity,
                    tenant = %tenant,
                    name = %name,
                    error = %err,
                    "Synchronization rolled back"
                );
            }
        }
        result
    }

    /// Create or update a CD pipeline with its associations.
    pub async fn sync_pipeline(&self, request: &PipelineSync) -> Result<CdPipeline, ProjectionError> {
        let owned = request.clone();
        self.run("cd_pipeline", &request.tenant, &request.name, move |gw| {
            Box::pin(async move { pipeline_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Admit, materialize and link one stage of a pipeline. Returns the
    /// stage id.
    pub async fn sync_stage(&self, request: &StageSync) -> Result<i64, ProjectionError> {
        let owned = request.clone();
        self.run("cd_stage", &request.tenant, &request.name, move |gw| {
            Box::pin(async move { stage_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Returns the branch id.
    pub async fn sync_branch(&self, request: &BranchSync) -> Result<i64, ProjectionError> {
        let owned = request.clone();
        self.run("codebase_branch", &request.tenant, &request.name, move |gw| {
            Box::pin(async move { branch_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Returns the codebase id.
    pub async fn sync_codebase(&self, request: &CodebaseSync) -> Result<i64, ProjectionError> {
        let owned = request.clone();
        self.run("codebase", &request.tenant, &request.name, move |gw| {
            Box::pin(async move { codebase_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Returns the service id.
    pub async fn sync_third_party_service(
        &self,
        request: &ThirdPartyServiceSync,
    ) -> Result<i64, ProjectionError> {
        let owned = request.clone();
        self.run("third_party_service", &request.tenant, &request.name, move |gw| {
            Box::pin(async move { third_party_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Returns the git server id.
    pub async fn sync_git_server(&self, request: &GitServerSync) -> Result<i64, ProjectionError> {
        let owned = request.clone();
        self.run("git_server", &request.tenant, &request.name, move |gw| {
            Box::pin(async move { git_server_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Register a Jira or perf server, or refresh its availability.
    pub async fn sync_tool_server(&self, request: &ToolServerSync) -> Result<i64, ProjectionError> {
        let owned = request.clone();
        self.run(request.kind.table(), &request.tenant, &request.name, move |gw| {
            Box::pin(async move { tool_server_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Returns how many slaves and job provisioners were added.
    pub async fn sync_jenkins(&self, request: &JenkinsSync) -> Result<usize, ProjectionError> {
        let owned = request.clone();
        self.run("jenkins", &request.tenant, "jenkins", move |gw| {
            Box::pin(async move { jenkins_service::sync(gw, &owned).await })
        })
        .await
    }

    /// Detach a perf data source from a codebase. Returns whether a link was
    /// removed.
    pub async fn remove_codebase_perf_data_source(
        &self,
        request: &PerfDataSourceRemoval,
    ) -> Result<bool, ProjectionError> {
        let owned = request.clone();
        self.run("codebase_perf_data_source", &request.tenant, &request.codebase, move |gw| {
            Box::pin(async move { perf_data_source_service::remove(gw, &owned).await })
        })
        .await
    }
}
