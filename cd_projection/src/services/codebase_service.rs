//! Codebase registration.

use crate::error::{ProjectionError, StepContext, SyncStep};
use crate::models::action_log::ActionLogOwner;
use crate::models::codebase::NewCodebase;
use crate::models::tooling::JenkinsResourceKind;
use crate::requests::CodebaseSync;
use crate::services::action_log_service::{self, ActionSubject};
use crate::services::perf_data_source_service;
use crate::store::{Gateway, StoreResult};

/// Get or create the codebase, update its status when it changed, attach its
/// perf data sources and record the action log.
///
/// The git server, Jenkins slave and job provisioner are bound on creation
/// and must already be registered.
pub async fn sync(gw: &mut dyn Gateway, request: &CodebaseSync) -> StoreResult<i64> {
    let existing = gw
        .find_codebase(&request.name)
        .await
        .step(SyncStep::ResolveCodebase)?;

    let codebase_id = match existing {
        Some(codebase) => {
            if codebase.status != request.status {
                gw.update_codebase_status(codebase.id, &request.status)
                    .await
                    .step(SyncStep::UpdateStatus)?;
                tracing::info!(
                    codebase_id = codebase.id,
                    status = %request.status,
                    "Codebase status updated"
                );
            }
            codebase.id
        }
        None => {
            let git_server_id = resolve_git_server(gw, request.git_server.as_deref())
                .await
                .step(SyncStep::ResolveTooling)?;
            let jenkins_slave_id =
                resolve_jenkins(gw, JenkinsResourceKind::Slave, request.jenkins_slave.as_deref())
                    .await
                    .step(SyncStep::ResolveTooling)?;
            let job_provisioning_id = resolve_jenkins(
                gw,
                JenkinsResourceKind::JobProvisioning,
                request.job_provisioning.as_deref(),
            )
            .await
            .step(SyncStep::ResolveTooling)?;

            let id = gw
                .insert_codebase(NewCodebase {
                    name: request.name.clone(),
                    codebase_type: request.codebase_type.as_str().to_string(),
                    status: request.status.clone(),
                    git_server_id,
                    jenkins_slave_id,
                    job_provisioning_id,
                })
                .await
                .step(SyncStep::ResolveCodebase)?;
            tracing::info!(
                codebase = %request.name,
                codebase_type = %request.codebase_type,
                codebase_id = id,
                "Codebase created"
            );
            id
        }
    };

    perf_data_source_service::attach(gw, codebase_id, &request.perf_data_sources)
        .await
        .step(SyncStep::PerfDataSources)?;

    action_log_service::record(
        gw,
        ActionLogOwner::Codebase(codebase_id),
        ActionSubject::Codebase {
            name: &request.name,
        },
        request.action_log.as_ref(),
    )
    .await
    .step(SyncStep::ActionLog)?;

    Ok(codebase_id)
}

async fn resolve_git_server(gw: &mut dyn Gateway, name: Option<&str>) -> StoreResult<Option<i64>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let server = gw
        .find_git_server(name)
        .await?
        .ok_or_else(|| ProjectionError::GitServerNotFound(name.to_string()))?;
    Ok(Some(server.id))
}

async fn resolve_jenkins(
    gw: &mut dyn Gateway,
    kind: JenkinsResourceKind,
    name: Option<&str>,
) -> StoreResult<Option<i64>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let id = gw.find_jenkins_resource(kind, name).await?.ok_or_else(|| {
        ProjectionError::JenkinsResourceNotFound {
            kind: kind.label(),
            name: name.to_string(),
        }
    })?;
    Ok(Some(id))
}
