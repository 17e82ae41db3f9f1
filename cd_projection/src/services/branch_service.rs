//! Codebase and branch resolution.

use crate::error::{ProjectionError, StepContext, SyncStep};
use crate::models::action_log::ActionLogOwner;
use crate::models::codebase::{Codebase, CodebaseBranch, NewCodebaseBranch};
use crate::requests::{BranchRef, BranchSync};
use crate::services::action_log_service::{self, ActionSubject};
use crate::services::docker_stream_service;
use crate::store::{Gateway, StoreResult};

/// Status given to branches created implicitly by a pipeline or stage.
const IMPLICIT_BRANCH_STATUS: &str = "active";

pub async fn resolve_codebase_id(gw: &mut dyn Gateway, name: &str) -> StoreResult<Option<i64>> {
    Ok(gw.find_codebase(name).await?.map(|c| c.id))
}

async fn require_codebase(gw: &mut dyn Gateway, name: &str) -> StoreResult<Codebase> {
    gw.find_codebase(name)
        .await?
        .ok_or_else(|| ProjectionError::CodebaseNotFound(name.to_string()))
}

enum BranchLookup {
    Existing(CodebaseBranch),
    Created(i64),
}

impl BranchLookup {
    fn id(&self) -> i64 {
        match self {
            BranchLookup::Existing(branch) => branch.id,
            BranchLookup::Created(id) => *id,
        }
    }
}

/// Get or create a branch of an existing codebase.
async fn get_or_create_branch(
    gw: &mut dyn Gateway,
    codebase: &Codebase,
    name: &str,
    from_commit: &str,
    status: &str,
) -> StoreResult<BranchLookup> {
    if let Some(branch) = gw.find_branch(codebase.id, name).await? {
        return Ok(BranchLookup::Existing(branch));
    }

    let branch_id = gw
        .insert_branch(NewCodebaseBranch {
            name: name.to_string(),
            codebase_id: codebase.id,
            from_commit: from_commit.to_string(),
            status: status.to_string(),
        })
        .await?;
    tracing::info!(codebase = %codebase.name, branch = %name, branch_id, "Codebase branch created");

    if codebase.is_application() {
        docker_stream_service::create_branch_stream(gw, codebase, branch_id, name).await?;
    }
    Ok(BranchLookup::Created(branch_id))
}

/// Id of the referenced branch, created on first use. The owning codebase
/// must already exist.
pub async fn resolve_branch_id(gw: &mut dyn Gateway, branch: &BranchRef) -> StoreResult<i64> {
    let codebase = require_codebase(gw, &branch.codebase).await?;
    let lookup =
        get_or_create_branch(gw, &codebase, &branch.branch, "", IMPLICIT_BRANCH_STATUS).await?;
    Ok(lookup.id())
}

/// Synchronize one codebase branch reported by the orchestrator.
pub async fn sync(gw: &mut dyn Gateway, request: &BranchSync) -> StoreResult<i64> {
    let codebase = require_codebase(gw, &request.codebase)
        .await
        .step(SyncStep::ResolveCodebase)?;

    let lookup = get_or_create_branch(
        gw,
        &codebase,
        &request.name,
        &request.from_commit,
        &request.status,
    )
    .await
    .step(SyncStep::ResolveBranch)?;
    let branch_id = lookup.id();

    if let BranchLookup::Existing(branch) = &lookup {
        if branch.status != request.status {
            gw.update_branch_status(branch_id, &request.status)
                .await
                .step(SyncStep::UpdateStatus)?;
            tracing::info!(branch_id, status = %request.status, "Codebase branch status updated");
        }
    }

    action_log_service::record(
        gw,
        ActionLogOwner::Branch(branch_id),
        ActionSubject::Branch {
            codebase: &request.codebase,
            branch: &request.name,
        },
        request.action_log.as_ref(),
    )
    .await
    .step(SyncStep::ActionLog)?;

    Ok(branch_id)
}
