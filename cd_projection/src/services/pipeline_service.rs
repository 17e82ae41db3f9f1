//! CD pipeline synchronization.
//!
//! A pipeline owns three association sets: source branches, third-party
//! services and applications to promote. They are written in full on
//! creation and fully replaced on every later sync.

use crate::error::{ProjectionError, StepContext, SyncStep};
use crate::models::action_log::ActionLogOwner;
use crate::models::pipeline::{
    CdPipeline, NewCdPipeline, PipelineBranch, PipelinePromotion, PipelineService,
};
use crate::requests::PipelineSync;
use crate::services::action_log_service::{self, ActionSubject};
use crate::services::branch_service;
use crate::store::{Gateway, StoreResult};

/// Keeps first-seen order; an id named twice is written once.
fn push_unique(ids: &mut Vec<i64>, id: i64) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

async fn resolve_branches(gw: &mut dyn Gateway, request: &PipelineSync) -> StoreResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(request.branches.len());
    for branch in &request.branches {
        push_unique(&mut ids, branch_service::resolve_branch_id(gw, branch).await?);
    }
    Ok(ids)
}

async fn resolve_services(gw: &mut dyn Gateway, request: &PipelineSync) -> StoreResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(request.third_party_services.len());
    for name in &request.third_party_services {
        let service = gw
            .find_third_party_service(name)
            .await?
            .ok_or_else(|| ProjectionError::ServiceNotFound(name.clone()))?;
        push_unique(&mut ids, service.id);
    }
    Ok(ids)
}

async fn resolve_promotions(gw: &mut dyn Gateway, request: &PipelineSync) -> StoreResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(request.applications_to_promote.len());
    for name in &request.applications_to_promote {
        let codebase_id = branch_service::resolve_codebase_id(gw, name)
            .await?
            .ok_or_else(|| ProjectionError::CodebaseNotFound(name.clone()))?;
        push_unique(&mut ids, codebase_id);
    }
    Ok(ids)
}

/// Write the three association sets of `pipeline_id`, replacing whatever
/// was stored before.
async fn replace_associations(
    gw: &mut dyn Gateway,
    pipeline_id: i64,
    request: &PipelineSync,
) -> StoreResult<()> {
    let branch_ids = resolve_branches(gw, request).await.step(SyncStep::ResolveBranch)?;
    let service_ids = resolve_services(gw, request).await?;
    let codebase_ids = resolve_promotions(gw, request)
        .await
        .step(SyncStep::ResolveCodebase)?;

    gw.delete_pipeline_branches(pipeline_id).await?;
    gw.insert_pipeline_branches(
        branch_ids
            .iter()
            .map(|&codebase_branch_id| PipelineBranch {
                cd_pipeline_id: pipeline_id,
                codebase_branch_id,
            })
            .collect(),
    )
    .await?;

    gw.delete_pipeline_services(pipeline_id).await?;
    gw.insert_pipeline_services(
        service_ids
            .iter()
            .map(|&third_party_service_id| PipelineService {
                cd_pipeline_id: pipeline_id,
                third_party_service_id,
            })
            .collect(),
    )
    .await?;

    gw.delete_pipeline_promotions(pipeline_id).await?;
    gw.insert_pipeline_promotions(
        codebase_ids
            .iter()
            .map(|&codebase_id| PipelinePromotion {
                cd_pipeline_id: pipeline_id,
                codebase_id,
            })
            .collect(),
    )
    .await?;

    tracing::debug!(
        pipeline_id,
        branches = branch_ids.len(),
        services = service_ids.len(),
        promotions = codebase_ids.len(),
        "Pipeline associations written"
    );
    Ok(())
}

/// Create or update a pipeline with its associations, status and action log.
pub async fn sync(gw: &mut dyn Gateway, request: &PipelineSync) -> StoreResult<CdPipeline> {
    let existing = gw
        .find_pipeline(&request.name)
        .await
        .step(SyncStep::ResolvePipeline)?;

    let pipeline = match existing {
        Some(pipeline) => {
            tracing::info!(pipeline = %request.name, pipeline_id = pipeline.id, "Updating CD pipeline");
            pipeline
        }
        None => {
            let pipeline = gw
                .insert_pipeline(NewCdPipeline {
                    name: request.name.clone(),
                    status: request.status.clone(),
                })
                .await
                .step(SyncStep::ResolvePipeline)?;
            tracing::info!(pipeline = %request.name, pipeline_id = pipeline.id, "CD pipeline created");
            pipeline
        }
    };

    replace_associations(gw, pipeline.id, request)
        .await
        .step(SyncStep::Associations)?;

    let pipeline = if pipeline.status != request.status {
        gw.update_pipeline_status(pipeline.id, &request.status)
            .await
            .step(SyncStep::UpdateStatus)?;
        tracing::info!(pipeline_id = pipeline.id, status = %request.status, "CD pipeline status updated");
        CdPipeline {
            status: request.status.clone(),
            ..pipeline
        }
    } else {
        pipeline
    };

    action_log_service::record(
        gw,
        ActionLogOwner::Pipeline(pipeline.id),
        ActionSubject::Pipeline {
            name: &request.name,
        },
        request.action_log.as_ref(),
    )
    .await
    .step(SyncStep::ActionLog)?;

    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::push_unique;

    #[test]
    fn duplicate_ids_are_dropped_in_order() {
        let mut ids = Vec::new();
        for id in [3, 1, 3, 2, 1] {
            push_unique(&mut ids, id);
        }
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
