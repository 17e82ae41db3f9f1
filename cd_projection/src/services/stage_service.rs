//! Stage ordering and materialization.
//!
//! A stage sync is an explicit state machine run inside one transaction:
//!
//! ```text
//! Absent -> Admitted -> Materialized -> Linked -> Synced
//! ```
//!
//! Each call to [`advance`] performs exactly one transition. Any error aborts
//! the sync and the enclosing transaction rolls back everything written by
//! earlier transitions.

use crate::error::{ProjectionError, StepContext, SyncStep};
use crate::models::action_log::ActionLogOwner;
use crate::models::docker_stream::StageStreamLink;
use crate::models::pipeline::CdPipeline;
use crate::models::stage::NewCdStage;
use crate::requests::{BranchRef, StageSource, StageSync};
use crate::services::action_log_service::{self, ActionSubject};
use crate::services::{branch_service, docker_stream_service, quality_gate_service};
use crate::store::{Gateway, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePhase {
    /// Nothing has been checked yet.
    Absent,
    /// The predecessor exists (or this is the first stage).
    Admitted,
    /// The stage row exists. `created` is true when it was inserted by this
    /// sync.
    Materialized { stage_id: i64, created: bool },
    /// Stream edges reflect the current pipeline topology.
    Linked {
        stage_id: i64,
        created: bool,
        links: Vec<StageStreamLink>,
    },
    /// Gates, status and audit trail are written.
    Synced { stage_id: i64 },
}

impl StagePhase {
    /// Sub-step the next transition out of this phase performs.
    pub fn next_step(&self) -> Option<SyncStep> {
        match self {
            StagePhase::Absent => Some(SyncStep::Admission),
            StagePhase::Admitted => Some(SyncStep::Materialize),
            StagePhase::Materialized { .. } => Some(SyncStep::LinkStreams),
            StagePhase::Linked { .. } => Some(SyncStep::UpdateStatus),
            StagePhase::Synced { .. } => None,
        }
    }
}

/// Request plus the pipeline it was resolved against.
pub struct StageContext<'r> {
    pub request: &'r StageSync,
    pub pipeline: CdPipeline,
}

async fn admit(gw: &mut dyn Gateway, ctx: &StageContext<'_>) -> StoreResult<StagePhase> {
    let order = ctx.request.order;
    if order > 0 {
        let previous = gw.find_stage_by_order(ctx.pipeline.id, order - 1).await?;
        if previous.is_none() {
            tracing::warn!(
                pipeline = %ctx.pipeline.name,
                stage = %ctx.request.name,
                order,
                "Previous stage missing, stage not admitted"
            );
            return Err(ProjectionError::PreviousStageMissing {
                pipeline: ctx.pipeline.name.clone(),
                order: order - 1,
            });
        }
    }
    Ok(StagePhase::Admitted)
}

async fn materialize(gw: &mut dyn Gateway, ctx: &StageContext<'_>) -> StoreResult<StagePhase> {
    let request = ctx.request;
    if let Some(stage) = gw.find_stage(ctx.pipeline.id, &request.name).await? {
        tracing::debug!(stage_id = stage.id, stage = %request.name, "Stage exists, update pass");
        return Ok(StagePhase::Materialized {
            stage_id: stage.id,
            created: false,
        });
    }

    let codebase_branch_id = match &request.source {
        StageSource::Default => None,
        StageSource::Library { codebase, branch } => {
            let branch = BranchRef {
                codebase: codebase.clone(),
                branch: branch.clone(),
            };
            Some(
                branch_service::resolve_branch_id(gw, &branch)
                    .await
                    .step(SyncStep::ResolveBranch)?,
            )
        }
    };

    let stage_id = gw
        .insert_stage(NewCdStage {
            name: request.name.clone(),
            cd_pipeline_id: ctx.pipeline.id,
            description: request.description.clone(),
            trigger_type: request.trigger_type.to_lowercase(),
            stage_order: request.order,
            status: request.status.clone(),
            codebase_branch_id,
        })
        .await?;
    tracing::info!(
        pipeline = %ctx.pipeline.name,
        stage = %request.name,
        stage_id,
        order = request.order,
        "CD stage created"
    );
    Ok(StagePhase::Materialized {
        stage_id,
        created: true,
    })
}

async fn link(
    gw: &mut dyn Gateway,
    ctx: &StageContext<'_>,
    stage_id: i64,
    created: bool,
) -> StoreResult<StagePhase> {
    let previous_outputs = if created {
        Vec::new()
    } else {
        gw.delete_stage_stream_links(stage_id).await?
    };

    let links = docker_stream_service::link_stage(
        gw,
        &ctx.pipeline.name,
        ctx.pipeline.id,
        &ctx.request.name,
        stage_id,
        ctx.request.order,
        created,
    )
    .await?;

    // Outputs reused by name are linked again; only the rest are orphans.
    let pruned = docker_stream_service::prune_streams(gw, previous_outputs).await?;
    tracing::info!(stage_id, edges = links.len(), pruned, "Stage docker streams linked");

    Ok(StagePhase::Linked {
        stage_id,
        created,
        links,
    })
}

async fn finish(
    gw: &mut dyn Gateway,
    ctx: &StageContext<'_>,
    stage_id: i64,
    created: bool,
) -> StoreResult<StagePhase> {
    let request = ctx.request;

    // Gates belong to the stage as first materialized; re-syncs leave them.
    if created {
        quality_gate_service::insert_gates(gw, stage_id, &request.quality_gates)
            .await
            .step(SyncStep::QualityGates)?;
    } else {
        let stored = gw
            .find_stage(ctx.pipeline.id, &request.name)
            .await
            .step(SyncStep::UpdateStatus)?;
        if stored.is_some_and(|stage| stage.status != request.status) {
            gw.update_stage_status(stage_id, &request.status)
                .await
                .step(SyncStep::UpdateStatus)?;
            tracing::info!(stage_id, status = %request.status, "CD stage status updated");
        }
    }

    action_log_service::record(
        gw,
        ActionLogOwner::Stage(stage_id),
        ActionSubject::Stage {
            name: &request.name,
        },
        request.action_log.as_ref(),
    )
    .await
    .step(SyncStep::ActionLog)?;

    Ok(StagePhase::Synced { stage_id })
}

/// Perform the single transition out of `phase`.
pub async fn advance(
    gw: &mut dyn Gateway,
    ctx: &StageContext<'_>,
    phase: StagePhase,
) -> StoreResult<StagePhase> {
    let step = phase.next_step();
    let next = match phase {
        StagePhase::Absent => admit(gw, ctx).await,
        StagePhase::Admitted => materialize(gw, ctx).await,
        StagePhase::Materialized { stage_id, created } => link(gw, ctx, stage_id, created).await,
        StagePhase::Linked {
            stage_id, created, ..
        } => finish(gw, ctx, stage_id, created).await,
        synced @ StagePhase::Synced { .. } => Ok(synced),
    };
    match step {
        Some(step) => next.step(step),
        None => next,
    }
}

/// Synchronize one stage, returning its id.
pub async fn sync(gw: &mut dyn Gateway, request: &StageSync) -> StoreResult<i64> {
    if request.order < 0 {
        return Err(ProjectionError::InvalidRequest(format!(
            "stage {} has negative order {}",
            request.name, request.order
        )));
    }

    let pipeline = gw
        .find_pipeline(&request.pipeline)
        .await
        .and_then(|found| {
            found.ok_or_else(|| ProjectionError::PipelineNotFound(request.pipeline.clone()))
        })
        .step(SyncStep::ResolvePipeline)?;
    gw.lock_pipeline(pipeline.id)
        .await
        .step(SyncStep::Admission)?;

    let ctx = StageContext { request, pipeline };
    let mut phase = StagePhase::Absent;
    loop {
        phase = advance(gw, &ctx, phase).await?;
        if let StagePhase::Synced { stage_id } = phase {
            return Ok(stage_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{PipelineSync, QualityGateSpec};
    use crate::store::{MemoryStore, Store};
    use crate::tenant::TenantSchema;

    fn stage(name: &str, order: i32) -> StageSync {
        StageSync {
            tenant: TenantSchema::new("acme").unwrap(),
            pipeline: "demo".into(),
            name: name.into(),
            description: String::new(),
            trigger_type: "Manual".into(),
            order,
            source: StageSource::Default,
            quality_gates: vec![QualityGateSpec::Manual {
                step_name: "Approve".into(),
            }],
            status: "created".into(),
            action_log: None,
        }
    }

    async fn store_with_pipeline() -> (MemoryStore, TenantSchema) {
        let store = MemoryStore::new();
        let tenant = TenantSchema::new("acme").unwrap();
        let request = PipelineSync {
            tenant: tenant.clone(),
            name: "demo".into(),
            branches: vec![],
            third_party_services: vec![],
            applications_to_promote: vec![],
            status: "active".into(),
            action_log: None,
        };
        store
            .transaction(&tenant, move |gw| {
                Box::pin(async move { crate::services::pipeline_service::sync(gw, &request).await })
            })
            .await
            .unwrap();
        (store, tenant)
    }

    #[test]
    fn every_phase_but_synced_has_a_next_step() {
        assert_eq!(StagePhase::Absent.next_step(), Some(SyncStep::Admission));
        assert_eq!(StagePhase::Admitted.next_step(), Some(SyncStep::Materialize));
        assert_eq!(
            StagePhase::Materialized {
                stage_id: 1,
                created: true
            }
            .next_step(),
            Some(SyncStep::LinkStreams)
        );
        assert_eq!(StagePhase::Synced { stage_id: 1 }.next_step(), None);
    }

    #[tokio::test]
    async fn phases_advance_in_order() {
        let (store, tenant) = store_with_pipeline().await;
        let request = stage("build", 0);

        let phases = store
            .transaction(&tenant, move |gw| {
                Box::pin(async move {
                    let pipeline = gw.find_pipeline("demo").await?.expect("pipeline synced");
                    let ctx = StageContext {
                        request: &request,
                        pipeline,
                    };
                    let mut seen = vec![StagePhase::Absent];
                    let mut phase = StagePhase::Absent;
                    while !matches!(phase, StagePhase::Synced { .. }) {
                        phase = advance(gw, &ctx, phase).await?;
                        seen.push(phase.clone());
                    }
                    Ok(seen)
                })
            })
            .await
            .unwrap();

        assert_eq!(phases.len(), 5);
        assert_eq!(phases[1], StagePhase::Admitted);
        assert!(matches!(phases[2], StagePhase::Materialized { created: true, .. }));
        assert!(matches!(&phases[3], StagePhase::Linked { links, .. } if links.is_empty()));
        assert!(matches!(phases[4], StagePhase::Synced { .. }));

        let tables = store.snapshot(&tenant).await;
        let stored = tables.stage("demo", "build").unwrap();
        assert_eq!(stored.trigger_type, "manual");
        assert_eq!(tables.gates_of(stored.id)[0].step_name, "approve");
    }

    #[tokio::test]
    async fn admission_failure_is_tagged_with_its_step() {
        let (store, tenant) = store_with_pipeline().await;
        let request = stage("qa", 1);

        let err = store
            .transaction(&tenant, move |gw| {
                Box::pin(async move { sync(gw, &request).await })
            })
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(SyncStep::Admission));
        assert!(matches!(
            err.root(),
            ProjectionError::PreviousStageMissing { order: 0, .. }
        ));
    }

    #[tokio::test]
    async fn negative_order_is_invalid() {
        let (store, tenant) = store_with_pipeline().await;
        let request = stage("weird", -1);
        let err = store
            .transaction(&tenant, move |gw| {
                Box::pin(async move { sync(gw, &request).await })
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Invalid);
    }
}
