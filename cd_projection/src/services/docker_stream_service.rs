//! Docker image stream lineage across the stages of a pipeline.
//!
//! Stage `k` consumes the outputs of stage `k - 1` (or, for the first stage,
//! the streams of the pipeline's source branches) and produces one verified
//! stream per codebase. The edge recorded for a codebase points at the chain
//! input only for promoted applications; every other codebase is wired to its
//! original source stream at every stage.

use std::collections::{HashMap, HashSet};

use crate::models::codebase::Codebase;
use crate::models::docker_stream::{NewCodebaseDockerStream, StageStreamLink, StreamSource};
use crate::store::{Gateway, StoreResult};

/// Name of the stream a branch of an application codebase builds into.
pub fn branch_stream_name(codebase: &str, branch: &str) -> String {
    format!("{codebase}-{branch}")
}

/// Name of the stream a stage verifies a codebase into.
pub fn output_stream_name(pipeline: &str, stage: &str, codebase: &str) -> String {
    format!("{pipeline}-{stage}-{codebase}-verified")
}

/// Create the source stream of a freshly created branch and attach it.
pub async fn create_branch_stream(
    gw: &mut dyn Gateway,
    codebase: &Codebase,
    branch_id: i64,
    branch: &str,
) -> StoreResult<i64> {
    let name = branch_stream_name(&codebase.name, branch);
    let stream_id = gw
        .insert_docker_stream(NewCodebaseDockerStream {
            codebase_id: codebase.id,
            codebase_branch_id: Some(branch_id),
            oc_image_stream_name: name.clone(),
        })
        .await?;
    gw.set_branch_output_stream(branch_id, stream_id).await?;

    crate::metrics::streams_created(1);
    tracing::info!(stream_id, stream = %name, branch_id, "Branch docker stream created");
    Ok(stream_id)
}

/// Streams flowing into the stage at `order`.
pub async fn discover_inputs(
    gw: &mut dyn Gateway,
    pipeline_id: i64,
    order: i32,
) -> StoreResult<Vec<StreamSource>> {
    if order == 0 {
        gw.pipeline_source_streams(pipeline_id).await
    } else {
        gw.stage_output_streams(pipeline_id, order - 1).await
    }
}

/// Delete every stream in `candidates` that no edge or branch references
/// any more. Returns the number of streams deleted.
pub async fn prune_streams(gw: &mut dyn Gateway, candidates: Vec<i64>) -> StoreResult<usize> {
    let mut deleted = 0;
    for stream_id in candidates {
        if gw.docker_stream_in_use(stream_id).await? {
            tracing::debug!(stream_id, "Docker stream still referenced, kept");
            continue;
        }
        gw.delete_docker_stream(stream_id).await?;
        deleted += 1;
    }
    Ok(deleted)
}

/// Wire a stage to its inputs, creating or reusing one output stream per
/// codebase and recording one edge per codebase. Inputs of codebases without
/// a declared source branch are skipped.
///
/// `created` marks a stage inserted in this pass: its output streams are
/// always new. An existing stage reuses streams that survived the refresh.
pub async fn link_stage(
    gw: &mut dyn Gateway,
    pipeline: &str,
    pipeline_id: i64,
    stage: &str,
    stage_id: i64,
    order: i32,
    created: bool,
) -> StoreResult<Vec<StageStreamLink>> {
    let inputs = discover_inputs(gw, pipeline_id, order).await?;
    let promoted: HashSet<String> = gw.promoted_codebases(pipeline_id).await?.into_iter().collect();
    let mut originals: HashMap<String, i64> = HashMap::new();
    if order > 0 {
        for source in gw.pipeline_source_streams(pipeline_id).await? {
            originals.entry(source.codebase_name).or_insert(source.stream_id);
        }
    }

    let mut links = Vec::with_capacity(inputs.len());
    let mut linked = HashSet::new();
    let mut new_streams = 0;
    for input in inputs {
        // A stale upstream output of a codebase the pipeline no longer
        // declares is left for the upstream stage's own refresh.
        let original = if order == 0 {
            Some(input.stream_id)
        } else {
            originals.get(&input.codebase_name).copied()
        };
        let Some(original) = original else {
            tracing::warn!(stage_id, codebase = %input.codebase_name, "Codebase no longer declared, input skipped");
            continue;
        };
        // One edge per codebase, even when several source branches share it.
        if !linked.insert(input.codebase_name.clone()) {
            tracing::warn!(stage_id, codebase = %input.codebase_name, "Codebase already linked, input skipped");
            continue;
        }
        let name = output_stream_name(pipeline, stage, &input.codebase_name);
        let existing = if created {
            None
        } else {
            gw.find_docker_stream_by_name(&name).await?
        };
        let output_id = match existing {
            Some(stream) => stream.id,
            None => {
                new_streams += 1;
                gw.insert_docker_stream(NewCodebaseDockerStream {
                    codebase_id: input.codebase_id,
                    codebase_branch_id: input.codebase_branch_id,
                    oc_image_stream_name: name.clone(),
                })
                .await?
            }
        };

        let input_id = if promoted.contains(&input.codebase_name) {
            input.stream_id
        } else {
            original
        };

        let link = StageStreamLink {
            cd_stage_id: stage_id,
            input_codebase_docker_stream_id: input_id,
            output_codebase_docker_stream_id: output_id,
        };
        gw.insert_stage_stream_link(link.clone()).await?;
        tracing::debug!(
            stage_id,
            codebase = %input.codebase_name,
            input = input_id,
            output = output_id,
            "Stage stream linked"
        );
        links.push(link);
    }

    if new_streams > 0 {
        crate::metrics::streams_created(new_streams);
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_names() {
        assert_eq!(branch_stream_name("svc", "master"), "svc-master");
        assert_eq!(output_stream_name("demo", "qa", "svc"), "demo-qa-svc-verified");
    }
}
