//! Quality gates of a stage.

use crate::error::ProjectionError;
use crate::models::quality_gate::NewQualityGate;
use crate::requests::QualityGateSpec;
use crate::store::{Gateway, StoreResult};

/// Insert one gate row per declared gate. Autotest gates reference the
/// autotest codebase and branch; manual gates reference nothing.
pub async fn insert_gates(
    gw: &mut dyn Gateway,
    stage_id: i64,
    gates: &[QualityGateSpec],
) -> StoreResult<usize> {
    for gate in gates {
        let (codebase_id, codebase_branch_id) = match gate {
            QualityGateSpec::Autotests {
                autotest, branch, ..
            } => {
                let (codebase_id, branch_id) = gw
                    .find_autotest_branch(autotest, branch)
                    .await?
                    .ok_or_else(|| ProjectionError::AutotestBranchNotFound {
                        codebase: autotest.clone(),
                        branch: branch.clone(),
                    })?;
                (Some(codebase_id), Some(branch_id))
            }
            QualityGateSpec::Manual { .. } => (None, None),
        };

        let gate_id = gw
            .insert_quality_gate(NewQualityGate {
                quality_gate: gate.kind().to_string(),
                step_name: gate.step_name().to_lowercase(),
                cd_stage_id: stage_id,
                codebase_id,
                codebase_branch_id,
            })
            .await?;
        tracing::debug!(stage_id, gate_id, kind = gate.kind(), "Quality gate inserted");
    }
    Ok(gates.len())
}
