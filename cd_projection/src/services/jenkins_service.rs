//! Jenkins slaves and job provisioners. Rows are only ever added; a resource
//! that disappears from Jenkins stays referenced by the codebases bound to it.

use crate::models::tooling::JenkinsResourceKind;
use crate::requests::JenkinsSync;
use crate::store::{Gateway, StoreResult};

/// Create the missing slaves and job provisioners, returning how many rows
/// were added.
pub async fn sync(gw: &mut dyn Gateway, request: &JenkinsSync) -> StoreResult<usize> {
    let mut created = 0;
    created += ensure(gw, JenkinsResourceKind::Slave, &request.slaves).await?;
    created += ensure(
        gw,
        JenkinsResourceKind::JobProvisioning,
        &request.job_provisions,
    )
    .await?;
    Ok(created)
}

async fn ensure(
    gw: &mut dyn Gateway,
    kind: JenkinsResourceKind,
    names: &[String],
) -> StoreResult<usize> {
    let mut created = 0;
    for name in names {
        if gw.find_jenkins_resource(kind, name).await?.is_some() {
            continue;
        }
        let id = gw.insert_jenkins_resource(kind, name).await?;
        tracing::info!(kind = kind.label(), name = %name, id, "Jenkins resource created");
        created += 1;
    }
    Ok(created)
}
