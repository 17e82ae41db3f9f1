//! Git servers codebases are imported from.

use crate::models::git_server::NewGitServer;
use crate::requests::GitServerSync;
use crate::store::{Gateway, StoreResult};

/// Create the server or refresh its availability. The hostname is fixed at
/// creation.
pub async fn sync(gw: &mut dyn Gateway, request: &GitServerSync) -> StoreResult<i64> {
    let available = request.available();

    if let Some(server) = gw.find_git_server(&request.name).await? {
        if server.available != available {
            gw.update_git_server_availability(server.id, available)
                .await?;
            tracing::info!(git_server = %request.name, available, "Git server availability updated");
        }
        return Ok(server.id);
    }

    let id = gw
        .insert_git_server(NewGitServer {
            name: request.name.clone(),
            hostname: request.git_host.clone(),
            available,
        })
        .await?;
    tracing::info!(
        git_server = %request.name,
        git_host = %request.git_host,
        git_server_id = id,
        "Git server created"
    );
    Ok(id)
}
