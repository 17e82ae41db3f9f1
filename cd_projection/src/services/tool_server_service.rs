//! Jira and perf servers, tracked by name and availability.

use crate::requests::ToolServerSync;
use crate::store::{Gateway, StoreResult};

pub async fn sync(gw: &mut dyn Gateway, request: &ToolServerSync) -> StoreResult<i64> {
    if let Some(server) = gw.find_tool_server(request.kind, &request.name).await? {
        if server.available != request.available {
            gw.update_tool_server_availability(request.kind, server.id, request.available)
                .await?;
            tracing::info!(
                kind = %request.kind,
                server = %request.name,
                available = request.available,
                "Tool server availability updated"
            );
        }
        return Ok(server.id);
    }

    let id = gw
        .insert_tool_server(request.kind, &request.name, request.available)
        .await?;
    tracing::info!(kind = %request.kind, server = %request.name, server_id = id, "Tool server created");
    Ok(id)
}
