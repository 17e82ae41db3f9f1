//! Third-party services referenced by pipelines.

use crate::models::third_party_service::NewThirdPartyService;
use crate::requests::ThirdPartyServiceSync;
use crate::store::{Gateway, StoreResult};

pub async fn sync(gw: &mut dyn Gateway, request: &ThirdPartyServiceSync) -> StoreResult<i64> {
    if let Some(service) = gw.find_third_party_service(&request.name).await? {
        return Ok(service.id);
    }

    let id = gw
        .insert_third_party_service(NewThirdPartyService {
            name: request.name.clone(),
            description: request.description.clone(),
            version: request.version.clone(),
        })
        .await?;
    tracing::info!(service = %request.name, service_id = id, "Third-party service created");
    Ok(id)
}
