//! Perf data sources attached to codebases.
//!
//! Source types are stored uppercased, so `sonar` and `SONAR` name the same
//! source.

use crate::requests::PerfDataSourceRemoval;
use crate::store::{Gateway, StoreResult};

fn normalize(source_type: &str) -> String {
    source_type.trim().to_uppercase()
}

/// Get or create each source and link it to the codebase when not linked yet.
pub async fn attach(
    gw: &mut dyn Gateway,
    codebase_id: i64,
    source_types: &[String],
) -> StoreResult<()> {
    for raw in source_types {
        let source_type = normalize(raw);
        if source_type.is_empty() {
            continue;
        }
        let source_id = match gw.find_perf_data_source(&source_type).await? {
            Some(source) => source.id,
            None => {
                let id = gw.insert_perf_data_source(&source_type).await?;
                tracing::info!(source_type = %source_type, id, "Perf data source created");
                id
            }
        };
        if gw
            .codebase_perf_data_source_exists(codebase_id, source_id)
            .await?
        {
            continue;
        }
        gw.insert_codebase_perf_data_source(codebase_id, source_id)
            .await?;
        tracing::info!(codebase_id, source_type = %source_type, "Perf data source attached");
    }
    Ok(())
}

/// Detach a source from a codebase. Unknown codebases or sources detach
/// nothing and return `false`.
pub async fn remove(gw: &mut dyn Gateway, request: &PerfDataSourceRemoval) -> StoreResult<bool> {
    let Some(codebase) = gw.find_codebase(&request.codebase).await? else {
        return Ok(false);
    };
    let Some(source) = gw
        .find_perf_data_source(&normalize(&request.data_source))
        .await?
    else {
        return Ok(false);
    };
    let removed = gw
        .delete_codebase_perf_data_source(codebase.id, source.id)
        .await?;
    if removed {
        tracing::info!(
            codebase = %request.codebase,
            source_type = %source.source_type,
            "Perf data source detached"
        );
    }
    Ok(removed)
}
