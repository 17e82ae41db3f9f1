//! cd_pipeline and its association tables.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{
    applications_to_promote, cd_pipeline, cd_pipeline_codebase_branch,
    cd_pipeline_third_party_service,
};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = cd_pipeline)]
pub struct CdPipeline {
    pub id: i64,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = cd_pipeline)]
pub struct NewCdPipeline {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable, Queryable)]
#[diesel(table_name = cd_pipeline_codebase_branch)]
pub struct PipelineBranch {
    pub cd_pipeline_id: i64,
    pub codebase_branch_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable, Queryable)]
#[diesel(table_name = cd_pipeline_third_party_service)]
pub struct PipelineService {
    pub cd_pipeline_id: i64,
    pub third_party_service_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable, Queryable)]
#[diesel(table_name = applications_to_promote)]
pub struct PipelinePromotion {
    pub cd_pipeline_id: i64,
    pub codebase_id: i64,
}
