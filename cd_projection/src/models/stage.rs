//! cd_stage: one ordered step of a CD pipeline.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::cd_stage;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = cd_stage)]
pub struct CdStage {
    pub id: i64,
    pub name: String,
    pub cd_pipeline_id: i64,
    pub description: String,
    pub trigger_type: String,
    pub stage_order: i32,
    pub status: String,
    pub codebase_branch_id: Option<i64>,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = cd_stage)]
pub struct NewCdStage {
    pub name: String,
    pub cd_pipeline_id: i64,
    pub description: String,
    pub trigger_type: String,
    pub stage_order: i32,
    pub status: String,
    pub codebase_branch_id: Option<i64>,
}
