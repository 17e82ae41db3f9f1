//! codebase_docker_stream + stage_codebase_docker_stream: image lineage.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{codebase_docker_stream, stage_codebase_docker_stream};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = codebase_docker_stream)]
pub struct CodebaseDockerStream {
    pub id: i64,
    pub codebase_id: i64,
    pub codebase_branch_id: Option<i64>,
    pub oc_image_stream_name: String,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = codebase_docker_stream)]
pub struct NewCodebaseDockerStream {
    pub codebase_id: i64,
    pub codebase_branch_id: Option<i64>,
    pub oc_image_stream_name: String,
}

/// Edge linking a stage to the input and output stream of one codebase.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = stage_codebase_docker_stream)]
pub struct StageStreamLink {
    pub cd_stage_id: i64,
    pub input_codebase_docker_stream_id: i64,
    pub output_codebase_docker_stream_id: i64,
}

/// A stream flowing into a stage, together with the codebase it carries.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize)]
pub struct StreamSource {
    pub stream_id: i64,
    pub codebase_id: i64,
    pub codebase_name: String,
    pub codebase_branch_id: Option<i64>,
}
