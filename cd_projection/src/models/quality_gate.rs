//! quality_gate_stage: approval criteria attached to a stage.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::quality_gate_stage;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = quality_gate_stage)]
pub struct QualityGateRow {
    pub id: i64,
    pub quality_gate: String,
    pub step_name: String,
    pub cd_stage_id: i64,
    pub codebase_id: Option<i64>,
    pub codebase_branch_id: Option<i64>,
}

/// Either both references are set (autotests) or neither is (manual).
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = quality_gate_stage)]
pub struct NewQualityGate {
    pub quality_gate: String,
    pub step_name: String,
    pub cd_stage_id: i64,
    pub codebase_id: Option<i64>,
    pub codebase_branch_id: Option<i64>,
}
