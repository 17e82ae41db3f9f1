//! action_log + per-entity join tables: append-only audit trail.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::action_log;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = action_log)]
pub struct ActionLogRow {
    pub id: i64,
    pub event: String,
    pub detailed_message: String,
    pub username: String,
    pub updated_at: DateTime<Utc>,
    pub action: String,
    pub result: String,
    pub action_message: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = action_log)]
pub struct NewActionLog {
    pub event: String,
    pub detailed_message: String,
    pub username: String,
    pub updated_at: DateTime<Utc>,
    pub action: String,
    pub result: String,
    pub action_message: String,
}

/// Entity an action log entry belongs to, by relational id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionLogOwner {
    Pipeline(i64),
    Stage(i64),
    Codebase(i64),
    Branch(i64),
}

impl ActionLogOwner {
    pub fn entity(&self) -> &'static str {
        match self {
            ActionLogOwner::Pipeline(_) => "cd_pipeline",
            ActionLogOwner::Stage(_) => "cd_stage",
            ActionLogOwner::Codebase(_) => "codebase",
            ActionLogOwner::Branch(_) => "codebase_branch",
        }
    }
}
