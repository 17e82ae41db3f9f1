//! codebase + codebase_branch: source repositories and their branches.

use std::fmt;
use std::str::FromStr;

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{codebase, codebase_branch};

/// Kind of codebase. Only applications own docker image streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodebaseType {
    Application,
    Library,
    Autotests,
}

impl CodebaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodebaseType::Application => "application",
            CodebaseType::Library => "library",
            CodebaseType::Autotests => "autotests",
        }
    }
}

impl fmt::Display for CodebaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodebaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "application" => Ok(CodebaseType::Application),
            "library" => Ok(CodebaseType::Library),
            "autotests" => Ok(CodebaseType::Autotests),
            other => Err(format!("unknown codebase type {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = codebase)]
pub struct Codebase {
    pub id: i64,
    pub name: String,
    pub codebase_type: String,
    pub status: String,
    pub git_server_id: Option<i64>,
    pub jenkins_slave_id: Option<i64>,
    pub job_provisioning_id: Option<i64>,
}

impl Codebase {
    pub fn is_application(&self) -> bool {
        self.codebase_type.parse::<CodebaseType>() == Ok(CodebaseType::Application)
    }
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = codebase)]
pub struct NewCodebase {
    pub name: String,
    pub codebase_type: String,
    pub status: String,
    pub git_server_id: Option<i64>,
    pub jenkins_slave_id: Option<i64>,
    pub job_provisioning_id: Option<i64>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = codebase_branch)]
pub struct CodebaseBranch {
    pub id: i64,
    pub name: String,
    pub codebase_id: i64,
    pub from_commit: String,
    pub status: String,
    pub output_codebase_docker_stream_id: Option<i64>,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = codebase_branch)]
pub struct NewCodebaseBranch {
    pub name: String,
    pub codebase_id: i64,
    pub from_commit: String,
    pub status: String,
}
