//! Registries of the delivery tooling: issue trackers, performance servers,
//! Jenkins agents and job provisioners, and perf data sources.
//!
//! Jira and perf servers share one row shape, as do Jenkins slaves and job
//! provisioners; a kind enum picks the table.

use std::fmt;

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{codebase_perf_data_sources, perf_data_sources};

/// Kind of tool server tracked by availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolServerKind {
    Jira,
    Perf,
}

impl ToolServerKind {
    pub fn table(&self) -> &'static str {
        match self {
            ToolServerKind::Jira => "jira_server",
            ToolServerKind::Perf => "perf_server",
        }
    }
}

impl fmt::Display for ToolServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Row of `jira_server` or `perf_server`.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize, Deserialize)]
pub struct ToolServer {
    pub id: i64,
    pub name: String,
    pub available: bool,
}

/// Jenkins-side resources a codebase can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JenkinsResourceKind {
    Slave,
    JobProvisioning,
}

impl JenkinsResourceKind {
    pub fn table(&self) -> &'static str {
        match self {
            JenkinsResourceKind::Slave => "jenkins_slave",
            JenkinsResourceKind::JobProvisioning => "job_provisioning",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JenkinsResourceKind::Slave => "jenkins slave",
            JenkinsResourceKind::JobProvisioning => "job provisioner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = perf_data_sources)]
pub struct PerfDataSource {
    pub id: i64,
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable, Queryable, Selectable)]
#[diesel(table_name = codebase_perf_data_sources)]
pub struct CodebasePerfDataSource {
    pub codebase_id: i64,
    pub data_source_id: i64,
}
