//! Inbound synchronization requests.
//!
//! These are plain data objects handed over by the watch layer, one per
//! entity kind. Optional fields are typed as such; nothing downstream checks
//! for "empty" placeholders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::codebase::CodebaseType;
use crate::models::tooling::ToolServerKind;
use crate::tenant::TenantSchema;

/// Status change reported by the orchestrator, recorded in the action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    /// Raw orchestrator status, e.g. `"In Progress"`.
    pub event: String,
    #[serde(default)]
    pub detailed_message: String,
    #[serde(default)]
    pub username: String,
    pub updated_at: DateTime<Utc>,
    /// Action code, e.g. `accept_cd_pipeline_registration`.
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub result: String,
}

/// A codebase branch referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub codebase: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSync {
    pub tenant: TenantSchema,
    pub name: String,
    #[serde(default)]
    pub branches: Vec<BranchRef>,
    #[serde(default)]
    pub third_party_services: Vec<String>,
    /// Codebase names whose artifacts are promoted stage to stage.
    #[serde(default)]
    pub applications_to_promote: Vec<String>,
    pub status: String,
    #[serde(default)]
    pub action_log: Option<ActionLogEntry>,
}

/// Where a stage takes its deployment templates from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", try_from = "RawStageSource")]
pub enum StageSource {
    #[default]
    Default,
    Library { codebase: String, branch: String },
}

/// Wire shape of `StageSource`; the type tag is matched case-insensitively.
#[derive(Deserialize)]
struct RawStageSource {
    #[serde(rename = "type")]
    kind: String,
    codebase: Option<String>,
    branch: Option<String>,
}

impl TryFrom<RawStageSource> for StageSource {
    type Error = String;

    fn try_from(raw: RawStageSource) -> Result<Self, Self::Error> {
        match raw.kind.to_lowercase().as_str() {
            "default" => Ok(StageSource::Default),
            "library" => match (raw.codebase, raw.branch) {
                (Some(codebase), Some(branch)) => Ok(StageSource::Library { codebase, branch }),
                _ => Err("library stage source needs codebase and branch".to_string()),
            },
            other => Err(format!("unknown stage source type {other:?}")),
        }
    }
}

/// Quality gate declared on a stage. The two kinds are exclusive by
/// construction: only autotest gates carry a codebase reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "quality_gate", rename_all = "lowercase", try_from = "RawQualityGate")]
pub enum QualityGateSpec {
    Autotests {
        step_name: String,
        autotest: String,
        branch: String,
    },
    Manual {
        step_name: String,
    },
}

/// Wire shape of `QualityGateSpec`. The orchestrator reports the gate kind
/// in any case (`Autotests`, `manual`).
#[derive(Deserialize)]
struct RawQualityGate {
    quality_gate: String,
    step_name: String,
    autotest: Option<String>,
    branch: Option<String>,
}

impl TryFrom<RawQualityGate> for QualityGateSpec {
    type Error = String;

    fn try_from(raw: RawQualityGate) -> Result<Self, Self::Error> {
        match raw.quality_gate.to_lowercase().as_str() {
            "autotests" => match (raw.autotest, raw.branch) {
                (Some(autotest), Some(branch)) => Ok(QualityGateSpec::Autotests {
                    step_name: raw.step_name,
                    autotest,
                    branch,
                }),
                _ => Err(format!(
                    "autotests quality gate {:?} needs autotest and branch",
                    raw.step_name
                )),
            },
            "manual" => Ok(QualityGateSpec::Manual {
                step_name: raw.step_name,
            }),
            other => Err(format!("unknown quality gate kind {other:?}")),
        }
    }
}

impl QualityGateSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            QualityGateSpec::Autotests { .. } => "autotests",
            QualityGateSpec::Manual { .. } => "manual",
        }
    }

    pub fn step_name(&self) -> &str {
        match self {
            QualityGateSpec::Autotests { step_name, .. } | QualityGateSpec::Manual { step_name } => {
                step_name
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSync {
    pub tenant: TenantSchema,
    pub pipeline: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_trigger_type")]
    pub trigger_type: String,
    pub order: i32,
    #[serde(default)]
    pub source: StageSource,
    #[serde(default)]
    pub quality_gates: Vec<QualityGateSpec>,
    pub status: String,
    #[serde(default)]
    pub action_log: Option<ActionLogEntry>,
}

fn default_trigger_type() -> String {
    "manual".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSync {
    pub tenant: TenantSchema,
    pub codebase: String,
    pub name: String,
    #[serde(default)]
    pub from_commit: String,
    pub status: String,
    #[serde(default)]
    pub action_log: Option<ActionLogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseSync {
    pub tenant: TenantSchema,
    pub name: String,
    #[serde(rename = "type")]
    pub codebase_type: CodebaseType,
    pub status: String,
    /// Git server the codebase is imported from. Resolved on creation only.
    #[serde(default)]
    pub git_server: Option<String>,
    #[serde(default)]
    pub jenkins_slave: Option<String>,
    #[serde(default)]
    pub job_provisioning: Option<String>,
    /// Perf data source types, attached on every sync.
    #[serde(default)]
    pub perf_data_sources: Vec<String>,
    #[serde(default)]
    pub action_log: Option<ActionLogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThirdPartyServiceSync {
    pub tenant: TenantSchema,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
}

/// Git server availability. The server counts as available when the last
/// action reported `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitServerSync {
    pub tenant: TenantSchema,
    pub name: String,
    #[serde(default)]
    pub git_host: String,
    #[serde(default)]
    pub action_log: Option<ActionLogEntry>,
}

impl GitServerSync {
    pub fn available(&self) -> bool {
        self.action_log
            .as_ref()
            .is_some_and(|entry| entry.result == "success")
    }
}

/// Jira or perf server availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerSync {
    pub tenant: TenantSchema,
    pub kind: ToolServerKind,
    pub name: String,
    #[serde(default)]
    pub available: bool,
}

/// Jenkins agents and job provisioners announced by a Jenkins instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JenkinsSync {
    pub tenant: TenantSchema,
    #[serde(default)]
    pub slaves: Vec<String>,
    #[serde(default)]
    pub job_provisions: Vec<String>,
}

/// Detach one perf data source from a codebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfDataSourceRemoval {
    pub tenant: TenantSchema,
    pub codebase: String,
    pub data_source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_request_from_json() {
        let json = r#"{
            "tenant": "acme",
            "pipeline": "demo",
            "name": "qa",
            "order": 1,
            "source": { "type": "library", "codebase": "templates", "branch": "master" },
            "quality_gates": [
                { "quality_gate": "autotests", "step_name": "smoke", "autotest": "e2e", "branch": "master" },
                { "quality_gate": "manual", "step_name": "approve" }
            ],
            "status": "created"
        }"#;

        let stage: StageSync = serde_json::from_str(json).unwrap();
        assert_eq!(stage.trigger_type, "manual");
        assert_eq!(
            stage.source,
            StageSource::Library {
                codebase: "templates".into(),
                branch: "master".into()
            }
        );
        assert_eq!(stage.quality_gates[0].kind(), "autotests");
        assert_eq!(stage.quality_gates[1].step_name(), "approve");
        assert!(stage.action_log.is_none());
    }

    #[test]
    fn gate_kind_and_source_type_ignore_case() {
        let json = r#"{
            "tenant": "acme",
            "pipeline": "demo",
            "name": "qa",
            "order": 1,
            "source": { "type": "Library", "codebase": "templates", "branch": "master" },
            "quality_gates": [
                { "quality_gate": "Autotests", "step_name": "smoke", "autotest": "e2e", "branch": "master" },
                { "quality_gate": "MANUAL", "step_name": "approve" }
            ],
            "status": "created"
        }"#;

        let stage: StageSync = serde_json::from_str(json).unwrap();
        assert!(matches!(stage.source, StageSource::Library { .. }));
        assert_eq!(stage.quality_gates[0].kind(), "autotests");
        assert_eq!(stage.quality_gates[1].kind(), "manual");
    }

    #[test]
    fn malformed_gates_are_rejected() {
        let unknown = r#"{ "quality_gate": "sonar", "step_name": "scan" }"#;
        assert!(serde_json::from_str::<QualityGateSpec>(unknown).is_err());

        let incomplete = r#"{ "quality_gate": "autotests", "step_name": "smoke" }"#;
        let err = serde_json::from_str::<QualityGateSpec>(incomplete).unwrap_err();
        assert!(err.to_string().contains("needs autotest and branch"));
    }

    #[test]
    fn gates_serialize_with_lowercase_tag() {
        let gate = QualityGateSpec::Manual {
            step_name: "approve".into(),
        };
        let json = serde_json::to_value(&gate).unwrap();
        assert_eq!(json["quality_gate"], "manual");
        assert_eq!(serde_json::from_value::<QualityGateSpec>(json).unwrap(), gate);
    }

    #[test]
    fn pipeline_request_defaults_collections() {
        let json = r#"{ "tenant": "acme", "name": "demo", "status": "active" }"#;
        let pipeline: PipelineSync = serde_json::from_str(json).unwrap();
        assert!(pipeline.branches.is_empty());
        assert!(pipeline.applications_to_promote.is_empty());
    }

    #[test]
    fn codebase_tooling_is_optional() {
        let json = r#"{ "tenant": "acme", "name": "api", "type": "application", "status": "active" }"#;
        let codebase: CodebaseSync = serde_json::from_str(json).unwrap();
        assert!(codebase.git_server.is_none());
        assert!(codebase.jenkins_slave.is_none());
        assert!(codebase.perf_data_sources.is_empty());
    }

    #[test]
    fn git_server_availability_follows_action_result() {
        let json = r#"{
            "tenant": "acme",
            "name": "gerrit",
            "git_host": "gerrit.acme.io",
            "action_log": { "event": "created", "updated_at": "2024-01-01T00:00:00Z", "result": "success" }
        }"#;
        let server: GitServerSync = serde_json::from_str(json).unwrap();
        assert!(server.available());

        let bare = r#"{ "tenant": "acme", "name": "gerrit" }"#;
        let server: GitServerSync = serde_json::from_str(bare).unwrap();
        assert!(!server.available());
    }

    #[test]
    fn tool_server_kind_is_lowercase() {
        let json = r#"{ "tenant": "acme", "kind": "jira", "name": "tracker", "available": true }"#;
        let server: ToolServerSync = serde_json::from_str(json).unwrap();
        assert_eq!(server.kind, ToolServerKind::Jira);
        assert!(serde_json::from_str::<ToolServerSync>(&json.replace("jira", "sonar")).is_err());
    }

    #[test]
    fn invalid_tenant_is_rejected_at_the_boundary() {
        let json = r#"{ "tenant": "Acme Corp", "name": "demo", "status": "active" }"#;
        assert!(serde_json::from_str::<PipelineSync>(json).is_err());
    }
}
