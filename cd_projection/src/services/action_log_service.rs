//! Append-only audit trail with duplicate suppression.
//!
//! The orchestrator redelivers the same status update many times. An entry is
//! keyed by its owner, its normalized event and its timestamp truncated to
//! whole seconds; a second entry with the same key is dropped silently.

use chrono::SubsecRound;

use crate::models::action_log::{ActionLogOwner, NewActionLog};
use crate::requests::ActionLogEntry;
use crate::store::{Gateway, StoreResult};

/// Natural key of the entity an entry is written for, used to render the
/// human readable action message.
#[derive(Debug, Clone, Copy)]
pub enum ActionSubject<'a> {
    Pipeline { name: &'a str },
    Stage { name: &'a str },
    Codebase { name: &'a str },
    Branch { codebase: &'a str, branch: &'a str },
}

/// `"In Progress"` becomes `in_progress`.
pub fn normalize_event(status: &str) -> String {
    status.to_lowercase().replace(' ', "_")
}

/// Message describing `action` for `subject`; empty for unknown actions.
pub fn action_message(subject: ActionSubject<'_>, action: &str) -> String {
    match subject {
        ActionSubject::Pipeline { name } => match action {
            "accept_cd_pipeline_registration" => format!("Accept CD Pipeline {name} registration"),
            "jenkins_configuration" => format!("CI Jenkins pipelines {name} provisioning"),
            "setup_initial_structure" => {
                format!("Initial structure for CD Pipeline {name} is created")
            }
            "cd_pipeline_registration" => format!("CD Pipeline {name} registration"),
            "create_jenkins_directory" => {
                format!("Create directory in Jenkins for CD Pipeline {name}")
            }
            _ => String::new(),
        },
        ActionSubject::Stage { name } => match action {
            "accept_cd_stage_registration" => format!("Accept CD Stage {name} registration"),
            "fetching_user_settings_config_map" => format!(
                "Fetch User Settings from config map during CD Stage {name} provision"
            ),
            "openshift_project_creation" => format!("Create Openshift Project for Stage {name}"),
            "jenkins_configuration" => format!("CI Jenkins pipelines {name} provisioning"),
            "setup_deployment_templates" => format!("Setup deployment templates for cd_stage {name}"),
            "create_jenkins_pipeline" => format!("Create Jenkins pipeline for CD Stage {name}"),
            _ => String::new(),
        },
        ActionSubject::Codebase { name } => match action {
            "codebase_registration" => format!("Codebase {name} registration"),
            "accept_codebase_registration" => format!("Accept codebase {name} registration"),
            "gerrit_repository_provisioning" => {
                format!("Gerrit repository for codebase {name} provisioning")
            }
            "jenkins_configuration" => format!("CI Jenkins pipelines codebase {name} provisioning"),
            "perf_registration" => format!("Registration codebase {name} in Perf"),
            "setup_deployment_templates" => format!("Setup deployment templates for codebase {name}"),
            _ => String::new(),
        },
        ActionSubject::Branch { codebase, branch } => match action {
            "jenkins_configuration" => format!(
                "CI Jenkins pipelines for codebase branch {branch} provisioning for codebase {codebase}"
            ),
            "codebase_branch_registration" => {
                format!("Branch {branch} for codebase {codebase} registration")
            }
            "accept_codebase_branch_registration" => {
                format!("Accept branch {branch} for codebase {codebase} registration")
            }
            _ => String::new(),
        },
    }
}

/// Record `entry` for `owner` unless an identical entry is already linked.
///
/// Returns the new log id, or `None` when nothing was written.
pub async fn record(
    gw: &mut dyn Gateway,
    owner: ActionLogOwner,
    subject: ActionSubject<'_>,
    entry: Option<&ActionLogEntry>,
) -> StoreResult<Option<i64>> {
    let Some(entry) = entry else {
        return Ok(None);
    };

    let event = normalize_event(&entry.event);
    let updated_at = entry.updated_at.trunc_subsecs(0);

    if gw.action_log_exists(owner, &event, updated_at).await? {
        crate::metrics::action_log_skipped(owner.entity());
        tracing::warn!(
            entity = owner.entity(),
            event = %event,
            updated_at = %updated_at,
            "Duplicate action log entry skipped"
        );
        return Ok(None);
    }

    let log_id = gw
        .insert_action_log(NewActionLog {
            event,
            detailed_message: entry.detailed_message.clone(),
            username: entry.username.clone(),
            updated_at,
            action: entry.action.clone(),
            result: entry.result.clone(),
            action_message: action_message(subject, &entry.action),
        })
        .await?;
    gw.link_action_log(owner, log_id).await?;

    tracing::debug!(entity = owner.entity(), log_id, "Action log recorded");
    Ok(Some(log_id))
}
