//! Error taxonomy for projection syncs.
//!
//! Callers (reconciliation loops) only need two answers from an error: did the
//! infrastructure fail, or is a referenced entity missing? Both are requeued,
//! but structural errors are expected to clear once the missing entity lands.

use std::fmt;

/// Sub-step of a synchronization pass, attached to errors for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    ResolvePipeline,
    ResolveTooling,
    ResolveBranch,
    ResolveCodebase,
    Admission,
    Materialize,
    LinkStreams,
    QualityGates,
    Associations,
    PerfDataSources,
    UpdateStatus,
    ActionLog,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStep::ResolvePipeline => "resolve pipeline",
            SyncStep::ResolveTooling => "resolve tooling",
            SyncStep::ResolveBranch => "resolve branch",
            SyncStep::ResolveCodebase => "resolve codebase",
            SyncStep::Admission => "admission check",
            SyncStep::Materialize => "materialize",
            SyncStep::LinkStreams => "link docker streams",
            SyncStep::QualityGates => "quality gates",
            SyncStep::Associations => "associations",
            SyncStep::PerfDataSources => "perf data sources",
            SyncStep::UpdateStatus => "update status",
            SyncStep::ActionLog => "action log",
        };
        f.write_str(name)
    }
}

/// Broad classification used by callers to pick a requeue policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, pool or transaction failure.
    Transient,
    /// A referenced entity is missing or an ordering rule was violated.
    Structural,
    /// The request itself is malformed and will never succeed as-is.
    Invalid,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("invalid tenant schema name {0:?}")]
    InvalidTenant(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("previous stage (order {order}) of CD pipeline {pipeline} has not been added yet")]
    PreviousStageMissing { pipeline: String, order: i32 },

    #[error("CD pipeline {0} has not been found")]
    PipelineNotFound(String),

    #[error("codebase {0} has not been found")]
    CodebaseNotFound(String),

    #[error("autotest codebase {codebase} with branch {branch} has not been found")]
    AutotestBranchNotFound { codebase: String, branch: String },

    #[error("third-party service {0} has not been found")]
    ServiceNotFound(String),

    #[error("git server {0} has not been found")]
    GitServerNotFound(String),

    #[error("{kind} {name} has not been found")]
    JenkinsResourceNotFound { kind: &'static str, name: String },

    #[error("{step} failed: {source}")]
    Step {
        step: SyncStep,
        #[source]
        source: Box<ProjectionError>,
    },
}

impl ProjectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectionError::Database(_) | ProjectionError::Pool(_) => ErrorKind::Transient,
            ProjectionError::InvalidTenant(_) | ProjectionError::InvalidRequest(_) => {
                ErrorKind::Invalid
            }
            ProjectionError::Step { source, .. } => source.kind(),
            _ => ErrorKind::Structural,
        }
    }

    /// The innermost error, with all step wrappers removed.
    pub fn root(&self) -> &ProjectionError {
        match self {
            ProjectionError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// The outermost sub-step recorded on this error, if any.
    pub fn step(&self) -> Option<SyncStep> {
        match self {
            ProjectionError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Attaches the failing sub-step to an error.
pub trait StepContext<T> {
    fn step(self, step: SyncStep) -> Result<T, ProjectionError>;
}

impl<T> StepContext<T> for Result<T, ProjectionError> {
    fn step(self, step: SyncStep) -> Result<T, ProjectionError> {
        self.map_err(|source| match source {
            // Keep the innermost step; it is the one that actually failed.
            already @ ProjectionError::Step { .. } => already,
            source => ProjectionError::Step {
                step,
                source: Box::new(source),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_wraps_once_and_keeps_inner_step() {
        let err: Result<(), ProjectionError> =
            Err(ProjectionError::CodebaseNotFound("svc".into()));
        let err = err
            .step(SyncStep::ResolveBranch)
            .step(SyncStep::Associations)
            .unwrap_err();

        assert_eq!(err.step(), Some(SyncStep::ResolveBranch));
        assert!(matches!(err.root(), ProjectionError::CodebaseNotFound(name) if name == "svc"));
        assert_eq!(err.to_string(), "resolve branch failed: codebase svc has not been found");
    }

    #[test]
    fn kinds_follow_the_taxonomy() {
        let transient = ProjectionError::Database(diesel::result::Error::NotFound);
        assert_eq!(transient.kind(), ErrorKind::Transient);
        assert_eq!(ProjectionError::Pool("timeout".into()).kind(), ErrorKind::Transient);

        let structural = ProjectionError::PreviousStageMissing {
            pipeline: "demo".into(),
            order: 0,
        };
        assert_eq!(structural.kind(), ErrorKind::Structural);

        let wrapped = Err::<(), _>(ProjectionError::Pool("down".into()))
            .step(SyncStep::ActionLog)
            .unwrap_err();
        assert_eq!(wrapped.kind(), ErrorKind::Transient);
        assert_eq!(ProjectionError::InvalidTenant("A;".into()).kind(), ErrorKind::Invalid);
    }

    #[test]
    fn tooling_lookups_are_structural() {
        let err = Err::<(), _>(ProjectionError::JenkinsResourceNotFound {
            kind: "jenkins slave",
            name: "maven".into(),
        })
        .step(SyncStep::ResolveTooling)
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(
            err.to_string(),
            "resolve tooling failed: jenkins slave maven has not been found"
        );
        assert_eq!(
            ProjectionError::GitServerNotFound("gerrit".into()).kind(),
            ErrorKind::Structural
        );
    }
}
