#![allow(dead_code)]

use cd_projection::models::codebase::CodebaseType;
use cd_projection::requests::{
    ActionLogEntry, BranchRef, CodebaseSync, PipelineSync, QualityGateSpec, StageSource,
    StageSync, ThirdPartyServiceSync,
};
use cd_projection::{MemoryStore, Projector, TenantSchema};
use chrono::{Duration, TimeZone, Utc};

pub fn tenant() -> TenantSchema {
    TenantSchema::new("acme").unwrap()
}

pub fn projector() -> Projector<MemoryStore> {
    Projector::new(MemoryStore::new())
}

pub fn entry(event: &str, action: &str, second: u32, nanos: u32) -> ActionLogEntry {
    ActionLogEntry {
        event: event.into(),
        detailed_message: String::new(),
        username: "operator".into(),
        updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, second).unwrap()
            + Duration::nanoseconds(i64::from(nanos)),
        action: action.into(),
        result: "success".into(),
    }
}

pub fn codebase(name: &str, codebase_type: CodebaseType) -> CodebaseSync {
    CodebaseSync {
        tenant: tenant(),
        name: name.into(),
        codebase_type,
        status: "active".into(),
        git_server: None,
        jenkins_slave: None,
        job_provisioning: None,
        perf_data_sources: vec![],
        action_log: None,
    }
}

pub fn pipeline(name: &str, branches: &[(&str, &str)], promote: &[&str]) -> PipelineSync {
    PipelineSync {
        tenant: tenant(),
        name: name.into(),
        branches: branches
            .iter()
            .map(|(codebase, branch)| BranchRef {
                codebase: (*codebase).into(),
                branch: (*branch).into(),
            })
            .collect(),
        third_party_services: vec![],
        applications_to_promote: promote.iter().map(|c| (*c).to_string()).collect(),
        status: "active".into(),
        action_log: None,
    }
}

pub fn stage(pipeline: &str, name: &str, order: i32) -> StageSync {
    StageSync {
        tenant: tenant(),
        pipeline: pipeline.into(),
        name: name.into(),
        description: format!("{name} environment"),
        trigger_type: "manual".into(),
        order,
        source: StageSource::Default,
        quality_gates: vec![QualityGateSpec::Manual {
            step_name: "approve".into(),
        }],
        status: "created".into(),
        action_log: None,
    }
}

pub fn service(name: &str) -> ThirdPartyServiceSync {
    ThirdPartyServiceSync {
        tenant: tenant(),
        name: name.into(),
        description: format!("{name} service"),
        version: "1.0".into(),
    }
}

/// Projector with an application codebase `svc` and pipeline `demo`
/// building `svc` from `master`.
pub async fn demo(promote: &[&str]) -> Projector<MemoryStore> {
    let projector = projector();
    projector
        .sync_codebase(&codebase("svc", CodebaseType::Application))
        .await
        .unwrap();
    projector
        .sync_pipeline(&pipeline("demo", &[("svc", "master")], promote))
        .await
        .unwrap();
    projector
}
