mod common;

use cd_projection::models::codebase::CodebaseType;
use cd_projection::requests::{QualityGateSpec, StageSource};
use cd_projection::store::MemoryTables;
use cd_projection::{ErrorKind, MemoryStore, ProjectionError, Projector, SyncStep};
use common::{codebase, demo, entry, pipeline, stage, tenant};

async fn tables(projector: &Projector<MemoryStore>) -> MemoryTables {
    projector.store().snapshot(&tenant()).await
}

fn stream_name(tables: &MemoryTables, stream_id: i64) -> String {
    tables.stream(stream_id).unwrap().oc_image_stream_name.clone()
}

/// (input stream name, output stream name) of every edge of the stage.
fn edges(tables: &MemoryTables, pipeline: &str, stage: &str) -> Vec<(String, String)> {
    let stage = tables.stage(pipeline, stage).unwrap();
    tables
        .links_of(stage.id)
        .into_iter()
        .map(|l| {
            (
                stream_name(tables, l.input_codebase_docker_stream_id),
                stream_name(tables, l.output_codebase_docker_stream_id),
            )
        })
        .collect()
}

fn assert_no_orphans(tables: &MemoryTables) {
    for link in &tables.stage_links {
        assert!(tables.stream(link.input_codebase_docker_stream_id).is_some());
        assert!(tables.stream(link.output_codebase_docker_stream_id).is_some());
    }
    for stream in &tables.docker_streams {
        let referenced = tables.stage_links.iter().any(|l| {
            l.input_codebase_docker_stream_id == stream.id
                || l.output_codebase_docker_stream_id == stream.id
        }) || tables
            .branches
            .iter()
            .any(|b| b.output_codebase_docker_stream_id == Some(stream.id));
        assert!(referenced, "stream {} is orphaned", stream.oc_image_stream_name);
    }
}

#[tokio::test]
async fn first_stage_is_admitted_and_later_stages_need_a_predecessor() {
    let projector = demo(&[]).await;

    projector.sync_stage(&stage("demo", "build", 0)).await.unwrap();
    projector.sync_stage(&stage("demo", "qa", 1)).await.unwrap();
    projector.sync_stage(&stage("demo", "prod", 2)).await.unwrap();

    let tables = tables(&projector).await;
    let orders: Vec<i32> = tables.stages.iter().map(|s| s.stage_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[tokio::test]
async fn out_of_order_stage_is_rejected_without_writes() {
    let projector = demo(&[]).await;
    projector.sync_stage(&stage("demo", "build", 0)).await.unwrap();
    let before = tables(&projector).await;

    let err = projector
        .sync_stage(&stage("demo", "prod", 2))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.step(), Some(SyncStep::Admission));
    assert!(matches!(
        err.root(),
        ProjectionError::PreviousStageMissing { pipeline, order: 1 } if pipeline == "demo"
    ));

    let after = tables(&projector).await;
    assert_eq!(after.stages.len(), before.stages.len());
    assert_eq!(after.docker_streams.len(), before.docker_streams.len());
    assert_eq!(after.stage_links.len(), before.stage_links.len());
    assert_eq!(after.quality_gates.len(), before.quality_gates.len());
    assert_eq!(after.action_logs.len(), before.action_logs.len());
    assert!(after.stage("demo", "prod").is_none());
}

#[tokio::test]
async fn stage_of_unknown_pipeline_is_structural() {
    let projector = demo(&[]).await;
    let err = projector
        .sync_stage(&stage("missing", "build", 0))
        .await
        .unwrap_err();
    assert_eq!(err.step(), Some(SyncStep::ResolvePipeline));
    assert!(matches!(err.root(), ProjectionError::PipelineNotFound(name) if name == "missing"));
}

#[tokio::test]
async fn demo_pipeline_chains_verified_streams() {
    let projector = demo(&[]).await;
    projector.sync_stage(&stage("demo", "build", 0)).await.unwrap();
    projector.sync_stage(&stage("demo", "qa", 1)).await.unwrap();

    let tables = tables(&projector).await;
    assert_eq!(
        edges(&tables, "demo", "build"),
        vec![("svc-master".to_string(), "demo-build-svc-verified".to_string())]
    );
    // Not promoted: qa verifies the original stream again.
    assert_eq!(
        edges(&tables, "demo", "qa"),
        vec![("svc-master".to_string(), "demo-qa-svc-verified".to_string())]
    );

    let qa_output = tables.stream_by_name("demo-qa-svc-verified").unwrap();
    let source = tables.stream_by_name("svc-master").unwrap();
    assert_eq!(qa_output.codebase_id, source.codebase_id);
    assert_eq!(qa_output.codebase_branch_id, source.codebase_branch_id);
    assert_no_orphans(&tables);
}

#[tokio::test]
async fn promoted_application_carries_previous_stage_output() {
    let projector = demo(&["svc"]).await;
    projector.sync_stage(&stage("demo", "build", 0)).await.unwrap();
    projector.sync_stage(&stage("demo", "qa", 1)).await.unwrap();
    projector.sync_stage(&stage("demo", "prod", 2)).await.unwrap();

    let tables = tables(&projector).await;
    assert_eq!(
        edges(&tables, "demo", "build"),
        vec![("svc-master".to_string(), "demo-build-svc-verified".to_string())]
    );
    assert_eq!(
        edges(&tables, "demo", "qa"),
        vec![(
            "demo-build-svc-verified".to_string(),
            "demo-qa-svc-verified".to_string()
        )]
    );
    assert_eq!(
        edges(&tables, "demo", "prod"),
        vec![(
            "demo-qa-svc-verified".to_string(),
            "demo-prod-svc-verified".to_string()
        )]
    );
}

#[tokio::test]
async fn only_promoted_codebases_follow_the_chain() {
    let projector = common::projector();
    for name in ["api", "web"] {
        projector
            .sync_codebase(&codebase(name, CodebaseType::Application))
            .await
            .unwrap();
    }
    projector
        .sync_pipeline(&pipeline(
            "shop",
            &[("api", "master"), ("web", "release")],
            &["web"],
        ))
        .await
        .unwrap();
    projector.sync_stage(&stage("shop", "dev", 0)).await.unwrap();
    projector.sync_stage(&stage("shop", "uat", 1)).await.unwrap();

    let tables = tables(&projector).await;
    assert_eq!(
        edges(&tables, "shop", "uat"),
        vec![
            ("api-master".to_string(), "shop-uat-api-verified".to_string()),
            (
                "shop-dev-web-verified".to_string(),
                "shop-uat-web-verified".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn removing_a_promotion_refreshes_the_topology() {
    let projector = demo(&["svc"]).await;
    projector.sync_stage(&stage("demo", "build", 0)).await.unwrap();
    projector.sync_stage(&stage("demo", "qa", 1)).await.unwrap();
    assert_eq!(
        edges(&tables(&projector).await, "demo", "qa")[0].0,
        "demo-build-svc-verified"
    );

    projector
        .sync_pipeline(&pipeline("demo", &[("svc", "master")], &[]))
        .await
        .unwrap();
    projector.sync_stage(&stage("demo", "qa", 1)).await.unwrap();

    let tables = tables(&projector).await;
    assert_eq!(
        edges(&tables, "demo", "qa"),
        vec![("svc-master".to_string(), "demo-qa-svc-verified".to_string())]
    );
    let qa = tables.stage("demo", "qa").unwrap();
    assert_eq!(tables.links_of(qa.id).len(), 1);
    assert_eq!(
        tables
            .docker_streams
            .iter()
            .filter(|s| s.oc_image_stream_name == "demo-qa-svc-verified")
            .count(),
        1
    );
    assert_no_orphans(&tables);
}

#[tokio::test]
async fn dropped_codebase_loses_its_edge_and_stream() {
    let projector = common::projector();
    for name in ["api", "web"] {
        projector
            .sync_codebase(&codebase(name, CodebaseType::Application))
            .await
            .unwrap();
    }
    projector
        .sync_pipeline(&pipeline("shop", &[("api", "master"), ("web", "master")], &[]))
        .await
        .unwrap();
    projector.sync_stage(&stage("shop", "dev", 0)).await.unwrap();

    projector
        .sync_pipeline(&pipeline("shop", &[("api", "master")], &[]))
        .await
        .unwrap();
    projector.sync_stage(&stage("shop", "dev", 0)).await.unwrap();

    let tables = tables(&projector).await;
    assert_eq!(
        edges(&tables, "shop", "dev"),
        vec![("api-master".to_string(), "shop-dev-api-verified".to_string())]
    );
    assert!(tables.stream_by_name("shop-dev-web-verified").is_none());
    assert_no_orphans(&tables);
}

#[tokio::test]
async fn downstream_stage_refreshed_first_skips_dropped_codebase() {
    let projector = common::projector();
    for name in ["api", "web"] {
        projector
            .sync_codebase(&codebase(name, CodebaseType::Application))
            .await
            .unwrap();
    }
    projector
        .sync_pipeline(&pipeline("shop", &[("api", "master"), ("web", "master")], &[]))
        .await
        .unwrap();
    projector.sync_stage(&stage("shop", "dev", 0)).await.unwrap();
    projector.sync_stage(&stage("shop", "qa", 1)).await.unwrap();

    projector
        .sync_pipeline(&pipeline("shop", &[("api", "master")], &[]))
        .await
        .unwrap();
    // dev still carries the web output when qa is refreshed.
    projector.sync_stage(&stage("shop", "qa", 1)).await.unwrap();

    let after_qa = tables(&projector).await;
    assert_eq!(
        edges(&after_qa, "shop", "qa"),
        vec![("api-master".to_string(), "shop-qa-api-verified".to_string())]
    );
    assert!(after_qa.stream_by_name("shop-qa-web-verified").is_none());
    assert!(after_qa.stream_by_name("shop-dev-web-verified").is_some());
    assert_no_orphans(&after_qa);

    projector.sync_stage(&stage("shop", "dev", 0)).await.unwrap();
    let after_dev = tables(&projector).await;
    assert!(after_dev.stream_by_name("shop-dev-web-verified").is_none());
    assert_no_orphans(&after_dev);
}

#[tokio::test]
async fn output_consumed_downstream_survives_upstream_refresh() {
    let projector = demo(&["svc"]).await;
    projector.sync_stage(&stage("demo", "build", 0)).await.unwrap();
    projector.sync_stage(&stage("demo", "qa", 1)).await.unwrap();
    let build_output = tables(&projector)
        .await
        .stream_by_name("demo-build-svc-verified")
        .unwrap()
        .id;

    projector.sync_stage(&stage("demo", "build", 0)).await.unwrap();

    let tables = tables(&projector).await;
    assert_eq!(
        tables.stream_by_name("demo-build-svc-verified").unwrap().id,
        build_output
    );
    assert_eq!(
        edges(&tables, "demo", "qa")[0].0,
        "demo-build-svc-verified".to_string()
    );
    assert_no_orphans(&tables);
}

#[tokio::test]
async fn stage_resync_is_idempotent() {
    let projector = demo(&[]).await;
    let mut build = stage("demo", "build", 0);
    build.action_log = Some(entry("created", "accept_cd_stage_registration", 5, 0));

    let first_id = projector.sync_stage(&build).await.unwrap();
    let first = tables(&projector).await;
    let second_id = projector.sync_stage(&build).await.unwrap();
    let second = tables(&projector).await;

    assert_eq!(first_id, second_id);
    assert_eq!(first.stages.len(), second.stages.len());
    assert_eq!(first.stage_links, second.stage_links);
    assert_eq!(
        first
            .docker_streams
            .iter()
            .map(|s| (s.id, s.oc_image_stream_name.clone()))
            .collect::<Vec<_>>(),
        second
            .docker_streams
            .iter()
            .map(|s| (s.id, s.oc_image_stream_name.clone()))
            .collect::<Vec<_>>()
    );
    assert_eq!(second.quality_gates.len(), 1);
    assert_eq!(second.action_logs.len(), 1);
    assert_eq!(second.action_log_links.len(), 1);
}

#[tokio::test]
async fn stage_status_changes_are_applied() {
    let projector = demo(&[]).await;
    let mut build = stage("demo", "build", 0);
    projector.sync_stage(&build).await.unwrap();

    build.status = "active".into();
    build.action_log = Some(entry("Active", "create_jenkins_pipeline", 9, 0));
    projector.sync_stage(&build).await.unwrap();

    let tables = tables(&projector).await;
    let stored = tables.stage("demo", "build").unwrap();
    assert_eq!(stored.status, "active");
    let logs = tables.logs_of(cd_projection::models::action_log::ActionLogOwner::Stage(stored.id));
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].event, "active");
    assert_eq!(logs[0].action_message, "Create Jenkins pipeline for CD Stage build");
}

#[tokio::test]
async fn quality_gate_kinds_are_exclusive() {
    let projector = demo(&[]).await;
    projector
        .sync_codebase(&codebase("e2e", CodebaseType::Autotests))
        .await
        .unwrap();
    projector
        .sync_branch(&cd_projection::requests::BranchSync {
            tenant: tenant(),
            codebase: "e2e".into(),
            name: "master".into(),
            from_commit: String::new(),
            status: "active".into(),
            action_log: None,
        })
        .await
        .unwrap();

    let mut build = stage("demo", "build", 0);
    build.quality_gates = vec![
        QualityGateSpec::Autotests {
            step_name: "Smoke".into(),
            autotest: "e2e".into(),
            branch: "master".into(),
        },
        QualityGateSpec::Manual {
            step_name: "approve".into(),
        },
    ];
    let stage_id = projector.sync_stage(&build).await.unwrap();

    let tables = tables(&projector).await;
    let gates = tables.gates_of(stage_id);
    assert_eq!(gates.len(), 2);
    for gate in gates {
        match gate.quality_gate.as_str() {
            "autotests" => {
                assert_eq!(gate.step_name, "smoke");
                assert!(gate.codebase_id.is_some() && gate.codebase_branch_id.is_some());
            }
            "manual" => assert!(gate.codebase_id.is_none() && gate.codebase_branch_id.is_none()),
            other => panic!("unexpected gate kind {other}"),
        }
    }
}

#[tokio::test]
async fn unknown_autotest_rolls_back_the_whole_stage() {
    let projector = demo(&[]).await;
    let before = tables(&projector).await;

    let mut build = stage("demo", "build", 0);
    build.quality_gates = vec![QualityGateSpec::Autotests {
        step_name: "smoke".into(),
        autotest: "e2e".into(),
        branch: "master".into(),
    }];
    let err = projector.sync_stage(&build).await.unwrap_err();

    assert_eq!(err.step(), Some(SyncStep::QualityGates));
    assert!(matches!(err.root(), ProjectionError::AutotestBranchNotFound { .. }));

    let after = tables(&projector).await;
    assert!(after.stage("demo", "build").is_none());
    assert_eq!(after.docker_streams.len(), before.docker_streams.len());
    assert!(after.stage_links.is_empty());
}

#[tokio::test]
async fn library_source_binds_the_stage_to_a_branch() {
    let projector = demo(&[]).await;
    projector
        .sync_codebase(&codebase("templates", CodebaseType::Library))
        .await
        .unwrap();

    let mut build = stage("demo", "build", 0);
    build.source = StageSource::Library {
        codebase: "templates".into(),
        branch: "master".into(),
    };
    projector.sync_stage(&build).await.unwrap();

    let tables = tables(&projector).await;
    let stored = tables.stage("demo", "build").unwrap();
    let branch = tables
        .branches
        .iter()
        .find(|b| Some(b.id) == stored.codebase_branch_id)
        .unwrap();
    assert_eq!(branch.name, "master");
    // Libraries own no image streams.
    assert!(tables.stream_by_name("templates-master").is_none());
}
