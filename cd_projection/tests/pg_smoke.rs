mod common;

use cd_projection::migration::run_migration;
use cd_projection::models::codebase::CodebaseType;
use cd_projection::{
    Gateway, PgStore, ProjectionConfig, ProjectionError, Projector, Store, TenantSchema,
};
use chrono::Utc;
use diesel_async::SimpleAsyncConnection;

const SMOKE_SCHEMA: &str = "cd_projection_smoke";

#[tokio::test]
async fn stage_chain_round_trip_against_postgres() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let config = ProjectionConfig::from_env();
    let store = PgStore::connect(&config).expect("pool");
    let tenant = TenantSchema::new(SMOKE_SCHEMA).unwrap();
    {
        let mut conn = store.pool().get().await.expect("connection");
        conn.batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS {SMOKE_SCHEMA}"))
            .await
            .expect("schema");
        run_migration(&mut conn, &tenant).await.expect("migration");
    }
    let projector = Projector::new(store);

    // Unique names so reruns against the same database do not collide.
    let run = Utc::now().timestamp_micros();
    let svc = format!("svc{run}");
    let demo = format!("demo{run}");

    let mut codebase = common::codebase(&svc, CodebaseType::Application);
    codebase.tenant = tenant.clone();
    projector.sync_codebase(&codebase).await.expect("codebase");

    let mut pipeline = common::pipeline(&demo, &[(svc.as_str(), "master")], &[svc.as_str()]);
    pipeline.tenant = tenant.clone();
    pipeline.action_log = Some(common::entry("created", "cd_pipeline_registration", 1, 500));
    let stored = projector.sync_pipeline(&pipeline).await.expect("pipeline");
    assert_eq!(projector.sync_pipeline(&pipeline).await.expect("resync").id, stored.id);

    let mut prod = common::stage(&demo, "prod", 2);
    prod.tenant = tenant.clone();
    let err = projector.sync_stage(&prod).await.unwrap_err();
    assert!(matches!(err.root(), ProjectionError::PreviousStageMissing { .. }));

    for (name, order) in [("build", 0), ("qa", 1)] {
        let mut request = common::stage(&demo, name, order);
        request.tenant = tenant.clone();
        projector.sync_stage(&request).await.expect("stage");
        projector.sync_stage(&request).await.expect("stage resync");
    }

    let build_output = format!("{demo}-build-{svc}-verified");
    let qa_output = format!("{demo}-qa-{svc}-verified");
    let pipeline_name = demo.clone();
    let (links, build_stream, qa_stream) = projector
        .store()
        .transaction(&tenant, move |gw| {
            Box::pin(async move {
                let pipeline = gw.find_pipeline(&pipeline_name).await?.expect("pipeline");
                let qa = gw.find_stage(pipeline.id, "qa").await?.expect("qa stage");
                let links = gw.stage_stream_links(qa.id).await?;
                let build_stream = gw.find_docker_stream_by_name(&build_output).await?;
                let qa_stream = gw.find_docker_stream_by_name(&qa_output).await?;
                Ok((links, build_stream, qa_stream))
            })
        })
        .await
        .expect("read back");

    let build_stream = build_stream.expect("build output stream");
    let qa_stream = qa_stream.expect("qa output stream");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].input_codebase_docker_stream_id, build_stream.id);
    assert_eq!(links[0].output_codebase_docker_stream_id, qa_stream.id);
}
