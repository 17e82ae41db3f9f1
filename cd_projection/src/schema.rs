//! Diesel table definitions for the CD reporting schema.
//!
//! Tables are unqualified: every transaction selects the tenant schema through
//! `search_path` before the first statement runs.

diesel::table! {
    git_server (id) {
        id -> Int8,
        name -> Varchar,
        hostname -> Varchar,
        available -> Bool,
    }
}

diesel::table! {
    jira_server (id) {
        id -> Int8,
        name -> Varchar,
        available -> Bool,
    }
}

diesel::table! {
    perf_server (id) {
        id -> Int8,
        name -> Varchar,
        available -> Bool,
    }
}

diesel::table! {
    jenkins_slave (id) {
        id -> Int8,
        name -> Varchar,
    }
}

diesel::table! {
    job_provisioning (id) {
        id -> Int8,
        name -> Varchar,
    }
}

diesel::table! {
    perf_data_sources (id) {
        id -> Int8,
        #[sql_name = "type"]
        source_type -> Varchar,
    }
}

diesel::table! {
    codebase_perf_data_sources (codebase_id, data_source_id) {
        codebase_id -> Int8,
        data_source_id -> Int8,
    }
}

diesel::table! {
    codebase (id) {
        id -> Int8,
        name -> Varchar,
        #[sql_name = "type"]
        codebase_type -> Varchar,
        status -> Varchar,
        git_server_id -> Nullable<Int8>,
        jenkins_slave_id -> Nullable<Int8>,
        job_provisioning_id -> Nullable<Int8>,
    }
}

diesel::table! {
    codebase_branch (id) {
        id -> Int8,
        name -> Varchar,
        codebase_id -> Int8,
        from_commit -> Varchar,
        status -> Varchar,
        output_codebase_docker_stream_id -> Nullable<Int8>,
    }
}

diesel::table! {
    codebase_docker_stream (id) {
        id -> Int8,
        codebase_id -> Int8,
        codebase_branch_id -> Nullable<Int8>,
        oc_image_stream_name -> Varchar,
    }
}

diesel::table! {
    cd_pipeline (id) {
        id -> Int8,
        name -> Varchar,
        status -> Varchar,
    }
}

diesel::table! {
    cd_pipeline_codebase_branch (cd_pipeline_id, codebase_branch_id) {
        cd_pipeline_id -> Int8,
        codebase_branch_id -> Int8,
    }
}

diesel::table! {
    third_party_service (id) {
        id -> Int8,
        name -> Varchar,
        description -> Varchar,
        version -> Varchar,
    }
}

diesel::table! {
    cd_pipeline_third_party_service (cd_pipeline_id, third_party_service_id) {
        cd_pipeline_id -> Int8,
        third_party_service_id -> Int8,
    }
}

diesel::table! {
    applications_to_promote (cd_pipeline_id, codebase_id) {
        cd_pipeline_id -> Int8,
        codebase_id -> Int8,
    }
}

diesel::table! {
    cd_stage (id) {
        id -> Int8,
        name -> Varchar,
        cd_pipeline_id -> Int8,
        description -> Varchar,
        trigger_type -> Varchar,
        #[sql_name = "order"]
        stage_order -> Int4,
        status -> Varchar,
        codebase_branch_id -> Nullable<Int8>,
    }
}

diesel::table! {
    stage_codebase_docker_stream (cd_stage_id, output_codebase_docker_stream_id) {
        cd_stage_id -> Int8,
        input_codebase_docker_stream_id -> Int8,
        output_codebase_docker_stream_id -> Int8,
    }
}

diesel::table! {
    quality_gate_stage (id) {
        id -> Int8,
        quality_gate -> Varchar,
        step_name -> Varchar,
        cd_stage_id -> Int8,
        codebase_id -> Nullable<Int8>,
        codebase_branch_id -> Nullable<Int8>,
    }
}

diesel::table! {
    action_log (id) {
        id -> Int8,
        event -> Varchar,
        detailed_message -> Text,
        username -> Varchar,
        updated_at -> Timestamptz,
        action -> Varchar,
        result -> Varchar,
        action_message -> Text,
    }
}

diesel::table! {
    cd_pipeline_action_log (cd_pipeline_id, action_log_id) {
        cd_pipeline_id -> Int8,
        action_log_id -> Int8,
    }
}

diesel::table! {
    cd_stage_action_log (cd_stage_id, action_log_id) {
        cd_stage_id -> Int8,
        action_log_id -> Int8,
    }
}

diesel::table! {
    codebase_action_log (codebase_id, action_log_id) {
        codebase_id -> Int8,
        action_log_id -> Int8,
    }
}

diesel::table! {
    codebase_branch_action_log (codebase_branch_id, action_log_id) {
        codebase_branch_id -> Int8,
        action_log_id -> Int8,
    }
}

// Foreign key relationships. Streams and branches reference each other in
// both directions, so those joins spell out their ON clause instead.
diesel::joinable!(codebase_branch -> codebase (codebase_id));
diesel::joinable!(codebase -> git_server (git_server_id));
diesel::joinable!(codebase_perf_data_sources -> perf_data_sources (data_source_id));
diesel::joinable!(cd_stage -> cd_pipeline (cd_pipeline_id));
diesel::joinable!(quality_gate_stage -> cd_stage (cd_stage_id));

diesel::allow_tables_to_appear_in_same_query!(
    git_server,
    jira_server,
    perf_server,
    jenkins_slave,
    job_provisioning,
    perf_data_sources,
    codebase_perf_data_sources,
    codebase,
    codebase_branch,
    codebase_docker_stream,
    cd_pipeline,
    cd_pipeline_codebase_branch,
    third_party_service,
    cd_pipeline_third_party_service,
    applications_to_promote,
    cd_stage,
    stage_codebase_docker_stream,
    quality_gate_stage,
    action_log,
    cd_pipeline_action_log,
    cd_stage_action_log,
    codebase_action_log,
    codebase_branch_action_log,
);
