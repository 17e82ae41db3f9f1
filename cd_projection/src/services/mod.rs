//! Projection services. Each takes the transaction-bound gateway and never
//! opens or commits a transaction itself.

pub mod action_log_service;
pub mod branch_service;
pub mod codebase_service;
pub mod docker_stream_service;
pub mod git_server_service;
pub mod jenkins_service;
pub mod perf_data_source_service;
pub mod pipeline_service;
pub mod quality_gate_service;
pub mod stage_service;
pub mod third_party_service;
pub mod tool_server_service;
