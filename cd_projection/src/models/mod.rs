//! Row models for the CD reporting schema.

pub mod action_log;
pub mod codebase;
pub mod docker_stream;
pub mod git_server;
pub mod pipeline;
pub mod quality_gate;
pub mod stage;
pub mod third_party_service;
pub mod tooling;
