//! Projection metrics. No exporter is installed here; the host process owns
//! the recorder.

use metrics::{counter, histogram};

/// Record the outcome of one synchronization pass.
pub fn sync_finished(entity: &'static str, outcome: &'static str) {
    counter!("cd_projection_syncs_total", "entity" => entity, "outcome" => outcome).increment(1);
}

/// Record how long one synchronization pass took, commit included.
pub fn sync_duration(entity: &'static str, duration_ms: u64) {
    histogram!("cd_projection_sync_duration_ms", "entity" => entity).record(duration_ms as f64);
}

/// Record an action log entry skipped as a redelivered duplicate.
pub fn action_log_skipped(entity: &'static str) {
    counter!("cd_projection_action_logs_skipped_total", "entity" => entity).increment(1);
}

/// Record newly created codebase docker streams.
pub fn streams_created(count: usize) {
    counter!("cd_projection_streams_created_total").increment(count as u64);
}
