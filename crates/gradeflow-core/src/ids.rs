use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Hand out a process-unique run id for provenance and log correlation.
///
/// This counter is the pipeline's only shared mutable state; concurrent runs
/// increment it without coordination.
pub fn next_run_id() -> u64 {
    NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed)
}
