use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use cart_ops_core::contract::{
    StoreUnavailable, SweepConfig, SweepReport, SWEEP_REPORT_SCHEMA_VERSION,
};
use cart_ops_core::sweep::{exit_updates, overdue_query};

use crate::adapters::record_store::RecordStore;

/// One sweep: query overdue records, commit the exit transition for all of
/// them as a single unit, report the count. Empty match is a valid no-op and
/// produces no write call.
pub fn run_sweep(
    now: DateTime<Utc>,
    config: &SweepConfig,
    store: &dyn RecordStore,
) -> Result<SweepReport, StoreUnavailable> {
    let query = overdue_query(now, config);
    let matched = store
        .query_overdue(&query)
        .map_err(|error| StoreUnavailable::new("query", error))?;

    if matched.is_empty() {
        return Ok(SweepReport {
            transitioned: 0,
            cutoff: query.entry_time_at_or_before,
            swept_at: now,
            schema_version: SWEEP_REPORT_SCHEMA_VERSION.to_string(),
        });
    }

    let updates = exit_updates(&matched, now, config);
    store
        .commit_exits(&updates)
        .map_err(|error| StoreUnavailable::new("commit", error))?;

    Ok(SweepReport {
        transitioned: updates.len(),
        cutoff: query.entry_time_at_or_before,
        swept_at: now,
        schema_version: SWEEP_REPORT_SCHEMA_VERSION.to_string(),
    })
}

/// Invocation boundary for the periodic trigger. A failed sweep is logged and
/// swallowed so the scheduler always sees a successful completion; the next
/// scheduled run re-queries and catches any still-overdue records.
pub fn handle_sweep_tick(
    now: DateTime<Utc>,
    config: &SweepConfig,
    store: &dyn RecordStore,
) -> Value {
    match run_sweep(now, config, store) {
        Ok(report) if report.transitioned == 0 => {
            log_sweep_info(
                "no_overdue_carts",
                json!({
                    "cutoff": report.cutoff.to_rfc3339(),
                }),
            );
            json!({ "status": "ok", "transitioned": 0 })
        }
        Ok(report) => {
            log_sweep_info(
                "carts_auto_exited",
                json!({
                    "transitioned": report.transitioned,
                    "cutoff": report.cutoff.to_rfc3339(),
                    "swept_at": report.swept_at.to_rfc3339(),
                }),
            );
            json!({ "status": "ok", "transitioned": report.transitioned })
        }
        Err(error) => {
            log_sweep_error(
                "sweep_failed",
                json!({
                    "operation": error.operation(),
                    "error": error.message(),
                }),
            );
            json!({ "status": "ok", "transitioned": 0, "deferred": true })
        }
    }
}

fn log_sweep_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "sweep_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_sweep_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "sweep_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
