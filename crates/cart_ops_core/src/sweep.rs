use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::{CartRecord, ExitUpdate, SweepConfig};

/// Filter handed to the record store: equality on status plus an inclusive
/// upper bound on the oven entry time. The store is expected to evaluate this
/// predicate itself; [`SweepQuery::matches`] is the normative definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepQuery {
    pub status: String,
    pub entry_time_at_or_before: DateTime<Utc>,
}

impl SweepQuery {
    /// A record matches when its status equals the swept status and its entry
    /// time is at or before the cutoff (boundary inclusive). Records without
    /// an entry time never match, regardless of status.
    pub fn matches(&self, record: &CartRecord) -> bool {
        if record.status != self.status {
            return false;
        }
        match record.oven_entry_time {
            Some(entry_time) => entry_time <= self.entry_time_at_or_before,
            None => false,
        }
    }
}

pub fn sweep_cutoff(now: DateTime<Utc>, timeout_minutes: i64) -> DateTime<Utc> {
    now - Duration::minutes(timeout_minutes)
}

pub fn overdue_query(now: DateTime<Utc>, config: &SweepConfig) -> SweepQuery {
    SweepQuery {
        status: config.in_oven_status.clone(),
        entry_time_at_or_before: sweep_cutoff(now, config.timeout_minutes),
    }
}

/// Builds the field updates for one atomic exit commit. Every update carries
/// the same `oven_exit_time` so a committed batch is indistinguishable from a
/// single instantaneous transition.
pub fn exit_updates(
    matched: &[CartRecord],
    now: DateTime<Utc>,
    config: &SweepConfig,
) -> Vec<ExitUpdate> {
    matched
        .iter()
        .map(|record| ExitUpdate {
            record_id: record.record_id.clone(),
            status: config.exited_status.clone(),
            oven_exit_time: now,
            auto_exited: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0)
            .single()
            .expect("valid reference timestamp")
    }

    fn in_oven(record_id: &str, entry_time: DateTime<Utc>) -> CartRecord {
        CartRecord {
            record_id: record_id.to_string(),
            status: "InOven".to_string(),
            oven_entry_time: Some(entry_time),
            oven_exit_time: None,
            auto_exited: false,
        }
    }

    #[test]
    fn cutoff_subtracts_the_timeout_window() {
        let now = reference_now();
        let cutoff = sweep_cutoff(now, 100);
        assert_eq!(now - cutoff, Duration::minutes(100));
    }

    #[test]
    fn record_at_exactly_the_cutoff_is_included() {
        let now = reference_now();
        let query = overdue_query(now, &SweepConfig::default());

        let record = in_oven("cart-1", now - Duration::minutes(100));
        assert!(query.matches(&record));
    }

    #[test]
    fn record_one_second_inside_the_window_is_excluded() {
        let now = reference_now();
        let query = overdue_query(now, &SweepConfig::default());

        let record = in_oven(
            "cart-1",
            now - Duration::minutes(99) - Duration::seconds(59),
        );
        assert!(!query.matches(&record));
    }

    #[test]
    fn other_statuses_never_match_regardless_of_age() {
        let now = reference_now();
        let query = overdue_query(now, &SweepConfig::default());

        let mut record = in_oven("cart-1", now - Duration::minutes(500));
        record.status = "ExitedOven".to_string();
        assert!(!query.matches(&record));

        record.status = "Drying".to_string();
        assert!(!query.matches(&record));
    }

    #[test]
    fn record_without_entry_time_never_matches() {
        let now = reference_now();
        let query = overdue_query(now, &SweepConfig::default());

        let mut record = in_oven("cart-1", now);
        record.oven_entry_time = None;
        assert!(!query.matches(&record));
    }

    #[test]
    fn exit_updates_share_one_exit_time_and_mark_auto_exit() {
        let now = reference_now();
        let config = SweepConfig::default();
        let matched = vec![
            in_oven("cart-1", now - Duration::minutes(150)),
            in_oven("cart-2", now - Duration::minutes(101)),
        ];

        let updates = exit_updates(&matched, now, &config);
        assert_eq!(updates.len(), 2);
        for update in &updates {
            assert_eq!(update.status, "ExitedOven");
            assert_eq!(update.oven_exit_time, now);
            assert!(update.auto_exited);
        }
        assert_eq!(updates[0].record_id, "cart-1");
        assert_eq!(updates[1].record_id, "cart-2");
    }

    #[test]
    fn exit_updates_on_empty_match_is_empty() {
        let updates = exit_updates(&[], reference_now(), &SweepConfig::default());
        assert!(updates.is_empty());
    }
}
