use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SWEEP_REPORT_SCHEMA_VERSION: &str = "v1";
pub const DEFAULT_OVEN_TIMEOUT_MINUTES: i64 = 100;
/// One year. Anything beyond this is a misconfigured deployment, and cutoff
/// arithmetic must stay far away from the timestamp range limits.
pub const MAX_TIMEOUT_MINUTES: i64 = 60 * 24 * 365;
pub const STATUS_IN_OVEN: &str = "InOven";
pub const STATUS_EXITED_OVEN: &str = "ExitedOven";

/// Snapshot of a cart record as read from the record store. The sweeper only
/// cares about this subset of fields; everything else stays with the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartRecord {
    pub record_id: String,
    pub status: String,
    pub oven_entry_time: Option<DateTime<Utc>>,
    pub oven_exit_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_exited: bool,
}

/// One field update in the atomic exit commit. `oven_exit_time` is identical
/// for every update produced by a single sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitUpdate {
    pub record_id: String,
    pub status: String,
    pub oven_exit_time: DateTime<Utc>,
    pub auto_exited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    pub transitioned: usize,
    pub cutoff: DateTime<Utc>,
    pub swept_at: DateTime<Utc>,
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepConfig {
    pub timeout_minutes: i64,
    pub in_oven_status: String,
    pub exited_status: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_OVEN_TIMEOUT_MINUTES,
            in_oven_status: STATUS_IN_OVEN.to_string(),
            exited_status: STATUS_EXITED_OVEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Query or commit failure against the record store. Treated as transient:
/// the boundary logs it and the next scheduled sweep retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUnavailable {
    operation: &'static str,
    message: String,
}

impl StoreUnavailable {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for StoreUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store unavailable during {}: {}", self.operation, self.message)
    }
}

impl std::error::Error for StoreUnavailable {}

pub fn normalize_config(config: SweepConfig) -> Result<SweepConfig, ValidationError> {
    if config.timeout_minutes <= 0 {
        return Err(ValidationError::new(
            "timeout_minutes must be a positive number of minutes",
        ));
    }

    if config.timeout_minutes > MAX_TIMEOUT_MINUTES {
        return Err(ValidationError::new(format!(
            "timeout_minutes exceeds MAX_TIMEOUT_MINUTES={MAX_TIMEOUT_MINUTES}"
        )));
    }

    let in_oven_status = config.in_oven_status.trim().to_string();
    if in_oven_status.is_empty() {
        return Err(ValidationError::new("in_oven_status cannot be empty"));
    }

    let exited_status = config.exited_status.trim().to_string();
    if exited_status.is_empty() {
        return Err(ValidationError::new("exited_status cannot be empty"));
    }

    if in_oven_status == exited_status {
        return Err(ValidationError::new(
            "in_oven_status and exited_status must be distinct",
        ));
    }

    Ok(SweepConfig {
        timeout_minutes: config.timeout_minutes,
        in_oven_status,
        exited_status,
    })
}
