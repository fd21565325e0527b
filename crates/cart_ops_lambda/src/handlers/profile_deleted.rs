use serde_json::{json, Value};

use crate::adapters::identity::IdentityStore;

/// Cascade handler for profile-document deletions: every REMOVE'd profile key
/// gets its identity record deleted. A failed delete is logged and counted
/// but never fails the invocation; the stream trigger must not retry-storm.
pub fn handle_profile_removal_event(event: &Value, identity: &dyn IdentityStore) -> Value {
    let Some(records) = event.get("Records").and_then(Value::as_array) else {
        log_cascade_error(
            "malformed_stream_event",
            json!({ "error": "stream event must include Records array" }),
        );
        return json!({ "status": "ok", "deleted": 0, "failed": 0 });
    };

    let mut deleted = 0usize;
    let mut failed = 0usize;
    for record in records {
        // A record that cannot be decoded is counted and skipped; the rest of
        // the batch still cascades (the stream will not redeliver it).
        let user_id = match removed_user_id(record) {
            Ok(Some(value)) => value,
            Ok(None) => continue,
            Err(message) => {
                failed += 1;
                log_cascade_error("malformed_stream_record", json!({ "error": message }));
                continue;
            }
        };

        match identity.delete_account(&user_id) {
            Ok(()) => {
                deleted += 1;
                log_cascade_info("auth_record_deleted", json!({ "user_id": user_id }));
            }
            Err(error) => {
                failed += 1;
                log_cascade_error(
                    "auth_record_delete_failed",
                    json!({ "user_id": user_id, "error": error }),
                );
            }
        }
    }

    json!({ "status": "ok", "deleted": deleted, "failed": failed })
}

/// Pulls the profile key out of one DynamoDB Streams record. `Ok(None)` for
/// INSERT and MODIFY records, which are not this handler's concern.
pub fn removed_user_id(record: &Value) -> Result<Option<String>, String> {
    let event_name = record
        .get("eventName")
        .and_then(Value::as_str)
        .ok_or_else(|| "stream record must carry eventName".to_string())?;
    if event_name != "REMOVE" {
        return Ok(None);
    }

    let user_id = record
        .pointer("/dynamodb/Keys/userId/S")
        .and_then(Value::as_str)
        .ok_or_else(|| "REMOVE record must carry Keys.userId".to_string())?;
    Ok(Some(user_id.to_string()))
}

fn log_cascade_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "profile_cascade_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_cascade_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "profile_cascade_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
