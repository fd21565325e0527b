use std::collections::HashMap;

use aws_sdk_dynamodb::types::{AttributeValue, TransactWriteItem, Update};
use chrono::{DateTime, TimeZone, Utc};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use cart_ops_core::contract::{normalize_config, CartRecord, ExitUpdate, SweepConfig};
use cart_ops_core::sweep::SweepQuery;
use cart_ops_lambda::adapters::record_store::RecordStore;
use cart_ops_lambda::handlers::sweep::handle_sweep_tick;

/// DynamoDB-backed record store. Entry/exit timestamps are stored as epoch
/// milliseconds so the GSI range condition orders chronologically.
struct DynamoRecordStore {
    table: String,
    status_index: String,
    dynamo_client: aws_sdk_dynamodb::Client,
}

// DynamoDB caps a TransactWriteItems call at 100 items. Each chunk commits
// all-or-nothing; records in a failed chunk stay in-oven for the next sweep.
const TRANSACTION_ITEM_CAP: usize = 100;

impl RecordStore for DynamoRecordStore {
    fn query_overdue(&self, query: &SweepQuery) -> Result<Vec<CartRecord>, String> {
        let table = self.table.clone();
        let index = self.status_index.clone();
        let status = query.status.clone();
        let cutoff_millis = query.entry_time_at_or_before.timestamp_millis();
        let client = self.dynamo_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut records = Vec::new();
                let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

                loop {
                    let output = client
                        .query()
                        .table_name(&table)
                        .index_name(&index)
                        .key_condition_expression("#status = :status AND ovenEntryTime <= :cutoff")
                        .expression_attribute_names("#status", "status")
                        .expression_attribute_values(":status", AttributeValue::S(status.clone()))
                        .expression_attribute_values(
                            ":cutoff",
                            AttributeValue::N(cutoff_millis.to_string()),
                        )
                        .set_exclusive_start_key(exclusive_start_key.take())
                        .send()
                        .await
                        .map_err(|error| format!("failed to query cart records: {error}"))?;

                    for item in output.items() {
                        records.push(parse_cart_record(item)?);
                    }

                    match output.last_evaluated_key() {
                        Some(key) => exclusive_start_key = Some(key.clone()),
                        None => break,
                    }
                }

                Ok(records)
            })
        })
    }

    fn commit_exits(&self, updates: &[ExitUpdate]) -> Result<(), String> {
        let table = self.table.clone();
        let updates = updates.to_vec();
        let client = self.dynamo_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                for chunk in updates.chunks(TRANSACTION_ITEM_CAP) {
                    let mut items = Vec::with_capacity(chunk.len());
                    for update in chunk {
                        items.push(exit_transact_item(&table, update)?);
                    }

                    client
                        .transact_write_items()
                        .set_transact_items(Some(items))
                        .send()
                        .await
                        .map_err(|error| format!("failed to commit exit transaction: {error}"))?;
                }

                Ok(())
            })
        })
    }
}

fn exit_transact_item(table: &str, update: &ExitUpdate) -> Result<TransactWriteItem, String> {
    let dynamo_update = Update::builder()
        .table_name(table)
        .key("recordId", AttributeValue::S(update.record_id.clone()))
        .update_expression("SET #status = :status, ovenExitTime = :exit, autoExited = :auto")
        .expression_attribute_names("#status", "status")
        .expression_attribute_values(":status", AttributeValue::S(update.status.clone()))
        .expression_attribute_values(
            ":exit",
            AttributeValue::N(update.oven_exit_time.timestamp_millis().to_string()),
        )
        .expression_attribute_values(":auto", AttributeValue::Bool(update.auto_exited))
        .build()
        .map_err(|error| format!("failed to build exit update: {error}"))?;

    Ok(TransactWriteItem::builder().update(dynamo_update).build())
}

fn parse_cart_record(item: &HashMap<String, AttributeValue>) -> Result<CartRecord, String> {
    let record_id = string_field(item, "recordId")?;
    let status = string_field(item, "status")?;
    let oven_entry_time = optional_millis_field(item, "ovenEntryTime")?;
    let oven_exit_time = optional_millis_field(item, "ovenExitTime")?;
    let auto_exited = item
        .get("autoExited")
        .and_then(|value| value.as_bool().ok())
        .copied()
        .unwrap_or(false);

    Ok(CartRecord {
        record_id,
        status,
        oven_entry_time,
        oven_exit_time,
        auto_exited,
    })
}

fn string_field(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String, String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(|value| value.to_string())
        .ok_or_else(|| format!("cart record is missing string attribute '{name}'"))
}

fn optional_millis_field(
    item: &HashMap<String, AttributeValue>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, String> {
    let Some(value) = item.get(name) else {
        return Ok(None);
    };

    let millis = value
        .as_n()
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| format!("attribute '{name}' must be an epoch-millisecond number"))?;

    Utc.timestamp_millis_opt(millis)
        .single()
        .map(Some)
        .ok_or_else(|| format!("attribute '{name}' is out of timestamp range"))
}

/// The scheduled event's `time` field is the trigger's snapshot of "now";
/// the cutoff is computed against it so logging timezones never shift the
/// window. Wall clock is the fallback for manual invocations.
fn resolve_now(event: &Value) -> DateTime<Utc> {
    event
        .get("time")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn resolve_sweep_config() -> Result<SweepConfig, Error> {
    let mut config = SweepConfig::default();
    if let Ok(raw) = std::env::var("OVEN_TIMEOUT_MINUTES") {
        config.timeout_minutes = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::from("OVEN_TIMEOUT_MINUTES must be an integer"))?;
    }

    normalize_config(config).map_err(|error| Error::from(error.message().to_string()))
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let table = std::env::var("CART_RECORDS_TABLE")
        .map_err(|_| Error::from("CART_RECORDS_TABLE must be configured"))?;
    let status_index = std::env::var("OVEN_STATUS_INDEX")
        .unwrap_or_else(|_| "status-ovenEntryTime-index".to_string());
    let config = resolve_sweep_config()?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = DynamoRecordStore {
        table,
        status_index,
        dynamo_client: aws_sdk_dynamodb::Client::new(&aws_config),
    };

    let now = resolve_now(&event.payload);
    Ok(handle_sweep_tick(now, &config, &store))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
