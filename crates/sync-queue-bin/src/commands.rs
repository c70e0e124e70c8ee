//! Subcommand implementations.

use crate::replica::StoreChecksumReplica;
use anyhow::{bail, Context};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use sync_config_and_utils::{Config, Paths};
use sync_endpoints::{EndpointConfig, RequestContext, SyncEndpoints};
use sync_queue::Queue;
use sync_queue_store::{ItemStore, SqliteItemStore};
use tracing::info;

/// Open (creating if needed) the configured SQLite database.
pub fn open_store(config: &Config, paths: &Paths) -> anyhow::Result<Arc<dyn ItemStore>> {
    let path = config.database_file(paths);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = SqliteItemStore::open(&path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn parse_json(label: &str, raw: Option<&str>, default: Value) -> anyhow::Result<Value> {
    match raw {
        Some(raw) => serde_json::from_str(raw).with_context(|| format!("{label} is not valid JSON")),
        None => Ok(default),
    }
}

pub fn append(
    store: Arc<dyn ItemStore>,
    queue: &str,
    action: &str,
    args: Option<&str>,
    user_id: Option<i64>,
) -> anyhow::Result<()> {
    let args = parse_json("args", args, json!([]))?;
    let microtime = format!("{:.6}", Utc::now().timestamp_micros() as f64 / 1_000_000.0);
    let queue = Queue::new(queue, store)?;

    let id = queue.append(&json!([action, args, user_id, microtime, false]))?;
    info!(queue = queue.name(), item_id = %id, "Appended action");
    println!("{id}");
    Ok(())
}

pub fn size(store: Arc<dyn ItemStore>, queue: &str) -> anyhow::Result<()> {
    let queue = Queue::new(queue, store)?;
    println!("{}", queue.size()?);
    Ok(())
}

pub fn peek(store: Arc<dyn ItemStore>, queue: &str) -> anyhow::Result<()> {
    let queue = Queue::new(queue, store)?;
    for item in queue.get_all()? {
        println!("{}\t{}", item.id, item.value);
    }
    Ok(())
}

pub fn reset(store: Arc<dyn ItemStore>, queue: &str) -> anyhow::Result<()> {
    Queue::new(queue, store)?.reset()?;
    Ok(())
}

pub fn flush(store: Arc<dyn ItemStore>, queue: &str) -> anyhow::Result<()> {
    let queue = Queue::new(queue, store)?;
    for value in queue.flush_all()? {
        println!("{value}");
    }
    Ok(())
}

pub async fn request(
    store: Arc<dyn ItemStore>,
    config: &Config,
    method: &str,
    params: Option<&str>,
) -> anyhow::Result<()> {
    let params = parse_json("params", params, Value::Null)?;
    let endpoints = SyncEndpoints::new(store.clone(), EndpointConfig::from_config(config)?)
        .with_replica(Arc::new(StoreChecksumReplica::new(store)));

    let raw = json!({ "id": "cli", "method": method, "params": params }).to_string();
    let response = endpoints.handle_json(&raw, &RequestContext::default()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let Some(error) = response.error {
        bail!("{} failed: {}", method, error.message);
    }
    Ok(())
}
