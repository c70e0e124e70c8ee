//! Full-sync scheduling.

use crate::collaborators::FullSyncScheduler;
use crate::endpoints::SyncEndpoints;
use crate::EndpointResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use sync_queue_store::ItemStore;
use tracing::info;

/// Store key of the pending full-sync job.
pub const FULL_SYNC_SCHEDULE_KEY: &str = "meta:full_sync_schedule";

/// How much of a module a full sync covers.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleScope {
    All,
    Ids(Vec<String>),
    /// Users only: the initial set recorded at connection time.
    Initial,
}

impl ModuleScope {
    pub fn to_value(&self) -> Value {
        match self {
            ModuleScope::All => Value::Bool(true),
            ModuleScope::Ids(ids) => json!(ids),
            ModuleScope::Initial => Value::String("initial".to_string()),
        }
    }
}

/// Module name to scope.
pub type FullSyncModules = BTreeMap<String, ModuleScope>;

/// `sync.schedule` params; all comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct ScheduleParams {
    #[serde(default)]
    pub modules: Option<String>,
    #[serde(default)]
    pub posts: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub users: Option<String>,
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn schedule params into a module filter. `None` means every module.
pub fn parse_schedule_params(params: &ScheduleParams) -> Option<FullSyncModules> {
    let mut modules = FullSyncModules::new();

    if let Some(list) = &params.modules {
        for name in split_list(list) {
            modules.insert(name, ModuleScope::All);
        }
    }

    for (name, list) in [
        ("posts", &params.posts),
        ("comments", &params.comments),
        ("users", &params.users),
    ] {
        let Some(list) = list else { continue };
        if name == "users" && list.trim() == "initial" {
            modules.insert(name.to_string(), ModuleScope::Initial);
            continue;
        }
        let ids = split_list(list);
        if !ids.is_empty() {
            modules.insert(name.to_string(), ModuleScope::Ids(ids));
        }
    }

    (!modules.is_empty()).then_some(modules)
}

pub(crate) fn modules_to_value(modules: &FullSyncModules) -> Value {
    Value::Object(
        modules
            .iter()
            .map(|(name, scope)| (name.clone(), scope.to_value()))
            .collect(),
    )
}

#[derive(Debug, Serialize, Deserialize)]
struct ScheduledJob {
    id: String,
    /// `null` for every module.
    modules: Value,
    scheduled_at: String,
}

/// Scheduler that records the pending job in the item store.
///
/// A host application's full-sync runner picks the job up from
/// [`FULL_SYNC_SCHEDULE_KEY`]; scheduling again replaces it.
pub struct StoreFullSyncScheduler {
    store: Arc<dyn ItemStore>,
}

impl StoreFullSyncScheduler {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn job(&self) -> EndpointResult<Option<ScheduledJob>> {
        match self.store.get(FULL_SYNC_SCHEDULE_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl FullSyncScheduler for StoreFullSyncScheduler {
    fn schedule(&self, modules: Option<&FullSyncModules>) -> EndpointResult<Value> {
        let job = ScheduledJob {
            id: uuid::Uuid::new_v4().to_string(),
            modules: modules.map(modules_to_value).unwrap_or(Value::Null),
            scheduled_at: Utc::now().to_rfc3339(),
        };
        self.store
            .put(FULL_SYNC_SCHEDULE_KEY, &serde_json::to_vec(&job)?)?;
        info!(job_id = %job.id, modules = %job.modules, "Scheduled full sync");
        Ok(Value::String(job.id))
    }

    fn is_scheduled(&self) -> EndpointResult<bool> {
        Ok(self.job()?.is_some())
    }

    fn status(&self) -> EndpointResult<Map<String, Value>> {
        let mut status = Map::new();
        match self.job()? {
            Some(job) => {
                status.insert("scheduled_job".into(), Value::String(job.id));
                status.insert("scheduled_at".into(), Value::String(job.scheduled_at));
                status.insert("config".into(), job.modules);
            }
            None => {
                status.insert("scheduled_job".into(), Value::Null);
                status.insert("scheduled_at".into(), Value::Null);
                status.insert("config".into(), Value::Null);
            }
        }
        Ok(status)
    }
}

impl SyncEndpoints {
    /// Schedule a full sync. Returns `{"scheduled": <job id>}`.
    pub fn schedule(&self, params: ScheduleParams) -> EndpointResult<Value> {
        let modules = parse_schedule_params(&params);
        let scheduled = self.scheduler.schedule(modules.as_ref())?;
        Ok(json!({ "scheduled": scheduled }))
    }
}
