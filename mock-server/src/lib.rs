//! In-memory stand-in for the manager API's scenario endpoints.
//!
//! Every handler answers HTTP 200 with the business envelope
//! `{ "code", "msg", "data" }`; failures use code 500 and a message, as the
//! real backend does. Rows are kept as JSON objects so fields the mock
//! does not interpret survive a save/read round-trip untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// The business envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiResult {
    pub code: i32,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn ok(data: impl Serialize) -> Json<ApiResult> {
    Json(ApiResult {
        code: 0,
        msg: "success".to_string(),
        data: Some(serde_json::to_value(data).unwrap_or(Value::Null)),
    })
}

fn fail(msg: impl Into<String>) -> Json<ApiResult> {
    let msg = msg.into();
    warn!(%msg, "request rejected");
    Json(ApiResult {
        code: 500,
        msg,
        data: None,
    })
}

type Row = Map<String, Value>;

/// Rows of one resource keyed by their id field.
#[derive(Debug)]
struct Table {
    id_field: &'static str,
    rows: BTreeMap<String, Row>,
}

impl Table {
    fn new(id_field: &'static str) -> Self {
        Self {
            id_field,
            rows: BTreeMap::new(),
        }
    }

    fn insert(&mut self, mut row: Row) -> String {
        let id = match row.get(self.id_field).and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().simple().to_string(),
        };
        row.insert(self.id_field.to_string(), Value::String(id.clone()));
        self.rows.insert(id.clone(), row);
        id
    }

    /// Overwrite the fields present and non-null in `patch`.
    fn merge(&mut self, id: &str, patch: Row) -> bool {
        let Some(row) = self.rows.get_mut(id) else {
            return false;
        };
        for (k, v) in patch {
            if !v.is_null() && k != self.id_field {
                row.insert(k, v);
            }
        }
        true
    }

    fn select(&self, pred: impl Fn(&Row) -> bool) -> Vec<Row> {
        self.rows.values().filter(|r| pred(r)).cloned().collect()
    }
}

#[derive(Debug)]
pub struct Store {
    scenarios: Table,
    steps: Table,
    templates: Table,
    records: Table,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            scenarios: Table::new("scenarioId"),
            steps: Table::new("stepId"),
            templates: Table::new("templateId"),
            records: Table::new("recordId"),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/scenario", post(save_scenario))
        .route("/scenario/list", get(list_scenarios))
        .route("/scenario/{id}", get(get_scenario).put(update_scenario).delete(delete_scenario))
        .route("/scenario/{id}/toggle", put(toggle_scenario))
        .route("/scenario/agent/{agent_id}", get(scenarios_by_agent))
        .route("/scenario/active/{scenario_type}", get(active_scenarios_by_type))
        .route("/scenario-step/list/{scenario_id}", get(list_steps))
        .route("/scenario-step/batch-save/{scenario_id}", post(batch_save_steps))
        .route("/scenario-step/count/{scenario_id}", get(count_steps))
        .route("/scenario-step/{id}", axum::routing::delete(delete_step))
        .route("/xiaozhi/step-template", post(save_template))
        .route("/xiaozhi/step-template/list", get(list_templates))
        .route("/xiaozhi/step-template/default", get(default_templates))
        .route("/xiaozhi/step-template/default/{template_type}", get(default_template_by_type))
        .route("/xiaozhi/step-template/type/{template_type}", get(templates_by_type))
        .route(
            "/xiaozhi/step-template/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/xiaozhi/learning-record", post(save_record))
        .route("/xiaozhi/learning-record/list", get(list_records))
        .route("/xiaozhi/learning-record/statistics", get(record_statistics))
        .route("/xiaozhi/learning-record/agent/{agent_id}", get(records_by_agent))
        .route("/xiaozhi/learning-record/scenario/{scenario_id}", get(records_by_scenario))
        .route("/xiaozhi/learning-record/child/{child_name}", get(records_by_child))
        .route(
            "/xiaozhi/learning-record/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn str_field<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

fn int_field(row: &Row, key: &str) -> i64 {
    row.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// Accepts `true`/`false` or an integer and stores 0/1.
fn normalize_flag(row: &mut Row, key: &str) {
    let flag = match row.get(key) {
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::Number(n)) => i64::from(n.as_i64().unwrap_or(0) != 0),
        _ => return,
    };
    row.insert(key.to_string(), json!(flag));
}

fn sort_by(rows: &mut [Row], key: &str) {
    rows.sort_by_key(|r| int_field(r, key));
}

fn matches_filters(row: &Row, params: &HashMap<String, String>, keys: &[&str]) -> bool {
    keys.iter().all(|key| match params.get(*key).filter(|v| !v.is_empty()) {
        None => true,
        Some(want) => match row.get(*key) {
            Some(Value::String(s)) => s.contains(want.as_str()),
            Some(other) => other.to_string() == *want,
            None => false,
        },
    })
}

fn page(rows: Vec<Row>, params: &HashMap<String, String>) -> Value {
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).filter(|p| *p > 0).unwrap_or(1);
    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).filter(|l| *l > 0).unwrap_or(10);
    let total = rows.len();
    let offset = (page - 1).checked_mul(limit).unwrap_or(usize::MAX);
    let list: Vec<Row> = rows.into_iter().skip(offset).take(limit).collect();
    json!({ "total": total, "list": list })
}

fn as_row(body: Value) -> Option<Row> {
    match body {
        Value::Object(row) => Some(row),
        _ => None,
    }
}

fn format_duration(seconds: i64) -> String {
    let (m, s) = (seconds / 60, seconds % 60);
    if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

async fn list_scenarios(State(db): State<Db>, Query(params): Query<HashMap<String, String>>) -> Json<ApiResult> {
    let store = db.read().await;
    let mut rows = store
        .scenarios
        .select(|r| matches_filters(r, &params, &["scenarioName", "scenarioType", "agentId", "isActive"]));
    sort_by(&mut rows, "sortOrder");
    info!(total = rows.len(), "list scenarios");
    ok(page(rows, &params))
}

async fn get_scenario(State(db): State<Db>, Path(id): Path<String>) -> Json<ApiResult> {
    match db.read().await.scenarios.rows.get(&id) {
        Some(row) => ok(row),
        None => fail("scenario not found"),
    }
}

async fn save_scenario(State(db): State<Db>, Json(body): Json<Value>) -> Json<ApiResult> {
    let Some(mut row) = as_row(body) else {
        return fail("scenario data is required");
    };
    if str_field(&row, "scenarioName").map_or(true, str::is_empty) {
        return fail("scenario name is required");
    }
    normalize_flag(&mut row, "isActive");
    row.entry("isActive").or_insert(json!(1));
    row.insert("stepCount".to_string(), json!(0));
    let id = db.write().await.scenarios.insert(row);
    info!(%id, "scenario saved");
    ok(id)
}

async fn update_scenario(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Value>) -> Json<ApiResult> {
    let Some(mut patch) = as_row(body) else {
        return fail("scenario data is required");
    };
    normalize_flag(&mut patch, "isActive");
    if db.write().await.scenarios.merge(&id, patch) {
        ok("updated")
    } else {
        fail("scenario not found")
    }
}

async fn delete_scenario(State(db): State<Db>, Path(id): Path<String>) -> Json<ApiResult> {
    let mut store = db.write().await;
    if store.scenarios.rows.remove(&id).is_none() {
        return fail("scenario not found");
    }
    store
        .steps
        .rows
        .retain(|_, step| str_field(step, "scenarioId") != Some(id.as_str()));
    info!(%id, "scenario deleted");
    ok("deleted")
}

async fn toggle_scenario(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Value>) -> Json<ApiResult> {
    let Some(mut patch) = as_row(body) else {
        return fail("isActive is required");
    };
    normalize_flag(&mut patch, "isActive");
    let Some(flag) = patch.get("isActive").cloned() else {
        return fail("isActive is required");
    };
    let patch = Row::from_iter([("isActive".to_string(), flag)]);
    if db.write().await.scenarios.merge(&id, patch) {
        ok("status updated")
    } else {
        fail("scenario not found")
    }
}

async fn scenarios_by_agent(State(db): State<Db>, Path(agent_id): Path<String>) -> Json<ApiResult> {
    let store = db.read().await;
    let mut rows = store.scenarios.select(|r| str_field(r, "agentId") == Some(agent_id.as_str()));
    sort_by(&mut rows, "sortOrder");
    ok(rows)
}

async fn active_scenarios_by_type(State(db): State<Db>, Path(scenario_type): Path<String>) -> Json<ApiResult> {
    let store = db.read().await;
    let mut rows = store
        .scenarios
        .select(|r| int_field(r, "isActive") == 1 && str_field(r, "scenarioType") == Some(scenario_type.as_str()));
    sort_by(&mut rows, "sortOrder");
    ok(rows)
}

// ---------------------------------------------------------------------------
// Scenario steps
// ---------------------------------------------------------------------------

async fn list_steps(State(db): State<Db>, Path(scenario_id): Path<String>) -> Json<ApiResult> {
    let store = db.read().await;
    let mut rows = store.steps.select(|r| str_field(r, "scenarioId") == Some(scenario_id.as_str()));
    sort_by(&mut rows, "stepOrder");
    ok(rows)
}

/// Replace all steps of a scenario with the submitted list.
async fn batch_save_steps(
    State(db): State<Db>,
    Path(scenario_id): Path<String>,
    Json(steps): Json<Vec<Value>>,
) -> Json<ApiResult> {
    let Some(rows) = steps.into_iter().map(as_row).collect::<Option<Vec<Row>>>() else {
        return fail("step data must be objects");
    };
    let saved = rows.len();

    let mut store = db.write().await;
    store
        .steps
        .rows
        .retain(|_, step| str_field(step, "scenarioId") != Some(scenario_id.as_str()));
    for mut row in rows {
        row.insert("scenarioId".to_string(), json!(scenario_id));
        store.steps.insert(row);
    }
    if let Some(scenario) = store.scenarios.rows.get_mut(&scenario_id) {
        scenario.insert("stepCount".to_string(), json!(saved));
    }
    info!(%scenario_id, saved, "steps saved");
    ok("saved")
}

async fn delete_step(State(db): State<Db>, Path(id): Path<String>) -> Json<ApiResult> {
    match db.write().await.steps.rows.remove(&id) {
        Some(_) => ok("deleted"),
        None => fail("step not found"),
    }
}

async fn count_steps(State(db): State<Db>, Path(scenario_id): Path<String>) -> Json<ApiResult> {
    let store = db.read().await;
    let count = store
        .steps
        .rows
        .values()
        .filter(|r| str_field(r, "scenarioId") == Some(scenario_id.as_str()))
        .count();
    ok(count)
}

// ---------------------------------------------------------------------------
// Step templates
// ---------------------------------------------------------------------------

async fn list_templates(State(db): State<Db>) -> Json<ApiResult> {
    let mut rows = db.read().await.templates.select(|_| true);
    sort_by(&mut rows, "sortOrder");
    ok(rows)
}

async fn get_template(State(db): State<Db>, Path(id): Path<String>) -> Json<ApiResult> {
    match db.read().await.templates.rows.get(&id) {
        Some(row) => ok(row),
        None => fail("template not found"),
    }
}

async fn save_template(State(db): State<Db>, Json(body): Json<Value>) -> Json<ApiResult> {
    let Some(row) = as_row(body) else {
        return fail("template data is required");
    };
    if str_field(&row, "templateName").map_or(true, str::is_empty) {
        return fail("template name is required");
    }
    let id = db.write().await.templates.insert(row);
    ok(id)
}

async fn update_template(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Value>) -> Json<ApiResult> {
    let Some(patch) = as_row(body) else {
        return fail("template data is required");
    };
    if db.write().await.templates.merge(&id, patch) {
        ok("updated")
    } else {
        fail("template not found")
    }
}

async fn delete_template(State(db): State<Db>, Path(id): Path<String>) -> Json<ApiResult> {
    match db.write().await.templates.rows.remove(&id) {
        Some(_) => ok("deleted"),
        None => fail("template not found"),
    }
}

async fn templates_by_type(State(db): State<Db>, Path(template_type): Path<String>) -> Json<ApiResult> {
    let mut rows = db
        .read()
        .await
        .templates
        .select(|r| str_field(r, "templateType") == Some(template_type.as_str()));
    sort_by(&mut rows, "sortOrder");
    ok(rows)
}

async fn default_templates(State(db): State<Db>) -> Json<ApiResult> {
    let mut rows = db.read().await.templates.select(|r| int_field(r, "isDefault") == 1);
    sort_by(&mut rows, "sortOrder");
    ok(rows)
}

async fn default_template_by_type(State(db): State<Db>, Path(template_type): Path<String>) -> Json<ApiResult> {
    let mut rows = db.read().await.templates.select(|r| {
        int_field(r, "isDefault") == 1 && str_field(r, "templateType") == Some(template_type.as_str())
    });
    sort_by(&mut rows, "sortOrder");
    match rows.into_iter().next() {
        Some(row) => ok(row),
        None => fail("no default template for type"),
    }
}

// ---------------------------------------------------------------------------
// Learning records
// ---------------------------------------------------------------------------

async fn list_records(State(db): State<Db>, Query(params): Query<HashMap<String, String>>) -> Json<ApiResult> {
    let store = db.read().await;
    let rows = store
        .records
        .select(|r| matches_filters(r, &params, &["agentId", "scenarioId", "childName"]));
    ok(page(rows, &params))
}

async fn get_record(State(db): State<Db>, Path(id): Path<String>) -> Json<ApiResult> {
    match db.read().await.records.rows.get(&id) {
        Some(row) => ok(row),
        None => fail("learning record not found"),
    }
}

async fn save_record(State(db): State<Db>, Json(body): Json<Value>) -> Json<ApiResult> {
    let Some(row) = as_row(body) else {
        return fail("learning record data is required");
    };
    let id = db.write().await.records.insert(row);
    ok(id)
}

async fn update_record(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Value>) -> Json<ApiResult> {
    let Some(patch) = as_row(body) else {
        return fail("learning record data is required");
    };
    if db.write().await.records.merge(&id, patch) {
        ok("updated")
    } else {
        fail("learning record not found")
    }
}

async fn delete_record(State(db): State<Db>, Path(id): Path<String>) -> Json<ApiResult> {
    match db.write().await.records.rows.remove(&id) {
        Some(_) => ok("deleted"),
        None => fail("learning record not found"),
    }
}

async fn records_by_agent(State(db): State<Db>, Path(agent_id): Path<String>) -> Json<ApiResult> {
    ok(db.read().await.records.select(|r| str_field(r, "agentId") == Some(agent_id.as_str())))
}

async fn records_by_scenario(State(db): State<Db>, Path(scenario_id): Path<String>) -> Json<ApiResult> {
    ok(db.read().await.records.select(|r| str_field(r, "scenarioId") == Some(scenario_id.as_str())))
}

async fn records_by_child(State(db): State<Db>, Path(child_name): Path<String>) -> Json<ApiResult> {
    ok(db.read().await.records.select(|r| str_field(r, "childName") == Some(child_name.as_str())))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsQuery {
    agent_id: String,
    child_name: String,
}

/// Totals over every record of one child with one agent.
async fn record_statistics(State(db): State<Db>, Query(q): Query<StatisticsQuery>) -> Json<ApiResult> {
    let rows = db.read().await.records.select(|r| {
        str_field(r, "agentId") == Some(q.agent_id.as_str()) && str_field(r, "childName") == Some(q.child_name.as_str())
    });
    let total_steps: i64 = rows.iter().map(|r| int_field(r, "totalSteps")).sum();
    let completed_steps: i64 = rows.iter().map(|r| int_field(r, "completedSteps")).sum();
    let duration: i64 = rows.iter().map(|r| int_field(r, "learningDuration")).sum();
    let success_rate = if total_steps > 0 {
        completed_steps as f64 / total_steps as f64
    } else {
        0.0
    };
    ok(json!({
        "agentId": q.agent_id,
        "childName": q.child_name,
        "totalSteps": total_steps,
        "completedSteps": completed_steps,
        "successRate": success_rate,
        "learningDuration": duration,
        "learningDurationFormatted": format_duration(duration),
    }))
}
