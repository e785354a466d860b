//! Stateless request builder and envelope parser for the scenario API.
//!
//! # Design
//! `ScenarioClient` holds only the service base URL. Every backend
//! operation has a `build_*` method producing an `HttpRequest`; nothing
//! here performs I/O. Responses are interpreted by the generic `parse_*`
//! helpers, which unwrap the business envelope and deserialize `data`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope::{get_business_data, get_error_message, is_api_success};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{LearningRecord, ListParams, Scenario, ScenarioStep, StepTemplate, ToggleScenario};

const SCENARIO: &str = "/scenario";
const SCENARIO_STEP: &str = "/scenario-step";
const STEP_TEMPLATE: &str = "/xiaozhi/step-template";
const LEARNING_RECORD: &str = "/xiaozhi/learning-record";

/// Builds requests for every scenario-console backend operation.
#[derive(Debug, Clone)]
pub struct ScenarioClient {
    base_url: String,
}

impl ScenarioClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- scenario --

    pub fn build_get_scenario_list(&self, params: &ListParams) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, format!("{SCENARIO}/list"));
        req.query = params.to_query();
        req
    }

    pub fn build_get_scenario(&self, scenario_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{SCENARIO}/{}", seg(scenario_id)))
    }

    pub fn build_save_scenario(&self, scenario: &Scenario) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, SCENARIO.to_string(), scenario)
    }

    pub fn build_update_scenario(&self, scenario_id: &str, scenario: &Scenario) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, format!("{SCENARIO}/{}", seg(scenario_id)), scenario)
    }

    pub fn build_delete_scenario(&self, scenario_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("{SCENARIO}/{}", seg(scenario_id)))
    }

    pub fn build_toggle_scenario(&self, scenario_id: &str, is_active: bool) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Put,
            format!("{SCENARIO}/{}/toggle", seg(scenario_id)),
            &ToggleScenario::new(is_active),
        )
    }

    pub fn build_get_scenarios_by_agent_id(&self, agent_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{SCENARIO}/agent/{}", seg(agent_id)))
    }

    pub fn build_get_active_scenarios_by_type(&self, scenario_type: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{SCENARIO}/active/{}", seg(scenario_type)))
    }

    // -- scenario steps --

    pub fn build_get_scenario_steps(&self, scenario_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{SCENARIO_STEP}/list/{}", seg(scenario_id)))
    }

    pub fn build_save_scenario_steps(&self, scenario_id: &str, steps: &[ScenarioStep]) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            format!("{SCENARIO_STEP}/batch-save/{}", seg(scenario_id)),
            &steps,
        )
    }

    pub fn build_delete_scenario_step(&self, step_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("{SCENARIO_STEP}/{}", seg(step_id)))
    }

    pub fn build_get_scenario_step_count(&self, scenario_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{SCENARIO_STEP}/count/{}", seg(scenario_id)))
    }

    // -- step templates --

    pub fn build_get_step_template_list(&self) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{STEP_TEMPLATE}/list"))
    }

    pub fn build_get_step_template(&self, template_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{STEP_TEMPLATE}/{}", seg(template_id)))
    }

    pub fn build_save_step_template(&self, template: &StepTemplate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, STEP_TEMPLATE.to_string(), template)
    }

    pub fn build_update_step_template(&self, template_id: &str, template: &StepTemplate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, format!("{STEP_TEMPLATE}/{}", seg(template_id)), template)
    }

    pub fn build_delete_step_template(&self, template_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("{STEP_TEMPLATE}/{}", seg(template_id)))
    }

    pub fn build_get_step_templates_by_type(&self, template_type: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{STEP_TEMPLATE}/type/{}", seg(template_type)))
    }

    pub fn build_get_default_step_templates(&self) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{STEP_TEMPLATE}/default"))
    }

    pub fn build_get_default_step_template(&self, template_type: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{STEP_TEMPLATE}/default/{}", seg(template_type)))
    }

    // -- learning records --

    pub fn build_get_learning_records(&self, params: &ListParams) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, format!("{LEARNING_RECORD}/list"));
        req.query = params.to_query();
        req
    }

    pub fn build_get_learning_record(&self, record_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{LEARNING_RECORD}/{}", seg(record_id)))
    }

    pub fn build_save_learning_record(&self, record: &LearningRecord) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, LEARNING_RECORD.to_string(), record)
    }

    pub fn build_update_learning_record(&self, record_id: &str, record: &LearningRecord) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, format!("{LEARNING_RECORD}/{}", seg(record_id)), record)
    }

    pub fn build_delete_learning_record(&self, record_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("{LEARNING_RECORD}/{}", seg(record_id)))
    }

    pub fn build_get_learning_records_by_agent_id(&self, agent_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{LEARNING_RECORD}/agent/{}", seg(agent_id)))
    }

    pub fn build_get_learning_records_by_scenario_id(&self, scenario_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{LEARNING_RECORD}/scenario/{}", seg(scenario_id)))
    }

    pub fn build_get_learning_records_by_child_name(&self, child_name: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{LEARNING_RECORD}/child/{}", seg(child_name)))
    }

    pub fn build_get_learning_statistics(&self, agent_id: &str, child_name: &str) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, format!("{LEARNING_RECORD}/statistics"));
        req.query = vec![
            ("agentId".to_string(), agent_id.to_string()),
            ("childName".to_string(), child_name.to_string()),
        ];
        req
    }

    // -- parsing --

    /// Unwrap the envelope and deserialize its `data` into `T`.
    pub fn parse_data<T: DeserializeOwned>(&self, response: &HttpResponse) -> Result<T, ApiError> {
        let raw = response.to_value();
        if !is_api_success(Some(&raw)) {
            return Err(ApiError::Business {
                message: get_error_message(Some(&raw), None),
            });
        }
        let data = get_business_data(Some(&raw)).cloned().unwrap_or_default();
        serde_json::from_value(data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Check the envelope of a write operation and return its `msg`.
    pub fn parse_ack(&self, response: &HttpResponse) -> Result<String, ApiError> {
        let raw = response.to_value();
        if !is_api_success(Some(&raw)) {
            return Err(ApiError::Business {
                message: get_error_message(Some(&raw), None),
            });
        }
        Ok(get_error_message(Some(&raw), Some("")))
    }

    fn request(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<B: Serialize + ?Sized>(&self, method: HttpMethod, path: String, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(method, path);
        req.headers = vec![("content-type".to_string(), "application/json".to_string())];
        req.body = Some(body);
        Ok(req)
    }
}

/// Percent-encode one path segment.
fn seg(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}
