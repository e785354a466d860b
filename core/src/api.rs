//! Callback-style API surface for the scenario console.
//!
//! Each method builds its request with [`ScenarioClient`] and hands it to
//! the [`Dispatcher`]. The callback receives the raw `HttpResponse`; use
//! [`create_api_callback`](crate::create_api_callback) or
//! [`create_api_promise`](crate::create_api_promise) to interpret the
//! envelope. Methods must be called from within a tokio runtime.
//!
//! The returned handle resolves to `Err` when the payload cannot be
//! serialized or the dispatcher gave up on the network; the callback is
//! not invoked in either case.

use tokio::task::JoinHandle;
use tracing::error;

use crate::client::ScenarioClient;
use crate::config::ConsoleConfig;
use crate::dispatch::{Dispatcher, RetryPolicy};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{LearningRecord, ListParams, Scenario, ScenarioStep, StepTemplate};

/// Pending API call. Aborting it cancels pending retries and the callback.
pub type ApiHandle = JoinHandle<Result<(), ApiError>>;

pub struct ScenarioApi<T> {
    client: ScenarioClient,
    dispatcher: Dispatcher<T>,
}

impl<T> Clone for ScenarioApi<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl ScenarioApi<UreqTransport> {
    /// Client over `ureq` using the configured service URL, timeout and
    /// retry policy.
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(
            &config.service_url,
            UreqTransport::new(config.request_timeout),
            config.retry.clone(),
        )
    }
}

impl<T: Transport> ScenarioApi<T> {
    pub fn new(base_url: &str, transport: T, policy: RetryPolicy) -> Self {
        Self {
            client: ScenarioClient::new(base_url),
            dispatcher: Dispatcher::new(transport, policy),
        }
    }

    pub fn client(&self) -> &ScenarioClient {
        &self.client
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    fn dispatch<F>(&self, request: HttpRequest, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatcher.send_with(request, callback)
    }

    fn dispatch_built<F>(&self, request: Result<HttpRequest, ApiError>, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        match request {
            Ok(request) => self.dispatch(request, callback),
            Err(err) => {
                error!(error = %err, "request could not be built");
                tokio::spawn(async move { Err(err) })
            }
        }
    }

    // -- scenario --

    pub fn get_scenario_list<F>(&self, params: &ListParams, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_scenario_list(params), callback)
    }

    pub fn get_scenario<F>(&self, scenario_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_scenario(scenario_id), callback)
    }

    pub fn save_scenario<F>(&self, scenario: &Scenario, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_save_scenario(scenario), callback)
    }

    pub fn update_scenario<F>(&self, scenario_id: &str, scenario: &Scenario, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_update_scenario(scenario_id, scenario), callback)
    }

    pub fn delete_scenario<F>(&self, scenario_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_delete_scenario(scenario_id), callback)
    }

    pub fn toggle_scenario<F>(&self, scenario_id: &str, is_active: bool, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_toggle_scenario(scenario_id, is_active), callback)
    }

    pub fn get_scenarios_by_agent_id<F>(&self, agent_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_scenarios_by_agent_id(agent_id), callback)
    }

    pub fn get_active_scenarios_by_type<F>(&self, scenario_type: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_active_scenarios_by_type(scenario_type), callback)
    }

    // -- scenario steps --

    pub fn get_scenario_steps<F>(&self, scenario_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_scenario_steps(scenario_id), callback)
    }

    pub fn save_scenario_steps<F>(&self, scenario_id: &str, steps: &[ScenarioStep], callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_save_scenario_steps(scenario_id, steps), callback)
    }

    pub fn delete_scenario_step<F>(&self, step_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_delete_scenario_step(step_id), callback)
    }

    pub fn get_scenario_step_count<F>(&self, scenario_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_scenario_step_count(scenario_id), callback)
    }

    // -- step templates --

    pub fn get_step_template_list<F>(&self, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_step_template_list(), callback)
    }

    pub fn get_step_template<F>(&self, template_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_step_template(template_id), callback)
    }

    pub fn save_step_template<F>(&self, template: &StepTemplate, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_save_step_template(template), callback)
    }

    pub fn update_step_template<F>(&self, template_id: &str, template: &StepTemplate, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_update_step_template(template_id, template), callback)
    }

    pub fn delete_step_template<F>(&self, template_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_delete_step_template(template_id), callback)
    }

    pub fn get_step_templates_by_type<F>(&self, template_type: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_step_templates_by_type(template_type), callback)
    }

    pub fn get_default_step_templates<F>(&self, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_default_step_templates(), callback)
    }

    pub fn get_default_step_template<F>(&self, template_type: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_default_step_template(template_type), callback)
    }

    // -- learning records --

    pub fn get_learning_records<F>(&self, params: &ListParams, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_learning_records(params), callback)
    }

    pub fn get_learning_record<F>(&self, record_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_learning_record(record_id), callback)
    }

    pub fn save_learning_record<F>(&self, record: &LearningRecord, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_save_learning_record(record), callback)
    }

    pub fn update_learning_record<F>(&self, record_id: &str, record: &LearningRecord, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch_built(self.client.build_update_learning_record(record_id, record), callback)
    }

    pub fn delete_learning_record<F>(&self, record_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_delete_learning_record(record_id), callback)
    }

    pub fn get_learning_records_by_agent_id<F>(&self, agent_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_learning_records_by_agent_id(agent_id), callback)
    }

    pub fn get_learning_records_by_scenario_id<F>(&self, scenario_id: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_learning_records_by_scenario_id(scenario_id), callback)
    }

    pub fn get_learning_records_by_child_name<F>(&self, child_name: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_learning_records_by_child_name(child_name), callback)
    }

    pub fn get_learning_statistics<F>(&self, agent_id: &str, child_name: &str, callback: F) -> ApiHandle
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        self.dispatch(self.client.build_get_learning_statistics(agent_id, child_name), callback)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use crate::envelope::{create_api_callback, create_api_promise, Completion};
    use crate::error::TransportError;
    use crate::http::HttpMethod;

    /// Records requests and answers each with a fixed body.
    struct Canned {
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for Canned {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: self.body.to_string(),
            })
        }
    }

    fn api(body: &'static str) -> ScenarioApi<Canned> {
        let transport = Canned {
            body,
            seen: Mutex::new(Vec::new()),
        };
        ScenarioApi::new("http://h", transport, RetryPolicy::none())
    }

    #[test]
    fn from_config_applies_url_and_retry() {
        let config = ConsoleConfig {
            service_url: "http://api:8002/xiaozhi/".to_string(),
            retry: RetryPolicy::none(),
            ..ConsoleConfig::default()
        };
        let api = ScenarioApi::from_config(&config);
        assert_eq!(api.client().base_url(), "http://api:8002/xiaozhi");
        assert_eq!(api.dispatcher().policy(), &RetryPolicy::none());
    }

    #[tokio::test]
    async fn callback_receives_raw_response() {
        let api = api(r#"{"code":0,"msg":"success","data":{"scenarioId":"7"}}"#);
        let (tx, rx) = tokio::sync::oneshot::channel();
        api.get_scenario("7", move |response| {
            let _ = tx.send(response);
        })
        .await
        .unwrap()
        .unwrap();
        let response = rx.await.unwrap();
        assert_eq!(response.body, r#"{"code":0,"msg":"success","data":{"scenarioId":"7"}}"#);

        let seen = api.dispatcher().transport().seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].path, "http://h/scenario/7");
    }

    #[tokio::test]
    async fn promise_over_api_call_resolves_data() {
        let api = api(r#"{"code":0,"data":3}"#);
        let count = create_api_promise(|cb: Completion<HttpResponse>| api.get_scenario_step_count("s1", cb)).await.unwrap();
        assert_eq!(count, json!(3));
    }

    #[tokio::test]
    async fn promise_over_api_call_rejects_business_failure() {
        let api = api(r#"{"code":500,"msg":"场景ID不能为空"}"#);
        let err = create_api_promise(|cb: Completion<HttpResponse>| api.delete_scenario("", cb)).await.unwrap_err();
        assert_eq!(err.to_string(), "场景ID不能为空");
    }

    #[tokio::test]
    async fn api_callback_adapter_splits_outcome() {
        let api = api(r#"{"code":1,"msg":"X"}"#);
        let (tx, rx) = tokio::sync::oneshot::channel::<String>();
        let handler = create_api_callback(
            |_: Value, _: &Value| panic!("unexpected success"),
            move |msg, _| {
                let _ = tx.send(msg);
            },
            None,
        );
        api.toggle_scenario("1", true, handler).await.unwrap().unwrap();
        assert_eq!(rx.await.unwrap(), "X");
    }
}
