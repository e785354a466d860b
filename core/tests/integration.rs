//! Scenario lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in its own thread and runtime,
//! then drives `ScenarioApi` over real HTTP with `UreqTransport`. Responses
//! come back through callbacks and are settled with the envelope helpers,
//! the same way console pages consume them.

use std::net::SocketAddr;
use std::time::Duration;

use scenario_console::{
    create_api_callback, create_api_promise, ApiError, Completion, HttpResponse, LearningRecord, ListParams,
    PageData, RetryPolicy, Scenario, ScenarioApi, ScenarioStep, StepTemplate, TransportError, UreqTransport,
};
use serde_json::Value;

fn start_mock_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn api(addr: SocketAddr) -> ScenarioApi<UreqTransport> {
    ScenarioApi::new(
        &format!("http://{addr}"),
        UreqTransport::new(Duration::from_secs(5)),
        RetryPolicy::default(),
    )
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_lifecycle() {
    let addr = start_mock_server();
    let api = api(addr);

    // Empty list.
    let page: PageData<Scenario> = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.get_scenario_list(&ListParams::page(1, 10), done))
            .await
            .unwrap(),
    );
    assert_eq!(page.total, 0);
    assert!(page.list.is_empty());

    // Create.
    let draft = Scenario {
        scenario_name: "Morning greeting".to_string(),
        scenario_type: Some("daily".to_string()),
        agent_id: Some("agent-1".to_string()),
        description: Some("say hello".to_string()),
        ..Default::default()
    };
    let id: String = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.save_scenario(&draft, done))
            .await
            .unwrap(),
    );
    assert!(!id.is_empty());

    // Read back.
    let fetched: Scenario = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.get_scenario(&id, done))
            .await
            .unwrap(),
    );
    assert_eq!(fetched.scenario_name, "Morning greeting");
    assert_eq!(fetched.is_active, Some(1));
    assert_eq!(fetched.scenario_id.as_deref(), Some(id.as_str()));

    // Partial update keeps untouched fields.
    let patch = Scenario {
        scenario_name: "Evening greeting".to_string(),
        ..Default::default()
    };
    create_api_promise(|done: Completion<HttpResponse>| api.update_scenario(&id, &patch, done))
        .await
        .unwrap();
    let fetched: Scenario = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.get_scenario(&id, done))
            .await
            .unwrap(),
    );
    assert_eq!(fetched.scenario_name, "Evening greeting");
    assert_eq!(fetched.description.as_deref(), Some("say hello"));

    // Steps.
    let steps = vec![
        ScenarioStep {
            step_name: "wave".to_string(),
            step_order: 2,
            ..Default::default()
        },
        ScenarioStep {
            step_name: "hello".to_string(),
            step_order: 1,
            ai_message: Some("Good morning!".to_string()),
            ..Default::default()
        },
    ];
    create_api_promise(|done: Completion<HttpResponse>| api.save_scenario_steps(&id, &steps, done))
        .await
        .unwrap();
    let saved: Vec<ScenarioStep> = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.get_scenario_steps(&id, done))
            .await
            .unwrap(),
    );
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].step_name, "hello");
    assert_eq!(saved[0].scenario_id.as_deref(), Some(id.as_str()));
    let count = create_api_promise(|done: Completion<HttpResponse>| api.get_scenario_step_count(&id, done))
        .await
        .unwrap();
    assert_eq!(count, 2);

    // Toggle off, then it drops out of the active list.
    create_api_promise(|done: Completion<HttpResponse>| api.toggle_scenario(&id, false, done))
        .await
        .unwrap();
    let active = create_api_promise(|done: Completion<HttpResponse>| api.get_active_scenarios_by_type("daily", done))
        .await
        .unwrap();
    assert_eq!(active, serde_json::json!([]));

    let by_agent: Vec<Scenario> = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.get_scenarios_by_agent_id("agent-1", done))
            .await
            .unwrap(),
    );
    assert_eq!(by_agent.len(), 1);
    assert_eq!(by_agent[0].step_count, Some(2));

    // Delete, then reads fail with the backend's message.
    create_api_promise(|done: Completion<HttpResponse>| api.delete_scenario(&id, done))
        .await
        .unwrap();
    let err = create_api_promise(|done: Completion<HttpResponse>| api.get_scenario(&id, done))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Business { ref message } if message == "scenario not found"));

    assert_eq!(api.dispatcher().stats().retried(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn templates_and_learning_records() {
    let addr = start_mock_server();
    let api = api(addr);

    let template = StepTemplate {
        template_name: "Greeting".to_string(),
        template_type: Some("greeting".to_string()),
        is_default: Some(1),
        ..Default::default()
    };
    let template_id: String = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.save_step_template(&template, done))
            .await
            .unwrap(),
    );
    let default: StepTemplate = decode(
        create_api_promise(|done: Completion<HttpResponse>| api.get_default_step_template("greeting", done))
            .await
            .unwrap(),
    );
    assert_eq!(default.template_id.as_deref(), Some(template_id.as_str()));

    for completed in [2, 4] {
        let record = LearningRecord {
            agent_id: Some("agent-1".to_string()),
            scenario_id: Some("s-1".to_string()),
            child_name: Some("Mia".to_string()),
            total_steps: Some(4),
            completed_steps: Some(completed),
            learning_duration: Some(30),
            ..Default::default()
        };
        create_api_promise(|done: Completion<HttpResponse>| api.save_learning_record(&record, done))
            .await
            .unwrap();
    }

    let stats = create_api_promise(|done: Completion<HttpResponse>| {
        api.get_learning_statistics("agent-1", "Mia", done)
    })
    .await
    .unwrap();
    assert_eq!(stats["completedSteps"], 6);
    assert_eq!(stats["learningDurationFormatted"], "1m0s");

    let page: PageData<LearningRecord> = decode(
        create_api_promise(|done: Completion<HttpResponse>| {
            api.get_learning_records(&ListParams::page(1, 1).filter("childName", "Mia"), done)
        })
        .await
        .unwrap(),
    );
    assert_eq!(page.total, 2);
    assert_eq!(page.list.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_style_reports_business_error() {
    let addr = start_mock_server();
    let api = api(addr);
    let (tx, rx) = tokio::sync::oneshot::channel();

    let callback = create_api_callback(
        |_data: Value, _raw: &Value| panic!("save without a name must fail"),
        move |message: String, _raw: &Value| {
            let _ = tx.send(message);
        },
        Some("save failed"),
    );
    let handle = api.save_scenario(&Scenario::default(), move |response: HttpResponse| callback(response));

    handle.await.unwrap().unwrap();
    assert_eq!(rx.await.unwrap(), "scenario name is required");
}

#[tokio::test]
async fn unreachable_server_exhausts_retries() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let policy = RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        ..RetryPolicy::default()
    };
    let api = ScenarioApi::new(
        &format!("http://{addr}"),
        UreqTransport::new(Duration::from_secs(2)),
        policy,
    );

    let handle = api.get_step_template_list(|_: HttpResponse| panic!("no response expected"));
    let err = handle.await.unwrap().unwrap_err();
    match err {
        ApiError::RetriesExhausted { attempts, last_error } => {
            assert_eq!(attempts, 2);
            assert!(!matches!(last_error, TransportError::Timeout));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(api.dispatcher().stats().exhausted(), 1);
}
