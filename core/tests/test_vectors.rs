//! Check envelope normalization and request building against the JSON
//! vectors stored in `test-vectors/`.
//!
//! Bodies are compared as parsed JSON, not raw strings, so field order in
//! the serializer output does not matter.

use scenario_console::{
    extract_business_data, get_business_data, get_error_message, is_api_success, HttpMethod, HttpRequest,
    LearningRecord, ListParams, Scenario, ScenarioClient, ScenarioStep, StepTemplate,
};
use serde_json::Value;

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args[key].as_str().unwrap_or_else(|| panic!("missing string arg {key}"))
}

fn body_arg<T: serde::de::DeserializeOwned>(args: &Value) -> T {
    serde_json::from_value(args["body"].clone()).unwrap()
}

fn list_params(args: &Value) -> ListParams {
    ListParams {
        page: args.get("page").and_then(Value::as_u64).map(|p| p as u32),
        limit: args.get("limit").and_then(Value::as_u64).map(|l| l as u32),
        filters: args
            .get("filters")
            .map(|f| serde_json::from_value(f.clone()).unwrap())
            .unwrap_or_default(),
    }
}

fn build(client: &ScenarioClient, op: &str, args: &Value) -> HttpRequest {
    match op {
        "get_scenario_list" => client.build_get_scenario_list(&list_params(args)),
        "get_scenario" => client.build_get_scenario(str_arg(args, "id")),
        "save_scenario" => client.build_save_scenario(&body_arg::<Scenario>(args)).unwrap(),
        "update_scenario" => client
            .build_update_scenario(str_arg(args, "id"), &body_arg::<Scenario>(args))
            .unwrap(),
        "delete_scenario" => client.build_delete_scenario(str_arg(args, "id")),
        "toggle_scenario" => client
            .build_toggle_scenario(str_arg(args, "id"), args["active"].as_bool().unwrap())
            .unwrap(),
        "get_scenarios_by_agent_id" => client.build_get_scenarios_by_agent_id(str_arg(args, "id")),
        "get_active_scenarios_by_type" => client.build_get_active_scenarios_by_type(str_arg(args, "id")),
        "get_scenario_steps" => client.build_get_scenario_steps(str_arg(args, "id")),
        "save_scenario_steps" => client
            .build_save_scenario_steps(str_arg(args, "id"), &body_arg::<Vec<ScenarioStep>>(args))
            .unwrap(),
        "delete_scenario_step" => client.build_delete_scenario_step(str_arg(args, "id")),
        "get_scenario_step_count" => client.build_get_scenario_step_count(str_arg(args, "id")),
        "get_step_template_list" => client.build_get_step_template_list(),
        "save_step_template" => client.build_save_step_template(&body_arg::<StepTemplate>(args)).unwrap(),
        "get_default_step_template" => client.build_get_default_step_template(str_arg(args, "id")),
        "get_learning_records" => client.build_get_learning_records(&list_params(args)),
        "save_learning_record" => client
            .build_save_learning_record(&body_arg::<LearningRecord>(args))
            .unwrap(),
        "delete_learning_record" => client.build_delete_learning_record(str_arg(args, "id")),
        "get_learning_statistics" => {
            client.build_get_learning_statistics(str_arg(args, "agent_id"), str_arg(args, "child_name"))
        }
        other => panic!("no builder for op {other}"),
    }
}

#[test]
fn request_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let client = ScenarioClient::new(vectors["base_url"].as_str().unwrap());

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];
        let req = build(&client, case["op"].as_str().unwrap(), &case["args"]);

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url(), expected["url"].as_str().unwrap(), "{name}: url");

        match expected.get("body") {
            Some(body) => {
                let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&sent, body, "{name}: body");
                assert_eq!(
                    req.headers,
                    vec![("content-type".to_string(), "application/json".to_string())],
                    "{name}: headers"
                );
            }
            None => {
                assert!(req.body.is_none(), "{name}: unexpected body");
                assert!(req.headers.is_empty(), "{name}: unexpected headers");
            }
        }
    }
}

#[test]
fn envelope_vectors() {
    let raw = include_str!("../../test-vectors/envelope.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];
        let response = case.get("response");
        let default_msg = case.get("default_msg").and_then(Value::as_str);

        let extracted = extract_business_data(response);
        match expected.get("extracted").and_then(Value::as_str) {
            Some("outer") => assert_eq!(extracted, response, "{name}: extracted"),
            Some("inner") => assert_eq!(extracted, response.map(|r| &r["data"]), "{name}: extracted"),
            Some(other) => panic!("{name}: bad extracted marker {other}"),
            None => assert!(extracted.is_none(), "{name}: extracted"),
        }

        assert_eq!(is_api_success(response), expected["success"].as_bool().unwrap(), "{name}: success");
        assert_eq!(
            get_error_message(response, default_msg),
            expected["message"].as_str().unwrap(),
            "{name}: message"
        );
        assert_eq!(get_business_data(response), expected.get("data"), "{name}: data");
    }
}
