// End-to-end schedule save: node details from the cloud, selection on
// the availability projection, the batched save request, and the
// reconciled outcome.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rainfly_core::convert::nodes_from_details;
use rainfly_core::{ActionStatus, DeviceServices, Outcome, ParamValue, Scheduler, Trigger};

fn node_detail() -> rainfly_api::NodeDetail {
    serde_json::from_value(json!({
        "id": "N1",
        "config": {
            "config_version": "2020-03-20",
            "info": { "name": "Bedroom", "type": "esp.node" },
            "devices": [
                {
                    "name": "Light",
                    "type": "esp.device.lightbulb",
                    "params": [
                        { "name": "Power", "data_type": "bool", "type": "esp.param.power",
                          "ui_type": "esp.ui.toggle", "properties": ["read", "write"] }
                    ]
                }
            ],
            "services": [
                {
                    "name": "Schedule",
                    "type": "esp.service.schedule",
                    "params": [
                        { "name": "Schedules", "data_type": "array",
                          "type": "esp.param.schedules", "properties": ["read", "write"],
                          "bounds": { "max": 5 } }
                    ]
                }
            ]
        },
        "status": { "connectivity": { "connected": true } },
        "params": {
            "Light": { "Power": false },
            "Schedule": { "Schedules": [ {"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"} ] }
        }
    }))
    .expect("node detail json")
}

#[tokio::test]
async fn save_new_schedule_round_trip() {
    let nodes = nodes_from_details(&[node_detail()]).expect("conversion");
    assert_eq!(nodes[0].max_schedules, 5);
    assert_eq!(nodes[0].current_schedules, 4);

    let mut scheduler = Scheduler::new();
    scheduler.rebuild_available_devices(&nodes);

    // One slot left on N1: scheduling is still allowed.
    let device = scheduler.device_mut("N1", "Light").expect("projected device");
    assert_eq!(device.schedule_action(&nodes[0]), ActionStatus::Allowed);

    // Select Light.Power = true for the new schedule.
    assert!(device.select_param_with_value("Power", ParamValue::Bool(true)));

    let schedule = scheduler.start_new();
    schedule.name = "Night light".into();
    schedule.trigger = Trigger { days: 31, minutes: 1290 };
    let id = schedule.id.clone();

    // The cloud must see exactly one node payload with the schedule
    // fragment wrapped under the node's service keys, the captured
    // action included.
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/user/nodes/params"))
        .and(body_partial_json(json!([
            {
                "node_id": "N1",
                "payload": {
                    "Schedule": {
                        "Schedules": [
                            {
                                "name": "Night light",
                                "id": id,
                                "operation": "add",
                                "triggers": [ { "d": 31, "m": 1290 } ],
                                "action": { "Light": { "Power": true } }
                            }
                        ]
                    }
                }
            }
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "node_id": "N1", "status": "success", "description": "" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let base: url::Url = server.uri().parse().expect("server uri");
    let api = rainfly_api::ApiClient::with_client(reqwest::Client::new(), base.clone(), base);

    let report = scheduler
        .save_current(&api, &nodes)
        .await
        .expect("save succeeds");

    assert_eq!(
        report.outcome,
        Outcome::Success {
            some_nodes_failed: false
        }
    );
    assert!(report.failed_devices.is_empty());

    // Selection persists after the save...
    assert_eq!(
        scheduler.device_mut("N1", "Light").expect("device").selected_params,
        1
    );

    // ...and the new schedule landed in the map under its generated id.
    let saved = scheduler
        .schedules
        .values()
        .find(|s| s.id == id)
        .expect("schedule stored");
    assert_eq!(saved.name, "Night light");
    assert_eq!(saved.actions.len(), 1);
    assert!(saved.actions.contains_key("N1"));
}

#[tokio::test]
async fn save_with_empty_selection_reports_failure_without_request() {
    let nodes = nodes_from_details(&[node_detail()]).expect("conversion");

    let mut scheduler = Scheduler::new();
    scheduler.rebuild_available_devices(&nodes);
    scheduler.start_new();

    // No mock server mounted: an HTTP call would fail the test.
    let base: url::Url = "http://127.0.0.1:9".parse().expect("url");
    let api = rainfly_api::ApiClient::with_client(reqwest::Client::new(), base.clone(), base);

    let report = scheduler
        .save_current(&api, &nodes)
        .await
        .expect("no request issued");
    assert_eq!(report.outcome, Outcome::Failure);
}

#[tokio::test]
async fn offline_flag_short_circuits_before_any_request() {
    let nodes = nodes_from_details(&[node_detail()]).expect("conversion");

    let mut scheduler = Scheduler::new();
    scheduler.rebuild_available_devices(&nodes);
    scheduler
        .device_mut("N1", "Light")
        .expect("device")
        .select_param_with_value("Power", ParamValue::Bool(true));
    scheduler.start_new().name = "x".into();
    scheduler.set_online(false);

    let base: url::Url = "http://127.0.0.1:9".parse().expect("url");
    let api = rainfly_api::ApiClient::with_client(reqwest::Client::new(), base.clone(), base);

    let err = scheduler
        .save_current(&api, &nodes)
        .await
        .expect_err("offline short-circuit");
    assert!(matches!(err, rainfly_core::CoreError::Offline));
}

#[tokio::test]
async fn partial_failure_lists_failed_devices() {
    // Two single-device nodes; one fails server-side.
    let mut detail_b = node_detail();
    detail_b.id = "N2".into();
    let nodes = nodes_from_details(&[node_detail(), detail_b]).expect("conversion");

    let mut scheduler = Scheduler::new();
    scheduler.rebuild_available_devices(&nodes);
    for node_id in ["N1", "N2"] {
        scheduler
            .device_mut(node_id, "Light")
            .expect("device")
            .select_param_with_value("Power", ParamValue::Bool(true));
    }
    scheduler.start_new().name = "Both".into();

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/user/nodes/params"))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!([
            { "node_id": "N1", "status": "success", "description": "" },
            { "node_id": "N2", "status": "failure", "description": "node offline" }
        ])))
        .mount(&server)
        .await;
    let base: url::Url = server.uri().parse().expect("server uri");
    let api = rainfly_api::ApiClient::with_client(reqwest::Client::new(), base.clone(), base);

    let report = scheduler
        .save_current(&api, &nodes)
        .await
        .expect("partial success");

    assert_eq!(
        report.outcome,
        Outcome::Success {
            some_nodes_failed: true
        }
    );
    assert_eq!(report.failed_devices.len(), 1);
    assert_eq!(
        report.message.as_deref(),
        Some(format!("Unable to save schedule for {}", report.failed_devices[0]).as_str())
    );
}
