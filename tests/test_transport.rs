mod support;

use flow_allocator::api::command_dto::ResponseDto;
use flow_allocator::transport::server::dispatch_line;
use support::{diamond_provisioning, engine_with};

#[tokio::test]
async fn allocate_command_round_trips_as_json() {
    let engine = engine_with(&diamond_provisioning());

    let line = format!(r#"{{"command":"allocate_flow","src":"{}","dst":"{}","bandwidth":4}}"#, support::HOST_MACS[0], support::HOST_MACS[3]);
    let response = dispatch_line(&engine.controller, &line).await;

    match response {
        ResponseDto::Success { path: Some(path), .. } => assert_eq!(path.len(), 3),
        other => panic!("unexpected response: {:?}", other),
    }

    let response = dispatch_line(&engine.controller, r#"{"command":"show_reservation"}"#).await;
    match response {
        ResponseDto::Success { result: Some(rows), .. } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].bandwidth, 4);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn failures_come_back_as_error_with_a_reason() {
    let engine = engine_with(&diamond_provisioning());

    let line = format!(r#"{{"command":"delete_flow","src":"{}","dst":"{}"}}"#, support::HOST_MACS[0], support::HOST_MACS[1]);
    let response = dispatch_line(&engine.controller, &line).await;
    match response {
        ResponseDto::Error { reason } => assert!(reason.contains("No reservation"), "reason was: {}", reason),
        other => panic!("unexpected response: {:?}", other),
    }

    let response = dispatch_line(&engine.controller, "not json at all").await;
    assert!(matches!(response, ResponseDto::Error { .. }));
}

#[tokio::test]
async fn feed_commands_update_engine_state() {
    let engine = engine_with(&diamond_provisioning());

    // Learn a new host over the wire, then allocate to it.
    let learned = dispatch_line(&engine.controller, r#"{"command":"host_seen","host":"12:34:56:78:9a:bc","switch":2,"port":9}"#).await;
    assert!(matches!(learned, ResponseDto::Success { .. }));

    let line = format!(r#"{{"command":"allocate_flow","src":"{}","dst":"12:34:56:78:9a:bc","bandwidth":2}}"#, support::HOST_MACS[0]);
    let response = dispatch_line(&engine.controller, &line).await;
    assert!(matches!(response, ResponseDto::Success { .. }), "got {:?}", response);

    // Take the destination switch down; the next allocate is refused.
    dispatch_line(&engine.controller, r#"{"command":"switch_down","switch":2}"#).await;
    let line = format!(r#"{{"command":"allocate_flow","src":"{}","dst":"{}","bandwidth":1}}"#, support::HOST_MACS[2], support::HOST_MACS[1]);
    let response = dispatch_line(&engine.controller, &line).await;
    match response {
        ResponseDto::Error { reason } => assert!(reason.contains("control session"), "reason was: {}", reason),
        other => panic!("unexpected response: {:?}", other),
    }
}
