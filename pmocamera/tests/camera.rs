//! Integration tests for the camera session against a fake camera

mod common;

use common::{FakeCamera, PICTURE_URL, camera, connected, location, serve, serve_with_service};
use pmocamera::{CallOutcome, Camera, CameraError, ConnectionState, PreconditionMap, SsdpError};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

#[tokio::test]
async fn test_connect_to_builds_registry() {
    let fake = FakeCamera::new();
    let (mock_server, camera) = connected(&fake).await;

    assert_eq!(camera.state(), ConnectionState::Connected);
    assert_eq!(
        camera.endpoint().unwrap().as_str(),
        format!("{}/sony/camera", mock_server.uri())
    );
    assert_eq!(camera.device().unwrap().friendly_name.as_deref(), Some("ILCE-QX1"));

    let api = camera.api().unwrap();
    assert_eq!(api.len(), 8);
    assert!(api.contains(&"setTouchAFPosition(double,double) -> int,JSON".to_string()));

    // Connecting costs exactly one RPC
    assert_eq!(fake.methods(), vec!["getMethodTypes"]);
    assert_eq!(fake.ids(), vec![1]);
    assert_eq!(camera.next_request_id(), 2);
}

#[tokio::test]
async fn test_commands_before_connect_fail_fast() {
    let camera = camera();

    assert_eq!(camera.state(), ConnectionState::Disconnected);
    assert!(matches!(camera.api(), Err(CameraError::NotConnected)));
    assert!(matches!(camera.picture().await, Err(CameraError::NotConnected)));
    assert!(matches!(
        camera.invoke("getEvent", &[json!(false)]).await,
        Err(CameraError::NotConnected)
    ));
    assert!(matches!(camera.available_api().await, Err(CameraError::NotConnected)));
    assert!(matches!(
        camera.timelapse(3, Duration::ZERO).await,
        Err(CameraError::NotConnected)
    ));
    assert_eq!(camera.next_request_id(), 1);
}

#[tokio::test]
async fn test_descriptor_without_camera_service() {
    let fake = FakeCamera::new();
    let mock_server = serve_with_service(&fake, "guide").await;

    let mut camera = camera();
    let err = camera.connect_to(&location(&mock_server)).await.unwrap_err();

    assert!(matches!(err, CameraError::Ssdp(SsdpError::DescriptorShape(_))));
    assert!(err.is_connection());
    assert_eq!(camera.state(), ConnectionState::Connecting);
    assert!(!camera.is_connected());
    assert!(fake.methods().is_empty());
}

#[tokio::test]
async fn test_connect_through_ssdp() {
    let fake = FakeCamera::new();
    let mock_server = serve(&fake).await;

    let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let responder_addr: SocketAddr = responder.local_addr().unwrap();
    let answer = format!(
        "HTTP/1.1 200 OK\r\nLOCATION: {}\r\nST: urn:schemas-sony-com:service:ScalarWebAPI:1\r\n\r\n",
        location(&mock_server)
    );
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        let (_, from) = responder.recv_from(&mut buf).await.unwrap();
        responder.send_to(answer.as_bytes(), from).await.unwrap();
    });

    let mut camera = Camera::builder()
        .ssdp_address(responder_addr)
        .discovery_timeout(Duration::from_secs(2))
        .settling_delay(Duration::ZERO)
        .build()
        .unwrap();
    camera.connect().await.unwrap();

    assert!(camera.is_connected());
    assert_eq!(fake.methods(), vec!["getMethodTypes"]);
}

#[tokio::test]
async fn test_connect_discovery_timeout() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut camera = Camera::builder()
        .ssdp_address(silent.local_addr().unwrap())
        .discovery_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let err = camera.connect().await.unwrap_err();

    assert!(matches!(err, CameraError::Ssdp(SsdpError::NoAdvertisement(_))));
    assert_eq!(camera.state(), ConnectionState::Connecting);
}

#[tokio::test]
async fn test_picture_switches_to_rec_mode_once() {
    let fake = FakeCamera::new();
    let (_mock_server, camera) = connected(&fake).await;

    let outcome = camera.picture().await.unwrap();
    assert_eq!(outcome.value(), Some(&json!([[PICTURE_URL]])));

    assert_eq!(
        fake.methods(),
        vec![
            "getMethodTypes",
            "getAvailableApiList", // actTakePicture missing
            "getAvailableApiList", // startRecMode available
            "startRecMode",
            "getAvailableApiList", // single retry
            "actTakePicture",
        ]
    );
}

#[tokio::test]
async fn test_picture_in_rec_mode_is_direct() {
    let fake = FakeCamera::new().in_rec_mode();
    let (_mock_server, camera) = connected(&fake).await;

    let outcome = tokio_test::assert_ok!(camera.picture().await);
    assert!(outcome.is_done());
    assert_eq!(fake.count("startRecMode"), 0);
    assert_eq!(
        fake.methods(),
        vec!["getMethodTypes", "getAvailableApiList", "actTakePicture"]
    );
}

#[tokio::test]
async fn test_settling_delay_is_waited() {
    let fake = FakeCamera::new();
    let mock_server = serve(&fake).await;
    let mut camera = Camera::builder()
        .settling_delay(Duration::from_millis(150))
        .build()
        .unwrap();
    camera.connect_to(&location(&mock_server)).await.unwrap();

    let started = std::time::Instant::now();
    assert!(camera.picture().await.unwrap().is_done());
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_unknown_precondition_issues_no_call() {
    let fake = FakeCamera::new();
    let (_mock_server, camera) = connected(&fake).await;

    let err = camera
        .ensure_available_then_call("actZoom", &[json!("in"), json!("start")])
        .await
        .unwrap_err();

    assert!(matches!(err, CameraError::UnresolvablePrecondition { .. }));
    assert_eq!(fake.count("actZoom"), 0);
    assert_eq!(fake.methods(), vec!["getMethodTypes", "getAvailableApiList"]);

    // Not a device-state failure: stays fatal through the command entry point
    assert!(matches!(
        camera.call("actZoom", &[]).await,
        Err(CameraError::UnresolvablePrecondition { .. })
    ));
}

#[tokio::test]
async fn test_still_unavailable_is_not_fatal() {
    let fake = FakeCamera {
        stuck_mode: true,
        ..FakeCamera::new()
    };
    let (_mock_server, camera) = connected(&fake).await;

    let outcome = camera.picture().await.unwrap();
    match outcome {
        CallOutcome::Failed(CameraError::StillUnavailable { method, precondition }) => {
            assert_eq!(method, "actTakePicture");
            assert_eq!(precondition, "startRecMode");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    // One precondition call, one retry, never the picture itself
    assert_eq!(fake.count("startRecMode"), 1);
    assert_eq!(fake.count("getAvailableApiList"), 3);
    assert_eq!(fake.count("actTakePicture"), 0);
}

#[tokio::test]
async fn test_cyclic_preconditions_are_capped() {
    let fake = FakeCamera::new();
    let mock_server = serve(&fake).await;
    let mut camera = Camera::builder()
        .settling_delay(Duration::ZERO)
        .max_precondition_depth(3)
        .preconditions(
            PreconditionMap::empty()
                .with("actZoom", "actHalfPressShutter")
                .with("actHalfPressShutter", "actZoom"),
        )
        .build()
        .unwrap();
    camera.connect_to(&location(&mock_server)).await.unwrap();

    let err = camera
        .ensure_available_then_call("actZoom", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, CameraError::UnresolvablePrecondition { .. }));
    // depths 0..=3 each checked availability once
    assert_eq!(fake.count("getAvailableApiList"), 4);
    assert_eq!(fake.count("actZoom"), 0);
    assert_eq!(fake.count("actHalfPressShutter"), 0);
}

#[tokio::test]
async fn test_invoke_validates_before_dispatch() {
    let fake = FakeCamera::new();
    let (_mock_server, camera) = connected(&fake).await;

    let err = camera.invoke("setExposureCompensation", &[]).await.unwrap_err();
    assert!(matches!(err, CameraError::Arity { expected: 1, given: 0, .. }));

    let err = camera
        .invoke("setExposureCompensation", &[json!(1), json!(2)])
        .await
        .unwrap_err();
    assert!(matches!(err, CameraError::Arity { expected: 1, given: 2, .. }));

    let err = camera
        .invoke("setTouchAFPosition", &[json!(10.5), json!("50")])
        .await
        .unwrap_err();
    assert!(matches!(err, CameraError::Type { index: 1, .. }));

    let err = tokio_test::assert_err!(camera.invoke("actFlyAway", &[]).await);
    assert!(matches!(err, CameraError::UnknownMethod(_)));

    // Nothing reached the camera
    assert_eq!(fake.methods(), vec!["getMethodTypes"]);

    let outcome = camera
        .invoke("setExposureCompensation", &[json!(-1)])
        .await
        .unwrap();
    assert_eq!(outcome.value(), Some(&json!([0])));
}

#[tokio::test]
async fn test_request_ids_have_no_gaps() {
    let fake = FakeCamera::new();
    let (mock_server, mut camera) = connected(&fake).await;

    camera.send("getEvent", &[json!(false)]).await.unwrap();

    let err = camera.send("brokenMethod", &[]).await.unwrap_err();
    assert!(matches!(err, CameraError::RpcTransport { .. }));

    let err = camera.send("noSuchMethod", &[]).await.unwrap_err();
    assert!(matches!(err, CameraError::Device { code: 12, .. }));

    camera.picture().await.unwrap();

    // Reconnecting keeps counting
    camera.connect_to(&location(&mock_server)).await.unwrap();
    camera.send("getEvent", &[json!(false)]).await.unwrap();

    let ids = fake.ids();
    let expected: Vec<u64> = (1..=ids.len() as u64).collect();
    assert_eq!(ids, expected);
    assert_eq!(camera.next_request_id(), ids.len() as u64 + 1);
}
