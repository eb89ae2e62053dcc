//! Fake Scalar Web API camera served by wiremock

#![allow(dead_code)]

use pmocamera::Camera;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PICTURE_URL: &str = "http://192.168.122.1:8080/postview/pict.jpg";

#[derive(Debug, Default)]
pub struct State {
    rec_mode: bool,
    pictures: usize,
    busy_rounds: usize,
    calls: Vec<(String, u64)>,
}

/// Behaviour knobs and call log of the fake camera
#[derive(Debug, Clone, Default)]
pub struct FakeCamera {
    pub state: Arc<Mutex<State>>,
    /// `startRecMode` succeeds but pictures never become available
    pub stuck_mode: bool,
    /// Picture number (1-based) answered with a device error
    pub failing_picture: Option<usize>,
    /// Picture number answered with HTTP 200 and a body that is not JSON
    pub garbled_picture: Option<usize>,
    /// After this picture, the next two availability checks list neither
    /// `actTakePicture` nor `startRecMode`
    pub busy_after: Option<usize>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_rec_mode(self) -> Self {
        self.state.lock().unwrap().rec_mode = true;
        self
    }

    /// Methods received, in order
    pub fn methods(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    /// Request ids received, in order
    pub fn ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().calls.iter().map(|(_, id)| *id).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.methods().iter().filter(|m| *m == name).count()
    }

    fn available(state: &State, stuck_mode: bool, busy: bool) -> Value {
        let mut names = vec![
            "getAvailableApiList",
            "getMethodTypes",
            "setExposureCompensation",
            "getEvent",
        ];
        match (busy, state.rec_mode && !stuck_mode) {
            (true, _) => {}
            (false, true) => names.extend(["actTakePicture", "stopRecMode"]),
            (false, false) => names.push("startRecMode"),
        }
        json!([names])
    }
}

impl Respond for FakeCamera {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let name = body["method"].as_str().unwrap_or_default().to_string();
        let id = body["id"].as_u64().unwrap_or_default();
        assert_eq!(body["version"], "1.0");

        let mut state = self.state.lock().unwrap();
        state.calls.push((name.clone(), id));

        let answer = match name.as_str() {
            "getMethodTypes" => {
                assert_eq!(body["params"], json!(["1.0"]));
                json!({"id": id, "results": [
                    ["getAvailableApiList", [], ["string*"], "1.0"],
                    ["getMethodTypes", ["string"], ["string", "string*", "string*", "string"], "1.0"],
                    ["startRecMode", [], ["int"], "1.0"],
                    ["stopRecMode", [], ["int"], "1.0"],
                    ["actTakePicture", [], ["string*"], "1.0"],
                    ["setExposureCompensation", ["int"], ["int"], "1.0"],
                    ["setTouchAFPosition", ["double", "double"], ["int", "JSON"], "1.0"],
                    ["getEvent", ["bool"], ["JSON*"], "1.0"]
                ]})
            }
            "getAvailableApiList" => {
                let busy = state.busy_rounds > 0;
                state.busy_rounds = state.busy_rounds.saturating_sub(1);
                json!({"id": id, "result": Self::available(&state, self.stuck_mode, busy)})
            }
            "startRecMode" => {
                state.rec_mode = true;
                json!({"id": id, "result": [0]})
            }
            "stopRecMode" => {
                state.rec_mode = false;
                json!({"id": id, "result": [0]})
            }
            "actTakePicture" if state.rec_mode && !self.stuck_mode => {
                state.pictures += 1;
                if self.busy_after == Some(state.pictures) {
                    state.busy_rounds = 2;
                }
                if self.garbled_picture == Some(state.pictures) {
                    return ResponseTemplate::new(200).set_body_string("<html>Busy</html>");
                }
                if self.failing_picture == Some(state.pictures) {
                    json!({"id": id, "error": [40400, "Still Capturing Not Finished"]})
                } else {
                    json!({"id": id, "result": [[PICTURE_URL]]})
                }
            }
            "actTakePicture" => json!({"id": id, "error": [1, "Not Available Now"]}),
            "setExposureCompensation" | "setTouchAFPosition" | "getEvent" => {
                json!({"id": id, "result": [0]})
            }
            "brokenMethod" => {
                return ResponseTemplate::new(500).set_body_string("<html>oops</html>");
            }
            _ => json!({"id": id, "error": [12, "No Such Method"]}),
        };

        ResponseTemplate::new(200).set_body_json(answer)
    }
}

pub fn description_xml(action_list_url: &str, service_type: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" xmlns:av="urn:schemas-sony-com:av">
  <device>
    <friendlyName>ILCE-QX1</friendlyName>
    <manufacturer>Sony Corporation</manufacturer>
    <modelName>SonyImagingDevice</modelName>
    <av:X_ScalarWebAPI_DeviceInfo>
      <av:X_ScalarWebAPI_ServiceList>
        <av:X_ScalarWebAPI_Service>
          <av:X_ScalarWebAPI_ServiceType>{service_type}</av:X_ScalarWebAPI_ServiceType>
          <av:X_ScalarWebAPI_ActionList_URL>{action_list_url}</av:X_ScalarWebAPI_ActionList_URL>
        </av:X_ScalarWebAPI_Service>
      </av:X_ScalarWebAPI_ServiceList>
    </av:X_ScalarWebAPI_DeviceInfo>
  </device>
</root>"#
    )
}

/// Serve the description and the control endpoint of `fake`
pub async fn serve(fake: &FakeCamera) -> MockServer {
    serve_with_service(fake, "camera").await
}

pub async fn serve_with_service(fake: &FakeCamera, service_type: &str) -> MockServer {
    let mock_server = MockServer::start().await;
    let action_list = format!("{}/sony", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/dd.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(description_xml(&action_list, service_type)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sony/camera"))
        .respond_with(fake.clone())
        .mount(&mock_server)
        .await;

    mock_server
}

pub fn location(mock_server: &MockServer) -> String {
    format!("{}/dd.xml", mock_server.uri())
}

/// Camera without settling delay
pub fn camera() -> Camera {
    Camera::builder()
        .settling_delay(Duration::ZERO)
        .build()
        .unwrap()
}

/// Connected camera and the server backing it
pub async fn connected(fake: &FakeCamera) -> (MockServer, Camera) {
    let mock_server = serve(fake).await;
    let mut camera = camera();
    camera.connect_to(&location(&mock_server)).await.unwrap();
    (mock_server, camera)
}
