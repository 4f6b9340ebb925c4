#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use freelancer_cards::analytics::AnalyticsHook;
use freelancer_cards::{ApiClient, ApiError, CardInteractionController, ControllerConfig, Page};
use kuchiki::NodeRef;
use serde_json::Value;

pub const RESULTS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta name="csrf-token" content="tok-123"><title>Resultados</title></head>
<body>
<div class="results">
  <div class="freelancer-card" data-freelancer-id="101">
    <div class="profile-image-container"><img src="/media/ana.png" alt="Ana"></div>
    <h3 class="freelancer-name">Ana Gómez</h3>
    <div class="rating">
      <span class="star filled"></span><span class="star filled"></span><span class="star filled"></span><span class="star"></span><span class="star"></span>
      <span class="rating-number">3.0</span>
    </div>
    <div class="skills">
      <span class="skill-tag">Rust</span>
      <span class="skill-tag"> UX Design </span>
      <span class="skill-tag more-skills">+3</span>
    </div>
    <span class="hourly-rate">AR$ 1.000</span>
    <a class="btn-contact" href="/login">Contactar</a>
    <button class="btn-hire">Ver perfil</button>
  </div>
  <div class="freelancer-card" data-freelancer-id="202">
    <div class="profile-image-container"><img src="/media/luis.png" alt="Luis"><span class="online-indicator"></span></div>
    <h3 class="freelancer-name">Luis Pérez</h3>
    <div class="rating">
      <span class="star"></span><span class="star"></span><span class="star"></span><span class="star"></span><span class="star"></span>
      <span class="rating-number">0.0</span>
    </div>
    <div class="skills"><span class="skill-tag">UX Design</span></div>
    <span class="hourly-rate">AR$ 900</span>
    <button class="btn-contact">Contactar</button>
  </div>
</div>
</body>
</html>"#;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

/// In-memory API that records every call and replies from a canned table.
/// Unconfigured paths answer `null`.
#[derive(Default)]
pub struct RecordingApi {
    requests: Mutex<Vec<RecordedRequest>>,
    responses: Mutex<HashMap<String, Result<Value, u16>>>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Ok(body));
    }

    pub fn fail(&self, path: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Err(status));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    /// Event names of every analytics beacon received so far.
    pub fn tracked_events(&self) -> Vec<String> {
        self.requests_to("/api/analytics/track")
            .into_iter()
            .filter_map(|request| request.body)
            .filter_map(|body| body["event"].as_str().map(str::to_string))
            .collect()
    }

    fn reply(&self, path: &str) -> Result<Value, ApiError> {
        match self.responses.lock().unwrap().get(path) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(ApiError::Status {
                path: path.to_string(),
                status: *status,
            }),
            None => Ok(Value::Null),
        }
    }
}

#[async_trait]
impl ApiClient for RecordingApi {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "GET",
            path: path.to_string(),
            body: None,
            headers: Vec::new(),
        });
        self.reply(path)
    }

    async fn post_json(
        &self,
        path: &str,
        body: Value,
        headers: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            body: Some(body),
            headers,
        });
        self.reply(path)
    }
}

/// Event names seen by the page-level analytics hook, in call order.
#[derive(Clone, Default)]
pub struct HookLog(Arc<Mutex<Vec<(String, Value)>>>);

impl HookLog {
    pub fn hook(&self) -> AnalyticsHook {
        let log = Arc::clone(&self.0);
        Arc::new(move |event: &str, data: &Value| {
            log.lock().unwrap().push((event.to_string(), data.clone()));
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|(name, _)| name == event).count()
    }
}

pub fn controller_for(html: &str, api: Arc<RecordingApi>) -> (CardInteractionController, HookLog) {
    let log = HookLog::default();
    let controller =
        CardInteractionController::new(Page::parse(html), api, ControllerConfig::default())
            .expect("controller")
            .with_analytics_hook(log.hook());
    (controller, log)
}

pub fn node(controller: &CardInteractionController, selector: &str) -> NodeRef {
    controller
        .page()
        .select_first(selector)
        .expect("valid selector")
        .unwrap_or_else(|| panic!("nothing matches {selector}"))
}

pub fn count(controller: &CardInteractionController, selector: &str) -> usize {
    controller.page().select_all(selector).expect("valid selector").len()
}
