use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::net::{endpoints, ApiClient};

/// Page-level analytics callback (the `gtag`-style global), invoked with the
/// event name and payload before the beacon is sent.
pub type AnalyticsHook = Arc<dyn Fn(&str, &Value) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedEvent {
    pub event: String,
    pub data: Value,
    pub user_agent: String,
    pub timestamp: String,
}

pub struct Analytics {
    api: Arc<dyn ApiClient>,
    user_agent: String,
    hook: Option<AnalyticsHook>,
}

impl Analytics {
    pub fn new(api: Arc<dyn ApiClient>, user_agent: String) -> Self {
        Self {
            api,
            user_agent,
            hook: None,
        }
    }

    pub fn set_hook(&mut self, hook: AnalyticsHook) {
        self.hook = Some(hook);
    }

    pub fn envelope(&self, event: &str, data: Value) -> TrackedEvent {
        TrackedEvent {
            event: event.to_string(),
            data,
            user_agent: self.user_agent.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Fire-and-forget: the hook runs now, the beacon runs on `tasks`.
    /// Outside a tokio runtime the beacon is dropped.
    pub fn track(&self, tasks: &mut JoinSet<()>, event: &str, data: Value) {
        if let Some(hook) = &self.hook {
            hook(event, &data);
        }

        if Handle::try_current().is_err() {
            warn!(target: "analytics", event, "no runtime, beacon dropped");
            return;
        }

        let envelope = self.envelope(event, data);
        let body = match serde_json::to_value(&envelope) {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "analytics", event, error = %err, "failed to encode event");
                return;
            }
        };

        let api = Arc::clone(&self.api);
        let event = envelope.event;
        tasks.spawn(async move {
            match api.post_json(endpoints::ANALYTICS_TRACK, body, Vec::new()).await {
                Ok(_) => debug!(target: "analytics", %event, "event tracked"),
                Err(err) => warn!(target: "analytics", %event, error = %err, "tracking failed"),
            }
        });
    }
}
