use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use kuchiki::NodeRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dom::{attribute, element, DomError, Page};
use crate::timers::TimerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Error,
    Success,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Info => "info",
            ToastKind::Error => "error",
            ToastKind::Success => "success",
        }
    }
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown toast kind '{0}'")]
pub struct UnknownToastKind(String);

impl FromStr for ToastKind {
    type Err = UnknownToastKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(ToastKind::Info),
            "error" => Ok(ToastKind::Error),
            "success" => Ok(ToastKind::Success),
            other => Err(UnknownToastKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToastId(pub u64);

struct ActiveToast {
    node: NodeRef,
    timers: Vec<TimerId>,
}

/// Toasts currently attached to the page. Toasts stack without limit.
#[derive(Default)]
pub struct ToastStack {
    next_id: u64,
    active: HashMap<ToastId, ActiveToast>,
}

impl ToastStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a toast element to `<body>`.
    pub fn show(
        &mut self,
        page: &mut Page,
        message: &str,
        kind: ToastKind,
    ) -> Result<ToastId, DomError> {
        let body = page.body()?;
        self.next_id += 1;
        let id = ToastId(self.next_id);

        let class = format!("toast toast-{kind}");
        let id_attr = id.0.to_string();
        let node = element(
            "div",
            &[
                ("class", class.as_str()),
                ("data-toast-id", id_attr.as_str()),
                ("role", "status"),
            ],
        );
        let text = element("span", &[("class", "toast-message")]);
        let close = element("button", &[("class", "toast-close"), ("aria-label", "Close")]);
        node.append(text.clone());
        node.append(close.clone());
        page.append_child(&body, node.clone());
        page.set_text(&text, message);
        page.set_text(&close, "\u{00d7}");

        debug!(target: "toast", id = id.0, %kind, text = message, "toast shown");
        self.active.insert(
            id,
            ActiveToast {
                node,
                timers: Vec::new(),
            },
        );
        Ok(id)
    }

    pub fn track_timer(&mut self, id: ToastId, timer: TimerId) {
        if let Some(toast) = self.active.get_mut(&id) {
            toast.timers.push(timer);
        }
    }

    /// Starts the reverse slide-out animation. Returns `false` for unknown toasts.
    pub fn begin_exit(&mut self, page: &mut Page, id: ToastId) -> bool {
        match self.active.get(&id) {
            Some(toast) => {
                page.set_style(&toast.node, "animation", "slideIn 0.3s ease reverse");
                true
            }
            None => false,
        }
    }

    /// Detaches the toast, handing back the timers that may still be pending.
    pub fn remove(&mut self, page: &mut Page, id: ToastId) -> Option<Vec<TimerId>> {
        let toast = self.active.remove(&id)?;
        page.remove(&toast.node);
        debug!(target: "toast", id = id.0, "toast removed");
        Some(toast.timers)
    }

    pub fn contains(&self, id: ToastId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Id of the toast element `node` belongs to.
pub fn toast_id_of(node: &NodeRef) -> Option<ToastId> {
    node.inclusive_ancestors()
        .find_map(|ancestor| attribute(&ancestor, "data-toast-id"))
        .and_then(|raw| raw.parse().ok())
        .map(ToastId)
}
