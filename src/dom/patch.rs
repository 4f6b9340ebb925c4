use serde::{Deserialize, Serialize};

/// A mutation applied to the page, recorded in application order.
///
/// `node` is a short human-readable label (`tag#id.class[data-freelancer-id]`)
/// rather than a stable handle; the log exists for diagnostics and tests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomPatch {
    AddClass {
        node: String,
        class: String,
    },
    RemoveClass {
        node: String,
        class: String,
    },
    TextContent {
        node: String,
        value: String,
    },
    Style {
        node: String,
        property: String,
        value: String,
    },
    AppendChild {
        parent: String,
        child: String,
    },
    RemoveNode {
        node: String,
    },
}

impl DomPatch {
    pub fn node(&self) -> &str {
        match self {
            DomPatch::AddClass { node, .. }
            | DomPatch::RemoveClass { node, .. }
            | DomPatch::TextContent { node, .. }
            | DomPatch::Style { node, .. }
            | DomPatch::RemoveNode { node } => node,
            DomPatch::AppendChild { parent, .. } => parent,
        }
    }
}
