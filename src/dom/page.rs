use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::*;
use kuchiki::{parse_html, Attribute, ExpandedName, NodeRef};

use super::patch::DomPatch;
use super::selectors::{CompiledSelector, DomError};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// An HTML document owned by the controller, plus the log of mutations
/// applied to it since the last drain.
pub struct Page {
    document: NodeRef,
    mutations: Vec<DomPatch>,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: parse_html().one(html),
            mutations: Vec::new(),
        }
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeRef>, DomError> {
        Ok(CompiledSelector::compile(selector)?.select_all(&self.document))
    }

    pub fn select_first(&self, selector: &str) -> Result<Option<NodeRef>, DomError> {
        Ok(CompiledSelector::compile(selector)?.select_first(&self.document))
    }

    pub fn head(&self) -> Result<NodeRef, DomError> {
        self.first_by_tag("head")
    }

    pub fn body(&self) -> Result<NodeRef, DomError> {
        self.first_by_tag("body")
    }

    fn first_by_tag(&self, tag: &'static str) -> Result<NodeRef, DomError> {
        self.document
            .descendants()
            .elements()
            .find(|element| &*element.name.local == tag)
            .map(|element| element.as_node().clone())
            .ok_or(DomError::MissingElement(tag))
    }

    /// `content` of `<meta name="{name}">`, if the page carries one.
    pub fn meta_content(&self, name: &str) -> Option<String> {
        self.document
            .descendants()
            .elements()
            .filter(|element| &*element.name.local == "meta")
            .find(|element| element.attributes.borrow().get("name") == Some(name))
            .and_then(|element| element.attributes.borrow().get("content").map(str::to_string))
    }

    /// Element with the given `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        self.document
            .descendants()
            .elements()
            .find(|element| element.attributes.borrow().get("id") == Some(id))
            .map(|element| element.as_node().clone())
    }

    /// Adds `class` to the element. Returns `false` when it was already present.
    pub fn add_class(&mut self, node: &NodeRef, class: &str) -> bool {
        let Some(element) = node.as_element() else {
            return false;
        };
        let mut attributes = element.attributes.borrow_mut();
        let current = attributes.get("class").unwrap_or("").to_string();
        if current.split_whitespace().any(|existing| existing == class) {
            return false;
        }
        let updated = if current.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current.trim(), class)
        };
        attributes.insert("class", updated);
        drop(attributes);

        self.mutations.push(DomPatch::AddClass {
            node: describe(node),
            class: class.to_string(),
        });
        true
    }

    /// Removes `class` from the element. Returns `false` when it was absent.
    pub fn remove_class(&mut self, node: &NodeRef, class: &str) -> bool {
        let Some(element) = node.as_element() else {
            return false;
        };
        let mut attributes = element.attributes.borrow_mut();
        let current = attributes.get("class").unwrap_or("").to_string();
        if !current.split_whitespace().any(|existing| existing == class) {
            return false;
        }
        let updated = current
            .split_whitespace()
            .filter(|existing| *existing != class)
            .collect::<Vec<_>>()
            .join(" ");
        attributes.insert("class", updated);
        drop(attributes);

        self.mutations.push(DomPatch::RemoveClass {
            node: describe(node),
            class: class.to_string(),
        });
        true
    }

    /// Replaces all children of `node` with a single text node.
    pub fn set_text(&mut self, node: &NodeRef, value: &str) {
        for child in node.children().collect::<Vec<_>>() {
            child.detach();
        }
        node.append(NodeRef::new_text(value));
        self.mutations.push(DomPatch::TextContent {
            node: describe(node),
            value: value.to_string(),
        });
    }

    /// Sets one inline style property, keeping the others in place.
    pub fn set_style(&mut self, node: &NodeRef, property: &str, value: &str) {
        let Some(element) = node.as_element() else {
            return;
        };
        let mut attributes = element.attributes.borrow_mut();
        let mut declarations: Vec<(String, String)> = attributes
            .get("style")
            .unwrap_or("")
            .split(';')
            .filter_map(|declaration| {
                let (name, val) = declaration.split_once(':')?;
                Some((name.trim().to_string(), val.trim().to_string()))
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();

        match declarations.iter_mut().find(|(name, _)| name == property) {
            Some(existing) => existing.1 = value.to_string(),
            None => declarations.push((property.to_string(), value.to_string())),
        }

        let style = declarations
            .iter()
            .map(|(name, val)| format!("{name}: {val}"))
            .collect::<Vec<_>>()
            .join("; ");
        attributes.insert("style", style);
        drop(attributes);

        self.mutations.push(DomPatch::Style {
            node: describe(node),
            property: property.to_string(),
            value: value.to_string(),
        });
    }

    pub fn append_child(&mut self, parent: &NodeRef, child: NodeRef) {
        self.mutations.push(DomPatch::AppendChild {
            parent: describe(parent),
            child: describe(&child),
        });
        parent.append(child);
    }

    pub fn remove(&mut self, node: &NodeRef) {
        self.mutations.push(DomPatch::RemoveNode {
            node: describe(node),
        });
        node.detach();
    }

    pub fn drain_mutations(&mut self) -> Vec<DomPatch> {
        std::mem::take(&mut self.mutations)
    }

    pub fn to_html(&self) -> String {
        self.document.to_string()
    }
}

/// Builds a detached HTML element with the given attributes.
pub fn element(tag: &str, attributes: &[(&str, &str)]) -> NodeRef {
    let name = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag));
    let attributes = attributes.iter().map(|(key, value)| {
        (
            ExpandedName::new(Namespace::from(""), LocalName::from(*key)),
            Attribute {
                prefix: None,
                value: value.to_string(),
            },
        )
    });
    NodeRef::new_element(name, attributes)
}

pub fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attribute(node, "class")
        .map(|classes| classes.split_whitespace().any(|existing| existing == class))
        .unwrap_or(false)
}

/// Text content with surrounding whitespace trimmed.
pub fn text_of(node: &NodeRef) -> String {
    node.text_contents().trim().to_string()
}

fn describe(node: &NodeRef) -> String {
    let Some(element) = node.as_element() else {
        return String::from("#text");
    };
    let attributes = element.attributes.borrow();
    let mut label = element.name.local.to_string();
    if let Some(id) = attributes.get("id") {
        label.push('#');
        label.push_str(id);
    }
    if let Some(class) = attributes.get("class").and_then(|c| c.split_whitespace().next()) {
        label.push('.');
        label.push_str(class);
    }
    if let Some(freelancer) = attributes.get("data-freelancer-id") {
        label.push_str(&format!("[data-freelancer-id=\"{freelancer}\"]"));
    }
    label
}
