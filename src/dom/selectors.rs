use kuchiki::traits::*;
use kuchiki::{NodeRef, Selectors};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("document has no <{0}> element")]
    MissingElement(&'static str),
}

/// A CSS selector compiled once and matched against nodes many times.
pub struct CompiledSelector {
    source: String,
    selectors: Selectors,
}

impl CompiledSelector {
    pub fn compile(source: &str) -> Result<Self, DomError> {
        let selectors = Selectors::compile(source)
            .map_err(|_| DomError::InvalidSelector(source.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            selectors,
        })
    }

    /// Whether `node` is an element matching this selector.
    pub fn matches(&self, node: &NodeRef) -> bool {
        match node.clone().into_element_ref() {
            Some(element) => self.selectors.matches(&element),
            None => false,
        }
    }

    /// Nearest inclusive ancestor of `node` matching this selector.
    pub fn closest(&self, node: &NodeRef) -> Option<NodeRef> {
        node.inclusive_ancestors()
            .elements()
            .find(|element| self.selectors.matches(element))
            .map(|element| element.as_node().clone())
    }

    /// All matching elements under `root` (inclusive), in document order.
    pub fn select_all(&self, root: &NodeRef) -> Vec<NodeRef> {
        root.inclusive_descendants()
            .elements()
            .filter(|element| self.selectors.matches(element))
            .map(|element| element.as_node().clone())
            .collect()
    }

    pub fn select_first(&self, root: &NodeRef) -> Option<NodeRef> {
        root.inclusive_descendants()
            .elements()
            .find(|element| self.selectors.matches(element))
            .map(|element| element.as_node().clone())
    }
}

impl std::fmt::Debug for CompiledSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CompiledSelector").field(&self.source).finish()
    }
}
