mod page;
mod patch;
mod selectors;

pub use page::{attribute, element, has_class, text_of, Page};
pub use patch::DomPatch;
pub use selectors::{CompiledSelector, DomError};
