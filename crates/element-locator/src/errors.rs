//! Error types for the locator

use dom_adapter::{DomError, ElementId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// The element is not part of the current document
    #[error("element {0:?} is not attached to the document")]
    Detached(ElementId),

    /// The element is attached but its own query does not match it
    #[error("element {element:?} is not matched by `{query}`")]
    NotMatched { element: ElementId, query: String },

    #[error("dom error: {0}")]
    Dom(#[from] DomError),
}
