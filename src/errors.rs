//! Error handling module
//!
//! Faults the page agent can hit while touching the page or the session slot.
//! None of them are fatal: handlers log them and fall back to "no selection".

use dom_adapter::{DomError, ElementId};
use element_locator::LocatorError;
use resizer_selection_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("dom error: {0}")]
    Dom(#[from] DomError),

    #[error("locator error: {0}")]
    Locator(#[from] LocatorError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Computed geometry could not be read as pixels
    #[error("unreadable {property} on {element:?}: {value:?}")]
    Geometry {
        element: ElementId,
        property: &'static str,
        value: Option<String>,
    },
}

impl PageError {
    /// True when the element vanished between lookup and use.
    pub fn is_stale_element(&self) -> bool {
        matches!(
            self,
            PageError::Dom(DomError::UnknownElement(_))
                | PageError::Locator(LocatorError::Detached(_))
        )
    }
}

pub type PageResult<T> = Result<T, PageError>;
