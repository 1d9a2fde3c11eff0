//! DOM capability surface for the iframe resizer.
//!
//! The page agent never owns live DOM nodes. It talks to the host page through
//! the [`Dom`] trait using arena-style [`ElementId`] handles, which are only
//! valid for the lifetime of one page load. Anything that must survive a
//! reload is expressed as a selector string instead (see `element-locator`).

pub mod selector;
pub mod style;
#[cfg(feature = "stub")]
pub mod virtual_dom;

pub use selector::{Selector, SelectorError};
pub use style::StyleDeclaration;
#[cfg(feature = "stub")]
pub use virtual_dom::{ElementSpec, VirtualDom};

pub mod ids {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Arena index of an element inside the current page load.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
    pub struct ElementId(pub u64);

    /// Handle of a single-shot click observer.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct ObserverId(pub Uuid);

    impl ObserverId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl Default for ObserverId {
        fn default() -> Self {
            Self::new()
        }
    }
}

pub mod error {
    use super::ids::ElementId;
    use thiserror::Error;

    /// Faults raised by a [`Dom`](super::Dom) implementation.
    #[derive(Clone, Debug, Error, PartialEq)]
    pub enum DomError {
        #[error("unknown element {0:?}")]
        UnknownElement(ElementId),
        #[error("invalid selector: {0}")]
        InvalidSelector(String),
        #[error("page has no body")]
        MissingBody,
    }
}

pub mod events {
    use super::ids::ElementId;
    use serde::{Deserialize, Serialize};

    /// Page events delivered to the page agent.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub enum DomEvent {
        /// The page (re)finished loading.
        Load,
        /// A click caught by a single-shot observer.
        Click { target: ElementId },
        /// A global key press.
        KeyDown { key: String, ctrl: bool },
    }
}

pub use error::DomError;
pub use events::DomEvent;
pub use ids::{ElementId, ObserverId};

/// Viewport size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Element primitives the page agent consumes from the host page.
///
/// Implementations are expected to be cheap, synchronous calls: the agent runs
/// to completion inside each handler and never holds a handle across a reload.
pub trait Dom: Send + Sync {
    /// Elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Result<Vec<ElementId>, DomError>;

    fn body(&self) -> Option<ElementId>;

    fn tag_name(&self, element: ElementId) -> Option<String>;

    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&self, element: ElementId, name: &str) -> Result<(), DomError>;

    /// Absolute URL of the element's `src`, resolved against the document base.
    fn resource_url(&self, element: ElementId) -> Option<String>;

    /// Effective value of a CSS property after the cascade.
    fn computed_style(&self, element: ElementId, property: &str) -> Option<String>;

    fn viewport(&self) -> Viewport;

    fn scroll_into_view(&self, element: ElementId) -> Result<(), DomError>;

    /// Inserts a `<style title=..>` sheet into the document head.
    fn insert_stylesheet(&self, title: &str, css: &str);

    fn remove_stylesheet(&self, title: &str) -> bool;

    /// Registers an observer that fires for the next click on the page root only.
    fn observe_click_once(&self) -> ObserverId;

    fn cancel_observer(&self, observer: ObserverId);

    /// Shows a blocking notice to the user.
    fn alert(&self, message: &str);

    /// Inline `style` attribute, parsed.
    fn inline_style(&self, element: ElementId) -> StyleDeclaration {
        self.attribute(element, "style")
            .map(|raw| StyleDeclaration::parse(&raw))
            .unwrap_or_default()
    }

    /// Sets one inline style property, keeping the others.
    fn set_style_property(
        &self,
        element: ElementId,
        property: &str,
        value: &str,
        important: bool,
    ) -> Result<(), DomError> {
        let mut style = self.inline_style(element);
        style.set(property, value, important);
        self.set_attribute(element, "style", &style.to_css())
    }
}
