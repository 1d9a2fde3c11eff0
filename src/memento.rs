//! Original inline-style capture and undo.
//!
//! The original `style` attribute is parked in `data-og-style` the first time
//! an element is about to be mutated. An empty value records "had no inline
//! style", so unstyled elements are protected by first-write-wins as well.

use dom_adapter::{Dom, DomError, ElementId};
use resizer_core_types::MEMENTO_ATTRIBUTE;
use tracing::trace;

/// Captures `element`'s inline style unless a memento already exists.
/// Returns whether a new memento was written.
pub fn capture(dom: &dyn Dom, element: ElementId) -> Result<bool, DomError> {
    if dom.tag_name(element).is_none() {
        return Err(DomError::UnknownElement(element));
    }
    if dom.attribute(element, MEMENTO_ATTRIBUTE).is_some() {
        return Ok(false);
    }
    let original = dom.attribute(element, "style").unwrap_or_default();
    dom.set_attribute(element, MEMENTO_ATTRIBUTE, &original)?;
    trace!(?element, %original, "style memento captured");
    Ok(true)
}

/// Puts the captured style back, or drops the inline style when none was captured.
/// The memento stays in place for later restores.
pub fn restore(dom: &dyn Dom, element: ElementId) -> Result<(), DomError> {
    match dom.attribute(element, MEMENTO_ATTRIBUTE) {
        Some(original) if !original.is_empty() => dom.set_attribute(element, "style", &original),
        _ => dom.remove_attribute(element, "style"),
    }
}

/// Restores and forgets the memento.
pub fn release(dom: &dyn Dom, element: ElementId) -> Result<(), DomError> {
    restore(dom, element)?;
    dom.remove_attribute(element, MEMENTO_ATTRIBUTE)
}

pub fn has_memento(dom: &dyn Dom, element: ElementId) -> bool {
    dom.attribute(element, MEMENTO_ATTRIBUTE).is_some()
}
