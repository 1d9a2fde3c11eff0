//! Applies a record's geometry to its frame.
//!
//! Every apply starts from the frame's memento, so applying the same record
//! twice yields the same inline style.

use dom_adapter::{Dom, DomError, ElementId};
use element_locator::resolve;
use resizer_core_types::SelectionRecord;
use tracing::{debug, info};

use crate::memento;

const FULL_VIEW: &[(&str, &str)] = &[
    ("border", "none"),
    ("margin", "0"),
    ("padding", "0"),
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100vw"),
    ("height", "100vh"),
];

/// Styles the record's frame. Returns the frame, or `None` when the locator
/// does not resolve (nothing is touched then).
pub fn apply(dom: &dyn Dom, record: &SelectionRecord) -> Result<Option<ElementId>, DomError> {
    let Some(frame) = resolve(dom, &record.locator) else {
        debug!(locator = %record.locator, "apply skipped: frame not present");
        return Ok(None);
    };

    memento::restore(dom, frame)?;
    if record.full_view_on {
        full_view(dom, frame, record.z_index)?;
    } else {
        windowed(dom, frame, record.width, record.height)?;
    }
    info!(
        name = %record.name,
        full_view = record.full_view_on,
        width = record.width,
        height = record.height,
        "frame styled"
    );
    Ok(Some(frame))
}

fn full_view(dom: &dyn Dom, frame: ElementId, z_index: i64) -> Result<(), DomError> {
    for (property, value) in FULL_VIEW {
        dom.set_style_property(frame, property, value, true)?;
    }
    dom.set_style_property(frame, "z-index", &z_index.to_string(), true)?;

    let body = dom.body().ok_or(DomError::MissingBody)?;
    memento::capture(dom, body)?;
    dom.set_style_property(body, "overflow", "hidden", true)
}

fn windowed(dom: &dyn Dom, frame: ElementId, width: f64, height: f64) -> Result<(), DomError> {
    if let Some(body) = dom.body() {
        memento::restore(dom, body)?;
    }
    dom.set_style_property(frame, "width", &format!("{width}vw"), true)?;
    dom.set_style_property(frame, "height", &format!("{height}vh"), true)?;
    dom.scroll_into_view(frame)
}

/// Captures any missing mementos for the frame and the body, then applies.
/// Used whenever the frame may not have been touched during this page load.
pub fn refresh(dom: &dyn Dom, record: &SelectionRecord) -> Result<Option<ElementId>, DomError> {
    let Some(frame) = resolve(dom, &record.locator) else {
        return Ok(None);
    };
    if let Some(body) = dom.body() {
        memento::capture(dom, body)?;
    }
    memento::capture(dom, frame)?;
    apply(dom, record)
}

/// Puts the frame and the body back the way they were before any selection
/// and forgets both mementos.
pub fn discard(dom: &dyn Dom, record: &SelectionRecord) -> Result<(), DomError> {
    if let Some(frame) = resolve(dom, &record.locator) {
        memento::release(dom, frame)?;
    }
    if let Some(body) = dom.body() {
        memento::release(dom, body)?;
    }
    Ok(())
}
