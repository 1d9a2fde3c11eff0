//! `describe` / `resolve` over the DOM capability surface

use dom_adapter::{Dom, ElementId, Selector};
use resizer_core_types::{Locator, FRAME_TAG};
use tracing::{debug, warn};

use crate::errors::LocatorError;

/// Builds the selector for `element`: `id` wins over `class`, which wins over the bare tag.
pub fn query_for(dom: &dyn Dom, element: ElementId) -> Result<String, LocatorError> {
    let tag = dom
        .tag_name(element)
        .ok_or(LocatorError::Detached(element))?;
    let tag = if tag.is_empty() { FRAME_TAG.to_string() } else { tag };
    let non_empty = |name: &str| dom.attribute(element, name).filter(|v| !v.is_empty());

    let selector = if let Some(id) = non_empty("id") {
        Selector::tag(tag).with_attribute("id", id)
    } else if let Some(class) = non_empty("class") {
        Selector::tag(tag).with_attribute("class", class)
    } else {
        Selector::tag(tag)
    };
    Ok(selector.to_string())
}

/// Derives a replayable descriptor for `element`.
pub fn describe(dom: &dyn Dom, element: ElementId) -> Result<Locator, LocatorError> {
    let query = query_for(dom, element)?;
    let matches = dom.query_all(&query)?;

    let index = if matches.len() <= 1 {
        0
    } else {
        matches
            .iter()
            .position(|candidate| *candidate == element)
            .ok_or_else(|| LocatorError::NotMatched {
                element,
                query: query.clone(),
            })?
    };

    if matches.len() > 1 {
        let src = dom.resource_url(element);
        let twins = matches
            .iter()
            .filter(|candidate| dom.resource_url(**candidate) == src)
            .count();
        if twins > 1 {
            warn!(
                %query,
                index,
                twins,
                "frames share query and src; identity relies on document order"
            );
        }
    }

    let locator = Locator::new(query, index);
    debug!(%locator, matches = matches.len(), "described element");
    Ok(locator)
}

/// Re-finds the element a descriptor points at.
///
/// `None` is the normal answer while content is still loading after a
/// navigation, and for descriptors whose target is gone for good.
pub fn resolve(dom: &dyn Dom, locator: &Locator) -> Option<ElementId> {
    match dom.query_all(&locator.query) {
        Ok(matches) => matches.get(locator.index).copied(),
        Err(err) => {
            warn!(%locator, error = %err, "locator query rejected by the page");
            None
        }
    }
}
