//! Building a fresh [`SelectionRecord`] from a live frame.

use dom_adapter::{Dom, ElementId};
use element_locator::describe;
use resizer_core_types::{round_percent, SelectionRecord, FALLBACK_NAME};
use tracing::debug;
use url::Url;

use crate::errors::{PageError, PageResult};

/// Snapshots `frame` into a record: label, locator, geometry as viewport
/// percentages and a z-index above everything currently on the page.
pub fn capture_record(
    dom: &dyn Dom,
    frame: ElementId,
    full_view_on: bool,
) -> PageResult<SelectionRecord> {
    let locator = describe(dom, frame)?;
    let viewport = dom.viewport();
    let width = pixels(dom, frame, "width")?;
    let height = pixels(dom, frame, "height")?;

    let record = SelectionRecord {
        name: frame_name(dom, frame),
        locator,
        width: percent_of(frame, "width", width, viewport.width)?,
        height: percent_of(frame, "height", height, viewport.height)?,
        z_index: largest_z_index(dom)? + 1,
        full_view_on,
    };
    debug!(name = %record.name, locator = %record.locator, "captured selection record");
    Ok(record)
}

/// `name`, `title`, `id`, then the host of the frame's source.
pub fn frame_name(dom: &dyn Dom, frame: ElementId) -> String {
    ["name", "title", "id"]
        .iter()
        .filter_map(|attr| dom.attribute(frame, attr))
        .find(|value| !value.trim().is_empty())
        .or_else(|| {
            dom.resource_url(frame)
                .and_then(|src| Url::parse(&src).ok())
                .and_then(|url| url.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Highest numeric computed `z-index` in the document, never below zero.
pub fn largest_z_index(dom: &dyn Dom) -> PageResult<i64> {
    let largest = dom
        .query_all("*")?
        .into_iter()
        .filter_map(|element| dom.computed_style(element, "z-index"))
        .filter_map(|raw| parse_leading_int(&raw))
        .fold(0, i64::max);
    Ok(largest)
}

fn pixels(dom: &dyn Dom, element: ElementId, property: &'static str) -> PageResult<f64> {
    let raw = dom.computed_style(element, property);
    raw.as_deref()
        .and_then(|value| value.trim().trim_end_matches("px").trim().parse::<f64>().ok())
        .filter(|px| px.is_finite())
        .ok_or(PageError::Geometry {
            element,
            property,
            value: raw,
        })
}

/// `px` as a rounded percentage of `extent`. A degenerate viewport yields no
/// usable geometry rather than an infinite or NaN record.
fn percent_of(
    element: ElementId,
    property: &'static str,
    px: f64,
    extent: f64,
) -> PageResult<f64> {
    let percent = round_percent(px / extent * 100.0);
    if extent.is_finite() && extent > 0.0 && percent.is_finite() {
        Ok(percent)
    } else {
        Err(PageError::Geometry {
            element,
            property,
            value: Some(format!("{px}px of a {extent}px viewport")),
        })
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .find(|&(idx, ch)| !(ch.is_ascii_digit() || (idx == 0 && (ch == '-' || ch == '+'))))
        .map(|(idx, _)| idx)
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_adapter::{ElementSpec, Viewport, VirtualDom};

    fn page() -> VirtualDom {
        VirtualDom::new(
            Url::parse("https://host.example/page").unwrap(),
            Viewport::new(1280.0, 720.0),
        )
    }

    #[test]
    fn name_follows_precedence() {
        let dom = page();
        let named = dom.append(
            ElementSpec::iframe("/a")
                .attr("name", "main")
                .attr("title", "Title")
                .attr("id", "ident"),
        );
        let titled = dom.append(ElementSpec::iframe("/a").attr("title", "Title").attr("id", "x"));
        let with_id = dom.append(ElementSpec::iframe("/a").attr("id", "ident"));
        let remote = dom.append(ElementSpec::iframe("https://player.video.example/embed/1"));
        let nowhere = dom.append(ElementSpec::new("iframe"));

        assert_eq!(frame_name(&dom, named), "main");
        assert_eq!(frame_name(&dom, titled), "Title");
        assert_eq!(frame_name(&dom, with_id), "ident");
        assert_eq!(frame_name(&dom, remote), "player.video.example");
        assert_eq!(frame_name(&dom, nowhere), FALLBACK_NAME);
    }

    #[test]
    fn z_index_ignores_auto_and_floors_at_zero() {
        let dom = page();
        dom.append(ElementSpec::new("div").z_index(-4));
        assert_eq!(largest_z_index(&dom).unwrap(), 0);
        dom.append(ElementSpec::new("div").z_index(12));
        dom.append(ElementSpec::new("div").attr("style", "z-index: 40;"));
        dom.append(ElementSpec::new("div").attr("style", "z-index: auto;"));
        assert_eq!(largest_z_index(&dom).unwrap(), 40);
    }

    #[test]
    fn geometry_is_percent_of_viewport() {
        let dom = page();
        let frame = dom.append(ElementSpec::iframe("/video").size(640.0, 240.0));
        let record = capture_record(&dom, frame, false).unwrap();
        assert_eq!(record.width, 50.0);
        assert_eq!(record.height, 33.33);
        assert_eq!(record.z_index, 1);
        assert_eq!(record.name, "host.example");
        assert_eq!(record.locator.query, "iframe");
        assert!(!record.full_view_on);
    }

    #[test]
    fn zero_viewport_yields_no_record() {
        let dom = VirtualDom::new(
            Url::parse("https://host.example/page").unwrap(),
            Viewport::new(0.0, 0.0),
        );
        let frame = dom.append(ElementSpec::iframe("/video"));
        match capture_record(&dom, frame, false) {
            Err(PageError::Geometry { property, .. }) => assert_eq!(property, "width"),
            other => panic!("expected a geometry error, got {other:?}"),
        }

        let dom = VirtualDom::new(
            Url::parse("https://host.example/page").unwrap(),
            Viewport::new(800.0, f64::NAN),
        );
        let frame = dom.append(ElementSpec::iframe("/video"));
        assert!(matches!(
            capture_record(&dom, frame, false),
            Err(PageError::Geometry { property: "height", .. })
        ));
    }

    #[test]
    fn leading_integer_parse() {
        assert_eq!(parse_leading_int("12"), Some(12));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("7px"), Some(7));
        assert_eq!(parse_leading_int("auto"), None);
    }
}
