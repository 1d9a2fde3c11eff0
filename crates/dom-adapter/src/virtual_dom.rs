//! In-memory page implementing [`Dom`].
//!
//! Elements live in an append-only arena, so arena order is document order.
//! Layout is fixture-driven: each element carries a natural pixel size and an
//! optional stylesheet `z-index`, and inline `width`/`height`/`z-index`
//! override them the way the cascade would.

use std::collections::HashSet;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::{
    Dom, DomError, DomEvent, ElementId, ObserverId, Selector, StyleDeclaration, Viewport,
};

/// Fixture description of one element.
#[derive(Clone, Debug, Default)]
pub struct ElementSpec {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub width: f64,
    pub height: f64,
    pub z_index: Option<i64>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn iframe(src: impl Into<String>) -> Self {
        Self::new("iframe").attr("src", src).size(300.0, 150.0)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn z_index(mut self, z_index: i64) -> Self {
        self.z_index = Some(z_index);
        self
    }
}

#[derive(Clone, Debug)]
struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    width: f64,
    height: f64,
    z_index: Option<i64>,
    attached: bool,
}

impl Node {
    fn from_spec(spec: ElementSpec) -> Self {
        Self {
            tag: spec.tag,
            attributes: spec.attributes,
            width: spec.width,
            height: spec.height,
            z_index: spec.z_index,
            attached: true,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    nodes: Vec<Node>,
    body: ElementId,
    stylesheets: Vec<(String, String)>,
    observers: HashSet<ObserverId>,
    alerts: Vec<String>,
    scrolled: Vec<ElementId>,
    events: Option<mpsc::UnboundedSender<DomEvent>>,
}

impl Inner {
    fn node(&self, element: ElementId) -> Result<&Node, DomError> {
        self.nodes
            .get(element.0 as usize)
            .filter(|node| node.attached)
            .ok_or(DomError::UnknownElement(element))
    }

    fn node_mut(&mut self, element: ElementId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(element.0 as usize)
            .filter(|node| node.attached)
            .ok_or(DomError::UnknownElement(element))
    }

    fn emit(&self, event: DomEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

pub struct VirtualDom {
    base_url: Url,
    viewport: Viewport,
    inner: Mutex<Inner>,
}

impl VirtualDom {
    /// Creates a page containing `<html>` and an empty `<body>`.
    pub fn new(base_url: Url, viewport: Viewport) -> Self {
        let html = Node::from_spec(ElementSpec::new("html").size(viewport.width, viewport.height));
        let body = Node::from_spec(ElementSpec::new("body").size(viewport.width, viewport.height));
        Self {
            base_url,
            viewport,
            inner: Mutex::new(Inner {
                nodes: vec![html, body],
                body: ElementId(1),
                stylesheets: Vec::new(),
                observers: HashSet::new(),
                alerts: Vec::new(),
                scrolled: Vec::new(),
                events: None,
            }),
        }
    }

    /// Appends an element at the end of the document.
    pub fn append(&self, spec: ElementSpec) -> ElementId {
        let mut inner = self.inner.lock();
        inner.nodes.push(Node::from_spec(spec));
        ElementId(inner.nodes.len() as u64 - 1)
    }

    /// Detaches an element; its handle stops resolving.
    pub fn detach(&self, element: ElementId) -> bool {
        let mut inner = self.inner.lock();
        match inner.node_mut(element) {
            Ok(node) => {
                node.attached = false;
                true
            }
            Err(_) => false,
        }
    }

    /// Routes future page events to the returned receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DomEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().events = Some(tx);
        rx
    }

    /// Simulates a user click. Only delivered while a click observer is armed;
    /// delivery consumes every armed observer.
    pub fn click(&self, target: ElementId) -> bool {
        let mut inner = self.inner.lock();
        if inner.observers.is_empty() {
            debug!(?target, "click ignored: no observer armed");
            return false;
        }
        inner.observers.clear();
        inner.emit(DomEvent::Click { target });
        true
    }

    pub fn press_key(&self, key: &str, ctrl: bool) {
        self.inner.lock().emit(DomEvent::KeyDown {
            key: key.to_string(),
            ctrl,
        });
    }

    pub fn fire_load(&self) {
        self.inner.lock().emit(DomEvent::Load);
    }

    pub fn armed_observers(&self) -> usize {
        self.inner.lock().observers.len()
    }

    pub fn has_stylesheet(&self, title: &str) -> bool {
        self.inner
            .lock()
            .stylesheets
            .iter()
            .any(|(existing, _)| existing == title)
    }

    pub fn alerts(&self) -> Vec<String> {
        self.inner.lock().alerts.clone()
    }

    pub fn take_alerts(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().alerts)
    }

    pub fn scrolled(&self) -> Vec<ElementId> {
        self.inner.lock().scrolled.clone()
    }

    fn length_to_px(&self, raw: &str, fallback: f64) -> f64 {
        let raw = raw.trim();
        let parse = |suffix: &str| raw.strip_suffix(suffix).and_then(|n| n.trim().parse::<f64>().ok());
        if let Some(px) = parse("px") {
            px
        } else if let Some(vw) = parse("vw") {
            vw * self.viewport.width / 100.0
        } else if let Some(vh) = parse("vh") {
            vh * self.viewport.height / 100.0
        } else {
            raw.parse::<f64>().unwrap_or(fallback)
        }
    }
}

impl Dom for VirtualDom {
    fn query_all(&self, selector: &str) -> Result<Vec<ElementId>, DomError> {
        let selector =
            Selector::parse(selector).map_err(|err| DomError::InvalidSelector(err.to_string()))?;
        let inner = self.inner.lock();
        Ok(inner
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.attached)
            .filter(|(_, node)| selector.matches(&node.tag, |name| node.attr(name)))
            .map(|(idx, _)| ElementId(idx as u64))
            .collect())
    }

    fn body(&self) -> Option<ElementId> {
        let inner = self.inner.lock();
        let body = inner.body;
        inner.node(body).ok().map(|_| body)
    }

    fn tag_name(&self, element: ElementId) -> Option<String> {
        let inner = self.inner.lock();
        inner.node(element).ok().map(|node| node.tag.clone())
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .node(element)
            .ok()
            .and_then(|node| node.attr(name).map(str::to_string))
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.lock();
        let node = inner.node_mut(element)?;
        let name = name.to_ascii_lowercase();
        match node.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => node.attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&self, element: ElementId, name: &str) -> Result<(), DomError> {
        let mut inner = self.inner.lock();
        let node = inner.node_mut(element)?;
        node.attributes
            .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        Ok(())
    }

    fn resource_url(&self, element: ElementId) -> Option<String> {
        let src = self.attribute(element, "src")?;
        self.base_url.join(&src).ok().map(|url| url.to_string())
    }

    fn computed_style(&self, element: ElementId, property: &str) -> Option<String> {
        let inner = self.inner.lock();
        let node = inner.node(element).ok()?;
        let inline = node
            .attr("style")
            .map(StyleDeclaration::parse)
            .unwrap_or_default();
        match property {
            "width" => {
                let px = inline
                    .get("width")
                    .map(|raw| self.length_to_px(raw, node.width))
                    .unwrap_or(node.width);
                Some(format!("{px}px"))
            }
            "height" => {
                let px = inline
                    .get("height")
                    .map(|raw| self.length_to_px(raw, node.height))
                    .unwrap_or(node.height);
                Some(format!("{px}px"))
            }
            "z-index" => Some(
                inline
                    .get("z-index")
                    .map(str::to_string)
                    .or_else(|| node.z_index.map(|z| z.to_string()))
                    .unwrap_or_else(|| "auto".to_string()),
            ),
            other => inline.get(other).map(str::to_string),
        }
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn scroll_into_view(&self, element: ElementId) -> Result<(), DomError> {
        let mut inner = self.inner.lock();
        inner.node(element)?;
        inner.scrolled.push(element);
        Ok(())
    }

    fn insert_stylesheet(&self, title: &str, css: &str) {
        self.inner
            .lock()
            .stylesheets
            .push((title.to_string(), css.to_string()));
    }

    fn remove_stylesheet(&self, title: &str) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.stylesheets.len();
        inner.stylesheets.retain(|(existing, _)| existing != title);
        before != inner.stylesheets.len()
    }

    fn observe_click_once(&self) -> ObserverId {
        let observer = ObserverId::new();
        self.inner.lock().observers.insert(observer);
        observer
    }

    fn cancel_observer(&self, observer: ObserverId) {
        self.inner.lock().observers.remove(&observer);
    }

    fn alert(&self, message: &str) {
        debug!(alert = message, "page alert");
        self.inner.lock().alerts.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> VirtualDom {
        VirtualDom::new(
            Url::parse("https://host.example/watch").unwrap(),
            Viewport::new(1000.0, 800.0),
        )
    }

    #[test]
    fn queries_follow_document_order() {
        let dom = page();
        let a = dom.append(ElementSpec::iframe("/a").attr("class", "v"));
        let _div = dom.append(ElementSpec::new("div").attr("class", "v"));
        let b = dom.append(ElementSpec::iframe("/b").attr("class", "v"));
        assert_eq!(dom.query_all("iframe").unwrap(), vec![a, b]);
        assert_eq!(dom.query_all(r#"iframe[class="v"]"#).unwrap(), vec![a, b]);
        assert_eq!(dom.query_all("*").unwrap().len(), 5);
        assert!(matches!(
            dom.query_all("iframe >"),
            Err(DomError::InvalidSelector(_))
        ));
    }

    #[test]
    fn detached_elements_stop_resolving() {
        let dom = page();
        let a = dom.append(ElementSpec::iframe("/a"));
        assert!(dom.detach(a));
        assert!(dom.query_all("iframe").unwrap().is_empty());
        assert_eq!(dom.tag_name(a), None);
        assert_eq!(
            dom.set_attribute(a, "style", "x: y"),
            Err(DomError::UnknownElement(a))
        );
    }

    #[test]
    fn resource_url_is_resolved_against_base() {
        let dom = page();
        let a = dom.append(ElementSpec::iframe("/embed/1"));
        assert_eq!(
            dom.resource_url(a).as_deref(),
            Some("https://host.example/embed/1")
        );
    }

    #[test]
    fn computed_geometry_prefers_inline_style() {
        let dom = page();
        let a = dom.append(ElementSpec::iframe("/a").size(400.0, 200.0).z_index(4));
        assert_eq!(dom.computed_style(a, "width").as_deref(), Some("400px"));
        dom.set_style_property(a, "width", "50vw", true).unwrap();
        dom.set_style_property(a, "height", "25vh", true).unwrap();
        assert_eq!(dom.computed_style(a, "width").as_deref(), Some("500px"));
        assert_eq!(dom.computed_style(a, "height").as_deref(), Some("200px"));
        assert_eq!(dom.computed_style(a, "z-index").as_deref(), Some("4"));
        assert_eq!(
            dom.computed_style(dom.body().unwrap(), "z-index").as_deref(),
            Some("auto")
        );
    }

    #[tokio::test]
    async fn click_observer_is_single_shot() {
        let dom = page();
        let mut events = dom.subscribe();
        let a = dom.append(ElementSpec::iframe("/a"));
        assert!(!dom.click(a));

        dom.observe_click_once();
        assert_eq!(dom.armed_observers(), 1);
        assert!(dom.click(a));
        assert_eq!(dom.armed_observers(), 0);
        assert!(!dom.click(a));
        assert_eq!(events.recv().await, Some(DomEvent::Click { target: a }));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn cancelled_observer_does_not_fire() {
        let dom = page();
        let a = dom.append(ElementSpec::iframe("/a"));
        let observer = dom.observe_click_once();
        dom.cancel_observer(observer);
        assert!(!dom.click(a));
    }
}
