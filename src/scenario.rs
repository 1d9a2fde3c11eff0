//! Scenario simulator.
//!
//! Replays a scripted session against an in-memory page: the page agent and
//! the popup talk over a real link, user input goes through the page's event
//! stream, and time is virtual so retries and late-loading frames play out
//! instantly. A reload builds a fresh page and a fresh page agent while the
//! session slot and the popup survive, like a browser tab would.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dom_adapter::{Dom, DomEvent, ElementId, ElementSpec, Viewport, VirtualDom};
use resizer_core_types::{ResizerError, SelectionRecord, FRAME_TAG};
use resizer_event_bus::{link, Inbox, Outbox};
use resizer_selection_store::SelectionStore;
use serde::{Deserialize, Serialize};
use sync_bridge::{PageToUi, PopupAgent, PopupView, UiToPage, PAGE_PEER, UI_PEER};
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

use crate::config::{duration_str, AgentConfig};
use crate::context::PageContext;
use crate::page_agent::PageAgent;
use crate::record::frame_name;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub page: PageFixture,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageFixture {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub viewport: ViewportFixture,
    #[serde(default)]
    pub elements: Vec<ElementFixture>,
}

impl Default for PageFixture {
    fn default() -> Self {
        Self {
            url: default_url(),
            viewport: ViewportFixture::default(),
            elements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ViewportFixture {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportFixture {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// One element of the page. `delay` makes it appear that long after each load.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementFixture {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub z_index: Option<i64>,
    #[serde(default, deserialize_with = "duration_str::deserialize_option")]
    pub delay: Option<Duration>,
}

impl ElementFixture {
    fn to_spec(&self) -> ElementSpec {
        let mut spec = ElementSpec::new(self.tag.clone()).size(self.width, self.height);
        if let Some(src) = &self.src {
            spec = spec.attr("src", src.clone());
        }
        for (name, value) in &self.attributes {
            spec = spec.attr(name.clone(), value.clone());
        }
        if let Some(style) = &self.style {
            spec = spec.attr("style", style.clone());
        }
        if let Some(z_index) = self.z_index {
            spec = spec.z_index(z_index);
        }
        spec
    }
}

/// User actions, on the popup or on the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "do", rename_all = "snake_case")]
pub enum Step {
    Open,
    Select {
        #[serde(default)]
        full_view: bool,
    },
    EndSelection,
    Discard,
    ToggleView,
    SetWidth {
        value: String,
    },
    SetHeight {
        value: String,
    },
    /// Clicks the n-th frame, or the page body when `frame` is absent.
    Click {
        #[serde(default)]
        frame: Option<usize>,
    },
    Hotkey,
    Reload,
    InsertFrame {
        element: ElementFixture,
    },
    RemoveFrame {
        frame: usize,
    },
    Wait {
        #[serde(rename = "for", with = "duration_str")]
        duration: Duration,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Open => "open",
            Step::Select { .. } => "select",
            Step::EndSelection => "end_selection",
            Step::Discard => "discard",
            Step::ToggleView => "toggle_view",
            Step::SetWidth { .. } => "set_width",
            Step::SetHeight { .. } => "set_height",
            Step::Click { .. } => "click",
            Step::Hotkey => "hotkey",
            Step::Reload => "reload",
            Step::InsertFrame { .. } => "insert_frame",
            Step::RemoveFrame { .. } => "remove_frame",
            Step::Wait { .. } => "wait",
        }
    }
}

/// State after one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: &'static str,
    pub elapsed_ms: u64,
    pub popup: PopupView,
    pub record: Option<SelectionRecord>,
    pub alerts: Vec<String>,
    pub frames: Vec<FrameReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub name: String,
    pub style: Option<String>,
}

struct LoadedPage {
    dom: Arc<VirtualDom>,
    events: mpsc::UnboundedReceiver<DomEvent>,
    agent: PageAgent,
}

pub struct ScenarioRunner {
    fixture: PageFixture,
    base_url: Url,
    config: AgentConfig,
    store: SelectionStore,
    page_outbox: Outbox<PageToUi>,
    page_inbox: Inbox<UiToPage>,
    ui_inbox: Inbox<PageToUi>,
    popup: PopupAgent,
    page: LoadedPage,
    clock: Duration,
    arrivals: Vec<(Duration, ElementFixture)>,
    next_retry_at: Option<Duration>,
}

impl ScenarioRunner {
    /// Loads the fixture page; the agent sees its first load right away.
    pub fn new(
        fixture: PageFixture,
        config: AgentConfig,
        store: SelectionStore,
    ) -> Result<Self, ResizerError> {
        let base_url = Url::parse(&fixture.url)
            .map_err(|err| ResizerError::InvalidUrl {
                url: fixture.url.clone(),
                reason: err.to_string(),
            })?;
        let (page_end, ui_end) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
        let (page_outbox, page_inbox) = page_end.split();
        let (ui_outbox, ui_inbox) = ui_end.split();

        let mut arrivals = Vec::new();
        let page = load_page(
            &fixture,
            &base_url,
            &config,
            &store,
            &page_outbox,
            Duration::ZERO,
            &mut arrivals,
        );
        let mut runner = Self {
            fixture,
            base_url,
            config,
            store,
            page_outbox,
            page_inbox,
            ui_inbox,
            popup: PopupAgent::new(ui_outbox),
            page,
            clock: Duration::ZERO,
            arrivals,
            next_retry_at: None,
        };
        runner.settle();
        Ok(runner)
    }

    pub fn dom(&self) -> &Arc<VirtualDom> {
        &self.page.dom
    }

    pub fn popup(&self) -> &PopupView {
        self.popup.view()
    }

    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<Vec<StepReport>, ResizerError> {
        steps
            .iter()
            .enumerate()
            .map(|(idx, step)| {
                self.step(step)?;
                Ok(self.report(idx + 1, step.name()))
            })
            .collect()
    }

    pub fn step(&mut self, step: &Step) -> Result<(), ResizerError> {
        info!(step = step.name(), elapsed = ?self.clock, "scenario step");
        match step {
            Step::Open => self.popup.open(),
            Step::Select { full_view } => self.popup.select(*full_view),
            Step::EndSelection => self.popup.end_selection(),
            Step::Discard => self.popup.discard(),
            Step::ToggleView => self.popup.toggle_view(),
            Step::SetWidth { value } => self.popup.set_width(value),
            Step::SetHeight { value } => self.popup.set_height(value),
            Step::Click { frame } => {
                let target = match frame {
                    Some(index) => self.frame(*index)?,
                    None => self
                        .page
                        .dom
                        .body()
                        .ok_or(ResizerError::MissingBody)?,
                };
                if !self.page.dom.click(target) {
                    debug!(?target, "click had no listener");
                }
            }
            Step::Hotkey => {
                let hotkey = &self.config.hotkey;
                self.page.dom.press_key(&hotkey.key, hotkey.ctrl);
            }
            Step::Reload => self.reload(),
            Step::InsertFrame { element } => match element.delay {
                Some(delay) if !delay.is_zero() => {
                    self.arrivals.push((self.clock + delay, element.clone()))
                }
                _ => {
                    self.page.dom.append(element.to_spec());
                }
            },
            Step::RemoveFrame { frame } => {
                let target = self.frame(*frame)?;
                self.page.dom.detach(target);
            }
            Step::Wait { duration } => self.advance(*duration),
        }
        self.settle();
        Ok(())
    }

    fn frame(&self, index: usize) -> Result<ElementId, ResizerError> {
        self.page
            .dom
            .query_all(FRAME_TAG)
            .ok()
            .and_then(|frames| frames.get(index).copied())
            .ok_or(ResizerError::NoFrameAt(index))
    }

    fn reload(&mut self) {
        self.arrivals.clear();
        self.next_retry_at = None;
        self.page = load_page(
            &self.fixture,
            &self.base_url,
            &self.config,
            &self.store,
            &self.page_outbox,
            self.clock,
            &mut self.arrivals,
        );
    }

    /// Delivers everything queued until nothing moves.
    fn settle(&mut self) {
        loop {
            let mut progressed = false;
            while let Ok(event) = self.page.events.try_recv() {
                progressed = true;
                if let Some(status) = self.page.agent.handle_dom_event(event) {
                    self.next_retry_at = status.retry_delay().map(|delay| self.clock + delay);
                }
            }
            while let Some(message) = self.page_inbox.try_recv() {
                progressed = true;
                self.page.agent.handle_message(message);
            }
            if self.popup.pump(&mut self.ui_inbox) > 0 {
                progressed = true;
            }
            if self.page.agent.next_retry().is_none() {
                self.next_retry_at = None;
            }
            if !progressed {
                break;
            }
        }
    }

    /// Moves the virtual clock forward, firing arrivals and retries on the way.
    fn advance(&mut self, duration: Duration) {
        let until = self.clock + duration;
        loop {
            let next_arrival = self.arrivals.iter().map(|(at, _)| *at).min();
            let next = match (next_arrival, self.next_retry_at) {
                (Some(a), Some(r)) => a.min(r),
                (Some(a), None) => a,
                (None, Some(r)) => r,
                (None, None) => break,
            };
            if next > until {
                break;
            }
            self.clock = next;

            let (due, later): (Vec<_>, Vec<_>) =
                self.arrivals.drain(..).partition(|(at, _)| *at <= next);
            self.arrivals = later;
            for (_, element) in due {
                let id = self.page.dom.append(element.to_spec());
                debug!(element = ?id, elapsed = ?self.clock, "late element arrived");
            }

            if self.next_retry_at.is_some_and(|at| at <= next) {
                self.next_retry_at = self
                    .page
                    .agent
                    .reacquire_tick()
                    .and_then(|status| status.retry_delay())
                    .map(|delay| self.clock + delay);
            }
            self.settle();
        }
        self.clock = until;
    }

    pub fn report(&self, step: usize, action: &'static str) -> StepReport {
        let dom = self.page.dom.as_ref();
        let frames = dom
            .query_all(FRAME_TAG)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, frame)| FrameReport {
                index,
                name: frame_name(dom, frame),
                style: dom.attribute(frame, "style"),
            })
            .collect();
        StepReport {
            step,
            action,
            elapsed_ms: self.clock.as_millis() as u64,
            popup: self.popup.view().clone(),
            record: self.store.load(),
            alerts: dom.take_alerts(),
            frames,
        }
    }
}

fn load_page(
    fixture: &PageFixture,
    base_url: &Url,
    config: &AgentConfig,
    store: &SelectionStore,
    outbox: &Outbox<PageToUi>,
    now: Duration,
    arrivals: &mut Vec<(Duration, ElementFixture)>,
) -> LoadedPage {
    let viewport = Viewport::new(fixture.viewport.width, fixture.viewport.height);
    let dom = Arc::new(VirtualDom::new(base_url.clone(), viewport));
    for element in &fixture.elements {
        match element.delay {
            Some(delay) if !delay.is_zero() => arrivals.push((now + delay, element.clone())),
            _ => {
                dom.append(element.to_spec());
            }
        }
    }
    let events = dom.subscribe();
    let ctx = PageContext::new(dom.clone(), store.clone(), outbox.clone());
    let agent = PageAgent::new(ctx, config.clone());
    dom.fire_load();
    LoadedPage { dom, events, agent }
}

fn default_url() -> String {
    "https://example.com/".to_string()
}

fn default_tag() -> String {
    FRAME_TAG.to_string()
}

fn default_width() -> f64 {
    300.0
}

fn default_height() -> f64 {
    150.0
}
