#![allow(dead_code)]

use std::sync::Arc;

use dom_adapter::{DomEvent, ElementSpec, Viewport, VirtualDom};
use iframe_resizer::{AgentConfig, PageAgent, PageContext};
use resizer_event_bus::{link, Inbox, Outbox};
use resizer_selection_store::SelectionStore;
use sync_bridge::{PageToUi, UiToPage, PAGE_PEER, UI_PEER};
use tokio::sync::mpsc;
use url::Url;

pub fn page() -> Arc<VirtualDom> {
    Arc::new(VirtualDom::new(
        Url::parse("https://news.example/story").unwrap(),
        Viewport::new(1000.0, 500.0),
    ))
}

pub fn frame(src: &str) -> ElementSpec {
    ElementSpec::iframe(src)
}

/// A page agent driven by hand: messages and page events are delivered by
/// the test, in order, one handler at a time.
pub struct Harness {
    pub dom: Arc<VirtualDom>,
    pub store: SelectionStore,
    pub agent: PageAgent,
    pub to_page: Outbox<UiToPage>,
    pub page_inbox: Inbox<UiToPage>,
    pub ui_inbox: Inbox<PageToUi>,
    pub events: mpsc::UnboundedReceiver<DomEvent>,
}

impl Harness {
    pub fn new(dom: Arc<VirtualDom>) -> Self {
        Self::with_store(dom, SelectionStore::in_memory())
    }

    pub fn with_store(dom: Arc<VirtualDom>, store: SelectionStore) -> Self {
        let (page_end, ui_end) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
        let (outbox, page_inbox) = page_end.split();
        let (to_page, ui_inbox) = ui_end.split();
        let events = dom.subscribe();
        let ctx = PageContext::new(dom.clone(), store.clone(), outbox);
        Self {
            dom,
            store,
            agent: PageAgent::new(ctx, AgentConfig::default()),
            to_page,
            page_inbox,
            ui_inbox,
            events,
        }
    }

    /// Sends a UI command over the link and lets the agent handle it.
    pub fn send(&mut self, message: UiToPage) -> Vec<PageToUi> {
        self.to_page.post(&message);
        self.settle()
    }

    /// Delivers queued messages and page events; returns what reached the UI.
    pub fn settle(&mut self) -> Vec<PageToUi> {
        loop {
            let mut progressed = false;
            while let Ok(event) = self.events.try_recv() {
                self.agent.handle_dom_event(event);
                progressed = true;
            }
            while let Some(message) = self.page_inbox.try_recv() {
                self.agent.handle_message(message);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        self.ui_inbox.drain()
    }
}
