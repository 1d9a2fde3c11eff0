//! Handles shared by every page-side component.

use std::sync::Arc;

use dom_adapter::Dom;
use resizer_core_types::SelectionRecord;
use resizer_event_bus::Outbox;
use resizer_selection_store::SelectionStore;
use sync_bridge::PageToUi;

/// The page agent's view of the world: the page, the session slot and the
/// link to the UI agent. Components borrow it; only the agent owns it.
#[derive(Clone)]
pub struct PageContext {
    pub dom: Arc<dyn Dom>,
    pub store: SelectionStore,
    outbox: Outbox<PageToUi>,
}

impl PageContext {
    pub fn new(dom: Arc<dyn Dom>, store: SelectionStore, outbox: Outbox<PageToUi>) -> Self {
        Self { dom, store, outbox }
    }

    pub fn dom(&self) -> &dyn Dom {
        self.dom.as_ref()
    }

    /// Fire-and-forget message to the UI agent.
    pub fn notify(&self, message: PageToUi) {
        self.outbox.post(&message);
    }

    pub fn notify_record(&self, record: &SelectionRecord) {
        self.notify(PageToUi::update(record));
    }

    pub fn alert(&self, message: &str) {
        self.dom.alert(message);
    }
}
