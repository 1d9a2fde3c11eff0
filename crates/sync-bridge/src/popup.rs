//! UI agent: the popup that renders the selection and issues commands.

use resizer_core_types::FALLBACK_NAME;
use resizer_event_bus::{Inbox, Outbox};
use serde::Serialize;
use tracing::{debug, warn};

use crate::messages::{PageToUi, SelectionSnapshot, UiToPage, UpdatePatch};

/// Everything the popup shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PopupView {
    pub legend: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub full_view_on: bool,
    pub fieldset_enabled: bool,
    pub select_enabled: bool,
    pub end_selection_visible: bool,
}

impl Default for PopupView {
    fn default() -> Self {
        Self {
            legend: FALLBACK_NAME.to_string(),
            width: None,
            height: None,
            full_view_on: false,
            fieldset_enabled: false,
            select_enabled: true,
            end_selection_visible: false,
        }
    }
}

impl PopupView {
    fn clear_fieldset(&mut self) {
        self.fieldset_enabled = false;
        self.legend = FALLBACK_NAME.to_string();
        self.width = None;
        self.height = None;
        self.full_view_on = false;
    }

    fn show(&mut self, snapshot: &SelectionSnapshot) {
        self.legend = snapshot.name.clone();
        self.width = Some(snapshot.width);
        self.height = Some(snapshot.height);
        self.full_view_on = snapshot.full_view_on;
        self.fieldset_enabled = true;
    }

    pub fn has_selection(&self) -> bool {
        self.fieldset_enabled
    }
}

/// The popup never writes the record itself; it only posts commands and
/// renders what the page agent pushes back.
pub struct PopupAgent {
    outbox: Outbox<UiToPage>,
    view: PopupView,
}

impl PopupAgent {
    pub fn new(outbox: Outbox<UiToPage>) -> Self {
        Self {
            outbox,
            view: PopupView::default(),
        }
    }

    pub fn view(&self) -> &PopupView {
        &self.view
    }

    /// Popup opened: ask the page for its current state.
    pub fn open(&mut self) {
        self.outbox.post(&UiToPage::Fetch);
    }

    pub fn select(&mut self, full_view_on: bool) {
        self.view.select_enabled = false;
        self.view.end_selection_visible = true;
        self.outbox.post(&UiToPage::Select { full_view_on });
    }

    pub fn end_selection(&mut self) {
        self.outbox.post(&UiToPage::EndSelection);
    }

    pub fn discard(&mut self) {
        self.outbox.post(&UiToPage::Clear);
    }

    /// Flips the full-view icon optimistically and asks the page to follow.
    pub fn toggle_view(&mut self) {
        let next = !self.view.full_view_on;
        self.view.full_view_on = next;
        self.outbox.post(&UiToPage::Update(UpdatePatch::full_view(next)));
    }

    /// Width input changed. Unparseable input is not sent.
    pub fn set_width(&mut self, raw: &str) {
        if let Some(width) = parse_number(raw) {
            self.outbox.post(&UiToPage::Update(UpdatePatch::width(width)));
        }
    }

    pub fn set_height(&mut self, raw: &str) {
        if let Some(height) = parse_number(raw) {
            self.outbox.post(&UiToPage::Update(UpdatePatch::height(height)));
        }
    }

    pub fn handle(&mut self, message: PageToUi) {
        debug!(?message, "popup received");
        match message {
            PageToUi::Update(snapshot) => {
                if let Err(err) = snapshot.validate() {
                    warn!(error = %err, "ignoring update with invalid fields");
                    return;
                }
                self.view.end_selection_visible = false;
                self.view.select_enabled = false;
                self.view.show(&snapshot);
            }
            PageToUi::Clear => {
                self.view.end_selection_visible = false;
                self.view.clear_fieldset();
                self.view.select_enabled = true;
            }
            PageToUi::AwaitSelection => {
                self.view.select_enabled = false;
                self.view.clear_fieldset();
                self.view.end_selection_visible = true;
            }
        }
    }

    /// Handles everything already delivered; returns how many messages were applied.
    pub fn pump(&mut self, inbox: &mut Inbox<PageToUi>) -> usize {
        let mut handled = 0;
        while let Some(message) = inbox.try_recv() {
            self.handle(message);
            handled += 1;
        }
        handled
    }
}

// Leading numeric prefix, the way an `<input type=number>` value reads.
fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .take_while(|(idx, c)| {
            c.is_ascii_digit() || *c == '.' || (*idx == 0 && (*c == '-' || *c == '+'))
        })
        .map(|(idx, c)| idx + c.len_utf8())
        .last()?;
    raw[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}
