//! The page-side agent.
//!
//! Owns the selection session and the re-acquisition loop for one page load
//! and is the only writer of the selection record. Handlers run to completion
//! one at a time, so every read-modify-write of the record is atomic with
//! respect to other handlers.

use std::time::Duration;

use dom_adapter::DomEvent;
use element_locator::resolve;
use resizer_event_bus::Inbox;
use sync_bridge::{PageToUi, UiToPage, UpdatePatch};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::context::PageContext;
use crate::reacquire::{ReacquireStatus, Reacquisition};
use crate::session::SelectionSession;
use crate::styler;

pub struct PageAgent {
    ctx: PageContext,
    session: SelectionSession,
    reacquire: Option<Reacquisition>,
    config: AgentConfig,
}

impl PageAgent {
    pub fn new(ctx: PageContext, config: AgentConfig) -> Self {
        Self {
            ctx,
            session: SelectionSession::new(),
            reacquire: None,
            config,
        }
    }

    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub fn session(&self) -> &SelectionSession {
        &self.session
    }

    /// Delay before the next re-acquisition tick, if one is due.
    pub fn next_retry(&self) -> Option<Duration> {
        self.reacquire
            .as_ref()
            .map(|_| self.config.reacquire.interval)
    }

    pub fn handle_message(&mut self, message: UiToPage) {
        debug!(?message, "ui message");
        match message {
            UiToPage::Fetch => self.answer_fetch(),
            UiToPage::Update(patch) => self.apply_patch(patch),
            UiToPage::Select { full_view_on } => self.start_selection(full_view_on),
            UiToPage::Clear => self.discard(),
            UiToPage::EndSelection => self.end_selection(),
        }
    }

    /// Returns the re-acquisition status when the event started or advanced it.
    pub fn handle_dom_event(&mut self, event: DomEvent) -> Option<ReacquireStatus> {
        match event {
            DomEvent::Load => self.on_load(),
            DomEvent::Click { target } => {
                self.session.on_click(&self.ctx, target);
                None
            }
            DomEvent::KeyDown { key, ctrl } => {
                if self.config.hotkey.matches(&key, ctrl) {
                    self.toggle_full_view();
                }
                None
            }
        }
    }

    /// Page finished loading: restyle the recorded frame, or start retrying.
    pub fn on_load(&mut self) -> Option<ReacquireStatus> {
        self.reacquire = None;
        self.ctx.store.load()?;

        let settings = &self.config.reacquire;
        let mut reacquisition = Reacquisition::new(settings.max_retries, settings.interval);
        let status = reacquisition.attempt(&self.ctx);
        if !status.is_terminal() {
            self.reacquire = Some(reacquisition);
        }
        Some(status)
    }

    /// One scheduled retry. `None` when no retry was pending.
    pub fn reacquire_tick(&mut self) -> Option<ReacquireStatus> {
        let mut reacquisition = self.reacquire.take()?;
        let status = reacquisition.attempt(&self.ctx);
        if !status.is_terminal() {
            self.reacquire = Some(reacquisition);
        }
        Some(status)
    }

    /// Hot-key: flip full view on the record, or pick a frame straight into
    /// full view when nothing is selected.
    pub fn toggle_full_view(&mut self) {
        let toggled = self
            .ctx
            .store
            .update(|record| record.full_view_on = !record.full_view_on);
        match toggled {
            Ok(Some(record)) => {
                info!(full_view = record.full_view_on, "full view toggled");
                self.ctx.notify_record(&record);
                if let Err(err) = styler::refresh(self.ctx.dom(), &record) {
                    warn!(error = %err, "could not restyle frame");
                }
            }
            Ok(None) => self.start_selection(true),
            Err(err) => warn!(error = %err, "could not persist full-view toggle"),
        }
    }

    fn answer_fetch(&self) {
        if self.session.is_pending() {
            self.ctx.notify(PageToUi::AwaitSelection);
            return;
        }
        match self.ctx.store.load() {
            Some(record) if resolve(self.ctx.dom(), &record.locator).is_some() => {
                self.ctx.notify_record(&record)
            }
            Some(record) => {
                debug!(locator = %record.locator, "recorded frame not present; reporting clear");
                self.ctx.notify(PageToUi::Clear);
            }
            None => self.ctx.notify(PageToUi::Clear),
        }
    }

    fn apply_patch(&mut self, patch: UpdatePatch) {
        let patch = sanitize(patch);
        let updated = self.ctx.store.update(|record| {
            if let Some(full_view_on) = patch.full_view_on {
                record.full_view_on = full_view_on;
            }
            if let Some(width) = patch.width {
                record.width = width;
            }
            if let Some(height) = patch.height {
                record.height = height;
            }
        });

        match updated {
            Ok(Some(record)) => match styler::refresh(self.ctx.dom(), &record) {
                Ok(Some(_)) => self.ctx.notify_record(&record),
                Ok(None) => {
                    debug!(locator = %record.locator, "patched record's frame not present");
                    self.ctx.notify(PageToUi::Clear);
                }
                Err(err) => {
                    warn!(error = %err, "could not restyle frame");
                    self.ctx.notify_record(&record);
                }
            },
            Ok(None) => self.ctx.notify(PageToUi::Clear),
            Err(err) => {
                warn!(error = %err, "could not persist update");
                self.answer_fetch();
            }
        }
    }

    fn start_selection(&mut self, full_view_on: bool) {
        if self.session.is_pending() {
            self.ctx.notify(PageToUi::AwaitSelection);
            return;
        }
        self.forget_record();
        self.session.begin(&self.ctx, full_view_on);
    }

    /// Ends a pending session. When the session already finished, the UI is
    /// answered with the stored state, exactly as for a fetch.
    fn end_selection(&mut self) {
        if !self.session.abort(&self.ctx) {
            debug!("end of selection requested with no session pending");
            self.answer_fetch();
        }
    }

    fn discard(&mut self) {
        self.session.cancel(&self.ctx);
        self.forget_record();
        self.ctx.notify(PageToUi::Clear);
    }

    /// Undoes the record's styling and deletes it.
    fn forget_record(&mut self) {
        self.reacquire = None;
        let Some(record) = self.ctx.store.load() else {
            return;
        };
        if let Err(err) = styler::discard(self.ctx.dom(), &record) {
            warn!(error = %err, "could not restore original styles");
        }
        match self.ctx.store.clear() {
            Ok(()) => info!(name = %record.name, "selection discarded"),
            Err(err) => warn!(error = %err, "could not delete selection record"),
        }
    }

    /// Event loop for one page load. Ends on cancellation, or once both
    /// channels are closed and no retry is pending.
    pub async fn run(
        mut self,
        mut inbox: Inbox<UiToPage>,
        mut events: mpsc::UnboundedReceiver<DomEvent>,
        cancel: CancellationToken,
    ) {
        let mut inbox_open = true;
        let mut events_open = true;
        let mut retry_at: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                message = inbox.recv(), if inbox_open => match message {
                    Some(message) => self.handle_message(message),
                    None => {
                        debug!("ui link closed");
                        inbox_open = false;
                    }
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Some(status) = self.handle_dom_event(event) {
                            retry_at = status.retry_delay().map(|delay| Instant::now() + delay);
                        }
                    }
                    None => events_open = false,
                },
                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    retry_at = self
                        .reacquire_tick()
                        .and_then(|status| status.retry_delay())
                        .map(|delay| Instant::now() + delay);
                }
            }

            if self.reacquire.is_none() {
                retry_at = None;
            }
            if !inbox_open && !events_open && retry_at.is_none() {
                break;
            }
        }
        debug!("page agent stopped");
    }

    pub fn spawn(
        self,
        inbox: Inbox<UiToPage>,
        events: mpsc::UnboundedReceiver<DomEvent>,
    ) -> AgentHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(inbox, events, cancel.clone()));
        AgentHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Ignores sizes the styler could not honour.
fn sanitize(mut patch: UpdatePatch) -> UpdatePatch {
    let usable = |value: f64| value.is_finite() && value > 0.0;
    if patch.width.is_some_and(|w| !usable(w)) {
        debug!(width = ?patch.width, "ignoring unusable width");
        patch.width = None;
    }
    if patch.height.is_some_and(|h| !usable(h)) {
        debug!(height = ?patch.height, "ignoring unusable height");
        patch.height = None;
    }
    patch
}

/// Running page agent.
pub struct AgentHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AgentHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops the loop and waits for it.
    pub async fn shutdown(mut self) -> Result<(), tokio::task::JoinError> {
        self.cancel.cancel();
        match self.task.take() {
            Some(task) => match task.await {
                Ok(()) => Ok(()),
                Err(err) if err.is_cancelled() => Ok(()),
                Err(err) => Err(err),
            },
            None => Ok(()),
        }
    }
}

impl Drop for AgentHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
