//! Interactive frame picking.
//!
//! ```text
//! Idle -> Scanning -> AwaitingClick -> Resolved
//!             |            |   ^
//!             |            +---+ click outside a frame restarts the scan
//!             +-> Resolved (single frame)  /  Aborted (no frame, abort)
//! ```
//!
//! While awaiting a click every frame carries a "select" banner and the page
//! holds a single-shot click observer plus the hover stylesheet. All three are
//! undone on every way out of `AwaitingClick`.

use dom_adapter::{DomError, ElementId, ObserverId};
use resizer_core_types::{SelectionRecord, FRAME_TAG};
use sync_bridge::PageToUi;
use tracing::{debug, info, warn};

use crate::context::PageContext;
use crate::errors::PageResult;
use crate::{memento, record, styler};

pub const SELECTION_STYLESHEET: &str = "iframe-resizer_selection";
const SELECTION_CSS: &str = "iframe:hover {\n  cursor: pointer !important;\n}";

pub const ALERT_NO_FRAMES: &str = "This page contains no iframes";
pub const ALERT_AUTO_SELECTED: &str =
    "The lonely iframe contained in this page was automatically selected";
pub const ALERT_SELECTED: &str = "The iframe was successfully selected";
pub const ALERT_MISSED: &str = "iframe not detected. Please try again.";
pub const ALERT_FAILED: &str = "The iframe could not be selected. Please try again.";

const BANNER_IMAGE: &str = concat!(
    "url(\"data:image/svg+xml,",
    "%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%20viewBox%3D%220%200%2021%20161%22",
    "%20preserveAspectRatio%3D%22none%22%3E%3Ctitle%3Eselect%3C%2Ftitle%3E",
    "%3Crect%20width%3D%2221%22%20height%3D%22161%22%20fill%3D%22%2309c%22%2F%3E",
    "%3Ctext%20x%3D%2215%22%20y%3D%2280%22%20fill%3D%22%23fff%22%20font-size%3D%2212%22",
    "%20text-anchor%3D%22middle%22%20transform%3D%22rotate%28-90%2015%2080%29%22%3E",
    "select%3C%2Ftext%3E%3C%2Fsvg%3E\")",
);

const BANNER: &[(&str, &str)] = &[
    ("padding-left", "5rem"),
    ("background-repeat", "no-repeat"),
    ("background-size", "5rem 100%"),
    ("background-position", "left"),
    ("background-image", BANNER_IMAGE),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Scanning,
    AwaitingClick,
    Resolved,
    Aborted,
}

#[derive(Debug)]
struct Marking {
    full_view_on: bool,
    observer: ObserverId,
    frames: Vec<ElementId>,
}

/// The one selection session of a page agent.
#[derive(Debug)]
pub struct SelectionSession {
    phase: SessionPhase,
    marking: Option<Marking>,
}

impl Default for SelectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            marking: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// A status query must answer `awaitSelection` while this holds.
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, SessionPhase::Scanning | SessionPhase::AwaitingClick)
    }

    /// Preference of the session currently waiting for a click.
    pub fn pending_full_view(&self) -> Option<bool> {
        self.marking.as_ref().map(|marking| marking.full_view_on)
    }

    /// Scans the page and either finishes right away (zero or one frame) or
    /// marks every frame and waits for the user's click.
    pub fn begin(&mut self, ctx: &PageContext, full_view_on: bool) -> SessionPhase {
        if self.marking.is_some() {
            debug!("selection already awaiting a click");
            ctx.notify(PageToUi::AwaitSelection);
            return self.phase;
        }

        self.phase = SessionPhase::Scanning;
        let frames = match ctx.dom().query_all(FRAME_TAG) {
            Ok(frames) => frames,
            Err(err) => {
                warn!(error = %err, "frame scan failed");
                return self.fail(ctx);
            }
        };
        info!(frames = frames.len(), full_view = full_view_on, "selection started");

        match frames.as_slice() {
            [] => {
                ctx.notify(PageToUi::Clear);
                ctx.alert(ALERT_NO_FRAMES);
                self.phase = SessionPhase::Aborted;
                self.phase
            }
            [frame] => self.resolve(ctx, *frame, full_view_on, ALERT_AUTO_SELECTED),
            _ => match self.mark(ctx, frames, full_view_on) {
                Ok(()) => {
                    ctx.notify(PageToUi::AwaitSelection);
                    self.phase
                }
                Err(err) => {
                    warn!(error = %err, "could not mark frames for selection");
                    self.fail(ctx)
                }
            },
        }
    }

    /// Handles the click caught by the session's observer.
    pub fn on_click(&mut self, ctx: &PageContext, target: ElementId) -> SessionPhase {
        let Some(marking) = self.marking.take() else {
            debug!(?target, "click outside a selection session ignored");
            return self.phase;
        };

        let hit = ctx.dom().tag_name(target).as_deref() == Some(FRAME_TAG);
        self.unmark(ctx, &marking, hit.then_some(target));

        if hit {
            self.resolve(ctx, target, marking.full_view_on, ALERT_SELECTED)
        } else {
            debug!(?target, "click missed every frame; scanning again");
            let phase = self.begin(ctx, marking.full_view_on);
            ctx.alert(ALERT_MISSED);
            phase
        }
    }

    /// External cancellation: undoes any marking and tells the UI there is no
    /// selection. Returns false, without telling the UI anything, when no
    /// session was pending; the caller then reports the stored state instead.
    pub fn abort(&mut self, ctx: &PageContext) -> bool {
        let pending = self.cancel(ctx);
        if pending {
            ctx.notify(PageToUi::Clear);
        }
        pending
    }

    /// Undoes any marking without telling the UI. Returns whether a session
    /// was actually pending.
    pub fn cancel(&mut self, ctx: &PageContext) -> bool {
        let pending = self.is_pending();
        if let Some(marking) = self.marking.take() {
            self.unmark(ctx, &marking, None);
            info!("selection cancelled");
        }
        if pending {
            self.phase = SessionPhase::Aborted;
        }
        pending
    }

    fn mark(
        &mut self,
        ctx: &PageContext,
        frames: Vec<ElementId>,
        full_view_on: bool,
    ) -> Result<(), DomError> {
        let dom = ctx.dom();
        if let Some(body) = dom.body() {
            memento::capture(dom, body)?;
        }
        dom.insert_stylesheet(SELECTION_STYLESHEET, SELECTION_CSS);
        let observer = dom.observe_click_once();
        // Recorded before styling so a failure below can still be undone.
        self.marking = Some(Marking {
            full_view_on,
            observer,
            frames: frames.clone(),
        });

        for frame in frames {
            let banner = memento::capture(dom, frame).and_then(|_| {
                BANNER
                    .iter()
                    .try_for_each(|(property, value)| dom.set_style_property(frame, property, value, true))
            });
            if let Err(err) = banner {
                if let Some(marking) = self.marking.take() {
                    self.unmark(ctx, &marking, None);
                }
                return Err(err);
            }
        }
        self.phase = SessionPhase::AwaitingClick;
        Ok(())
    }

    /// Removes the decoration. Frames other than `keep` get their original
    /// style back and lose the memento; `keep` retains it for the styler.
    fn unmark(&self, ctx: &PageContext, marking: &Marking, keep: Option<ElementId>) {
        let dom = ctx.dom();
        dom.cancel_observer(marking.observer);
        dom.remove_stylesheet(SELECTION_STYLESHEET);

        for frame in &marking.frames {
            let undone = if Some(*frame) == keep {
                memento::restore(dom, *frame)
            } else {
                memento::release(dom, *frame)
            };
            if let Err(err) = undone {
                debug!(?frame, error = %err, "frame vanished while marked");
            }
        }
        if keep.is_none() {
            if let Some(body) = dom.body() {
                if let Err(err) = memento::release(dom, body) {
                    debug!(error = %err, "body memento not released");
                }
            }
        }
    }

    fn resolve(
        &mut self,
        ctx: &PageContext,
        frame: ElementId,
        full_view_on: bool,
        alert: &str,
    ) -> SessionPhase {
        match select_frame(ctx, frame, full_view_on) {
            Ok(record) => {
                info!(name = %record.name, locator = %record.locator, "frame selected");
                ctx.notify_record(&record);
                ctx.alert(alert);
                self.phase = SessionPhase::Resolved;
                self.phase
            }
            Err(err) => {
                warn!(?frame, error = %err, "frame could not be selected");
                let dom = ctx.dom();
                for element in std::iter::once(frame).chain(dom.body()) {
                    if memento::has_memento(dom, element) {
                        if let Err(err) = memento::release(dom, element) {
                            debug!(?element, error = %err, "memento not released after failed selection");
                        }
                    }
                }
                self.fail(ctx)
            }
        }
    }

    fn fail(&mut self, ctx: &PageContext) -> SessionPhase {
        ctx.notify(PageToUi::Clear);
        ctx.alert(ALERT_FAILED);
        self.phase = SessionPhase::Aborted;
        self.phase
    }
}

/// Captures mementos, writes the record and styles the frame.
fn select_frame(
    ctx: &PageContext,
    frame: ElementId,
    full_view_on: bool,
) -> PageResult<SelectionRecord> {
    let dom = ctx.dom();
    if let Some(body) = dom.body() {
        memento::capture(dom, body)?;
    }
    memento::capture(dom, frame)?;
    let record = record::capture_record(dom, frame, full_view_on)?;
    ctx.store.save(&record)?;
    styler::apply(dom, &record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_adapter::{Dom, ElementSpec, Viewport, VirtualDom};
    use resizer_event_bus::{link, Inbox};
    use resizer_selection_store::SelectionStore;
    use std::sync::Arc;
    use sync_bridge::UiToPage;
    use url::Url;

    fn setup() -> (Arc<VirtualDom>, PageContext, Inbox<PageToUi>) {
        let dom = Arc::new(VirtualDom::new(
            Url::parse("https://site.example/").unwrap(),
            Viewport::new(1000.0, 500.0),
        ));
        let (page, ui) = link::<PageToUi, UiToPage>("page", "ui");
        let (outbox, _) = page.split();
        let (_, inbox) = ui.split();
        let ctx = PageContext::new(dom.clone(), SelectionStore::in_memory(), outbox);
        (dom, ctx, inbox)
    }

    #[test]
    fn no_frames_aborts_without_record() {
        let (dom, ctx, mut inbox) = setup();
        let mut session = SelectionSession::new();
        assert_eq!(session.begin(&ctx, true), SessionPhase::Aborted);
        assert!(ctx.store.load().is_none());
        assert_eq!(inbox.drain(), vec![PageToUi::Clear]);
        assert_eq!(dom.alerts(), vec![ALERT_NO_FRAMES.to_string()]);
    }

    #[test]
    fn marking_is_fully_undone_on_abort() {
        let (dom, ctx, mut inbox) = setup();
        let styled = dom.append(ElementSpec::iframe("/a").attr("style", "border: 0;"));
        let plain = dom.append(ElementSpec::iframe("/b"));
        let mut session = SelectionSession::new();

        assert_eq!(session.begin(&ctx, false), SessionPhase::AwaitingClick);
        assert!(session.is_pending());
        assert!(dom.has_stylesheet(SELECTION_STYLESHEET));
        assert_eq!(dom.armed_observers(), 1);
        assert_eq!(dom.inline_style(plain).get("padding-left"), Some("5rem"));

        assert!(session.abort(&ctx));
        assert_eq!(session.phase(), SessionPhase::Aborted);
        assert!(!dom.has_stylesheet(SELECTION_STYLESHEET));
        assert_eq!(dom.armed_observers(), 0);
        assert_eq!(dom.attribute(styled, "style").as_deref(), Some("border: 0;"));
        assert_eq!(dom.attribute(plain, "style"), None);
        assert!(!memento::has_memento(&*dom, styled));
        assert!(!memento::has_memento(&*dom, dom.body().unwrap()));
        assert_eq!(inbox.drain(), vec![PageToUi::AwaitSelection, PageToUi::Clear]);
    }

    #[test]
    fn miss_restarts_and_hit_resolves() {
        let (dom, ctx, mut inbox) = setup();
        dom.append(ElementSpec::iframe("/a"));
        let second = dom.append(ElementSpec::iframe("/b").size(500.0, 250.0));
        let heading = dom.append(ElementSpec::new("h1"));
        let mut session = SelectionSession::new();

        session.begin(&ctx, false);
        assert_eq!(session.on_click(&ctx, heading), SessionPhase::AwaitingClick);
        assert_eq!(dom.alerts(), vec![ALERT_MISSED.to_string()]);
        assert_eq!(dom.armed_observers(), 1);

        assert_eq!(session.on_click(&ctx, second), SessionPhase::Resolved);
        assert!(!dom.has_stylesheet(SELECTION_STYLESHEET));
        let record = ctx.store.load().unwrap();
        assert_eq!(record.locator.index, 1);
        assert_eq!((record.width, record.height), (50.0, 50.0));
        assert_eq!(
            inbox.drain(),
            vec![
                PageToUi::AwaitSelection,
                PageToUi::AwaitSelection,
                PageToUi::update(&record)
            ]
        );
    }

    #[test]
    fn second_begin_while_pending_only_reports() {
        let (dom, ctx, mut inbox) = setup();
        dom.append(ElementSpec::iframe("/a"));
        dom.append(ElementSpec::iframe("/b"));
        let mut session = SelectionSession::new();
        session.begin(&ctx, true);
        assert_eq!(session.begin(&ctx, false), SessionPhase::AwaitingClick);
        assert_eq!(session.pending_full_view(), Some(true));
        assert_eq!(dom.armed_observers(), 1);
        assert_eq!(inbox.drain().len(), 2);
    }
}
