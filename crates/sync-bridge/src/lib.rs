//! Cross-context protocol between the page agent and the UI agent.
//!
//! The page agent is the only writer of the selection record. The UI agent
//! renders whatever the page agent last pushed and asks for changes with
//! [`UiToPage`] commands; every state-changing command is answered with an
//! authoritative [`PageToUi::Update`] or [`PageToUi::Clear`].

pub mod messages;
pub mod popup;

pub use messages::{PageToUi, ProtocolError, SelectionSnapshot, UiToPage, UpdatePatch};
pub use popup::{PopupAgent, PopupView};

/// Peer name of the page-side agent on a link.
pub const PAGE_PEER: &str = "page-agent";

/// Peer name of the UI-side agent on a link.
pub const UI_PEER: &str = "ui-agent";
