//! Iframe resizer library
//!
//! Page-side half of the resizer: style mementos, the styler, the selection
//! session, re-acquisition after reloads and the page agent that ties them to
//! the UI agent. Also hosts the configuration model and the scenario
//! simulator used by the CLI and the integration tests.

pub mod config;
pub mod context;
pub mod errors;
pub mod memento;
pub mod page_agent;
pub mod reacquire;
pub mod record;
pub mod scenario;
pub mod session;
pub mod styler;

// Re-export commonly used types for external use
pub use config::{AgentConfig, Config};
pub use context::PageContext;
pub use errors::{PageError, PageResult};
pub use page_agent::{AgentHandle, PageAgent};
pub use reacquire::{ReacquireStatus, Reacquisition};
pub use scenario::{Scenario, ScenarioRunner, StepReport};
pub use session::{SelectionSession, SessionPhase};
