//! Re-finding the selected frame after a page load.
//!
//! Content often arrives after the page's own load event, so the agent makes
//! one attempt at load and then retries at a constant interval up to a hard
//! cap. Giving up leaves the record in place.

use std::time::Duration;

use dom_adapter::ElementId;
use element_locator::resolve;
use tracing::{debug, info, warn};

use crate::context::PageContext;
use crate::styler;

pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReacquireStatus {
    /// The frame was found and styled.
    Acquired(ElementId),
    /// Not there yet; try again after `delay`.
    Retrying { retry: u32, delay: Duration },
    /// Every retry missed. The record is left alone.
    Exhausted { retries: u32 },
    /// Nothing to re-acquire, or the page refused the styling.
    Abandoned,
}

impl ReacquireStatus {
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            ReacquireStatus::Retrying { delay, .. } => Some(*delay),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.retry_delay().is_none()
    }
}

/// Bounded retry counter for one page load.
#[derive(Clone, Debug)]
pub struct Reacquisition {
    retries: u32,
    max_retries: u32,
    interval: Duration,
}

impl Default for Reacquisition {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_INTERVAL)
    }
}

impl Reacquisition {
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            retries: 0,
            max_retries,
            interval,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// One resolution attempt against the persisted record.
    pub fn attempt(&mut self, ctx: &PageContext) -> ReacquireStatus {
        let Some(record) = ctx.store.load() else {
            debug!("no selection record; nothing to re-acquire");
            return ReacquireStatus::Abandoned;
        };

        match resolve(ctx.dom(), &record.locator) {
            Some(frame) => match styler::refresh(ctx.dom(), &record) {
                Ok(Some(_)) => {
                    info!(
                        locator = %record.locator,
                        retries = self.retries,
                        "selected frame re-acquired"
                    );
                    ReacquireStatus::Acquired(frame)
                }
                Ok(None) => self.record_miss(),
                Err(err) => {
                    warn!(locator = %record.locator, error = %err, "re-acquired frame could not be styled");
                    ReacquireStatus::Abandoned
                }
            },
            None => self.record_miss(),
        }
    }

    /// Counts a miss and decides whether another attempt is allowed.
    pub fn record_miss(&mut self) -> ReacquireStatus {
        if self.retries < self.max_retries {
            self.retries += 1;
            debug!(retry = self.retries, max = self.max_retries, "frame not present yet");
            ReacquireStatus::Retrying {
                retry: self.retries,
                delay: self.interval,
            }
        } else {
            warn!(retries = self.retries, "giving up on re-acquiring the selected frame");
            ReacquireStatus::Exhausted {
                retries: self.retries,
            }
        }
    }
}
