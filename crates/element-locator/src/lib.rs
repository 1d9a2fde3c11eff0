//! Element locator
//!
//! Turns a live element into a `{query, index}` descriptor and back:
//! - `describe`: selector scoped by `id`, then `class`, then the bare frame tag,
//!   plus the element's position among that selector's matches
//! - `resolve`: re-runs the selector and indexes into the result
//!
//! Identity is positional. Two structurally identical frames that swap places
//! between loads will swap identities too; nothing here tries to prevent that.

pub mod errors;
pub mod resolver;

pub use errors::*;
pub use resolver::*;
