//! Sandbox provider interfaces for sandlease
//!
//! This crate defines the boundary between the session core and whatever
//! service actually provisions remote sandboxes. It contains no session
//! logic itself: a provider creates, executes in, lists and closes
//! sandboxes, and never keeps a handle beyond a single call.

mod handle;
mod http;
mod mock;
mod traits;

pub use handle::*;
pub use http::*;
pub use mock::*;
pub use traits::*;
