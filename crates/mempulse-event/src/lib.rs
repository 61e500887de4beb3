//! mempulse Listener Registry
//!
//! Typed publish/subscribe plumbing shared by the monitoring crates:
//! - `ListenerBroadcast<L>`: an ordered set of listeners of one type that
//!   fans a single call out to every registered listener
//! - `ListenerManager`: creates anonymous broadcasters and hands out the
//!   shared broadcaster for a listener type
//!
//! Delivery is synchronous, in registration order, on the caller's thread.
//! A panicking listener is isolated so the rest of the set still hears
//! about the event.

mod broadcast;
mod manager;

pub use broadcast::{DispatchError, ListenerBroadcast, ListenerFailure};
pub use manager::ListenerManager;
