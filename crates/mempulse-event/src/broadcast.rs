//! Ordered listener set with panic-isolated fan-out.

use std::any::{type_name, Any};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, error};

/// A single listener that failed during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// Position of the listener in registration order at dispatch time
    pub index: usize,
    /// Panic payload rendered as text
    pub message: String,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener #{}: {}", self.index, self.message)
    }
}

/// Errors reported after a dispatch has visited every listener
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("{} of {delivered_to} {listener_type} listener(s) failed", .failures.len())]
    ListenerFailed {
        listener_type: &'static str,
        delivered_to: usize,
        failures: Vec<ListenerFailure>,
    },
}

impl DispatchError {
    /// Failures collected during the dispatch.
    pub fn failures(&self) -> &[ListenerFailure] {
        match self {
            Self::ListenerFailed { failures, .. } => failures,
        }
    }
}

/// An ordered set of listeners of type `L`.
///
/// Clones share the same registration set, so a producer can keep one
/// handle for dispatching while subscribers register through another.
/// `L` is normally a trait object such as `dyn MyListener`.
pub struct ListenerBroadcast<L: ?Sized> {
    listeners: Arc<RwLock<Vec<Arc<L>>>>,
}

impl<L: ?Sized + Send + Sync> ListenerBroadcast<L> {
    /// Create an empty broadcast.
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a listener at the end of the set.
    ///
    /// Registering the same `Arc` twice is ignored.
    pub fn add(&self, listener: Arc<L>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if listeners.iter().any(|existing| Arc::ptr_eq(existing, &listener)) {
            debug!(listener_type = type_name::<L>(), "Listener already registered");
            return;
        }
        listeners.push(listener);
    }

    /// Remove a listener by identity. Returns whether it was registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match listeners.iter().position(|existing| Arc::ptr_eq(existing, listener)) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every listener.
    pub fn remove_all(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `notify` for every listener, in registration order.
    ///
    /// The set is copied before the first call, so listeners may subscribe
    /// or unsubscribe from inside a callback; the change applies to the next
    /// dispatch. Each call runs inside a panic isolation boundary and every
    /// listener is visited even if an earlier one panicked.
    pub fn dispatch<F>(&self, mut notify: F) -> Result<(), DispatchError>
    where
        F: FnMut(&L),
    {
        let listeners: Vec<Arc<L>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = Vec::new();
        for (index, listener) in listeners.iter().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| notify(&**listener)));

            if let Err(panic_info) = result {
                let message = panic_message(panic_info.as_ref());
                error!(
                    listener_type = type_name::<L>(),
                    index,
                    "Listener panicked: {}",
                    message
                );
                failures.push(ListenerFailure { index, message });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::ListenerFailed {
                listener_type: type_name::<L>(),
                delivered_to: listeners.len(),
                failures,
            })
        }
    }
}

impl<L: ?Sized + Send + Sync> Default for ListenerBroadcast<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for ListenerBroadcast<L> {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<L: ?Sized> fmt::Debug for ListenerBroadcast<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .listeners
            .read()
            .map(|listeners| listeners.len())
            .unwrap_or_default();
        f.debug_struct("ListenerBroadcast")
            .field("listener_type", &type_name::<L>())
            .field("listeners", &count)
            .finish()
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
