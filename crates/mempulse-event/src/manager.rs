//! Listener manager: broadcaster factory and per-type registry.

use crate::broadcast::ListenerBroadcast;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Hands out listener broadcasts.
///
/// Anonymous broadcasters belong to whoever created them. Shared
/// broadcasters are keyed by listener type, so a subsystem can subscribe to
/// `dyn SomeListener` without a handle on the component that fires it.
#[derive(Default)]
pub struct ListenerManager {
    shared: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl ListenerManager {
    /// Create a new manager with no shared broadcasters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a broadcaster that is not visible through this manager.
    pub fn create_anonymous_broadcaster<L>(&self) -> ListenerBroadcast<L>
    where
        L: ?Sized + Send + Sync + 'static,
    {
        debug!(listener_type = type_name::<L>(), "Creating anonymous broadcaster");
        ListenerBroadcast::new()
    }

    /// Get the shared broadcaster for listener type `L`, creating it on first use.
    pub fn broadcaster<L>(&self) -> ListenerBroadcast<L>
    where
        L: ?Sized + Send + Sync + 'static,
    {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = shared.entry(TypeId::of::<L>()).or_insert_with(|| {
            debug!(listener_type = type_name::<L>(), "Creating shared broadcaster");
            let broadcast: Box<dyn Any + Send + Sync> = Box::new(ListenerBroadcast::<L>::new());
            broadcast
        });

        match entry.downcast_ref::<ListenerBroadcast<L>>() {
            Some(broadcast) => broadcast.clone(),
            // Keys are derived from the stored type, so this arm is unreachable
            None => ListenerBroadcast::new(),
        }
    }

    /// Register a listener with the shared broadcaster for its type.
    pub fn add_listener<L>(&self, listener: Arc<L>)
    where
        L: ?Sized + Send + Sync + 'static,
    {
        self.broadcaster::<L>().add(listener);
    }

    /// Remove a listener from the shared broadcaster for its type.
    pub fn remove_listener<L>(&self, listener: &Arc<L>) -> bool
    where
        L: ?Sized + Send + Sync + 'static,
    {
        self.broadcaster::<L>().remove(listener)
    }

    /// Check whether a shared broadcaster exists for `L`.
    pub fn has_broadcaster<L>(&self) -> bool
    where
        L: ?Sized + 'static,
    {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<L>())
    }
}

impl std::fmt::Debug for ListenerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .shared
            .lock()
            .map(|shared| shared.len())
            .unwrap_or_default();
        f.debug_struct("ListenerManager")
            .field("shared_broadcasters", &count)
            .finish()
    }
}
