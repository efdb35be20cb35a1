//! Auth state listeners.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{Arc, Mutex, PoisonError, Weak},
};

use tracing::debug;

use crate::auth::{AuthEvent, Session};

/// Callback invoked on every session transition with the session after it.
pub type AuthCallback = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, AuthCallback)>,
}

/// Subscriber list shared by an auth provider and its [`Subscription`]s.
#[derive(Clone, Default)]
pub struct Listeners {
    registry: Arc<Mutex<Registry>>,
}

impl Debug for Listeners {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Listeners")
            .field("count", &self.len())
            .finish()
    }
}

impl Listeners {
    /// Register `callback` until the returned subscription is dropped.
    pub fn subscribe(&self, callback: AuthCallback) -> Subscription {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);

        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, callback));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every subscriber, in subscription order.
    pub fn notify(&self, event: AuthEvent, session: Option<&Session>) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let callbacks: Vec<AuthCallback> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        debug!(event = event.as_str(), listeners = callbacks.len(), "auth state changed");

        for callback in callbacks {
            callback(event, session);
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by `on_auth_state_change`; unsubscribes when dropped.
#[must_use = "dropping a subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop receiving events.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}
