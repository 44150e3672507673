//! Debounce for user-facing notifications.

use super::{EventKind, MutationEvent, NotificationSink, Operation};
use crate::entity::EntityKind;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

type ThrottleKey = (EventKind, EntityKind, Operation);

/// Suppresses repeats of the same kind of notification inside a window.
///
/// Two events share a key when they have the same outcome, entity kind and
/// operation; the entity id is ignored so that a burst of failures (e.g. the
/// network dropping while several toggles are in flight) yields one toast.
pub struct NotificationThrottle {
    window: Duration,
    last_shown: Mutex<HashMap<ThrottleKey, Instant>>,
}

impl NotificationThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_shown: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if `event` should be shown now and records it.
    pub fn allow(&self, event: &MutationEvent) -> bool {
        self.allow_at(event, Instant::now())
    }

    pub fn allow_at(&self, event: &MutationEvent, now: Instant) -> bool {
        let key = (event.kind, event.entity_kind, event.operation);
        let Ok(mut last_shown) = self.last_shown.lock() else {
            return true;
        };
        match last_shown.get(&key) {
            Some(shown) if now.saturating_duration_since(*shown) < self.window => false,
            _ => {
                last_shown.insert(key, now);
                true
            }
        }
    }

    /// Forgets every recorded notification.
    pub fn reset(&self) {
        if let Ok(mut last_shown) = self.last_shown.lock() {
            last_shown.clear();
        }
    }
}

/// A sink that only forwards events the throttle lets through.
pub struct ThrottledSink<S: NotificationSink> {
    inner: S,
    throttle: NotificationThrottle,
}

impl<S: NotificationSink> ThrottledSink<S> {
    pub fn new(inner: S, throttle: NotificationThrottle) -> Self {
        Self { inner, throttle }
    }

    pub fn reset(&self) {
        self.throttle.reset();
    }
}

impl<S: NotificationSink> NotificationSink for ThrottledSink<S> {
    fn notify(&self, event: &MutationEvent) {
        if self.throttle.allow(event) {
            self.inner.notify(event);
        } else {
            tracing::debug!(
                target: "sync",
                id = %event.entity_id,
                operation = %event.operation,
                "notification suppressed by throttle"
            );
        }
    }
}
