//! Snapshot broadcasting to observers

use sandlease_util::SubscriptionId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::trace;

type Observer<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct HubInner<T> {
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer<T>)>,
    latest: Arc<T>,
}

/// Fan-out of immutable values to registered observers
///
/// Observers are invoked synchronously, in registration order, with the
/// hub's lock released. The most recent value is retained so it can be
/// read without waiting for the next notification.
pub struct NotificationHub<T> {
    inner: Arc<Mutex<HubInner<T>>>,
}

impl<T> Clone for NotificationHub<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> NotificationHub<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                next_id: 1,
                observers: Vec::new(),
                latest: Arc::new(initial),
            })),
        }
    }

    /// Register an observer. It is not called with the current value.
    pub fn subscribe<F>(&self, observer: F) -> Subscription<T>
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId::new(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        trace!(subscription = %id, "Observer registered");

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove_observer(&self.inner, id)
    }

    /// Store `value` as the latest and deliver it to every observer
    pub fn notify(&self, value: T) {
        let value = Arc::new(value);
        let observers: Vec<Observer<T>> = {
            let mut inner = self.lock();
            inner.latest = value.clone();
            inner.observers.iter().map(|(_, o)| o.clone()).collect()
        };

        for observer in observers {
            observer(&value);
        }
    }

    pub fn latest(&self) -> Arc<T> {
        self.lock().latest.clone()
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Drop every observer
    pub fn clear(&self) {
        self.lock().observers.clear();
    }

    fn lock(&self) -> MutexGuard<'_, HubInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn remove_observer<T>(inner: &Mutex<HubInner<T>>, id: SubscriptionId) -> bool {
    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
    let before = inner.observers.len();
    inner.observers.retain(|(existing, _)| *existing != id);
    before != inner.observers.len()
}

/// Registration token returned by [`NotificationHub::subscribe`]
///
/// Dropping the token does not unsubscribe.
pub struct Subscription<T> {
    id: SubscriptionId,
    hub: Weak<Mutex<HubInner<T>>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop receiving notifications. Returns whether the observer was
    /// still registered.
    pub fn unsubscribe(self) -> bool {
        match self.hub.upgrade() {
            Some(inner) => remove_observer(&inner, self.id),
            None => false,
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observers_called_in_registration_order() {
        let hub = NotificationHub::new(0u32);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            hub.subscribe(move |value: &Arc<u32>| {
                seen.lock().unwrap().push((tag, **value));
            });
        }

        hub.notify(7);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
        assert_eq!(*hub.latest(), 7);
    }

    #[test]
    fn unsubscribed_observer_stops_receiving() {
        let hub = NotificationHub::new(0u32);
        let count = Arc::new(Mutex::new(0));

        let counter = count.clone();
        let sub = hub.subscribe(move |_| *counter.lock().unwrap() += 1);

        hub.notify(1);
        assert!(sub.unsubscribe());
        hub.notify(2);

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(hub.observer_count(), 0);
    }

    #[test]
    fn all_observers_share_one_value() {
        let hub = NotificationHub::new(String::new());
        let seen = Arc::new(Mutex::new(Vec::<Arc<String>>::new()));

        for _ in 0..2 {
            let seen = seen.clone();
            hub.subscribe(move |value| seen.lock().unwrap().push(value.clone()));
        }
        hub.notify("snap".to_string());

        let seen = seen.lock().unwrap();
        assert!(Arc::ptr_eq(&seen[0], &seen[1]));
    }

    #[test]
    fn observer_may_subscribe_during_notification() {
        let hub = NotificationHub::new(0u32);
        let inner_hub = hub.clone();
        hub.subscribe(move |_| {
            inner_hub.subscribe(|_| {});
        });

        hub.notify(1);
        assert_eq!(hub.observer_count(), 2);
    }

    #[test]
    fn clear_drops_everything() {
        let hub = NotificationHub::new(0u32);
        let sub = hub.subscribe(|_| {});
        hub.subscribe(|_| {});
        hub.clear();
        assert_eq!(hub.observer_count(), 0);
        assert!(!sub.unsubscribe());
    }
}
