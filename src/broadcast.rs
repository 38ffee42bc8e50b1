//! Minimal typed publish/subscribe primitive.
//!
//! Both the cache store and the navigation state machine publish their state
//! through a [`Broadcast`]. Semantics the rest of the crate (and its tests)
//! rely on:
//!
//! - subscribing immediately replays the current state to the new listener,
//!   so late subscribers never need a separate "get current state" call;
//! - every publish notifies all current subscribers synchronously, in
//!   subscription order;
//! - unsubscribing during a notification round does not disturb delivery to
//!   the other listeners in that round.

use std::sync::{Arc, Mutex, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
  current: T,
  next_id: u64,
  listeners: Vec<(u64, Listener<T>)>,
}

/// A broadcast channel holding the latest published value.
pub struct Broadcast<T> {
  inner: Arc<Mutex<Inner<T>>>,
}

impl<T: Clone> Broadcast<T> {
  pub fn new(initial: T) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        current: initial,
        next_id: 0,
        listeners: Vec::new(),
      })),
    }
  }

  /// Register a listener. It is invoked once immediately with the current
  /// state, then again on every publish until the returned [`Subscription`]
  /// is dropped or explicitly unsubscribed.
  pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
  where
    F: Fn(&T) + Send + Sync + 'static,
  {
    let listener: Listener<T> = Arc::new(listener);

    let (id, snapshot) = {
      let mut inner = lock(&self.inner);
      let id = inner.next_id;
      inner.next_id += 1;
      inner.listeners.push((id, Arc::clone(&listener)));
      (id, inner.current.clone())
    };

    // Replay outside the lock so the listener may freely call back in.
    listener(&snapshot);

    Subscription {
      id,
      inner: Arc::downgrade(&self.inner),
    }
  }

  /// Publish a new value, notifying all subscribers synchronously.
  pub fn publish(&self, value: T) {
    // Snapshot the listener set under the lock, then notify without holding
    // it: a listener that unsubscribes (or subscribes) mid-round only affects
    // the next round.
    let listeners = {
      let mut inner = lock(&self.inner);
      inner.current = value.clone();
      inner.listeners.clone()
    };

    for (_, listener) in &listeners {
      listener(&value);
    }
  }

  /// The most recently published value.
  pub fn current(&self) -> T {
    lock(&self.inner).current.clone()
  }
}

impl<T> Clone for Broadcast<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

/// Handle returned from [`Broadcast::subscribe`]. Dropping it removes the
/// listener.
pub struct Subscription<T> {
  id: u64,
  inner: Weak<Mutex<Inner<T>>>,
}

impl<T> Subscription<T> {
  /// Remove the listener now instead of at drop time.
  pub fn unsubscribe(self) {
    // Drop impl does the work.
  }

  fn remove(&self) {
    if let Some(inner) = self.inner.upgrade() {
      let mut inner = lock(&inner);
      inner.listeners.retain(|(id, _)| *id != self.id);
    }
  }
}

impl<T> Drop for Subscription<T> {
  fn drop(&mut self) {
    self.remove();
  }
}

// Recover from poisoning instead of failing: the broadcast holds plain data
// and a panicking listener leaves it in a usable state.
fn lock<T>(mutex: &Mutex<Inner<T>>) -> std::sync::MutexGuard<'_, Inner<T>> {
  mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Fn(&i32) + Send + Sync) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |v: &i32| sink.lock().unwrap().push(*v))
  }

  #[test]
  fn subscribe_replays_current_state() {
    let bus = Broadcast::new(7);
    let (seen, listener) = recorder();

    let _sub = bus.subscribe(listener);

    assert_eq!(*seen.lock().unwrap(), vec![7]);
  }

  #[test]
  fn publish_notifies_in_subscription_order() {
    let bus = Broadcast::new(0);
    let order = Arc::new(Mutex::new(Vec::new()));

    let o1 = Arc::clone(&order);
    let _a = bus.subscribe(move |v: &i32| o1.lock().unwrap().push(("a", *v)));
    let o2 = Arc::clone(&order);
    let _b = bus.subscribe(move |v: &i32| o2.lock().unwrap().push(("b", *v)));

    bus.publish(1);

    assert_eq!(
      *order.lock().unwrap(),
      vec![("a", 0), ("b", 0), ("a", 1), ("b", 1)]
    );
  }

  #[test]
  fn dropped_subscription_stops_delivery() {
    let bus = Broadcast::new(0);
    let (seen, listener) = recorder();

    let sub = bus.subscribe(listener);
    bus.publish(1);
    drop(sub);
    bus.publish(2);

    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
  }

  #[test]
  fn unsubscribe_during_notify_keeps_round_intact() {
    let bus = Broadcast::new(0);

    // First listener drops the second listener's subscription mid-round.
    let victim: Arc<Mutex<Option<Subscription<i32>>>> = Arc::new(Mutex::new(None));
    let victim_handle = Arc::clone(&victim);
    let _killer = bus.subscribe(move |v: &i32| {
      if *v == 1 {
        victim_handle.lock().unwrap().take();
      }
    });

    let (seen, listener) = recorder();
    *victim.lock().unwrap() = Some(bus.subscribe(listener));

    // The victim still receives the value published in the round that
    // removed it, but nothing afterwards.
    bus.publish(1);
    bus.publish(2);

    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
  }

  #[test]
  fn current_reflects_last_publish() {
    let bus = Broadcast::new(1);
    bus.publish(5);
    assert_eq!(bus.current(), 5);
  }
}
