//! Publish-subscribe event bus (§4.7): each subscriber owns a bounded
//! queue, oldest entry dropped on overflow, drained via `poll`. Publishing
//! is non-blocking per subscriber — there is no backpressure from a slow
//! consumer onto the frame loop that publishes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// One published occurrence: a wire name from §6 (e.g. `recorder.state`)
/// plus its JSON payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub event_type: String,
    pub payload: Value,
}

struct Subscriber {
    filter: Option<HashSet<String>>,
    capacity: usize,
    queue: Mutex<VecDeque<Event>>,
}

impl Subscriber {
    fn wants(&self, event_type: &str) -> bool {
        match &self.filter {
            Some(types) => types.contains(event_type),
            None => true,
        }
    }

    fn push(&self, event: Event) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(event);
    }
}

struct Inner {
    subscribers: Mutex<HashMap<u64, Arc<Subscriber>>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
pub struct EventBus(Arc<Inner>);

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self(Arc::new(Inner { subscribers: Mutex::new(HashMap::new()), next_id: AtomicU64::new(0) }))
    }

    /// Serializes `payload`'s named fields and fans it out to every matching
    /// subscriber's queue. A payload that fails to serialize is logged and
    /// dropped rather than panicking the publisher.
    pub fn publish(&self, event_type: impl Into<String>, payload: impl Serialize) {
        let event_type = event_type.into();
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(?err, event_type, "failed to serialize event payload, dropping");
                return;
            }
        };
        let event = Event { event_type, payload };
        for subscriber in self.0.subscribers.lock().values() {
            if subscriber.wants(&event.event_type) {
                subscriber.push(event.clone());
            }
        }
    }

    /// Registers a new subscription. `filter` restricts delivery to the
    /// named event types; `None` receives everything. `capacity` bounds the
    /// subscriber's own queue.
    pub fn subscribe(&self, filter: Option<HashSet<String>>, capacity: usize) -> Subscription {
        let id = self.0.next_id.fetch_add(1, Ordering::SeqCst);
        let subscriber = Arc::new(Subscriber { filter, capacity, queue: Mutex::new(VecDeque::new()) });
        self.0.subscribers.lock().insert(id, subscriber.clone());
        Subscription { bus: self.clone(), id, subscriber }
    }

    fn unsubscribe(&self, id: u64) {
        self.0.subscribers.lock().remove(&id);
    }
}

/// A live subscription. Dropping it releases the subscriber's queue and
/// stops further delivery, matching "closing the subscription releases
/// resources" (§4.7).
pub struct Subscription {
    bus: EventBus,
    id: u64,
    subscriber: Arc<Subscriber>,
}

impl Subscription {
    /// Drains up to `max_items` queued events in publication order.
    pub fn poll(&self, max_items: usize) -> Vec<Event> {
        let mut queue = self.subscriber.queue.lock();
        let take = max_items.min(queue.len());
        queue.drain(..take).collect()
    }

    pub fn close(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_receives_matching_events_in_order() {
        let bus = EventBus::new();
        let sub = bus.subscribe(None, 8);
        bus.publish("recorder.state", serde_json::json!({"state": "RECORDING"}));
        bus.publish("recorder.reset", serde_json::json!({}));

        let events = sub.poll(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "recorder.state");
        assert_eq!(events[1].event_type, "recorder.reset");
    }

    #[test]
    fn filter_restricts_delivery() {
        let bus = EventBus::new();
        let filter = HashSet::from(["recorder.state".to_string()]);
        let sub = bus.subscribe(Some(filter), 8);
        bus.publish("recorder.reset", serde_json::json!({}));
        bus.publish("recorder.state", serde_json::json!({"state": "PAUSED"}));

        let events = sub.poll(10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "recorder.state");
    }

    #[test]
    fn full_queue_drops_oldest() {
        let bus = EventBus::new();
        let sub = bus.subscribe(None, 2);
        bus.publish("a", serde_json::json!(1));
        bus.publish("b", serde_json::json!(2));
        bus.publish("c", serde_json::json!(3));

        let events = sub.poll(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "b");
        assert_eq!(events[1].event_type, "c");
    }

    #[test]
    fn dropping_subscription_removes_it_from_the_bus() {
        let bus = EventBus::new();
        {
            let _sub = bus.subscribe(None, 4);
            assert_eq!(bus.0.subscribers.lock().len(), 1);
        }
        assert_eq!(bus.0.subscribers.lock().len(), 0);
    }
}
