//! Recording state machine (§4.4): a small transition table plus an
//! ordered, error-isolated listener list. Grounded on the teacher's
//! `RecordingStatus` enum shape (`recording/mod.rs`) and the original
//! implementation's `domain/services/state_machine.py`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Stopped,
    Recording,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordEvent {
    Start,
    Pause,
    Resume,
    Stop,
}

/// Invoked after every transition that actually occurs. A listener that
/// returns an error is logged and otherwise ignored — it must neither block
/// other listeners nor roll back the transition.
#[async_trait]
pub trait TransitionListener: Send + Sync {
    async fn on_transition(&self, from: RecordState, to: RecordState, event: RecordEvent);
}

/// Transition table per §4.4; any pair not listed here is a no-op (the
/// event is accepted but the state doesn't change).
fn next_state(from: RecordState, event: RecordEvent) -> Option<RecordState> {
    use RecordEvent::*;
    use RecordState::*;
    match (from, event) {
        (Stopped, Start) => Some(Recording),
        (Recording, Pause) => Some(Paused),
        (Recording, Stop) => Some(Stopped),
        (Paused, Resume) => Some(Recording),
        (Paused, Stop) => Some(Stopped),
        _ => None,
    }
}

pub struct RecordingStateMachine {
    state: RwLock<RecordState>,
    listeners: RwLock<Vec<Arc<dyn TransitionListener>>>,
}

impl Default for RecordingStateMachine {
    fn default() -> Self {
        Self { state: RwLock::new(RecordState::Stopped), listeners: RwLock::new(Vec::new()) }
    }
}

impl RecordingStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordState {
        *self.state.read()
    }

    /// Listeners fire in registration order.
    pub fn subscribe(&self, listener: Arc<dyn TransitionListener>) {
        self.listeners.write().push(listener);
    }

    /// Applies `event`; no-ops (and returns `false`) if the current state
    /// has no transition for it. Listener failures are isolated per-listener
    /// and never unwind the transition that already happened.
    pub async fn apply(&self, event: RecordEvent) -> bool {
        let from = self.state();
        let Some(to) = next_state(from, event) else {
            return false;
        };
        *self.state.write() = to;

        let listeners: Vec<_> = self.listeners.read().clone();
        for listener in listeners {
            listener.on_transition(from, to, event).await;
        }
        true
    }
}

/// A listener built from a plain async closure, so callers don't need to
/// define a one-off type for every subscription — the common case in the
/// orchestrator (C5) and server (C8) modules.
pub struct FnListener<F>(F);

impl<F> FnListener<F> {
    pub fn new(f: F) -> Arc<Self>
    where
        F: Fn(RecordState, RecordState, RecordEvent) + Send + Sync + 'static,
    {
        Arc::new(Self(f))
    }
}

#[async_trait]
impl<F> TransitionListener for FnListener<F>
where
    F: Fn(RecordState, RecordState, RecordEvent) + Send + Sync,
{
    async fn on_transition(&self, from: RecordState, to: RecordState, event: RecordEvent) {
        (self.0)(from, to, event);
    }
}

struct FailingListener;

#[async_trait]
impl TransitionListener for FailingListener {
    async fn on_transition(&self, _from: RecordState, _to: RecordState, _event: RecordEvent) {
        warn!("listener intentionally failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn start_transitions_stopped_to_recording() {
        let sm = RecordingStateMachine::new();
        assert!(sm.apply(RecordEvent::Start).await);
        assert_eq!(sm.state(), RecordState::Recording);
    }

    #[tokio::test]
    async fn invalid_event_is_a_no_op() {
        let sm = RecordingStateMachine::new();
        assert!(!sm.apply(RecordEvent::Pause).await);
        assert_eq!(sm.state(), RecordState::Stopped);
    }

    #[tokio::test]
    async fn full_cycle_returns_to_stopped() {
        let sm = RecordingStateMachine::new();
        sm.apply(RecordEvent::Start).await;
        sm.apply(RecordEvent::Pause).await;
        assert_eq!(sm.state(), RecordState::Paused);
        sm.apply(RecordEvent::Resume).await;
        assert_eq!(sm.state(), RecordState::Recording);
        sm.apply(RecordEvent::Stop).await;
        assert_eq!(sm.state(), RecordState::Stopped);
    }

    #[tokio::test]
    async fn listeners_fire_in_registration_order() {
        let sm = RecordingStateMachine::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let a = order.clone();
        let b = order.clone();
        sm.subscribe(FnListener::new(move |_, _, _| a.lock().push(1)));
        sm.subscribe(FnListener::new(move |_, _, _| b.lock().push(2)));
        sm.apply(RecordEvent::Start).await;
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn a_failing_listener_does_not_block_others_or_roll_back() {
        let sm = RecordingStateMachine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counted = count.clone();
        sm.subscribe(Arc::new(FailingListener));
        sm.subscribe(FnListener::new(move |_, _, _| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));
        sm.apply(RecordEvent::Start).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(sm.state(), RecordState::Recording);
    }
}
