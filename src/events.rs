use crate::side_effects::{run_hook, HookKind, SideEffectFailure};
use serde::Serialize;

/// Transition notifications published by the timer engine. Every event is
/// emitted after the state change it describes has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    #[serde(rename_all = "camelCase")]
    SessionLoaded {
        step_count: usize,
        steps: Vec<PlannedStep>,
    },
    #[serde(rename_all = "camelCase")]
    Started { step_index: usize },
    #[serde(rename_all = "camelCase")]
    Paused {
        step_index: usize,
        remaining_seconds: u32,
    },
    #[serde(rename_all = "camelCase")]
    Ticked {
        step_index: usize,
        remaining_seconds: u32,
    },
    #[serde(rename_all = "camelCase")]
    StepReset { step_index: usize },
    #[serde(rename_all = "camelCase")]
    StepCompleted {
        step_index: usize,
        step_id: String,
        elapsed_seconds: u32,
    },
    #[serde(rename_all = "camelCase")]
    StepChanged { step_index: usize, step_id: String },
    #[serde(rename_all = "camelCase")]
    StepSkipped {
        from_index: usize,
        from_step_id: String,
        to_index: usize,
        elapsed_seconds: u32,
    },
    SequenceCompleted,
}

/// Step id and full duration, as carried by [`TimerEvent::SessionLoaded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub step_id: String,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&TimerEvent) + Send>;

/// Fan-out of engine events to any number of observers, in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&TimerEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers `event` to every listener. A panicking listener is skipped
    /// and returned as a failure; the rest still receive the event.
    pub fn emit(&mut self, event: &TimerEvent) -> Vec<SideEffectFailure> {
        self.listeners
            .iter_mut()
            .filter_map(|(_, listener)| {
                run_hook(HookKind::EventListener, None, || {
                    listener(event);
                    Ok(())
                })
                .err()
            })
            .collect()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
