use crate::events::{EventBus, PlannedStep, SubscriptionId, TimerEvent};
use crate::models::{TimerSnapshot, TimerStatus};
use crate::sequence::{OutOfRangeError, Sequence, Step};
use crate::side_effects::{
    run_hook, CompletionSink, ErrorReporter, HookKind, NoopSink, TracingReporter,
};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeError),
    #[error("sequence is already complete")]
    SequenceComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceResult {
    NoChange,
    Ticked { remaining_seconds: u32 },
    StepAdvanced { step_index: usize },
    SequenceCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    active_step_index: usize,
    time_remaining_seconds: u32,
    is_running: bool,
    completed_step_ids: Vec<String>,
    is_sequence_complete: bool,
}

impl Session {
    fn new(sequence: &Sequence) -> Self {
        Self {
            active_step_index: 0,
            time_remaining_seconds: sequence.steps()[0].duration_seconds,
            is_running: false,
            completed_step_ids: Vec::new(),
            is_sequence_complete: false,
        }
    }
}

/// Drives one countdown session over a [`Sequence`].
///
/// All mutation goes through the command methods. Completion hooks run after
/// the transition is committed; their failures are reported, never returned.
pub struct TimerEngine {
    sequence: Sequence,
    session: Session,
    sink: Box<dyn CompletionSink>,
    reporter: Box<dyn ErrorReporter>,
    events: EventBus,
}

impl TimerEngine {
    pub fn new(sequence: Sequence) -> Self {
        let session = Session::new(&sequence);
        Self {
            sequence,
            session,
            sink: Box::new(NoopSink),
            reporter: Box::new(TracingReporter),
            events: EventBus::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl CompletionSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn set_sink(&mut self, sink: Box<dyn CompletionSink>) {
        self.sink = sink;
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn ErrorReporter>) {
        self.reporter = reporter;
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&TimerEvent) + Send + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Replaces the sequence and starts a fresh session over it.
    pub fn load_sequence(&mut self, sequence: Sequence) {
        self.sequence = sequence;
        self.reset_session();
    }

    pub fn reset_session(&mut self) {
        self.session = Session::new(&self.sequence);
        info!(steps = self.sequence.step_count(), "timer session loaded");
        let steps = self
            .sequence
            .steps()
            .iter()
            .map(|step| PlannedStep {
                step_id: step.id.clone(),
                duration_seconds: step.duration_seconds,
            })
            .collect();
        self.emit(&TimerEvent::SessionLoaded {
            step_count: self.sequence.step_count(),
            steps,
        });
    }

    pub fn active_step_index(&self) -> usize {
        self.session.active_step_index
    }

    pub fn active_step(&self) -> &Step {
        &self.sequence.steps()[self.session.active_step_index]
    }

    pub fn time_remaining_seconds(&self) -> u32 {
        self.session.time_remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running
    }

    pub fn completed_step_ids(&self) -> &[String] {
        &self.session.completed_step_ids
    }

    pub fn is_step_completed(&self, step_id: &str) -> bool {
        self.session.completed_step_ids.iter().any(|id| id == step_id)
    }

    pub fn is_sequence_complete(&self) -> bool {
        self.session.is_sequence_complete
    }

    pub fn status(&self) -> TimerStatus {
        if self.session.is_sequence_complete {
            TimerStatus::SequenceComplete
        } else if self.session.is_running {
            TimerStatus::Running
        } else if self.session.time_remaining_seconds == self.active_step().duration_seconds {
            TimerStatus::Ready
        } else {
            TimerStatus::Paused
        }
    }

    pub fn overall_progress(&self) -> f32 {
        self.session.completed_step_ids.len() as f32 / self.sequence.step_count() as f32
    }

    pub fn step_progress(&self) -> f32 {
        let duration = self.active_step().duration_seconds;
        let elapsed = duration.saturating_sub(self.session.time_remaining_seconds);
        elapsed as f32 / duration as f32
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            active_step_index: self.session.active_step_index,
            active_step_id: self.active_step().id.clone(),
            time_remaining_seconds: self.session.time_remaining_seconds,
            is_running: self.session.is_running,
            completed_step_ids: self.session.completed_step_ids.clone(),
            is_sequence_complete: self.session.is_sequence_complete,
            status: self.status(),
            overall_progress: self.overall_progress(),
            step_progress: self.step_progress(),
        }
    }

    /// Returns `Ok(false)` when the clock was already running.
    pub fn start(&mut self) -> Result<bool, TimerError> {
        if self.session.is_sequence_complete {
            return Err(TimerError::SequenceComplete);
        }
        if self.session.is_running {
            return Ok(false);
        }
        self.session.is_running = true;
        let step_index = self.session.active_step_index;
        debug!(step_index, "timer started");
        self.emit(&TimerEvent::Started { step_index });
        Ok(true)
    }

    /// Returns `false` when the clock was not running.
    pub fn pause(&mut self) -> bool {
        if !self.session.is_running {
            return false;
        }
        self.session.is_running = false;
        let step_index = self.session.active_step_index;
        let remaining_seconds = self.session.time_remaining_seconds;
        debug!(step_index, remaining_seconds, "timer paused");
        self.emit(&TimerEvent::Paused {
            step_index,
            remaining_seconds,
        });
        true
    }

    pub fn reset_current_step(&mut self) {
        self.session.is_running = false;
        self.session.time_remaining_seconds = self.active_step().duration_seconds;
        let step_index = self.session.active_step_index;
        debug!(step_index, "current step reset");
        self.emit(&TimerEvent::StepReset { step_index });
    }

    /// Advances the countdown by one second. Ticks delivered while the clock
    /// is stopped are ignored.
    pub fn tick(&mut self) -> AdvanceResult {
        if !self.session.is_running || self.session.time_remaining_seconds == 0 {
            trace!("tick ignored");
            return AdvanceResult::NoChange;
        }
        self.session.time_remaining_seconds -= 1;
        let step_index = self.session.active_step_index;
        let remaining_seconds = self.session.time_remaining_seconds;
        trace!(step_index, remaining_seconds, "tick");
        self.emit(&TimerEvent::Ticked {
            step_index,
            remaining_seconds,
        });
        if remaining_seconds > 0 {
            return AdvanceResult::Ticked { remaining_seconds };
        }
        self.complete_current_step()
    }

    /// Marks the active step done and moves on. This is the only path that
    /// completes a step, whether the countdown ran out or the user forced it.
    ///
    /// The running flag is left as it was, except on the last step where the
    /// clock stops for good. Calls after the sequence completed are no-ops.
    pub fn complete_current_step(&mut self) -> AdvanceResult {
        if self.session.is_sequence_complete {
            debug!("completion ignored, sequence already complete");
            return AdvanceResult::NoChange;
        }
        let step_index = self.session.active_step_index;
        let step = self.active_step();
        let step_id = step.id.clone();
        let elapsed_seconds = step
            .duration_seconds
            .saturating_sub(self.session.time_remaining_seconds);

        if !self.is_step_completed(&step_id) {
            self.session.completed_step_ids.push(step_id.clone());
        }

        let result = if step_index == self.sequence.last_index() {
            self.session.is_sequence_complete = true;
            self.session.is_running = false;
            self.session.time_remaining_seconds = 0;
            AdvanceResult::SequenceCompleted
        } else {
            let next_index = step_index + 1;
            self.session.active_step_index = next_index;
            self.session.time_remaining_seconds = self.active_step().duration_seconds;
            AdvanceResult::StepAdvanced {
                step_index: next_index,
            }
        };
        info!(step_index, step_id = %step_id, elapsed_seconds, "step completed");

        self.fire_step_complete(step_index);
        if result == AdvanceResult::SequenceCompleted {
            info!("sequence completed");
            self.fire_sequence_complete();
        }

        self.emit(&TimerEvent::StepCompleted {
            step_index,
            step_id,
            elapsed_seconds,
        });
        match result {
            AdvanceResult::StepAdvanced { step_index } => {
                let step_id = self.active_step().id.clone();
                self.emit(&TimerEvent::StepChanged { step_index, step_id });
            }
            AdvanceResult::SequenceCompleted => self.emit(&TimerEvent::SequenceCompleted),
            _ => {}
        }
        result
    }

    /// Jumps to `index` with a full countdown and the clock stopped. The
    /// completed set is left alone. An invalid index changes nothing.
    pub fn skip_to_step(&mut self, index: usize) -> Result<(), TimerError> {
        let target = self.sequence.step_at(index)?;
        let duration_seconds = target.duration_seconds;
        let step_id = target.id.clone();

        let from_index = self.session.active_step_index;
        let from_step = self.active_step();
        let from_step_id = from_step.id.clone();
        let elapsed_seconds = from_step
            .duration_seconds
            .saturating_sub(self.session.time_remaining_seconds);

        self.session.active_step_index = index;
        self.session.time_remaining_seconds = duration_seconds;
        self.session.is_running = false;
        debug!(from_index, to_index = index, "skipped to step");

        self.emit(&TimerEvent::StepSkipped {
            from_index,
            from_step_id,
            to_index: index,
            elapsed_seconds,
        });
        self.emit(&TimerEvent::StepChanged {
            step_index: index,
            step_id,
        });
        Ok(())
    }

    fn emit(&mut self, event: &TimerEvent) {
        for failure in self.events.emit(event) {
            self.reporter.report(&failure);
        }
    }

    fn fire_step_complete(&mut self, step_index: usize) {
        let Self {
            sequence,
            sink,
            reporter,
            ..
        } = self;
        let Some(step) = sequence.steps().get(step_index) else {
            return;
        };
        if let Err(failure) = run_hook(HookKind::StepComplete, Some(step.id.as_str()), || {
            sink.on_step_complete(step)
        }) {
            reporter.report(&failure);
        }
    }

    fn fire_sequence_complete(&mut self) {
        let Self { sink, reporter, .. } = self;
        if let Err(failure) = run_hook(HookKind::SequenceComplete, None, || {
            sink.on_sequence_complete()
        }) {
            reporter.report(&failure);
        }
    }
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("sequence", &self.sequence)
            .field("session", &self.session)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
