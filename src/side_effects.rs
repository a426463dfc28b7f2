//! Hooks fired at completion boundaries and the reporting path for their
//! failures. A hook failure is never propagated back into the engine.

use crate::sequence::Step;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SideEffectError(pub String);

impl SideEffectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait CompletionSink: Send {
    fn on_step_complete(&mut self, step: &Step) -> Result<(), SideEffectError>;

    fn on_sequence_complete(&mut self) -> Result<(), SideEffectError>;
}

/// Lets the host keep a handle on a sink (to mute it, read its log) while the
/// engine owns a clone. A hook that panicked mid-call leaves the lock
/// poisoned; later cues still go through.
impl<T: CompletionSink> CompletionSink for Arc<Mutex<T>> {
    fn on_step_complete(&mut self, step: &Step) -> Result<(), SideEffectError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_step_complete(step)
    }

    fn on_sequence_complete(&mut self) -> Result<(), SideEffectError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_sequence_complete()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl CompletionSink for NoopSink {
    fn on_step_complete(&mut self, _step: &Step) -> Result<(), SideEffectError> {
        Ok(())
    }

    fn on_sequence_complete(&mut self) -> Result<(), SideEffectError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    StepComplete,
    SequenceComplete,
    EventListener,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectFailure {
    pub hook: HookKind,
    pub step_id: Option<String>,
    pub message: String,
}

pub trait ErrorReporter: Send {
    fn report(&mut self, failure: &SideEffectFailure);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&mut self, failure: &SideEffectFailure) {
        tracing::warn!(
            hook = ?failure.hook,
            step_id = failure.step_id.as_deref().unwrap_or("-"),
            "side effect failed: {}",
            failure.message
        );
    }
}

/// Runs a hook, turning both a returned error and a panic into a
/// [`SideEffectFailure`].
pub(crate) fn run_hook<F>(
    hook: HookKind,
    step_id: Option<&str>,
    call: F,
) -> Result<(), SideEffectFailure>
where
    F: FnOnce() -> Result<(), SideEffectError>,
{
    let message = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("hook panicked: {}", panic_message(payload.as_ref())),
    };
    Err(SideEffectFailure {
        hook,
        step_id: step_id.map(str::to_string),
        message,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
