use crate::data_manager::DataError;
use crate::sequence::SequenceError;
use crate::side_effects::{HookKind, SideEffectFailure};
use crate::timer_engine::TimerError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppErrorKind {
    System,
    Data,
    Sequence,
    Timer,
    SideEffect,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppErrorPayload {
    pub kind: AppErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub recoverable: bool,
}

/// Error shape handed to the presentation layer: a short user-facing message,
/// the technical detail, and whether the screen can carry on.
#[derive(Debug, Clone)]
pub struct AppError {
    kind: AppErrorKind,
    message: String,
    detail: Option<String>,
    recoverable: bool,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            recoverable,
        }
    }

    pub fn with_detail(
        kind: AppErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: Some(detail.into()),
            recoverable,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::System, message, true)
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn payload(&self) -> AppErrorPayload {
        AppErrorPayload {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            recoverable: self.recoverable,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({detail})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AppError {}

impl From<TimerError> for AppError {
    fn from(error: TimerError) -> Self {
        let detail = error.to_string();
        let message = match error {
            TimerError::OutOfRange(_) => "That step does not exist",
            TimerError::SequenceComplete => "All steps are already done",
        };
        Self::with_detail(AppErrorKind::Timer, message, detail, true)
    }
}

/// A malformed sequence must keep the timer screen from opening at all.
impl From<SequenceError> for AppError {
    fn from(error: SequenceError) -> Self {
        let detail = error.to_string();
        let message = match error {
            SequenceError::Empty => "Add at least one step",
            SequenceError::EmptyId { .. } => "Every step needs an id",
            SequenceError::NonPositiveDuration { .. } => "Step time must be at least 1 second",
            SequenceError::DurationTooLong { .. } => "Step time is too long",
            SequenceError::DuplicateId { .. } => "Step ids must be unique",
        };
        Self::with_detail(AppErrorKind::Sequence, message, detail, false)
    }
}

impl From<DataError> for AppError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::Sequence { source, .. } => Self::from(source),
            DataError::RecipeNotFound(ref id) => Self::with_detail(
                AppErrorKind::Data,
                "Recipe not found",
                format!("recipe id `{id}`"),
                true,
            ),
            DataError::Io(_) => Self::with_detail(
                AppErrorKind::Data,
                "Failed to read or write data",
                error.to_string(),
                true,
            ),
            DataError::Serde(_) => Self::with_detail(
                AppErrorKind::Data,
                "Failed to read the data format",
                error.to_string(),
                true,
            ),
        }
    }
}

impl From<&SideEffectFailure> for AppError {
    fn from(failure: &SideEffectFailure) -> Self {
        let message = match failure.hook {
            HookKind::StepComplete | HookKind::SequenceComplete => {
                "Could not play the alert, continuing with visual cues"
            }
            HookKind::EventListener => "A timer display failed to update",
        };
        Self::with_detail(
            AppErrorKind::SideEffect,
            message,
            failure.message.clone(),
            true,
        )
    }
}
