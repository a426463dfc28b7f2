//! Sequential step-timer engine: one countdown that runs through an ordered
//! list of timed steps, with pause, reset, skip and forced completion.

pub mod app_error;
pub mod audio_manager;
pub mod clock;
pub mod data_manager;
pub mod events;
pub mod logging;
pub mod models;
pub mod sequence;
pub mod session_tracker;
pub mod side_effects;
pub mod timer_actions;
pub mod timer_engine;

pub use app_error::{AppError, AppErrorKind, AppErrorPayload};
pub use audio_manager::{AudioManager, PlaybackMode};
pub use clock::{ClockDriver, SharedEngine, DEFAULT_TICK_INTERVAL};
pub use data_manager::{DataError, DataManager};
pub use events::{PlannedStep, SubscriptionId, TimerEvent};
pub use models::{Recipe, RecipeStep, TimerSettings, TimerSnapshot, TimerStatus};
pub use sequence::{OutOfRangeError, Sequence, SequenceError, Step};
pub use session_tracker::SessionTracker;
pub use side_effects::{
    CompletionSink, ErrorReporter, SideEffectError, SideEffectFailure, TracingReporter,
};
pub use timer_actions::{AppErrorReporter, LoadedRecipe};
pub use timer_engine::{AdvanceResult, TimerEngine, TimerError};
