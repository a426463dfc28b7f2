//! Host-side command helpers over a shared engine. Each returns the snapshot
//! to render after the command, or an [`AppError`] that has already been
//! logged.

use crate::app_error::{AppError, AppErrorPayload};
use crate::audio_manager::{AudioManager, PlaybackMode};
use crate::data_manager::DataManager;
use crate::models::{Recipe, TimerSettings, TimerSnapshot};
use crate::sequence::Sequence;
use crate::side_effects::{ErrorReporter, SideEffectFailure};
use crate::timer_engine::TimerEngine;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Converts hook failures into [`AppError`]s, logs them and queues their
/// payloads until the host drains them for display.
#[derive(Debug, Clone, Default)]
pub struct AppErrorReporter {
    pending: Arc<Mutex<Vec<AppErrorPayload>>>,
}

impl AppErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<AppErrorPayload> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ErrorReporter for AppErrorReporter {
    fn report(&mut self, failure: &SideEffectFailure) {
        let error = report_error(AppError::from(failure));
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error.payload());
    }
}

/// Result of loading a recipe: the first snapshot, the sound sink (so the
/// host can mute it) and the queue of hook failures to surface.
#[derive(Debug)]
pub struct LoadedRecipe {
    pub snapshot: TimerSnapshot,
    pub audio: Arc<Mutex<AudioManager>>,
    pub errors: AppErrorReporter,
}

fn lock_engine(timer_engine: &Mutex<TimerEngine>) -> Result<MutexGuard<'_, TimerEngine>, AppError> {
    timer_engine
        .lock()
        .map_err(|_| report_error(AppError::system("Timer state lock failed")))
}

/// Validates `recipe` and swaps it into the engine with a fresh session. The
/// engine is left untouched when the recipe is malformed.
pub fn load_recipe(
    recipe: &Recipe,
    settings: &TimerSettings,
    playback_mode: PlaybackMode,
    timer_engine: &Mutex<TimerEngine>,
) -> Result<LoadedRecipe, AppError> {
    let sequence = Sequence::from_recipe(recipe).map_err(|err| report_error(err.into()))?;
    let audio = Arc::new(Mutex::new(AudioManager::for_recipe(
        recipe,
        settings,
        playback_mode,
    )));
    let errors = AppErrorReporter::new();
    let mut engine = lock_engine(timer_engine)?;
    engine.load_sequence(sequence);
    engine.set_sink(Box::new(Arc::clone(&audio)));
    engine.set_reporter(Box::new(errors.clone()));
    if settings.auto_start {
        engine.start().map_err(|err| report_error(err.into()))?;
    }
    tracing::info!(recipe_id = %recipe.id, steps = recipe.steps.len(), "recipe loaded");
    Ok(LoadedRecipe {
        snapshot: engine.snapshot(),
        audio,
        errors,
    })
}

pub fn load_recipe_by_id(
    recipe_id: &str,
    data_manager: &DataManager,
    playback_mode: PlaybackMode,
    timer_engine: &Mutex<TimerEngine>,
) -> Result<LoadedRecipe, AppError> {
    let recipe = data_manager
        .find_recipe(recipe_id)
        .map_err(|err| report_error(err.into()))?;
    let settings = data_manager
        .load_settings()
        .map_err(|err| report_error(err.into()))?;
    load_recipe(&recipe, &settings, playback_mode, timer_engine)
}

pub fn start_timer(timer_engine: &Mutex<TimerEngine>) -> Result<TimerSnapshot, AppError> {
    let mut engine = lock_engine(timer_engine)?;
    engine.start().map_err(|err| report_error(err.into()))?;
    Ok(engine.snapshot())
}

pub fn pause_timer(timer_engine: &Mutex<TimerEngine>) -> Result<TimerSnapshot, AppError> {
    let mut engine = lock_engine(timer_engine)?;
    engine.pause();
    Ok(engine.snapshot())
}

pub fn reset_step(timer_engine: &Mutex<TimerEngine>) -> Result<TimerSnapshot, AppError> {
    let mut engine = lock_engine(timer_engine)?;
    engine.reset_current_step();
    Ok(engine.snapshot())
}

pub fn complete_step(timer_engine: &Mutex<TimerEngine>) -> Result<TimerSnapshot, AppError> {
    let mut engine = lock_engine(timer_engine)?;
    engine.complete_current_step();
    Ok(engine.snapshot())
}

/// An out-of-range index is reported and otherwise ignored; the session is
/// not modified.
pub fn skip_to_step(
    index: usize,
    timer_engine: &Mutex<TimerEngine>,
) -> Result<TimerSnapshot, AppError> {
    let mut engine = lock_engine(timer_engine)?;
    engine
        .skip_to_step(index)
        .map_err(|err| report_error(err.into()))?;
    Ok(engine.snapshot())
}

pub fn reset_session(timer_engine: &Mutex<TimerEngine>) -> Result<TimerSnapshot, AppError> {
    let mut engine = lock_engine(timer_engine)?;
    engine.reset_session();
    Ok(engine.snapshot())
}

pub fn get_timer_state(timer_engine: &Mutex<TimerEngine>) -> Result<TimerSnapshot, AppError> {
    Ok(lock_engine(timer_engine)?.snapshot())
}

pub fn report_error(error: AppError) -> AppError {
    match error.detail() {
        Some(detail) => tracing::warn!(kind = ?error.kind(), "{}: {detail}", error.message()),
        None => tracing::warn!(kind = ?error.kind(), "{}", error.message()),
    }
    error
}
