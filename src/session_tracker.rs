use crate::events::{SubscriptionId, TimerEvent};
use crate::models::{SessionRecord, SessionTotals, StepRun, StepRunResult};
use crate::sequence::Sequence;
use crate::timer_engine::TimerEngine;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Builds the history of one timer session from engine events: one
/// [`StepRun`] each time a step instance is left, by completion or by skip.
#[derive(Debug, Default)]
pub struct SessionTracker {
    active: Option<ActiveSession>,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    id: String,
    recipe_id: Option<String>,
    planned: HashMap<String, u32>,
    started_at: String,
    current_step_started_at: String,
    step_runs: Vec<StepRun>,
    sequence_completed: bool,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_session(&mut self, recipe_id: Option<&str>, sequence: &Sequence) -> String {
        let id = generate_session_id();
        let started_at = now_rfc3339();
        self.active = Some(ActiveSession {
            id: id.clone(),
            recipe_id: recipe_id.map(str::to_string),
            planned: sequence
                .steps()
                .iter()
                .map(|step| (step.id.clone(), step.duration_seconds))
                .collect(),
            current_step_started_at: started_at.clone(),
            started_at,
            step_runs: Vec::new(),
            sequence_completed: false,
        });
        id
    }

    /// Starts a session for the engine's current sequence and feeds it every
    /// subsequent engine event.
    pub fn attach(
        tracker: &Arc<Mutex<Self>>,
        recipe_id: Option<&str>,
        engine: &mut TimerEngine,
    ) -> Option<SubscriptionId> {
        tracker
            .lock()
            .ok()?
            .start_session(recipe_id, engine.sequence());
        let tracker = Arc::clone(tracker);
        Some(engine.subscribe(move |event| match tracker.lock() {
            Ok(mut tracker) => tracker.record_event(event),
            Err(_) => tracing::error!("session tracker lock poisoned"),
        }))
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn record_event(&mut self, event: &TimerEvent) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        match event {
            TimerEvent::StepCompleted {
                step_id,
                elapsed_seconds,
                ..
            } => active.finish_step(step_id, *elapsed_seconds, StepRunResult::Completed),
            TimerEvent::StepSkipped {
                from_step_id,
                elapsed_seconds,
                ..
            } => active.finish_step(from_step_id, *elapsed_seconds, StepRunResult::Skipped),
            TimerEvent::SequenceCompleted => active.sequence_completed = true,
            TimerEvent::SessionLoaded { steps, .. } => {
                let now = now_rfc3339();
                active.planned = steps
                    .iter()
                    .map(|step| (step.step_id.clone(), step.duration_seconds))
                    .collect();
                active.id = generate_session_id();
                active.started_at = now.clone();
                active.current_step_started_at = now;
                active.step_runs.clear();
                active.sequence_completed = false;
            }
            _ => {}
        }
    }

    pub fn finish_session(&mut self) -> Option<SessionRecord> {
        let active = self.active.take()?;
        let totals = build_totals(&active);
        Some(SessionRecord {
            id: active.id,
            recipe_id: active.recipe_id,
            started_at: active.started_at,
            ended_at: Some(now_rfc3339()),
            step_runs: active.step_runs,
            totals,
        })
    }
}

impl ActiveSession {
    fn finish_step(&mut self, step_id: &str, elapsed_seconds: u32, result: StepRunResult) {
        let ended_at = now_rfc3339();
        self.step_runs.push(StepRun {
            step_id: step_id.to_string(),
            planned_duration_seconds: self.planned.get(step_id).copied().unwrap_or(0),
            elapsed_seconds,
            started_at: std::mem::replace(&mut self.current_step_started_at, ended_at.clone()),
            ended_at,
            result,
        });
    }
}

fn build_totals(active: &ActiveSession) -> SessionTotals {
    let mut totals = SessionTotals {
        sequence_completed: active.sequence_completed,
        ..SessionTotals::default()
    };
    for run in &active.step_runs {
        totals.total_seconds = totals.total_seconds.saturating_add(run.elapsed_seconds);
        match run.result {
            StepRunResult::Completed => {
                totals.completed_count = totals.completed_count.saturating_add(1);
            }
            StepRunResult::Skipped => {
                totals.skipped_count = totals.skipped_count.saturating_add(1);
            }
        }
    }
    totals
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn generate_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("session-{nanos}-{}", std::process::id())
}
