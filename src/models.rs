use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub steps: Vec<RecipeStep>,
}

/// A step as written in the recipe file. Durations are signed so that a bad
/// value is rejected by sequence validation instead of by the JSON parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    pub id: String,
    pub label: String,
    pub duration_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default)]
    pub sound_override: SoundOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSettings {
    pub sound_default: SoundSetting,
    pub sound_scheme: SoundScheme,
    pub tick_interval_ms: u64,
    pub auto_start: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            sound_default: SoundSetting::On,
            sound_scheme: SoundScheme::Default,
            tick_interval_ms: 1000,
            auto_start: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundSetting {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoundOverride {
    #[default]
    Inherit,
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundScheme {
    Default,
    EndDifferent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Ready,
    Running,
    Paused,
    SequenceComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub active_step_index: usize,
    pub active_step_id: String,
    pub time_remaining_seconds: u32,
    pub is_running: bool,
    pub completed_step_ids: Vec<String>,
    pub is_sequence_complete: bool,
    pub status: TimerStatus,
    pub overall_progress: f32,
    pub step_progress: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub recipe_id: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub step_runs: Vec<StepRun>,
    pub totals: SessionTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRun {
    pub step_id: String,
    pub planned_duration_seconds: u32,
    pub elapsed_seconds: u32,
    pub started_at: String,
    pub ended_at: String,
    pub result: StepRunResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTotals {
    pub total_seconds: u32,
    pub completed_count: u32,
    pub skipped_count: u32,
    pub sequence_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepRunResult {
    Completed,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::{Recipe, SoundOverride, TimerSettings};

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: TimerSettings =
            serde_json::from_str(r#"{"autoStart": true}"#).expect("parse settings");

        assert!(settings.auto_start);
        assert_eq!(settings.tick_interval_ms, 1000);
        assert_eq!(settings.sound_default, TimerSettings::default().sound_default);
    }

    #[test]
    fn recipe_step_defaults_optional_fields() {
        let recipe: Recipe = serde_json::from_str(
            r#"{
                "id": "bread",
                "name": "Bread",
                "steps": [{"id": "prep", "label": "Prep", "durationSeconds": 300}]
            }"#,
        )
        .expect("parse recipe");

        let step = &recipe.steps[0];
        assert_eq!(step.duration_seconds, 300);
        assert!(step.instruction.is_none());
        assert_eq!(step.sound_override, SoundOverride::Inherit);
    }
}
