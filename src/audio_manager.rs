use crate::models::{Recipe, SoundOverride, SoundScheme, SoundSetting, TimerSettings};
use crate::sequence::Step;
use crate::side_effects::{CompletionSink, SideEffectError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    StepTransition,
    SequenceCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundPlaybackReason {
    Played,
    Muted,
    SettingDisabled,
    PlaybackDisabled,
    PlaybackFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    System,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundPlaybackRecord {
    pub step_id: Option<String>,
    pub event: SoundEvent,
    pub played: bool,
    pub reason: SoundPlaybackReason,
    pub sound_path: Option<String>,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

/// Plays the audible cues for step and sequence completion.
///
/// Playback is fire-and-forget: the player process is spawned and reaped on a
/// background thread so the timer never waits for a sound to finish.
#[derive(Debug)]
pub struct AudioManager {
    global_mute: bool,
    playback_mode: PlaybackMode,
    player: Option<String>,
    sound_default: SoundSetting,
    sound_scheme: SoundScheme,
    step_overrides: HashMap<String, SoundOverride>,
    log: Vec<SoundPlaybackRecord>,
    failure_notified: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        Self::with_playback_mode(PlaybackMode::System)
    }

    pub fn with_playback_mode(playback_mode: PlaybackMode) -> Self {
        Self {
            global_mute: false,
            playback_mode,
            player: default_player().map(str::to_string),
            sound_default: SoundSetting::On,
            sound_scheme: SoundScheme::Default,
            step_overrides: HashMap::new(),
            log: Vec::new(),
            failure_notified: false,
        }
    }

    /// Configures the manager for one recipe: sequence-wide defaults from the
    /// settings and each step's override from the recipe.
    pub fn for_recipe(recipe: &Recipe, settings: &TimerSettings, playback_mode: PlaybackMode) -> Self {
        let mut manager = Self::with_playback_mode(playback_mode);
        manager.sound_default = settings.sound_default;
        manager.sound_scheme = settings.sound_scheme;
        manager.step_overrides = recipe
            .steps
            .iter()
            .map(|step| (step.id.clone(), step.sound_override))
            .collect();
        manager
    }

    pub fn with_player(mut self, program: impl Into<String>) -> Self {
        self.player = Some(program.into());
        self
    }

    pub fn is_muted(&self) -> bool {
        self.global_mute
    }

    pub fn set_global_mute(&mut self, muted: bool) {
        self.global_mute = muted;
    }

    pub fn toggle_global_mute(&mut self) -> bool {
        self.global_mute = !self.global_mute;
        self.global_mute
    }

    pub fn effective_setting(&self, step_override: SoundOverride) -> SoundSetting {
        match step_override {
            SoundOverride::On => SoundSetting::On,
            SoundOverride::Off => SoundSetting::Off,
            SoundOverride::Inherit => self.sound_default,
        }
    }

    pub fn should_play(&self, step_override: SoundOverride) -> bool {
        if self.global_mute {
            return false;
        }
        matches!(self.effective_setting(step_override), SoundSetting::On)
    }

    pub fn play_for_event(&mut self, step_id: Option<&str>, event: SoundEvent) -> SoundPlaybackRecord {
        let step_override = step_id
            .and_then(|id| self.step_overrides.get(id).copied())
            .unwrap_or_default();
        let mut played = false;
        let mut sound_path = None;
        let mut error = None;

        let reason = if self.global_mute {
            SoundPlaybackReason::Muted
        } else if matches!(self.effective_setting(step_override), SoundSetting::Off) {
            SoundPlaybackReason::SettingDisabled
        } else if matches!(self.playback_mode, PlaybackMode::Disabled) {
            SoundPlaybackReason::PlaybackDisabled
        } else {
            let path = self.sound_path(event);
            let result = self.play_system_sound(&path);
            sound_path = Some(path.to_string_lossy().to_string());
            match result {
                Ok(()) => {
                    played = true;
                    SoundPlaybackReason::Played
                }
                Err(err) => {
                    error = Some(err);
                    SoundPlaybackReason::PlaybackFailed
                }
            }
        };

        let record = SoundPlaybackRecord {
            step_id: step_id.map(str::to_string),
            event,
            played,
            reason,
            sound_path,
            error,
            timestamp: SystemTime::now(),
        };
        self.log.push(record.clone());
        record
    }

    pub fn logs(&self) -> &[SoundPlaybackRecord] {
        &self.log
    }

    pub fn take_logs(&mut self) -> Vec<SoundPlaybackRecord> {
        std::mem::take(&mut self.log)
    }

    /// True only for the first failure after a successful playback, so a
    /// missing audio device is reported once rather than on every step.
    pub fn should_notify_failure(&mut self, record: &SoundPlaybackRecord) -> bool {
        match record.reason {
            SoundPlaybackReason::Played => {
                self.failure_notified = false;
                false
            }
            SoundPlaybackReason::PlaybackFailed => {
                if self.failure_notified {
                    false
                } else {
                    self.failure_notified = true;
                    true
                }
            }
            _ => false,
        }
    }

    fn finish(&mut self, record: SoundPlaybackRecord) -> Result<(), SideEffectError> {
        if !self.should_notify_failure(&record) {
            return Ok(());
        }
        let detail = record.error.unwrap_or_else(|| "unknown error".to_string());
        Err(SideEffectError::new(format!(
            "could not play completion sound: {detail}"
        )))
    }

    fn sound_path(&self, event: SoundEvent) -> PathBuf {
        let (default, end) = default_sounds();
        match self.sound_scheme {
            SoundScheme::Default => default,
            SoundScheme::EndDifferent => match event {
                SoundEvent::SequenceCompleted => end,
                SoundEvent::StepTransition => default,
            },
        }
    }

    fn play_system_sound(&self, path: &Path) -> Result<(), String> {
        let Some(program) = self.player.as_deref() else {
            return Err("no sound player available on this platform".to_string());
        };
        let mut child = Command::new(program)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| format!("{program}: {err}"))?;
        thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

impl CompletionSink for AudioManager {
    fn on_step_complete(&mut self, step: &Step) -> Result<(), SideEffectError> {
        let record = self.play_for_event(Some(&step.id), SoundEvent::StepTransition);
        self.finish(record)
    }

    fn on_sequence_complete(&mut self) -> Result<(), SideEffectError> {
        let record = self.play_for_event(None, SoundEvent::SequenceCompleted);
        self.finish(record)
    }
}

fn default_player() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("afplay")
    } else if cfg!(target_os = "linux") {
        Some("paplay")
    } else {
        None
    }
}

fn default_sounds() -> (PathBuf, PathBuf) {
    if cfg!(target_os = "macos") {
        (
            PathBuf::from("/System/Library/Sounds/Ping.aiff"),
            PathBuf::from("/System/Library/Sounds/Glass.aiff"),
        )
    } else {
        (
            PathBuf::from("/usr/share/sounds/freedesktop/stereo/bell.oga"),
            PathBuf::from("/usr/share/sounds/freedesktop/stereo/complete.oga"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioManager, PlaybackMode, SoundEvent, SoundPlaybackReason, SoundPlaybackRecord};
    use crate::models::{
        Recipe, RecipeStep, SoundOverride, SoundScheme, SoundSetting, TimerSettings,
    };
    use crate::sequence::Step;
    use crate::side_effects::CompletionSink;
    use std::time::SystemTime;

    fn recipe_step(id: &str, sound_override: SoundOverride) -> RecipeStep {
        RecipeStep {
            id: id.to_string(),
            label: id.to_string(),
            duration_seconds: 60,
            instruction: None,
            sound_override,
        }
    }

    fn sample_recipe() -> Recipe {
        Recipe {
            id: "recipe-1".to_string(),
            name: "Sample".to_string(),
            steps: vec![
                recipe_step("prep", SoundOverride::Inherit),
                recipe_step("rest", SoundOverride::Off),
                recipe_step("bake", SoundOverride::On),
            ],
        }
    }

    fn settings(sound_default: SoundSetting) -> TimerSettings {
        TimerSettings {
            sound_default,
            sound_scheme: SoundScheme::EndDifferent,
            ..TimerSettings::default()
        }
    }

    fn record(reason: SoundPlaybackReason) -> SoundPlaybackRecord {
        SoundPlaybackRecord {
            step_id: Some("prep".to_string()),
            event: SoundEvent::StepTransition,
            played: matches!(reason, SoundPlaybackReason::Played),
            reason,
            sound_path: None,
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn global_mute_blocks_playback() {
        let mut manager = AudioManager::with_playback_mode(PlaybackMode::Disabled);
        manager.set_global_mute(true);

        let record = manager.play_for_event(Some("prep"), SoundEvent::StepTransition);

        assert!(!record.played);
        assert_eq!(record.reason, SoundPlaybackReason::Muted);
    }

    #[test]
    fn toggle_mute_flips_state() {
        let mut manager = AudioManager::with_playback_mode(PlaybackMode::Disabled);
        assert!(manager.toggle_global_mute());
        assert!(manager.is_muted());
        assert!(!manager.toggle_global_mute());
    }

    #[test]
    fn step_overrides_win_over_default() {
        let manager = AudioManager::for_recipe(
            &sample_recipe(),
            &settings(SoundSetting::Off),
            PlaybackMode::Disabled,
        );
        assert!(manager.should_play(SoundOverride::On));
        assert!(!manager.should_play(SoundOverride::Inherit));
        assert!(!manager.should_play(SoundOverride::Off));
    }

    #[test]
    fn recipe_override_off_is_logged_as_setting_disabled() {
        let mut manager = AudioManager::for_recipe(
            &sample_recipe(),
            &settings(SoundSetting::On),
            PlaybackMode::Disabled,
        );

        let rest = manager.play_for_event(Some("rest"), SoundEvent::StepTransition);
        let prep = manager.play_for_event(Some("prep"), SoundEvent::StepTransition);

        assert_eq!(rest.reason, SoundPlaybackReason::SettingDisabled);
        assert_eq!(prep.reason, SoundPlaybackReason::PlaybackDisabled);
        assert_eq!(manager.logs().len(), 2);
        assert_eq!(manager.take_logs().len(), 2);
        assert!(manager.logs().is_empty());
    }

    #[test]
    fn notify_failure_only_once_until_played() {
        let mut manager = AudioManager::with_playback_mode(PlaybackMode::Disabled);
        let failed = record(SoundPlaybackReason::PlaybackFailed);
        let played = record(SoundPlaybackReason::Played);

        assert!(manager.should_notify_failure(&failed));
        assert!(!manager.should_notify_failure(&failed));
        assert!(!manager.should_notify_failure(&played));
        assert!(manager.should_notify_failure(&failed));
    }

    #[test]
    fn disabled_playback_never_fails_the_hook() {
        let mut manager = AudioManager::with_playback_mode(PlaybackMode::Disabled);
        let step = Step::new("prep", "Prep", 60);

        assert!(manager.on_step_complete(&step).is_ok());
        assert!(manager.on_sequence_complete().is_ok());
        assert_eq!(manager.logs()[1].event, SoundEvent::SequenceCompleted);
    }

    #[test]
    fn missing_player_fails_hook_once() {
        let mut manager = AudioManager::with_playback_mode(PlaybackMode::System)
            .with_player("steptimer-test-missing-player");
        let step = Step::new("prep", "Prep", 60);

        let err = manager.on_step_complete(&step).expect_err("should fail");
        assert!(err.to_string().contains("could not play completion sound"));
        assert!(manager.on_step_complete(&step).is_ok());

        let last = manager.logs().last().expect("log entry");
        assert_eq!(last.reason, SoundPlaybackReason::PlaybackFailed);
        assert!(last.sound_path.is_some());
    }
}
