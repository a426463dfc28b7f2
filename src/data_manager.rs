use crate::models::{Recipe, SessionRecord, TimerSettings};
use crate::sequence::{Sequence, SequenceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid recipe `{recipe_id}`: {source}")]
    Sequence {
        recipe_id: String,
        #[source]
        source: SequenceError,
    },
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),
}

pub type DataResult<T> = Result<T, DataError>;

/// JSON files backing the timer: recipes (the sequence source), settings and
/// finished session history.
#[derive(Debug, Clone)]
pub struct DataManager {
    base_dir: PathBuf,
    recipes_path: PathBuf,
    sessions_path: PathBuf,
    settings_path: PathBuf,
}

impl DataManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> DataResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let recipes_path = base_dir.join("recipes.json");
        let sessions_path = base_dir.join("sessions.json");
        let settings_path = base_dir.join("settings.json");

        let manager = Self {
            base_dir,
            recipes_path,
            sessions_path,
            settings_path,
        };

        if !manager.recipes_path.exists() {
            manager.write_json(&manager.recipes_path, &Vec::<Recipe>::new())?;
        }
        if !manager.sessions_path.exists() {
            manager.write_json(&manager.sessions_path, &Vec::<SessionRecord>::new())?;
        }

        Ok(manager)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn recipes_path(&self) -> &Path {
        &self.recipes_path
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn load_recipes(&self) -> DataResult<Vec<Recipe>> {
        Ok(self.read_json(&self.recipes_path)?.unwrap_or_default())
    }

    pub fn find_recipe(&self, recipe_id: &str) -> DataResult<Recipe> {
        self.load_recipes()?
            .into_iter()
            .find(|recipe| recipe.id == recipe_id)
            .ok_or_else(|| DataError::RecipeNotFound(recipe_id.to_string()))
    }

    /// Loads a recipe and validates it into a runnable sequence.
    pub fn load_sequence(&self, recipe_id: &str) -> DataResult<(Recipe, Sequence)> {
        let recipe = self.find_recipe(recipe_id)?;
        let sequence = Sequence::from_recipe(&recipe).map_err(|source| DataError::Sequence {
            recipe_id: recipe.id.clone(),
            source,
        })?;
        Ok((recipe, sequence))
    }

    pub fn save_recipe(&self, recipe: Recipe) -> DataResult<()> {
        let mut recipes = self.load_recipes()?;
        if let Some(existing) = recipes.iter_mut().find(|item| item.id == recipe.id) {
            *existing = recipe;
        } else {
            recipes.push(recipe);
        }
        self.save_recipes(&recipes)
    }

    pub fn save_recipes(&self, recipes: &[Recipe]) -> DataResult<()> {
        self.write_json(&self.recipes_path, recipes)
    }

    pub fn load_settings(&self) -> DataResult<TimerSettings> {
        Ok(self.read_json(&self.settings_path)?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &TimerSettings) -> DataResult<()> {
        self.write_json(&self.settings_path, settings)
    }

    pub fn load_sessions(&self) -> DataResult<Vec<SessionRecord>> {
        Ok(self.read_json(&self.sessions_path)?.unwrap_or_default())
    }

    pub fn save_session(&self, session: SessionRecord) -> DataResult<()> {
        let mut sessions = self.load_sessions()?;
        if let Some(existing) = sessions.iter_mut().find(|item| item.id == session.id) {
            *existing = session;
        } else {
            sessions.push(session);
        }
        self.write_json(&self.sessions_path, &sessions)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> DataResult<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> DataResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        match fs::rename(&temp_path, path) {
            Ok(()) => Ok(()),
            Err(_err) if path.exists() => {
                let _ = fs::remove_file(path);
                fs::rename(&temp_path, path).map_err(DataError::from)
            }
            Err(err) => Err(DataError::from(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataError, DataManager};
    use crate::models::{
        Recipe, RecipeStep, SessionRecord, SessionTotals, SoundOverride, SoundSetting,
        TimerSettings,
    };
    use crate::sequence::SequenceError;
    use std::fs;

    fn recipe(id: &str, durations: &[i64]) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: format!("Recipe {id}"),
            steps: durations
                .iter()
                .enumerate()
                .map(|(index, duration_seconds)| RecipeStep {
                    id: format!("step-{index}"),
                    label: format!("Step {index}"),
                    duration_seconds: *duration_seconds,
                    instruction: None,
                    sound_override: SoundOverride::Inherit,
                })
                .collect(),
        }
    }

    fn sample_session(id: &str) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            recipe_id: Some("bread".to_string()),
            started_at: "2025-01-01T10:00:00+00:00".to_string(),
            ended_at: None,
            step_runs: Vec::new(),
            totals: SessionTotals::default(),
        }
    }

    #[test]
    fn new_seeds_empty_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = DataManager::new(dir.path().join("data")).expect("create manager");

        assert!(manager.recipes_path().exists());
        assert!(manager.load_recipes().expect("load recipes").is_empty());
        assert!(manager.load_sessions().expect("load sessions").is_empty());
        assert_eq!(manager.base_dir(), dir.path().join("data"));
    }

    #[test]
    fn save_recipe_upserts_by_id() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = DataManager::new(dir.path()).expect("create manager");

        manager.save_recipe(recipe("bread", &[60])).expect("save");
        manager.save_recipe(recipe("soup", &[30])).expect("save");
        manager
            .save_recipe(recipe("bread", &[60, 120]))
            .expect("save");

        let recipes = manager.load_recipes().expect("load");
        assert_eq!(recipes.len(), 2);
        assert_eq!(manager.find_recipe("bread").expect("find").steps.len(), 2);
    }

    #[test]
    fn load_sequence_validates_recipe() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = DataManager::new(dir.path()).expect("create manager");
        manager
            .save_recipes(&[recipe("good", &[5, 10]), recipe("bad", &[5, 0])])
            .expect("save");

        let (_, sequence) = manager.load_sequence("good").expect("valid");
        assert_eq!(sequence.total_duration(), 15);

        match manager.load_sequence("bad").expect_err("should fail") {
            DataError::Sequence { recipe_id, source } => {
                assert_eq!(recipe_id, "bad");
                assert!(matches!(source, SequenceError::NonPositiveDuration { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            manager.load_sequence("missing"),
            Err(DataError::RecipeNotFound(_))
        ));
    }

    #[test]
    fn settings_default_when_absent_or_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = DataManager::new(dir.path()).expect("create manager");
        assert_eq!(manager.load_settings().expect("load"), TimerSettings::default());

        fs::write(manager.settings_path(), "  \n").expect("write");
        assert_eq!(manager.load_settings().expect("load"), TimerSettings::default());

        let settings = TimerSettings {
            sound_default: SoundSetting::Off,
            tick_interval_ms: 250,
            ..TimerSettings::default()
        };
        manager.save_settings(&settings).expect("save");
        assert_eq!(manager.load_settings().expect("load"), settings);
    }

    #[test]
    fn corrupt_recipes_file_is_a_serde_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = DataManager::new(dir.path()).expect("create manager");
        fs::write(manager.recipes_path(), "{ not json").expect("write");

        assert!(matches!(manager.load_recipes(), Err(DataError::Serde(_))));
    }

    #[test]
    fn save_session_upserts_by_id() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = DataManager::new(dir.path()).expect("create manager");

        manager.save_session(sample_session("s1")).expect("save");
        let mut updated = sample_session("s1");
        updated.ended_at = Some("2025-01-01T10:05:00+00:00".to_string());
        manager.save_session(updated).expect("save");
        manager.save_session(sample_session("s2")).expect("save");

        let sessions = manager.load_sessions().expect("load");
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].ended_at.is_some());
    }
}
