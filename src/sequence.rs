//! Immutable step list that a timer session runs through.

use crate::models::Recipe;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("sequence must have at least one step")]
    Empty,
    #[error("step id must not be empty (position {position})")]
    EmptyId { position: usize },
    #[error("step `{id}` must have a positive duration, got {duration_seconds}")]
    NonPositiveDuration { id: String, duration_seconds: i64 },
    #[error("step `{id}` duration {duration_seconds}s is too long")]
    DurationTooLong { id: String, duration_seconds: i64 },
    #[error("duplicate step id `{id}`")]
    DuplicateId { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("step index {index} is out of range for a sequence of {len} steps")]
pub struct OutOfRangeError {
    pub index: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    pub duration_seconds: u32,
}

impl Step {
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_seconds,
        }
    }
}

/// A validated, non-empty list of steps. Only obtainable through
/// [`Sequence::new`] or [`Sequence::from_recipe`], so holding one means the
/// data is well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    pub fn new(steps: Vec<Step>) -> Result<Self, SequenceError> {
        if steps.is_empty() {
            return Err(SequenceError::Empty);
        }
        let mut seen = HashSet::with_capacity(steps.len());
        for (position, step) in steps.iter().enumerate() {
            if step.id.is_empty() {
                return Err(SequenceError::EmptyId { position });
            }
            if step.duration_seconds == 0 {
                return Err(SequenceError::NonPositiveDuration {
                    id: step.id.clone(),
                    duration_seconds: 0,
                });
            }
            if !seen.insert(step.id.as_str()) {
                return Err(SequenceError::DuplicateId {
                    id: step.id.clone(),
                });
            }
        }
        Ok(Self { steps })
    }

    pub fn from_recipe(recipe: &Recipe) -> Result<Self, SequenceError> {
        let steps = recipe
            .steps
            .iter()
            .map(|step| {
                if step.duration_seconds <= 0 {
                    return Err(SequenceError::NonPositiveDuration {
                        id: step.id.clone(),
                        duration_seconds: step.duration_seconds,
                    });
                }
                let duration_seconds = u32::try_from(step.duration_seconds).map_err(|_| {
                    SequenceError::DurationTooLong {
                        id: step.id.clone(),
                        duration_seconds: step.duration_seconds,
                    }
                })?;
                Ok(Step::new(step.id.clone(), step.label.clone(), duration_seconds))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn step_at(&self, index: usize) -> Result<&Step, OutOfRangeError> {
        self.steps.get(index).ok_or(OutOfRangeError {
            index,
            len: self.steps.len(),
        })
    }

    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == step_id)
    }

    /// Sum of every step's duration. Skipped steps still count, since skipping
    /// never removes a step from the sequence.
    pub fn total_duration(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| u64::from(step.duration_seconds))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{OutOfRangeError, Sequence, SequenceError, Step};
    use crate::models::{Recipe, RecipeStep, SoundOverride};

    fn recipe_step(id: &str, duration_seconds: i64) -> RecipeStep {
        RecipeStep {
            id: id.to_string(),
            label: id.to_string(),
            duration_seconds,
            instruction: None,
            sound_override: SoundOverride::Inherit,
        }
    }

    fn recipe(steps: Vec<RecipeStep>) -> Recipe {
        Recipe {
            id: "recipe-1".to_string(),
            name: "Sample".to_string(),
            steps,
        }
    }

    #[test]
    fn rejects_empty_sequence() {
        assert_eq!(Sequence::new(Vec::new()), Err(SequenceError::Empty));
    }

    #[test]
    fn rejects_zero_duration() {
        let err = Sequence::new(vec![Step::new("a", "A", 0)]).expect_err("should fail");
        assert!(matches!(err, SequenceError::NonPositiveDuration { .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Sequence::new(vec![Step::new("a", "A", 5), Step::new("a", "Again", 5)])
            .expect_err("should fail");
        assert_eq!(
            err,
            SequenceError::DuplicateId {
                id: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_empty_id() {
        let err = Sequence::new(vec![Step::new("a", "A", 5), Step::new("", "B", 5)])
            .expect_err("should fail");
        assert_eq!(err, SequenceError::EmptyId { position: 1 });
    }

    #[test]
    fn derived_queries() {
        let sequence = Sequence::new(vec![
            Step::new("prep", "Prep", 5),
            Step::new("bake", "Bake", 10),
        ])
        .expect("valid sequence");

        assert_eq!(sequence.step_count(), 2);
        assert_eq!(sequence.last_index(), 1);
        assert_eq!(sequence.total_duration(), 15);
        assert_eq!(sequence.step_at(1).expect("step").id, "bake");
        assert_eq!(sequence.index_of("bake"), Some(1));
        assert_eq!(
            sequence.step_at(2),
            Err(OutOfRangeError { index: 2, len: 2 })
        );
    }

    #[test]
    fn builds_from_recipe() {
        let sequence = Sequence::from_recipe(&recipe(vec![
            recipe_step("prep", 300),
            recipe_step("bake", 1800),
        ]))
        .expect("valid recipe");

        assert_eq!(sequence.step_count(), 2);
        assert_eq!(sequence.steps()[1].duration_seconds, 1800);
    }

    #[test]
    fn recipe_with_negative_duration_is_invalid() {
        let err = Sequence::from_recipe(&recipe(vec![recipe_step("prep", -5)]))
            .expect_err("should fail");
        assert_eq!(
            err,
            SequenceError::NonPositiveDuration {
                id: "prep".to_string(),
                duration_seconds: -5
            }
        );
    }

    #[test]
    fn recipe_with_oversized_duration_is_invalid() {
        let err = Sequence::from_recipe(&recipe(vec![recipe_step("prep", i64::from(u32::MAX) + 1)]))
            .expect_err("should fail");
        assert!(matches!(err, SequenceError::DurationTooLong { .. }));
    }

    #[test]
    fn empty_recipe_is_invalid() {
        assert_eq!(
            Sequence::from_recipe(&recipe(Vec::new())),
            Err(SequenceError::Empty)
        );
    }
}
