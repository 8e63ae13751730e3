//! Field-level validation of user input before it reaches the store.

use crate::catalog::ExerciseCatalog;
use crate::db::models::ExerciseSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path of the offending field, e.g. `exercises[0].sets[1].weight`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid input: {}", join(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any error was reported for exactly `field`.
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub(crate) fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub trait Validate {
    fn validate(&self, catalog: &ExerciseCatalog) -> Result<(), ValidationErrors>;
}

pub(crate) fn check_non_negative(errors: &mut ValidationErrors, field: String, value: Option<f64>) {
    if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
        errors.push(field, "must be a non-negative number");
    }
}

fn check_known_exercise(errors: &mut ValidationErrors, field: String, id: &str, catalog: &ExerciseCatalog) {
    if catalog.get(id).is_none() {
        errors.push(field, format!("unknown exercise '{}'", id));
    }
}

impl Validate for ExerciseSet {
    fn validate(&self, catalog: &ExerciseCatalog) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.set_number < 1 {
            errors.push("setNumber", "must be at least 1");
        }
        check_known_exercise(&mut errors, "exerciseId".into(), &self.exercise_id, catalog);
        check_non_negative(&mut errors, "weight".into(), self.weight);
        check_non_negative(&mut errors, "distance".into(), self.distance);
        errors.into_result()
    }
}

/// The manual "log workout" form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    pub name: String,
    pub exercises: Vec<LoggedExercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedExercise {
    pub exercise_id: String,
    pub sets: Vec<LoggedSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for WorkoutLog {
    fn validate(&self, catalog: &ExerciseCatalog) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.name.trim().is_empty() {
            errors.push("name", "Workout name is required");
        }
        if self.exercises.is_empty() {
            errors.push("exercises", "add at least one exercise");
        }
        for (i, exercise) in self.exercises.iter().enumerate() {
            check_known_exercise(
                &mut errors,
                format!("exercises[{}].exerciseId", i),
                &exercise.exercise_id,
                catalog,
            );
            for (j, set) in exercise.sets.iter().enumerate() {
                let prefix = format!("exercises[{}].sets[{}]", i, j);
                check_non_negative(&mut errors, format!("{}.weight", prefix), set.weight);
                check_non_negative(&mut errors, format!("{}.distance", prefix), set.distance);
            }
        }
        errors.into_result()
    }
}
