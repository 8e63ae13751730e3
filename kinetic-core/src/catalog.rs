//! Static exercise catalog and workout templates.
//!
//! The catalog is read-only reference data. Lookups never fail: an unknown
//! exercise id resolves to a placeholder entry so that logging and calorie
//! estimation keep working with stale or foreign ids.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Cardio,
    Strength,
    Flexibility,
    Balance,
    Sports,
}

impl ExerciseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseCategory::Cardio => "cardio",
            ExerciseCategory::Strength => "strength",
            ExerciseCategory::Flexibility => "flexibility",
            ExerciseCategory::Balance => "balance",
            ExerciseCategory::Sports => "sports",
        }
    }
}

impl fmt::Display for ExerciseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cardio" => Ok(ExerciseCategory::Cardio),
            "strength" => Ok(ExerciseCategory::Strength),
            "flexibility" => Ok(ExerciseCategory::Flexibility),
            "balance" => Ok(ExerciseCategory::Balance),
            "sports" => Ok(ExerciseCategory::Sports),
            other => Err(format!("unknown exercise category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: ExerciseCategory,
    pub muscle_groups: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
}

impl Exercise {
    pub fn new(id: &str, name: &str, category: ExerciseCategory, muscles: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            muscle_groups: muscles.iter().map(|m| m.to_string()).collect(),
            equipment: Vec::new(),
        }
    }

    pub fn with_equipment(mut self, equipment: &[&str]) -> Self {
        self.equipment = equipment.iter().map(|e| e.to_string()).collect();
        self
    }

    fn placeholder() -> Self {
        Self::new(
            "unknown",
            "Unknown exercise",
            ExerciseCategory::Strength,
            &[],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    pub duration: String,
    pub category: ExerciseCategory,
    pub description: String,
    /// Exercise ids, in the order they are performed.
    pub exercises: Vec<String>,
    pub difficulty: String,
}

impl WorkoutTemplate {
    /// Ad-hoc template for a workout that was not picked from the library.
    pub fn custom(name: &str, exercises: Vec<String>) -> Self {
        Self {
            id: "custom".to_string(),
            name: name.to_string(),
            duration: String::new(),
            category: ExerciseCategory::Strength,
            description: String::new(),
            exercises,
            difficulty: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExerciseCatalog {
    exercises: Vec<Exercise>,
    templates: Vec<WorkoutTemplate>,
    placeholder: Exercise,
}

impl Default for ExerciseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExerciseCatalog {
    pub fn new(exercises: Vec<Exercise>, templates: Vec<WorkoutTemplate>) -> Self {
        Self {
            exercises,
            templates,
            placeholder: Exercise::placeholder(),
        }
    }

    /// The exercise library shipped with the mobile app.
    pub fn builtin() -> Self {
        use ExerciseCategory::{Cardio, Strength};

        let exercises = vec![
            Exercise::new(
                "push_ups",
                "Push-ups",
                Strength,
                &["chest", "shoulders", "triceps", "core"],
            ),
            Exercise::new(
                "squats",
                "Squats",
                Strength,
                &["quadriceps", "glutes", "hamstrings", "calves"],
            ),
            Exercise::new("running", "Running", Cardio, &["legs", "core"]),
            Exercise::new(
                "deadlifts",
                "Deadlifts",
                Strength,
                &["hamstrings", "glutes", "back", "core"],
            )
            .with_equipment(&["barbell"]),
            Exercise::new(
                "bench_press",
                "Bench Press",
                Strength,
                &["chest", "shoulders", "triceps"],
            )
            .with_equipment(&["barbell", "bench"]),
            Exercise::new("plank", "Plank", Strength, &["core", "shoulders"]),
            Exercise::new("burpees", "Burpees", Cardio, &["full body"]),
            Exercise::new(
                "mountain_climbers",
                "Mountain Climbers",
                Cardio,
                &["core", "shoulders", "legs"],
            ),
            Exercise::new("jumping_jacks", "Jumping Jacks", Cardio, &["legs", "shoulders"]),
            Exercise::new(
                "lunges",
                "Lunges",
                Strength,
                &["quadriceps", "glutes", "hamstrings"],
            ),
        ];

        let template = |id: &str,
                        name: &str,
                        duration: &str,
                        category: ExerciseCategory,
                        description: &str,
                        exercises: &[&str],
                        difficulty: &str| WorkoutTemplate {
            id: id.to_string(),
            name: name.to_string(),
            duration: duration.to_string(),
            category,
            description: description.to_string(),
            exercises: exercises.iter().map(|e| e.to_string()).collect(),
            difficulty: difficulty.to_string(),
        };

        let templates = vec![
            template(
                "quick_hiit",
                "Quick HIIT",
                "15 min",
                Cardio,
                "High-intensity interval training for quick results",
                &["burpees", "mountain_climbers", "jumping_jacks", "push_ups"],
                "intermediate",
            ),
            template(
                "push_day",
                "Push Day",
                "45 min",
                Strength,
                "Focus on pushing movements for chest, shoulders, and triceps",
                &["push_ups", "bench_press", "squats"],
                "intermediate",
            ),
            template(
                "core_blast",
                "Core Blast",
                "20 min",
                Strength,
                "Intense core workout for stability and strength",
                &["plank", "mountain_climbers", "burpees"],
                "beginner",
            ),
            template(
                "full_body",
                "Full Body Workout",
                "40 min",
                Strength,
                "Complete workout targeting all major muscle groups",
                &["squats", "push_ups", "deadlifts", "plank", "lunges"],
                "advanced",
            ),
            template(
                "cardio_blast",
                "Cardio Blast",
                "25 min",
                Cardio,
                "High-energy cardio session to boost endurance",
                &["running", "burpees", "jumping_jacks", "mountain_climbers"],
                "intermediate",
            ),
        ];

        Self::new(exercises, templates)
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn templates(&self) -> &[WorkoutTemplate] {
        &self.templates
    }

    pub fn get(&self, exercise_id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }

    /// Like [`ExerciseCatalog::get`], but falls back to a placeholder strength
    /// exercise for ids the catalog does not know.
    pub fn resolve(&self, exercise_id: &str) -> &Exercise {
        self.get(exercise_id).unwrap_or_else(|| {
            warn!(
                "Exercise '{}' not found in catalog, using placeholder",
                exercise_id
            );
            &self.placeholder
        })
    }

    pub fn category_of(&self, exercise_id: &str) -> ExerciseCategory {
        self.resolve(exercise_id).category
    }

    pub fn name_of(&self, exercise_id: &str) -> &str {
        &self.resolve(exercise_id).name
    }

    pub fn template(&self, template_id: &str) -> Option<&WorkoutTemplate> {
        self.templates.iter().find(|t| t.id == template_id)
    }

    pub fn template_exercises(&self, template: &WorkoutTemplate) -> Vec<&Exercise> {
        template
            .exercises
            .iter()
            .map(|id| self.resolve(id))
            .collect()
    }
}
