use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutStatus {
    Planned,
    InProgress,
    Completed,
    Skipped,
}

impl WorkoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutStatus::Planned => "planned",
            WorkoutStatus::InProgress => "in_progress",
            WorkoutStatus::Completed => "completed",
            WorkoutStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for WorkoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Set models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSet {
    pub id: String,
    pub exercise_id: String,
    pub set_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl fmt::Display for ExerciseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exercise {} #{}", self.exercise_id, self.set_number)?;
        write_set_details(f, self)
    }
}

// Helper struct for displaying sets with exercise names
pub struct DisplayableSet<'a> {
    pub set: &'a ExerciseSet,
    pub exercise_name: &'a str,
}

impl<'a> DisplayableSet<'a> {
    pub fn new(set: &'a ExerciseSet, exercise_name: &'a str) -> Self {
        Self { set, exercise_name }
    }
}

impl fmt::Display for DisplayableSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.exercise_name, self.set.set_number)?;
        write_set_details(f, self.set)
    }
}

fn write_set_details(f: &mut fmt::Formatter<'_>, set: &ExerciseSet) -> fmt::Result {
    if let Some(reps) = set.reps.filter(|r| *r > 0) {
        let weight = set.weight.unwrap_or(0.0);
        if weight > 0.0 {
            write!(f, ": {:.1}lbs x {} reps", weight, reps)?;
        } else {
            write!(f, ": {} reps", reps)?;
        }
    }
    if let Some(duration) = set.duration.filter(|d| *d > 0) {
        write!(f, " ({}s)", duration)?;
    }
    if let Some(distance) = set.distance.filter(|d| *d > 0.0) {
        write!(f, " {:.0}m", distance)?;
    }
    Ok(())
}

// Workout models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: WorkoutStatus,
    #[serde(default)]
    pub exercises: Vec<ExerciseSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Workout {
    /// A freshly started workout, dated on the (UTC) day it began.
    pub fn in_progress(id: String, user_id: &str, name: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            date: started_at.date_naive(),
            start_time: Some(started_at),
            end_time: None,
            status: WorkoutStatus::InProgress,
            exercises: Vec::new(),
            total_calories: None,
            notes: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == WorkoutStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutStats {
    pub total_workouts: u32,
    pub total_calories: u32,
    pub total_minutes: u32,
    pub current_streak: u32,
    pub weekly_workouts: u32,
    pub weekly_calories: u32,
    pub weekly_minutes: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStats {
    pub workouts_completed: u32,
    pub calories_burned: u32,
    pub minutes_active: u32,
    pub current_streak: u32,
}
