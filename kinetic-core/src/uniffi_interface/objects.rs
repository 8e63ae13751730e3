use crate::catalog::{Exercise, WorkoutTemplate};
use crate::db::models::{ExerciseSet, TodayStats, Workout, WorkoutStats};
use crate::session::{SessionEvent, SessionSnapshot};

#[derive(Debug, Clone, uniffi::Record)]
pub struct ExerciseRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub muscle_groups: Vec<String>,
    pub equipment: Vec<String>,
}

impl From<&Exercise> for ExerciseRecord {
    fn from(e: &Exercise) -> Self {
        ExerciseRecord {
            id: e.id.clone(),
            name: e.name.clone(),
            category: e.category.to_string(),
            muscle_groups: e.muscle_groups.clone(),
            equipment: e.equipment.clone(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    pub duration: String,
    pub category: String,
    pub description: String,
    pub exercises: Vec<String>,
    pub difficulty: String,
}

impl From<&WorkoutTemplate> for TemplateRecord {
    fn from(t: &WorkoutTemplate) -> Self {
        TemplateRecord {
            id: t.id.clone(),
            name: t.name.clone(),
            duration: t.duration.clone(),
            category: t.category.to_string(),
            description: t.description.clone(),
            exercises: t.exercises.clone(),
            difficulty: t.difficulty.clone(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct ExerciseSetRecord {
    pub id: String,
    pub exercise_id: String,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration: Option<u32>,
    pub distance: Option<f64>,
    pub notes: Option<String>,
}

impl From<ExerciseSet> for ExerciseSetRecord {
    fn from(s: ExerciseSet) -> Self {
        ExerciseSetRecord {
            id: s.id,
            exercise_id: s.exercise_id,
            set_number: s.set_number,
            reps: s.reps,
            weight: s.weight,
            duration: s.duration,
            distance: s.distance,
            notes: s.notes,
        }
    }
}

/// Timestamps are RFC 3339 strings, the date is `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct WorkoutRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: String,
    pub exercises: Vec<ExerciseSetRecord>,
    pub total_calories: Option<u32>,
    pub notes: Option<String>,
}

impl From<Workout> for WorkoutRecord {
    fn from(w: Workout) -> Self {
        WorkoutRecord {
            id: w.id,
            user_id: w.user_id,
            name: w.name,
            date: w.date.format("%Y-%m-%d").to_string(),
            start_time: w.start_time.map(|t| t.to_rfc3339()),
            end_time: w.end_time.map(|t| t.to_rfc3339()),
            status: w.status.to_string(),
            exercises: w.exercises.into_iter().map(Into::into).collect(),
            total_calories: w.total_calories,
            notes: w.notes,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct WorkoutStatsRecord {
    pub total_workouts: u32,
    pub total_calories: u32,
    pub total_minutes: u32,
    pub current_streak: u32,
    pub weekly_workouts: u32,
    pub weekly_calories: u32,
    pub weekly_minutes: u32,
}

impl From<WorkoutStats> for WorkoutStatsRecord {
    fn from(s: WorkoutStats) -> Self {
        WorkoutStatsRecord {
            total_workouts: s.total_workouts,
            total_calories: s.total_calories,
            total_minutes: s.total_minutes,
            current_streak: s.current_streak,
            weekly_workouts: s.weekly_workouts,
            weekly_calories: s.weekly_calories,
            weekly_minutes: s.weekly_minutes,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct TodayStatsRecord {
    pub workouts_completed: u32,
    pub calories_burned: u32,
    pub minutes_active: u32,
    pub current_streak: u32,
}

impl From<TodayStats> for TodayStatsRecord {
    fn from(s: TodayStats) -> Self {
        TodayStatsRecord {
            workouts_completed: s.workouts_completed,
            calories_burned: s.calories_burned,
            minutes_active: s.minutes_active,
            current_streak: s.current_streak,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct SessionSnapshotRecord {
    pub workout_id: Option<String>,
    pub workout_name: Option<String>,
    pub state: String,
    pub exercise_index: Option<u32>,
    pub exercise_count: u32,
    pub set_number: Option<u32>,
    pub exercise_id: Option<String>,
    pub exercise_name: Option<String>,
    pub rest_seconds_remaining: Option<u32>,
    pub elapsed_seconds: i64,
    pub elapsed: String,
    pub calories: u32,
    pub completed_sets: Vec<ExerciseSetRecord>,
}

impl From<SessionSnapshot> for SessionSnapshotRecord {
    fn from(s: SessionSnapshot) -> Self {
        SessionSnapshotRecord {
            workout_id: s.workout_id,
            workout_name: s.workout_name,
            state: s.state.to_string(),
            exercise_index: s.exercise_index.map(|i| i as u32),
            exercise_count: s.exercise_count as u32,
            set_number: s.set_number,
            exercise_id: s.exercise_id,
            exercise_name: s.exercise_name,
            rest_seconds_remaining: s.rest_seconds_remaining,
            elapsed_seconds: s.elapsed_seconds,
            elapsed: s.elapsed,
            calories: s.calories,
            completed_sets: s.completed_sets.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Enum)]
pub enum SessionEventRecord {
    Elapsed { seconds: i64 },
    RestStarted { seconds: u32 },
    RestTick { seconds_remaining: u32 },
    RestFinished,
    RestSkipped,
    SetCompleted { set_number: u32, exercise_id: String },
    Finished { total_calories: u32 },
}

impl From<SessionEvent> for SessionEventRecord {
    fn from(e: SessionEvent) -> Self {
        match e {
            SessionEvent::Elapsed { seconds } => SessionEventRecord::Elapsed { seconds },
            SessionEvent::RestStarted { seconds } => SessionEventRecord::RestStarted { seconds },
            SessionEvent::RestTick { seconds_remaining } => {
                SessionEventRecord::RestTick { seconds_remaining }
            }
            SessionEvent::RestFinished => SessionEventRecord::RestFinished,
            SessionEvent::RestSkipped => SessionEventRecord::RestSkipped,
            SessionEvent::SetCompleted {
                set_number,
                exercise_id,
            } => SessionEventRecord::SetCompleted {
                set_number,
                exercise_id,
            },
            SessionEvent::Finished { total_calories } => {
                SessionEventRecord::Finished { total_calories }
            }
        }
    }
}
