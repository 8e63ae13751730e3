use crate::db::models::ExerciseSet;
use crate::session::{LiveSession, SessionState};
use serde::Serialize;

/// Formats seconds as `m:ss`; minutes are not wrapped into hours.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Point-in-time view of a live session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub workout_id: Option<String>,
    pub workout_name: Option<String>,
    pub state: &'static str,
    pub exercise_index: Option<usize>,
    pub exercise_count: usize,
    pub set_number: Option<u32>,
    pub exercise_id: Option<String>,
    pub exercise_name: Option<String>,
    pub rest_seconds_remaining: Option<u32>,
    pub elapsed_seconds: i64,
    pub elapsed: String,
    pub calories: u32,
    pub completed_sets: Vec<ExerciseSet>,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Active { .. } => "active",
            SessionState::Resting { .. } => "resting",
            SessionState::Finished => "finished",
        }
    }
}

impl LiveSession {
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        let exercise = self.current_exercise();
        let rest_seconds_remaining = match state {
            SessionState::Resting {
                seconds_remaining, ..
            } => Some(seconds_remaining),
            _ => None,
        };
        let elapsed_seconds = self.elapsed_seconds();
        SessionSnapshot {
            workout_id: self.workout().map(|w| w.id.clone()),
            workout_name: self.workout().map(|w| w.name.clone()),
            state: state.label(),
            exercise_index: state.position().map(|(exercise_index, _)| exercise_index),
            exercise_count: self.template().map_or(0, |t| t.exercises.len()),
            set_number: self.next_set_number(),
            exercise_id: self.current_exercise_id().map(str::to_string),
            exercise_name: exercise.map(|e| e.name.clone()),
            rest_seconds_remaining,
            elapsed_seconds,
            elapsed: format_elapsed(elapsed_seconds),
            calories: self.calories_so_far().max(0.0).round() as u32,
            completed_sets: self.completed_sets().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExerciseCatalog;
    use crate::session::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(59), "0:59");
        assert_eq!(format_elapsed(95), "1:35");
        assert_eq!(format_elapsed(3600), "60:00");
        assert_eq!(format_elapsed(-4), "0:00");
    }

    #[test]
    fn snapshot_tracks_progress() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 7, 0, 0).unwrap(),
        ));
        let catalog = Arc::new(ExerciseCatalog::builtin());
        let mut session = LiveSession::new("demo", catalog.clone(), clock.clone());

        let idle = session.snapshot();
        assert_eq!(idle.state, "idle");
        assert_eq!(idle.set_number, None);
        assert_eq!(idle.elapsed, "0:00");

        session
            .start(catalog.template("push_day").unwrap().clone())
            .unwrap();
        clock.advance(Duration::seconds(75));
        {
            let input = session.input_mut().unwrap();
            input.reps = Some(10);
            input.weight = Some(100.0);
        }
        session.complete_set().unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, "resting");
        assert_eq!(snapshot.exercise_name.as_deref(), Some("Push-ups"));
        assert_eq!(snapshot.exercise_count, 3);
        assert_eq!(snapshot.set_number, Some(2));
        assert_eq!(snapshot.rest_seconds_remaining, Some(60));
        assert_eq!(snapshot.elapsed, "1:15");
        assert_eq!(snapshot.calories, 60);

        session.next_exercise().unwrap();
        assert_eq!(session.snapshot().set_number, Some(1));
        assert_eq!(session.snapshot().exercise_name.as_deref(), Some("Bench Press"));
    }
}
