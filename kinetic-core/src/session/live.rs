use crate::catalog::{Exercise, ExerciseCatalog, ExerciseCategory, WorkoutTemplate};
use crate::db::models::{ExerciseSet, Workout, WorkoutStatus};
use crate::db::{LocalStore, StoreError, operations};
use crate::session::{Clock, SetInput};
use crate::stats::{self, StatsPolicy};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_WORKOUT_NAME: &str = "Live Workout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active {
        exercise_index: usize,
        set_index: usize,
    },
    Resting {
        exercise_index: usize,
        set_index: usize,
        seconds_remaining: u32,
    },
    Finished,
}

impl SessionState {
    pub fn is_resting(&self) -> bool {
        matches!(self, SessionState::Resting { .. })
    }

    /// `(exercise_index, set_index)` while a workout is running.
    pub fn position(&self) -> Option<(usize, usize)> {
        match *self {
            SessionState::Active {
                exercise_index,
                set_index,
            }
            | SessionState::Resting {
                exercise_index,
                set_index,
                ..
            } => Some((exercise_index, set_index)),
            SessionState::Idle | SessionState::Finished => None,
        }
    }
}

/// Rest enforced after each completed set, per exercise category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestPolicy {
    pub cardio_seconds: u32,
    pub default_seconds: u32,
}

impl Default for RestPolicy {
    fn default() -> Self {
        Self {
            cardio_seconds: 30,
            default_seconds: 60,
        }
    }
}

impl RestPolicy {
    pub fn rest_for(&self, category: ExerciseCategory) -> u32 {
        match category {
            ExerciseCategory::Cardio => self.cardio_seconds,
            ExerciseCategory::Strength
            | ExerciseCategory::Flexibility
            | ExerciseCategory::Balance
            | ExerciseCategory::Sports => self.default_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestTick {
    /// Still resting; seconds left.
    Counting(u32),
    /// The rest just ended and the session is active again.
    Finished,
    /// Nothing to count down.
    Idle,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no workout has been started")]
    NotStarted,
    #[error("a workout is already in progress")]
    AlreadyStarted,
    #[error("the workout is already finished")]
    Finished,
    #[error("resting; skip the rest or wait for it to end")]
    Resting,
    #[error("no exercise left in this workout")]
    NoCurrentExercise,
    #[error("enter reps or a duration before completing the set")]
    IncompleteSet,
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("failed to save workout: {0}")]
    Persistence(#[from] StoreError),
}

/// State machine for one live workout.
///
/// Time never advances on its own here: elapsed time is derived from the
/// clock on demand and rest is counted down by [`LiveSession::tick_rest`],
/// which the caller invokes once per second.
pub struct LiveSession {
    user_id: String,
    catalog: Arc<ExerciseCatalog>,
    clock: Arc<dyn Clock>,
    rest_policy: RestPolicy,
    template: Option<WorkoutTemplate>,
    workout: Option<Workout>,
    state: SessionState,
    completed_sets: Vec<ExerciseSet>,
    input: SetInput,
    // Highest set number recorded for the current exercise.
    last_set_number: u32,
}

impl LiveSession {
    pub fn new(user_id: &str, catalog: Arc<ExerciseCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            user_id: user_id.to_string(),
            catalog,
            clock,
            rest_policy: RestPolicy::default(),
            template: None,
            workout: None,
            state: SessionState::Idle,
            completed_sets: Vec::new(),
            input: SetInput::default(),
            last_set_number: 0,
        }
    }

    pub fn with_rest_policy(mut self, rest_policy: RestPolicy) -> Self {
        self.rest_policy = rest_policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rest_policy(&self) -> RestPolicy {
        self.rest_policy
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn workout(&self) -> Option<&Workout> {
        self.workout.as_ref()
    }

    pub fn template(&self) -> Option<&WorkoutTemplate> {
        self.template.as_ref()
    }

    pub fn catalog(&self) -> &ExerciseCatalog {
        &self.catalog
    }

    pub fn completed_sets(&self) -> &[ExerciseSet] {
        &self.completed_sets
    }

    pub fn input(&self) -> &SetInput {
        &self.input
    }

    /// The set-input buffer; editable only while active.
    pub fn input_mut(&mut self) -> Result<&mut SetInput, SessionError> {
        match self.state {
            SessionState::Active { .. } => Ok(&mut self.input),
            SessionState::Resting { .. } => Err(SessionError::Resting),
            SessionState::Idle => Err(SessionError::NotStarted),
            SessionState::Finished => Err(SessionError::Finished),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn position(&self) -> Result<(usize, usize), SessionError> {
        match self.state {
            SessionState::Idle => Err(SessionError::NotStarted),
            SessionState::Finished => Err(SessionError::Finished),
            state => state.position().ok_or(SessionError::NotStarted),
        }
    }

    pub fn start(&mut self, template: WorkoutTemplate) -> Result<&Workout, SessionError> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Finished => return Err(SessionError::Finished),
            _ => return Err(SessionError::AlreadyStarted),
        }

        let started_at = self.clock.now();
        let name = if template.name.trim().is_empty() {
            DEFAULT_WORKOUT_NAME
        } else {
            template.name.as_str()
        };
        let workout = Workout::in_progress(
            Uuid::new_v4().to_string(),
            &self.user_id,
            name,
            started_at,
        );
        info!(
            "Started workout {} ({}) for {} with {} exercises",
            workout.id,
            workout.name,
            self.user_id,
            template.exercises.len()
        );

        self.template = Some(template);
        self.state = SessionState::Active {
            exercise_index: 0,
            set_index: 0,
        };
        self.last_set_number = 0;
        Ok(self.workout.insert(workout))
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.current_exercise_id().map(|id| self.catalog.resolve(id))
    }

    /// Id from the template, kept even when the catalog does not know it.
    pub fn current_exercise_id(&self) -> Option<&str> {
        let (exercise_index, _) = self.state.position()?;
        self.template
            .as_ref()?
            .exercises
            .get(exercise_index)
            .map(String::as_str)
    }

    pub fn has_next_exercise(&self) -> bool {
        match (self.state.position(), self.template.as_ref()) {
            (Some((exercise_index, _)), Some(template)) => {
                exercise_index + 1 < template.exercises.len()
            }
            _ => false,
        }
    }

    /// Number the next completed set of the current exercise will get.
    pub fn next_set_number(&self) -> Option<u32> {
        self.current_exercise_id()?;
        let (_, set_index) = self.state.position()?;
        Some((set_index as u32 + 1).max(self.last_set_number + 1))
    }

    /// Records the buffered set and starts the rest period.
    pub fn complete_set(&mut self) -> Result<ExerciseSet, SessionError> {
        let (exercise_index, set_index) = match self.state {
            SessionState::Active {
                exercise_index,
                set_index,
            } => (exercise_index, set_index),
            SessionState::Resting { .. } => return Err(SessionError::Resting),
            SessionState::Idle => return Err(SessionError::NotStarted),
            SessionState::Finished => return Err(SessionError::Finished),
        };
        let exercise_id = self
            .current_exercise_id()
            .map(str::to_string)
            .ok_or(SessionError::NoCurrentExercise)?;
        let category = self.catalog.category_of(&exercise_id);
        if !self.input.is_completable() {
            return Err(SessionError::IncompleteSet);
        }
        self.input.validate()?;

        let set_number = (set_index as u32 + 1).max(self.last_set_number + 1);
        let workout_id = self.workout.as_ref().map(|w| w.id.as_str()).unwrap_or_default();
        let set_id = format!("{}_{}_{}", workout_id, exercise_index, set_number);
        let set = self.input.take_set(set_id, &exercise_id, set_number);
        self.last_set_number = set_number;
        self.completed_sets.push(set.clone());

        let rest = self.rest_policy.rest_for(category);
        self.state = if rest == 0 {
            SessionState::Active {
                exercise_index,
                set_index,
            }
        } else {
            SessionState::Resting {
                exercise_index,
                set_index,
                seconds_remaining: rest,
            }
        };
        debug!(
            "Completed set {} of {} ({}), resting {}s",
            set_number, exercise_id, category, rest
        );
        Ok(set)
    }

    /// Advances the rest countdown by one second.
    pub fn tick_rest(&mut self) -> RestTick {
        let SessionState::Resting {
            exercise_index,
            set_index,
            seconds_remaining,
        } = self.state
        else {
            return RestTick::Idle;
        };

        if seconds_remaining <= 1 {
            self.state = SessionState::Active {
                exercise_index,
                set_index,
            };
            debug!("Rest finished");
            RestTick::Finished
        } else {
            self.state = SessionState::Resting {
                exercise_index,
                set_index,
                seconds_remaining: seconds_remaining - 1,
            };
            RestTick::Counting(seconds_remaining - 1)
        }
    }

    /// Ends the rest early. A no-op while already active.
    pub fn skip_rest(&mut self) -> Result<(), SessionError> {
        let (exercise_index, set_index) = self.position()?;
        if self.state.is_resting() {
            debug!("Rest skipped");
        }
        self.state = SessionState::Active {
            exercise_index,
            set_index,
        };
        Ok(())
    }

    /// Moves to the next set of the same exercise without resting.
    pub fn next_set(&mut self) -> Result<(), SessionError> {
        let (exercise_index, set_index) = self.position()?;
        self.input.clear();
        self.state = SessionState::Active {
            exercise_index,
            set_index: set_index + 1,
        };
        Ok(())
    }

    pub fn next_exercise(&mut self) -> Result<(), SessionError> {
        let (exercise_index, _) = self.position()?;
        let exercise_count = self.template.as_ref().map_or(0, |t| t.exercises.len());
        if exercise_index >= exercise_count {
            return Err(SessionError::NoCurrentExercise);
        }
        self.input.clear();
        self.last_set_number = 0;
        self.state = SessionState::Active {
            exercise_index: exercise_index + 1,
            set_index: 0,
        };
        debug!("Moved to exercise {}", exercise_index + 1);
        Ok(())
    }

    /// Seconds since the workout started; frozen once it is finished.
    pub fn elapsed_seconds(&self) -> i64 {
        let Some(start) = self.workout.as_ref().and_then(|w| w.start_time) else {
            return 0;
        };
        let end = match self.state {
            SessionState::Finished => self
                .workout
                .as_ref()
                .and_then(|w| w.end_time)
                .unwrap_or_else(|| self.clock.now()),
            _ => self.clock.now(),
        };
        (end - start).num_seconds().max(0)
    }

    pub fn calories_so_far(&self) -> f64 {
        stats::estimate_calories(&self.completed_sets, &self.catalog)
    }

    /// The completed workout as it would be persisted right now.
    pub fn prepare_finish(&self) -> Result<Workout, SessionError> {
        match self.state {
            SessionState::Idle => return Err(SessionError::NotStarted),
            SessionState::Finished => return Err(SessionError::Finished),
            _ => {}
        }
        let mut workout = self.workout.clone().ok_or(SessionError::NotStarted)?;
        workout.end_time = Some(self.clock.now());
        workout.status = WorkoutStatus::Completed;
        workout.exercises = self.completed_sets.clone();
        workout.total_calories = Some(stats::calculate_calories(
            &self.completed_sets,
            &self.catalog,
        ));
        Ok(workout)
    }

    pub fn mark_finished(&mut self, workout: Workout) {
        self.input.clear();
        self.workout = Some(workout);
        self.state = SessionState::Finished;
    }

    /// Completes the workout and persists it.
    ///
    /// On a store failure the session stays as it was, so `finish` can be
    /// called again.
    pub async fn finish<S: LocalStore>(
        &mut self,
        store: &S,
        policy: &StatsPolicy,
    ) -> Result<Workout, SessionError> {
        let workout = self.prepare_finish()?;
        operations::commit_workout(store, &workout, self.clock.now(), policy)
            .await
            .inspect_err(|e| error!("Failed to save workout {}: {}", workout.id, e))?;
        self.mark_finished(workout.clone());
        Ok(workout)
    }
}
