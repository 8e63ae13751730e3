use crate::catalog::WorkoutTemplate;
use crate::db::models::{ExerciseSet, Workout};
use crate::db::{LocalStore, operations};
use crate::session::{LiveSession, RestTick, SessionError, SessionSnapshot, SessionState};
use crate::stats::StatsPolicy;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval_at};

const EVENT_CAPACITY: usize = 256;
const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Elapsed { seconds: i64 },
    RestStarted { seconds: u32 },
    RestTick { seconds_remaining: u32 },
    RestFinished,
    RestSkipped,
    SetCompleted { set_number: u32, exercise_id: String },
    Finished { total_calories: u32 },
}

fn lock(session: &Mutex<LiveSession>) -> MutexGuard<'_, LiveSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs a [`LiveSession`] in real time.
///
/// Owns the elapsed-time and rest tickers and publishes every state change as a
/// [`SessionEvent`]. Tickers are aborted as soon as the state they drive is
/// left, so a skipped rest never produces another tick. Must be used from
/// inside a tokio runtime.
pub struct SessionDriver {
    session: Arc<Mutex<LiveSession>>,
    events: broadcast::Sender<SessionEvent>,
    elapsed_ticker: Option<JoinHandle<()>>,
    rest_ticker: Option<JoinHandle<()>>,
}

impl SessionDriver {
    pub fn new(session: LiveSession) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(session)),
            events,
            elapsed_ticker: None,
            rest_ticker: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Runs `f` with the session locked. Do not block inside `f`.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut LiveSession) -> R) -> R {
        f(&mut lock(&self.session))
    }

    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.session).snapshot()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn start(&mut self, template: WorkoutTemplate) -> Result<Workout, SessionError> {
        let workout = lock(&self.session).start(template)?.clone();
        self.elapsed_ticker = Some(self.spawn_elapsed_ticker());
        Ok(workout)
    }

    pub fn complete_set(&mut self) -> Result<ExerciseSet, SessionError> {
        let (set, state) = {
            let mut session = lock(&self.session);
            let set = session.complete_set()?;
            (set, session.state())
        };
        self.emit(SessionEvent::SetCompleted {
            set_number: set.set_number,
            exercise_id: set.exercise_id.clone(),
        });
        if let SessionState::Resting {
            seconds_remaining, ..
        } = state
        {
            self.emit(SessionEvent::RestStarted {
                seconds: seconds_remaining,
            });
            self.cancel_rest();
            self.rest_ticker = Some(self.spawn_rest_ticker());
        }
        Ok(set)
    }

    pub fn skip_rest(&mut self) -> Result<(), SessionError> {
        self.cancel_rest();
        let mut session = lock(&self.session);
        let was_resting = session.state().is_resting();
        session.skip_rest()?;
        if was_resting {
            // Under the lock, so no rest tick can follow it.
            self.emit(SessionEvent::RestSkipped);
        }
        Ok(())
    }

    pub fn next_set(&mut self) -> Result<(), SessionError> {
        self.cancel_rest();
        lock(&self.session).next_set()
    }

    pub fn next_exercise(&mut self) -> Result<(), SessionError> {
        self.cancel_rest();
        lock(&self.session).next_exercise()
    }

    /// The completed workout as it would be saved now, and the save time.
    /// The session keeps running.
    pub fn prepare_finish(&self) -> Result<(Workout, DateTime<Utc>), SessionError> {
        let session = lock(&self.session);
        Ok((session.prepare_finish()?, session.now()))
    }

    /// Ends the session with a workout that has already been saved and stops
    /// all tickers.
    pub fn mark_finished(&mut self, workout: Workout) {
        lock(&self.session).mark_finished(workout.clone());
        self.cancel_rest();
        if let Some(ticker) = self.elapsed_ticker.take() {
            ticker.abort();
        }
        info!(
            "Finished workout {} with {} sets",
            workout.id,
            workout.exercises.len()
        );
        self.emit(SessionEvent::Finished {
            total_calories: workout.total_calories.unwrap_or(0),
        });
    }

    /// Completes and persists the workout, then stops all tickers.
    ///
    /// The session lock is not held while the store is written; on failure
    /// the session keeps running and `finish` may be retried.
    pub async fn finish<S: LocalStore>(
        &mut self,
        store: &S,
        policy: &StatsPolicy,
    ) -> Result<Workout, SessionError> {
        let (workout, now) = self.prepare_finish()?;
        operations::commit_workout(store, &workout, now, policy)
            .await
            .inspect_err(|e| error!("Failed to save workout {}: {}", workout.id, e))?;
        self.mark_finished(workout.clone());
        Ok(workout)
    }

    fn cancel_rest(&mut self) {
        if let Some(ticker) = self.rest_ticker.take() {
            ticker.abort();
            debug!("Rest ticker cancelled");
        }
    }

    fn spawn_elapsed_ticker(&self) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticks.tick().await;
                let seconds = {
                    let session = lock(&session);
                    if session.state() == SessionState::Finished {
                        break;
                    }
                    session.elapsed_seconds()
                };
                let _ = events.send(SessionEvent::Elapsed { seconds });
            }
        })
    }

    fn spawn_rest_ticker(&self) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticks.tick().await;
                if !rest_step(&session, &events) {
                    break;
                }
            }
        })
    }
}

/// One second of rest. Returns whether the countdown goes on.
///
/// The event is sent with the session still locked: a ticker that wakes up
/// while `skip_rest` holds the lock finds the session active and stays quiet.
fn rest_step(session: &Mutex<LiveSession>, events: &broadcast::Sender<SessionEvent>) -> bool {
    let mut session = lock(session);
    match session.tick_rest() {
        RestTick::Counting(seconds_remaining) => {
            let _ = events.send(SessionEvent::RestTick { seconds_remaining });
            true
        }
        RestTick::Finished => {
            let _ = events.send(SessionEvent::RestFinished);
            false
        }
        RestTick::Idle => false,
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        for ticker in [self.elapsed_ticker.take(), self.rest_ticker.take()]
            .into_iter()
            .flatten()
        {
            ticker.abort();
        }
    }
}
