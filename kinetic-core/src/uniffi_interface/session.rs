use crate::catalog::ExerciseCatalog;
use crate::config::KineticConfig;
use crate::db::models::{TodayStats, Workout, WorkoutStats};
use crate::db::{self, LocalStore, SqliteStore, operations};
use crate::session::{LiveSession, SessionDriver, SessionEvent, SetInput, SystemClock, format_elapsed};
use crate::stats::StatsPolicy;
use crate::uniffi_interface::errors::KineticError;
use crate::uniffi_interface::objects::{
    ExerciseRecord, ExerciseSetRecord, SessionEventRecord, SessionSnapshotRecord, TemplateRecord,
    TodayStatsRecord, WorkoutRecord, WorkoutStatsRecord,
};
use chrono::Utc;
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio::sync::{OnceCell, broadcast};

static STORE: OnceCell<Arc<SqliteStore>> = OnceCell::const_new();
static CATALOG: OnceLock<Arc<ExerciseCatalog>> = OnceLock::new();

fn catalog() -> Arc<ExerciseCatalog> {
    Arc::clone(CATALOG.get_or_init(|| Arc::new(ExerciseCatalog::builtin())))
}

async fn shared_store() -> Result<Arc<SqliteStore>, KineticError> {
    let store = STORE
        .get_or_try_init(async || {
            let path = db::get_db_path().await;
            SqliteStore::open(path).map(Arc::new)
        })
        .await?;
    Ok(Arc::clone(store))
}

fn config() -> Result<KineticConfig, KineticError> {
    Ok(KineticConfig::from_env()?)
}

async fn open_database(path: &str) -> Result<(), KineticError> {
    db::set_db_path(path).await?;
    shared_store().await?;
    Ok(())
}

/// Registers the database file and runs migrations. Call once at startup.
#[uniffi::export]
pub fn setup_database(path: &str) -> Result<(), KineticError> {
    let rt = crate::runtime::init_global_runtime_blocking();
    rt.block_on(open_database(path))
}

#[uniffi::export]
pub fn list_exercises() -> Vec<ExerciseRecord> {
    catalog().exercises().iter().map(Into::into).collect()
}

#[uniffi::export]
pub fn list_templates() -> Vec<TemplateRecord> {
    catalog().templates().iter().map(Into::into).collect()
}

#[uniffi::export]
pub fn format_elapsed_seconds(seconds: i64) -> String {
    format_elapsed(seconds)
}

async fn user_stats(user_id: &str, policy: &StatsPolicy) -> Result<WorkoutStats, KineticError> {
    let store = shared_store().await?;
    Ok(operations::get_user_stats(&store, user_id, Utc::now(), policy).await?)
}

async fn today_stats(user_id: &str, policy: &StatsPolicy) -> Result<TodayStats, KineticError> {
    let store = shared_store().await?;
    Ok(operations::get_today_stats(&store, user_id, Utc::now(), policy).await?)
}

async fn recent_workouts(user_id: &str, limit: usize) -> Result<Vec<Workout>, KineticError> {
    let store = shared_store().await?;
    Ok(operations::get_recent_workouts(&store, user_id, limit).await?)
}

#[uniffi::export]
pub fn get_user_stats(user_id: &str) -> Result<WorkoutStatsRecord, KineticError> {
    let policy = config()?.stats;
    let rt = crate::runtime::init_global_runtime_blocking();
    rt.block_on(user_stats(user_id, &policy)).map(Into::into)
}

#[uniffi::export]
pub fn get_today_stats(user_id: &str) -> Result<TodayStatsRecord, KineticError> {
    let policy = config()?.stats;
    let rt = crate::runtime::init_global_runtime_blocking();
    rt.block_on(today_stats(user_id, &policy)).map(Into::into)
}

#[uniffi::export]
pub fn get_recent_workouts(
    user_id: &str,
    limit: Option<u32>,
) -> Result<Vec<WorkoutRecord>, KineticError> {
    let limit = limit.map_or(operations::DEFAULT_RECENT_LIMIT, |l| l as usize);
    let rt = crate::runtime::init_global_runtime_blocking();
    let workouts = rt.block_on(recent_workouts(user_id, limit))?;
    Ok(workouts.into_iter().map(Into::into).collect())
}

/// A live workout driven from the mobile UI.
///
/// Timers run on the global runtime; the host drains them with
/// [`LiveWorkout::poll_events`] and re-renders from [`LiveWorkout::snapshot`].
#[derive(uniffi::Object)]
pub struct LiveWorkout {
    driver: Mutex<SessionDriver>,
    events: Mutex<broadcast::Receiver<SessionEvent>>,
    policy: StatsPolicy,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Saves the workout with the driver unlocked, so host calls such as
/// `snapshot` are not blocked behind the write.
async fn finish_live<S: LocalStore>(
    driver: &Mutex<SessionDriver>,
    store: &S,
    policy: &StatsPolicy,
) -> Result<Workout, KineticError> {
    let (workout, now) = guard(driver).prepare_finish()?;
    operations::commit_workout(store, &workout, now, policy)
        .await
        .inspect_err(|e| error!("Failed to save workout {}: {}", workout.id, e))?;
    guard(driver).mark_finished(workout.clone());
    Ok(workout)
}

async fn finish_shared(
    driver: &Mutex<SessionDriver>,
    policy: &StatsPolicy,
) -> Result<Workout, KineticError> {
    let store = shared_store().await?;
    finish_live(driver, &store, policy).await
}

impl LiveWorkout {
    fn edit_input(&self, f: impl FnOnce(&mut SetInput)) -> Result<(), KineticError> {
        guard(&self.driver).with_session(|session| -> Result<(), KineticError> {
            f(session.input_mut()?);
            Ok(())
        })
    }
}

#[uniffi::export]
impl LiveWorkout {
    /// Starts a workout from a catalog template.
    #[uniffi::constructor]
    pub fn start(user_id: &str, template_id: &str) -> Result<Arc<Self>, KineticError> {
        let config = config()?;
        let catalog = catalog();
        let template = catalog
            .template(template_id)
            .cloned()
            .ok_or_else(|| KineticError::NotFound(format!("template '{}'", template_id)))?;

        let session = LiveSession::new(user_id, catalog, Arc::new(SystemClock))
            .with_rest_policy(config.rest);
        let mut driver = SessionDriver::new(session);
        let events = driver.subscribe();

        let rt = crate::runtime::init_global_runtime_blocking();
        let _runtime = rt.enter();
        let workout = driver.start(template)?;
        info!("Live workout {} started from {}", workout.id, template_id);

        Ok(Arc::new(LiveWorkout {
            driver: Mutex::new(driver),
            events: Mutex::new(events),
            policy: config.stats,
        }))
    }

    pub fn snapshot(&self) -> SessionSnapshotRecord {
        guard(&self.driver).snapshot().into()
    }

    /// Events published since the last poll, oldest first.
    pub fn poll_events(&self) -> Vec<SessionEventRecord> {
        let mut events = guard(&self.events);
        let mut drained = Vec::new();
        loop {
            match events.try_recv() {
                Ok(event) => drained.push(event.into()),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Dropped {} session events", skipped);
                }
                Err(_) => break,
            }
        }
        drained
    }

    pub fn set_reps(&self, reps: Option<u32>) -> Result<(), KineticError> {
        self.edit_input(|input| input.reps = reps)
    }

    pub fn set_weight(&self, weight: Option<f64>) -> Result<(), KineticError> {
        self.edit_input(|input| input.weight = weight)
    }

    pub fn set_duration(&self, seconds: Option<u32>) -> Result<(), KineticError> {
        self.edit_input(|input| input.duration = seconds)
    }

    pub fn set_distance(&self, meters: Option<f64>) -> Result<(), KineticError> {
        self.edit_input(|input| input.distance = meters)
    }

    pub fn set_notes(&self, notes: Option<String>) -> Result<(), KineticError> {
        self.edit_input(|input| input.notes = notes)
    }

    pub fn adjust_reps(&self, delta: i64) -> Result<(), KineticError> {
        self.edit_input(|input| input.adjust_reps(delta))
    }

    pub fn adjust_weight(&self, delta: f64) -> Result<(), KineticError> {
        self.edit_input(|input| input.adjust_weight(delta))
    }

    pub fn adjust_duration(&self, delta_seconds: i64) -> Result<(), KineticError> {
        self.edit_input(|input| input.adjust_duration(delta_seconds))
    }

    pub fn complete_set(&self) -> Result<ExerciseSetRecord, KineticError> {
        let rt = crate::runtime::init_global_runtime_blocking();
        let _runtime = rt.enter();
        Ok(guard(&self.driver).complete_set()?.into())
    }

    pub fn skip_rest(&self) -> Result<(), KineticError> {
        Ok(guard(&self.driver).skip_rest()?)
    }

    pub fn next_set(&self) -> Result<(), KineticError> {
        Ok(guard(&self.driver).next_set()?)
    }

    pub fn next_exercise(&self) -> Result<(), KineticError> {
        Ok(guard(&self.driver).next_exercise()?)
    }

    /// Completes and saves the workout. Safe to call again after a storage
    /// error.
    pub fn finish(&self) -> Result<WorkoutRecord, KineticError> {
        let rt = crate::runtime::init_global_runtime_blocking();
        let workout = rt.block_on(finish_shared(&self.driver, &self.policy))?;
        Ok(workout.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, StoreError};
    use crate::session::SessionState;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Records whether the driver could be locked during every write.
    struct WatchingStore {
        inner: MemoryStore,
        driver: Arc<Mutex<SessionDriver>>,
        writes: AtomicUsize,
        driver_free: AtomicBool,
    }

    impl LocalStore for WatchingStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.driver_free
                .fetch_and(self.driver.try_lock().is_ok(), Ordering::SeqCst);
            self.inner.set(key, value).await
        }
    }

    #[tokio::test]
    async fn finishing_saves_without_holding_the_driver() {
        let catalog = catalog();
        let template = catalog.template("push_day").unwrap().clone();
        let mut driver = SessionDriver::new(LiveSession::new(
            "demo",
            catalog,
            Arc::new(SystemClock),
        ));
        driver.start(template).unwrap();
        driver
            .with_session(|s| s.input_mut().map(|i| i.reps = Some(10)))
            .unwrap();
        driver.complete_set().unwrap();

        let driver = Arc::new(Mutex::new(driver));
        let store = WatchingStore {
            inner: MemoryStore::new(),
            driver: Arc::clone(&driver),
            writes: AtomicUsize::new(0),
            driver_free: AtomicBool::new(true),
        };
        let workout = finish_live(&driver, &store, &StatsPolicy::default())
            .await
            .unwrap();

        assert!(store.writes.load(Ordering::SeqCst) >= 1);
        assert!(store.driver_free.load(Ordering::SeqCst));
        assert_eq!(workout.exercises.len(), 1);
        assert_eq!(guard(&driver).state(), SessionState::Finished);
    }
}
