use crate::catalog::ExerciseCatalog;
use crate::db::models::{ExerciseSet, TodayStats, Workout, WorkoutStats, WorkoutStatus};
use crate::db::{LocalStore, StoreError, WORKOUTS_KEY, read_json, stats_key, write_json};
use crate::stats::{self, StatsPolicy};
use crate::validation::{Validate, ValidationErrors, WorkoutLog};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::cmp::Reverse;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum LogWorkoutError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn non_blank(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

// Workouts
pub async fn get_all_workouts<S: LocalStore>(store: &S) -> Result<Vec<Workout>, StoreError> {
    Ok(read_json(store, WORKOUTS_KEY).await?.unwrap_or_default())
}

pub async fn get_user_workouts<S: LocalStore>(
    store: &S,
    user_id: &str,
) -> Result<Vec<Workout>, StoreError> {
    let mut workouts = get_all_workouts(store).await?;
    workouts.retain(|w| w.user_id == user_id);
    Ok(workouts)
}

/// Inserts the workout, or replaces the stored one with the same id.
pub async fn save_workout<S: LocalStore>(store: &S, workout: &Workout) -> Result<(), StoreError> {
    let mut workouts = get_all_workouts(store).await?;
    match workouts.iter_mut().find(|w| w.id == workout.id) {
        Some(existing) => *existing = workout.clone(),
        None => workouts.push(workout.clone()),
    }
    write_json(store, WORKOUTS_KEY, &workouts).await?;
    info!(
        "Saved workout {} ({}) for {}",
        workout.id, workout.status, workout.user_id
    );
    Ok(())
}

/// Saves a finished workout and refreshes the owner's cached stats.
pub async fn commit_workout<S: LocalStore>(
    store: &S,
    workout: &Workout,
    now: DateTime<Utc>,
    policy: &StatsPolicy,
) -> Result<WorkoutStats, StoreError> {
    save_workout(store, workout).await?;
    update_stats(store, &workout.user_id, now, policy).await
}

/// Turns a manually entered log into a completed workout and stores it.
pub async fn log_workout<S: LocalStore>(
    store: &S,
    catalog: &ExerciseCatalog,
    user_id: &str,
    log: &WorkoutLog,
    now: DateTime<Utc>,
    policy: &StatsPolicy,
) -> Result<Workout, LogWorkoutError> {
    log.validate(catalog)?;

    let workout_id = Uuid::new_v4().to_string();
    let exercises: Vec<ExerciseSet> = log
        .exercises
        .iter()
        .enumerate()
        .flat_map(|(i, exercise)| {
            let workout_id = &workout_id;
            exercise
                .sets
                .iter()
                .enumerate()
                .map(move |(j, set)| ExerciseSet {
                    id: format!("{}_{}_{}", workout_id, i, j),
                    exercise_id: exercise.exercise_id.clone(),
                    set_number: j as u32 + 1,
                    reps: set.reps,
                    weight: set.weight,
                    duration: set.duration,
                    distance: set.distance,
                    notes: non_blank(&set.notes),
                })
        })
        .collect();

    let workout = Workout {
        id: workout_id,
        user_id: user_id.to_string(),
        name: log.name.trim().to_string(),
        date: now.date_naive(),
        start_time: Some(now),
        end_time: Some(now),
        status: WorkoutStatus::Completed,
        total_calories: Some(stats::calculate_calories(&exercises, catalog)),
        exercises,
        notes: non_blank(&log.notes),
    };
    commit_workout(store, &workout, now, policy).await?;
    Ok(workout)
}

/// Completed workouts, newest first.
pub async fn get_recent_workouts<S: LocalStore>(
    store: &S,
    user_id: &str,
    limit: usize,
) -> Result<Vec<Workout>, StoreError> {
    let mut workouts = get_user_workouts(store, user_id).await?;
    workouts.retain(Workout::is_completed);
    workouts.sort_by_key(|w| Reverse((w.date, w.start_time)));
    workouts.truncate(limit);
    Ok(workouts)
}

// Stats
pub async fn update_stats<S: LocalStore>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
    policy: &StatsPolicy,
) -> Result<WorkoutStats, StoreError> {
    let workouts = get_user_workouts(store, user_id).await?;
    let stats = stats::compute_stats(&workouts, now, policy);
    write_json(store, &stats_key(user_id), &stats).await?;
    debug!("Updated stats for {}: {:?}", user_id, stats);
    Ok(stats)
}

/// Cached stats when present, otherwise computed and cached.
pub async fn get_user_stats<S: LocalStore>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
    policy: &StatsPolicy,
) -> Result<WorkoutStats, StoreError> {
    match read_json::<_, WorkoutStats>(store, &stats_key(user_id)).await {
        Ok(Some(stats)) => Ok(stats),
        Ok(None) => update_stats(store, user_id, now, policy).await,
        Err(StoreError::Malformed { key, source }) => {
            warn!("Discarding cached stats under {}: {}", key, source);
            update_stats(store, user_id, now, policy).await
        }
        Err(e) => Err(e),
    }
}

pub async fn get_today_stats<S: LocalStore>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
    policy: &StatsPolicy,
) -> Result<TodayStats, StoreError> {
    let workouts = get_user_workouts(store, user_id).await?;
    Ok(stats::today_stats(&workouts, now, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::validation::{LoggedExercise, LoggedSet};
    use chrono::{Duration, TimeZone};
    use serde_json::{Value, json};

    struct ReadOnlyStore(MemoryStore);

    impl LocalStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.0.get(key).await
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Backend("read-only".into()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 18, 0, 0).unwrap()
    }

    fn completed(id: &str, user_id: &str, started: DateTime<Utc>, calories: u32) -> Workout {
        let mut workout = Workout::in_progress(id.to_string(), user_id, "Workout", started);
        workout.status = WorkoutStatus::Completed;
        workout.end_time = Some(started + Duration::minutes(30));
        workout.total_calories = Some(calories);
        workout
    }

    fn bench_log() -> WorkoutLog {
        WorkoutLog {
            name: " Evening lift ".into(),
            exercises: vec![
                LoggedExercise {
                    exercise_id: "bench_press".into(),
                    sets: vec![
                        LoggedSet {
                            reps: Some(10),
                            weight: Some(100.0),
                            ..Default::default()
                        },
                        LoggedSet {
                            reps: Some(8),
                            weight: Some(100.0),
                            notes: Some("  ".into()),
                            ..Default::default()
                        },
                    ],
                },
                LoggedExercise {
                    exercise_id: "running".into(),
                    sets: vec![LoggedSet {
                        duration: Some(600),
                        ..Default::default()
                    }],
                },
            ],
            notes: Some("felt strong".into()),
        }
    }

    #[tokio::test]
    async fn save_workout_upserts_by_id() {
        let store = MemoryStore::new();
        let mut workout = Workout::in_progress("w1".into(), "demo", "Push Day", now());
        save_workout(&store, &workout).await.unwrap();

        workout.status = WorkoutStatus::Completed;
        save_workout(&store, &workout).await.unwrap();
        save_workout(&store, &completed("w2", "other", now(), 10))
            .await
            .unwrap();

        let mine = get_user_workouts(&store, "demo").await.unwrap();
        assert_eq!(mine, vec![workout]);
        assert_eq!(get_all_workouts(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn log_workout_builds_completed_workout() {
        let store = MemoryStore::new();
        let catalog = ExerciseCatalog::builtin();
        let workout = log_workout(
            &store,
            &catalog,
            "demo",
            &bench_log(),
            now(),
            &StatsPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(workout.name, "Evening lift");
        assert_eq!(workout.status, WorkoutStatus::Completed);
        assert_eq!(workout.start_time, Some(now()));
        assert_eq!(workout.end_time, Some(now()));
        let numbers: Vec<u32> = workout.exercises.iter().map(|s| s.set_number).collect();
        assert_eq!(numbers, vec![1, 2, 1]);
        assert_eq!(workout.exercises[1].notes, None);
        assert_eq!(workout.exercises[2].id, format!("{}_1_0", workout.id));
        // 60 + 8 * 6 + 100
        assert_eq!(workout.total_calories, Some(208));

        let stats: WorkoutStats = read_json(&store, &stats_key("demo"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_workouts, 1);
        assert_eq!(stats.total_calories, 208);
        assert_eq!(stats.current_streak, 1);
    }

    #[tokio::test]
    async fn invalid_log_is_not_stored() {
        let store = MemoryStore::new();
        let mut log = bench_log();
        log.name = String::new();
        let err = log_workout(
            &store,
            &ExerciseCatalog::builtin(),
            "demo",
            &log,
            now(),
            &StatsPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LogWorkoutError::Invalid(ref e) if e.has("name")));
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn store_failures_are_reported() {
        let store = ReadOnlyStore(MemoryStore::new());
        let err = log_workout(
            &store,
            &ExerciseCatalog::builtin(),
            "demo",
            &bench_log(),
            now(),
            &StatsPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LogWorkoutError::Store(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn user_stats_are_cached_until_updated() {
        let store = MemoryStore::new();
        let policy = StatsPolicy::default();
        save_workout(&store, &completed("w1", "demo", now(), 100))
            .await
            .unwrap();

        let first = get_user_stats(&store, "demo", now(), &policy).await.unwrap();
        assert_eq!(first.total_workouts, 1);

        // Saved without a stats refresh, so the cache is stale.
        save_workout(&store, &completed("w2", "demo", now(), 50))
            .await
            .unwrap();
        let cached = get_user_stats(&store, "demo", now(), &policy).await.unwrap();
        assert_eq!(cached, first);

        let fresh = update_stats(&store, "demo", now(), &policy).await.unwrap();
        assert_eq!(fresh.total_workouts, 2);
        assert_eq!(fresh.total_calories, 150);
    }

    #[tokio::test]
    async fn malformed_stats_cache_is_recomputed() {
        let store = MemoryStore::new();
        store
            .set(&stats_key("demo"), json!("garbage"))
            .await
            .unwrap();
        let stats = get_user_stats(&store, "demo", now(), &StatsPolicy::default())
            .await
            .unwrap();
        assert_eq!(stats, WorkoutStats::default());
    }

    #[tokio::test]
    async fn recent_workouts_are_completed_and_newest_first() {
        let store = MemoryStore::new();
        let day = Duration::days(1);
        for workout in [
            completed("old", "demo", now() - day * 3, 10),
            completed("newest", "demo", now(), 10),
            completed("middle", "demo", now() - day, 10),
            Workout::in_progress("open".into(), "demo", "Open", now()),
            completed("theirs", "other", now(), 10),
        ] {
            save_workout(&store, &workout).await.unwrap();
        }

        let recent = get_recent_workouts(&store, "demo", DEFAULT_RECENT_LIMIT)
            .await
            .unwrap();
        let ids: Vec<&str> = recent.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "middle", "old"]);

        let limited = get_recent_workouts(&store, "demo", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn today_stats_cover_only_today() {
        let store = MemoryStore::new();
        save_workout(&store, &completed("a", "demo", now() - Duration::hours(2), 120))
            .await
            .unwrap();
        save_workout(&store, &completed("b", "demo", now() - Duration::days(1), 80))
            .await
            .unwrap();

        let today = get_today_stats(&store, "demo", now(), &StatsPolicy::default())
            .await
            .unwrap();
        assert_eq!(
            today,
            TodayStats {
                workouts_completed: 1,
                calories_burned: 120,
                minutes_active: 30,
                current_streak: 2,
            }
        );
    }
}
