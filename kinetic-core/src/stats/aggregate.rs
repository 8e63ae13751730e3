use crate::db::models::{TodayStats, Workout, WorkoutStats};
use crate::stats::{StatsPolicy, current_streak};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Length of a workout in minutes, or the policy default when either
/// timestamp is missing.
pub fn workout_minutes(workout: &Workout, policy: &StatsPolicy) -> f64 {
    match (workout.start_time, workout.end_time) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 60_000.0,
        _ => f64::from(policy.default_workout_minutes),
    }
}

struct Totals {
    workouts: u32,
    calories: u32,
    minutes: f64,
}

fn totals<'a>(workouts: impl Iterator<Item = &'a Workout>, policy: &StatsPolicy) -> Totals {
    workouts.fold(
        Totals {
            workouts: 0,
            calories: 0,
            minutes: 0.0,
        },
        |mut acc, w| {
            acc.workouts += 1;
            acc.calories = acc.calories.saturating_add(w.total_calories.unwrap_or(0));
            acc.minutes += workout_minutes(w, policy);
            acc
        },
    )
}

fn round_minutes(minutes: f64) -> u32 {
    minutes.max(0.0).round() as u32
}

/// Aggregates a user's workouts. Anything not `completed` is ignored.
pub fn compute_stats(workouts: &[Workout], now: DateTime<Utc>, policy: &StatsPolicy) -> WorkoutStats {
    let window_start = now - Duration::days(i64::from(policy.weekly_window_days));
    let completed = || workouts.iter().filter(|w| w.is_completed());

    let all = totals(completed(), policy);
    let weekly = totals(
        completed().filter(|w| w.date.and_time(NaiveTime::default()).and_utc() >= window_start),
        policy,
    );

    WorkoutStats {
        total_workouts: all.workouts,
        total_calories: all.calories,
        total_minutes: round_minutes(all.minutes),
        current_streak: current_streak(workouts, now.date_naive(), policy),
        weekly_workouts: weekly.workouts,
        weekly_calories: weekly.calories,
        weekly_minutes: round_minutes(weekly.minutes),
    }
}

/// Dashboard figures for the current (UTC) day.
pub fn today_stats(workouts: &[Workout], now: DateTime<Utc>, policy: &StatsPolicy) -> TodayStats {
    let today = now.date_naive();
    let day = totals(
        workouts
            .iter()
            .filter(|w| w.is_completed() && w.date == today),
        policy,
    );

    TodayStats {
        workouts_completed: day.workouts,
        calories_burned: day.calories,
        minutes_active: round_minutes(day.minutes),
        current_streak: current_streak(workouts, today, policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WorkoutStatus;
    use chrono::{Days, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 18, 0, 0).unwrap()
    }

    fn workout(days_ago: u64, minutes: Option<i64>, calories: u32, status: WorkoutStatus) -> Workout {
        let date = now().date_naive() - Days::new(days_ago);
        let start = date.and_hms_opt(7, 0, 0).unwrap().and_utc();
        Workout {
            id: format!("w{}_{}", days_ago, calories),
            user_id: "demo".into(),
            name: "Workout".into(),
            date,
            start_time: minutes.map(|_| start),
            end_time: minutes.map(|m| start + Duration::minutes(m)),
            status,
            exercises: Vec::new(),
            total_calories: Some(calories),
            notes: None,
        }
    }

    #[test]
    fn totals_and_weekly_window() {
        let workouts = vec![
            workout(0, Some(45), 300, WorkoutStatus::Completed),
            workout(1, Some(20), 150, WorkoutStatus::Completed),
            workout(10, Some(60), 500, WorkoutStatus::Completed),
            workout(0, Some(90), 999, WorkoutStatus::InProgress),
        ];

        let stats = compute_stats(&workouts, now(), &StatsPolicy::default());
        assert_eq!(
            stats,
            WorkoutStats {
                total_workouts: 3,
                total_calories: 950,
                total_minutes: 125,
                current_streak: 2,
                weekly_workouts: 2,
                weekly_calories: 450,
                weekly_minutes: 65,
            }
        );
    }

    #[test]
    fn missing_timestamps_use_default_duration() {
        let workouts = vec![
            workout(0, None, 100, WorkoutStatus::Completed),
            workout(3, Some(10), 50, WorkoutStatus::Completed),
        ];
        let stats = compute_stats(&workouts, now(), &StatsPolicy::default());
        assert_eq!(stats.total_minutes, 40);

        let policy = StatsPolicy {
            default_workout_minutes: 45,
            ..StatsPolicy::default()
        };
        assert_eq!(compute_stats(&workouts, now(), &policy).total_minutes, 55);
    }

    #[test]
    fn weekly_window_compares_against_start_of_day() {
        // Seven days ago at midnight is before `now - 7 days` (18:00), so it
        // falls outside the window; six days ago is inside.
        let workouts = vec![
            workout(7, Some(30), 100, WorkoutStatus::Completed),
            workout(6, Some(30), 100, WorkoutStatus::Completed),
        ];
        let stats = compute_stats(&workouts, now(), &StatsPolicy::default());
        assert_eq!(stats.weekly_workouts, 1);
        assert_eq!(stats.total_workouts, 2);
    }

    #[test]
    fn compute_stats_is_idempotent() {
        let workouts = vec![
            workout(0, Some(33), 210, WorkoutStatus::Completed),
            workout(2, None, 80, WorkoutStatus::Completed),
            workout(5, Some(12), 40, WorkoutStatus::Skipped),
        ];
        let policy = StatsPolicy::default();
        let first = compute_stats(&workouts, now(), &policy);
        let second = compute_stats(&workouts, now(), &policy);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_history_is_all_zero() {
        let stats = compute_stats(&[], now(), &StatsPolicy::default());
        assert_eq!(stats, WorkoutStats::default());
    }

    #[test]
    fn today_only_counts_todays_completed_workouts() {
        let workouts = vec![
            workout(0, Some(25), 200, WorkoutStatus::Completed),
            workout(0, None, 100, WorkoutStatus::Completed),
            workout(1, Some(60), 400, WorkoutStatus::Completed),
            workout(0, Some(60), 400, WorkoutStatus::Planned),
        ];
        let today = today_stats(&workouts, now(), &StatsPolicy::default());
        assert_eq!(
            today,
            TodayStats {
                workouts_completed: 2,
                calories_burned: 300,
                minutes_active: 55,
                current_streak: 2,
            }
        );
    }
}
