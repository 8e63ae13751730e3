use crate::db::models::Workout;
use crate::stats::StatsPolicy;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Consecutive days with at least one completed workout, ending today or
/// yesterday. Walks back at most `policy.streak_lookback_days` days.
pub fn current_streak(workouts: &[Workout], today: NaiveDate, policy: &StatsPolicy) -> u32 {
    let days: BTreeSet<NaiveDate> = workouts
        .iter()
        .filter(|w| w.is_completed())
        .map(|w| w.date)
        .collect();

    let Some(latest) = days.last().copied() else {
        return 0;
    };
    if latest != today && Some(latest) != today.pred_opt() {
        return 0;
    }

    let mut streak = 0;
    let mut day = today;
    for _ in 0..policy.streak_lookback_days {
        if days.contains(&day) {
            streak += 1;
        } else if streak > 0 {
            break;
        }
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WorkoutStatus;
    use chrono::Days;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn workout_on(date: NaiveDate, status: WorkoutStatus) -> Workout {
        Workout {
            id: date.to_string(),
            user_id: "demo".into(),
            name: "Workout".into(),
            date,
            start_time: None,
            end_time: None,
            status,
            exercises: Vec::new(),
            total_calories: None,
            notes: None,
        }
    }

    fn completed_days_ago(days: &[u64]) -> Vec<Workout> {
        days.iter()
            .map(|d| workout_on(today() - Days::new(*d), WorkoutStatus::Completed))
            .collect()
    }

    #[test]
    fn three_consecutive_days() {
        let policy = StatsPolicy::default();
        assert_eq!(current_streak(&completed_days_ago(&[0, 1, 2]), today(), &policy), 3);
    }

    #[test]
    fn gap_breaks_streak() {
        let policy = StatsPolicy::default();
        assert_eq!(current_streak(&completed_days_ago(&[0, 2]), today(), &policy), 1);
    }

    #[test]
    fn streak_may_end_yesterday() {
        let policy = StatsPolicy::default();
        assert_eq!(current_streak(&completed_days_ago(&[1, 2, 3]), today(), &policy), 3);
    }

    #[test]
    fn stale_history_has_no_streak() {
        let policy = StatsPolicy::default();
        assert_eq!(current_streak(&completed_days_ago(&[2, 3, 4]), today(), &policy), 0);
        assert_eq!(current_streak(&[], today(), &policy), 0);
    }

    #[test]
    fn multiple_workouts_on_one_day_count_once() {
        let policy = StatsPolicy::default();
        assert_eq!(current_streak(&completed_days_ago(&[0, 0, 1]), today(), &policy), 2);
    }

    #[test]
    fn only_completed_workouts_count() {
        let policy = StatsPolicy::default();
        let mut workouts = completed_days_ago(&[0]);
        workouts.push(workout_on(today() - Days::new(1), WorkoutStatus::Skipped));
        workouts.push(workout_on(today() - Days::new(2), WorkoutStatus::Completed));
        assert_eq!(current_streak(&workouts, today(), &policy), 1);

        let planned = vec![workout_on(today(), WorkoutStatus::Planned)];
        assert_eq!(current_streak(&planned, today(), &policy), 0);
    }

    #[test]
    fn lookback_caps_the_streak() {
        let every_day: Vec<u64> = (0..45).collect();
        let workouts = completed_days_ago(&every_day);
        assert_eq!(current_streak(&workouts, today(), &StatsPolicy::default()), 30);

        let longer = StatsPolicy {
            streak_lookback_days: 60,
            ..StatsPolicy::default()
        };
        assert_eq!(current_streak(&workouts, today(), &longer), 45);
    }
}
