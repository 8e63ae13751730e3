use crate::catalog::{ExerciseCatalog, ExerciseCategory};
use crate::db::models::ExerciseSet;

const CARDIO_CALORIES_PER_MINUTE: f64 = 10.0;
const CALORIES_PER_REP: f64 = 5.0;
const MAX_WEIGHT_FACTOR: f64 = 2.0;

/// Unrounded calorie estimate for one set.
pub fn set_calories(category: ExerciseCategory, set: &ExerciseSet) -> f64 {
    match category {
        ExerciseCategory::Cardio => {
            let minutes = f64::from(set.duration.unwrap_or(0)) / 60.0;
            minutes * CARDIO_CALORIES_PER_MINUTE
        }
        ExerciseCategory::Strength
        | ExerciseCategory::Flexibility
        | ExerciseCategory::Balance
        | ExerciseCategory::Sports => {
            let reps = f64::from(set.reps.unwrap_or(0));
            let weight_factor = (set.weight.unwrap_or(0.0) / 100.0).min(MAX_WEIGHT_FACTOR);
            reps * (CALORIES_PER_REP + weight_factor)
        }
    }
}

/// Running total used by the live screen; not rounded.
pub fn estimate_calories(sets: &[ExerciseSet], catalog: &ExerciseCatalog) -> f64 {
    sets.iter()
        .map(|set| set_calories(catalog.category_of(&set.exercise_id), set))
        .sum()
}

/// Calories for a whole workout, rounded once at the end.
pub fn calculate_calories(sets: &[ExerciseSet], catalog: &ExerciseCatalog) -> u32 {
    estimate_calories(sets, catalog).max(0.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(exercise_id: &str, reps: Option<u32>, weight: Option<f64>, duration: Option<u32>) -> ExerciseSet {
        ExerciseSet {
            id: format!("{}_set", exercise_id),
            exercise_id: exercise_id.to_string(),
            set_number: 1,
            reps,
            weight,
            duration,
            distance: None,
            notes: None,
        }
    }

    #[test]
    fn strength_set_uses_weight_factor() {
        let catalog = ExerciseCatalog::builtin();
        let sets = vec![set("bench_press", Some(10), Some(100.0), None)];
        assert_eq!(calculate_calories(&sets, &catalog), 60);
    }

    #[test]
    fn cardio_set_counts_minutes() {
        let catalog = ExerciseCatalog::builtin();
        let sets = vec![set("running", None, None, Some(120))];
        assert_eq!(calculate_calories(&sets, &catalog), 20);
    }

    #[test]
    fn weight_factor_is_capped() {
        let catalog = ExerciseCatalog::builtin();
        let heavy = vec![set("deadlifts", Some(5), Some(1000.0), None)];
        // 5 * (5 + 2)
        assert_eq!(calculate_calories(&heavy, &catalog), 35);
    }

    #[test]
    fn strength_calories_never_decrease_with_more_reps() {
        let catalog = ExerciseCatalog::builtin();
        for weight in [0.0, 45.0, 135.0, 315.0] {
            let mut previous = 0.0;
            for reps in 0..50 {
                let sets = vec![set("squats", Some(reps), Some(weight), None)];
                let calories = estimate_calories(&sets, &catalog);
                assert!(calories >= previous, "reps {} weight {}", reps, weight);
                previous = calories;
            }
        }
    }

    #[test]
    fn cardio_calories_scale_linearly_with_duration() {
        let catalog = ExerciseCatalog::builtin();
        for duration in [30, 45, 60, 90, 600, 1800] {
            let single = estimate_calories(&[set("burpees", None, None, Some(duration))], &catalog);
            let double =
                estimate_calories(&[set("burpees", None, None, Some(duration * 2))], &catalog);
            assert!((double - 2.0 * single).abs() < 1e-9);
        }
    }

    #[test]
    fn rounding_happens_at_workout_level() {
        let catalog = ExerciseCatalog::builtin();
        // 5.5 kcal per set; rounding each set would give 12.
        let sets = vec![
            set("bench_press", Some(1), Some(50.0), None),
            set("bench_press", Some(1), Some(50.0), None),
        ];
        assert_eq!(calculate_calories(&sets, &catalog), 11);
    }

    #[test]
    fn empty_workout_has_no_calories() {
        let catalog = ExerciseCatalog::builtin();
        assert_eq!(calculate_calories(&[], &catalog), 0);
    }

    #[test]
    fn unknown_exercise_is_scored_as_strength() {
        let catalog = ExerciseCatalog::builtin();
        let sets = vec![set("sled_push", Some(4), Some(50.0), Some(300))];
        // 4 * (5 + 0.5)
        assert_eq!(calculate_calories(&sets, &catalog), 22);
    }
}
