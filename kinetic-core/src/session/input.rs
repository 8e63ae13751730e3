use crate::db::models::ExerciseSet;
use crate::validation::{ValidationErrors, check_non_negative};

/// The set currently being entered on the live screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetInput {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    /// Seconds.
    pub duration: Option<u32>,
    /// Meters.
    pub distance: Option<f64>,
    pub notes: Option<String>,
}

impl SetInput {
    /// A set needs some reps or some time to be worth recording.
    pub fn is_completable(&self) -> bool {
        self.reps.unwrap_or(0) > 0 || self.duration.unwrap_or(0) > 0
    }

    pub fn adjust_reps(&mut self, delta: i64) {
        self.reps = Some(step_u32(self.reps, delta));
    }

    pub fn adjust_weight(&mut self, delta: f64) {
        self.weight = Some((self.weight.unwrap_or(0.0) + delta).max(0.0));
    }

    pub fn adjust_duration(&mut self, delta_seconds: i64) {
        self.duration = Some(step_u32(self.duration, delta_seconds));
    }

    /// Weight and distance must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_non_negative(&mut errors, "weight".into(), self.weight);
        check_non_negative(&mut errors, "distance".into(), self.distance);
        errors.into_result()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn take_set(&mut self, id: String, exercise_id: &str, set_number: u32) -> ExerciseSet {
        let input = std::mem::take(self);
        ExerciseSet {
            id,
            exercise_id: exercise_id.to_string(),
            set_number,
            reps: input.reps,
            weight: input.weight,
            duration: input.duration,
            distance: input.distance,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

fn step_u32(current: Option<u32>, delta: i64) -> u32 {
    let next = i64::from(current.unwrap_or(0)) + delta;
    next.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_never_go_negative() {
        let mut input = SetInput::default();
        input.adjust_reps(-1);
        input.adjust_weight(-5.0);
        input.adjust_duration(-60);
        assert_eq!(input.reps, Some(0));
        assert_eq!(input.weight, Some(0.0));
        assert_eq!(input.duration, Some(0));
        assert!(!input.is_completable());

        input.adjust_reps(3);
        input.adjust_weight(5.0);
        assert_eq!(input.reps, Some(3));
        assert_eq!(input.weight, Some(5.0));
        assert!(input.is_completable());
    }

    #[test]
    fn taking_a_set_clears_the_buffer() {
        let mut input = SetInput {
            duration: Some(45),
            notes: Some("  ".into()),
            ..Default::default()
        };
        let set = input.take_set("s1".into(), "plank", 2);
        assert_eq!(set.duration, Some(45));
        assert_eq!(set.set_number, 2);
        assert_eq!(set.notes, None);
        assert_eq!(input, SetInput::default());
    }

    #[test]
    fn negative_or_non_finite_measurements_are_rejected() {
        let input = SetInput {
            reps: Some(10),
            weight: Some(f64::NAN),
            distance: Some(-5.0),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.has("weight"));
        assert!(errors.has("distance"));

        let input = SetInput {
            weight: Some(0.0),
            distance: Some(400.0),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }
}
