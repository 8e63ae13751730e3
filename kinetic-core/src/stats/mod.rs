//! Derived workout statistics.
//!
//! Everything here is a pure function of its inputs. Callers decide whether
//! the result is cached (see [`crate::db::operations::update_stats`]).

mod aggregate;
mod calories;
mod streak;

pub use aggregate::{compute_stats, today_stats, workout_minutes};
pub use calories::{calculate_calories, estimate_calories, set_calories};
pub use streak::current_streak;

/// Tunable constants of the stats derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsPolicy {
    /// How many days back the streak walk looks before giving up.
    pub streak_lookback_days: u32,
    /// Minutes credited to a workout missing its start or end time.
    pub default_workout_minutes: u32,
    /// Width of the "weekly" window, in days.
    pub weekly_window_days: u32,
}

impl Default for StatsPolicy {
    fn default() -> Self {
        Self {
            streak_lookback_days: 30,
            default_workout_minutes: 30,
            weekly_window_days: 7,
        }
    }
}
