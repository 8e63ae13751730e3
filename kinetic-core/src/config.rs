use crate::db::DEFAULT_DB_PATH;
use crate::logging::parse_level;
use crate::session::RestPolicy;
use crate::stats::StatsPolicy;
use log::LevelFilter;
use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_USER_ID: &str = "demo";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KineticConfig {
    pub database_url: String,
    pub user_id: String,
    pub log_level: LevelFilter,
    pub stats: StatsPolicy,
    pub rest: RestPolicy,
}

impl Default for KineticConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_PATH.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            log_level: LevelFilter::Info,
            stats: StatsPolicy::default(),
            rest: RestPolicy::default(),
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

impl KineticConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable source; unset variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let log_level = match lookup("KINETIC_LOG_LEVEL") {
            Some(value) => parse_level(&value).ok_or(ConfigError::Invalid {
                var: "KINETIC_LOG_LEVEL",
                value,
            })?,
            None => defaults.log_level,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            user_id: lookup("KINETIC_USER_ID")
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.user_id),
            log_level,
            stats: StatsPolicy {
                streak_lookback_days: parse_or(
                    &lookup,
                    "KINETIC_STREAK_LOOKBACK_DAYS",
                    defaults.stats.streak_lookback_days,
                )?,
                default_workout_minutes: parse_or(
                    &lookup,
                    "KINETIC_DEFAULT_WORKOUT_MINUTES",
                    defaults.stats.default_workout_minutes,
                )?,
                weekly_window_days: parse_or(
                    &lookup,
                    "KINETIC_WEEKLY_WINDOW_DAYS",
                    defaults.stats.weekly_window_days,
                )?,
            },
            rest: RestPolicy {
                cardio_seconds: parse_or(
                    &lookup,
                    "KINETIC_REST_CARDIO_SECONDS",
                    defaults.rest.cardio_seconds,
                )?,
                default_seconds: parse_or(
                    &lookup,
                    "KINETIC_REST_DEFAULT_SECONDS",
                    defaults.rest.default_seconds,
                )?,
            },
        })
    }
}
