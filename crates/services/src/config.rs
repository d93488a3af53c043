use std::env;
use std::str::FromStr;

use quiz_core::settings::{SchedulerSettings, SessionSettings};

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";

/// Runtime configuration for the quiz services.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizConfig {
    pub database_url: String,
    pub scheduler: SchedulerSettings,
    pub session: SessionSettings,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_URL.into(),
            scheduler: SchedulerSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl QuizConfig {
    /// Read configuration from `QUIZ_*` environment variables.
    ///
    /// Unset variables fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the resulting
    /// settings are invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`QuizConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let sched = defaults.scheduler;
        let sess = defaults.session;

        let database_url = lookup("QUIZ_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.database_url);

        let scheduler = SchedulerSettings::new(
            parse_or(&lookup, "QUIZ_SM2_FIRST_INTERVAL", sched.first_interval_days())?,
            parse_or(&lookup, "QUIZ_SM2_SECOND_INTERVAL", sched.second_interval_days())?,
            parse_or(&lookup, "QUIZ_SM2_INCORRECT_INTERVAL", sched.incorrect_interval_days())?,
            parse_or(&lookup, "QUIZ_SM2_MIN_EASE_FACTOR", sched.min_ease_factor())?,
        )?;

        let session = SessionSettings::new(
            parse_or(&lookup, "QUIZ_DEFAULT_SESSION_SIZE", sess.default_size())?,
            parse_or(&lookup, "QUIZ_MIN_SESSION_SIZE", sess.min_size())?,
            parse_or(&lookup, "QUIZ_MAX_SESSION_SIZE", sess.max_size())?,
            parse_or(&lookup, "QUIZ_MAX_REVIEW_PER_SESSION", sess.max_review_per_session())?,
        )?;

        Ok(Self {
            database_url,
            scheduler,
            session,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::settings::SettingsError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_values_use_defaults() {
        let config = QuizConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, QuizConfig::default());
        assert_eq!(config.database_url, DEFAULT_DB_URL);
        assert_eq!(config.session.default_size(), 15);
        assert_eq!(config.scheduler.incorrect_interval_days(), 0.25);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = QuizConfig::from_lookup(lookup_from(&[
            ("QUIZ_DB_URL", "sqlite::memory:"),
            ("QUIZ_MAX_SESSION_SIZE", " 30 "),
            ("QUIZ_SM2_SECOND_INTERVAL", "4.5"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.session.max_size(), 30);
        assert_eq!(config.scheduler.second_interval_days(), 4.5);
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let err = QuizConfig::from_lookup(lookup_from(&[("QUIZ_MIN_SESSION_SIZE", "five")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "QUIZ_MIN_SESSION_SIZE", ref value } if value == "five"
        ));
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let err = QuizConfig::from_lookup(lookup_from(&[
            ("QUIZ_MIN_SESSION_SIZE", "25"),
            ("QUIZ_MAX_SESSION_SIZE", "20"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Settings(SettingsError::InvalidSessionBounds { min: 25, max: 20 })
        ));
    }

    #[test]
    fn oversized_session_is_rejected() {
        let err = QuizConfig::from_lookup(lookup_from(&[("QUIZ_MAX_SESSION_SIZE", "50000")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Settings(SettingsError::SessionTooLarge { max: 50000, .. })
        ));
    }
}
