//! Runtime settings
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables:
//! - `SURVEY_LEASE_DURATION_SECS`: lease length in seconds
//! - `SURVEY_SEED`: seed for design generation
//! - `SURVEY_LOG`: default tracing filter directive
//! - `SURVEY_LOG_FORMAT`: `plain` or `json`

use crate::error::SurveyError;
use chrono::TimeDelta;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use survey_lease::DEFAULT_LEASE_SECS;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(SurveyError::Settings(format!("unknown log format: {other}"))),
        }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

/// Survey service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySettings {
    /// Lease length in seconds
    pub lease_duration_secs: u64,
    /// Seed for design generation; fresh entropy when absent
    pub seed: Option<u64>,
    /// Tracing output
    pub telemetry: TelemetrySettings,
}

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            lease_duration_secs: DEFAULT_LEASE_SECS.unsigned_abs(),
            seed: None,
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl SurveySettings {
    /// Parse settings from TOML
    ///
    /// # Errors
    /// - `SurveyError::Settings` if the text is not valid settings TOML
    pub fn from_toml_str(text: &str) -> Result<Self, SurveyError> {
        toml::from_str(text).map_err(|e| SurveyError::Settings(e.to_string()))
    }

    /// Load from an optional file, then apply `SURVEY_*` environment overrides
    ///
    /// # Errors
    /// - `SurveyError::Io` if the file cannot be read
    /// - `SurveyError::Settings` for unparsable or out-of-range values
    pub fn load(path: Option<&Path>) -> Result<Self, SurveyError> {
        let mut settings = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from a variable lookup
    ///
    /// # Errors
    /// - `SurveyError::Settings` if a variable cannot be parsed
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SurveyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SURVEY_LEASE_DURATION_SECS") {
            self.lease_duration_secs = parse_var("SURVEY_LEASE_DURATION_SECS", &raw)?;
        }
        if let Some(raw) = lookup("SURVEY_SEED") {
            self.seed = Some(parse_var("SURVEY_SEED", &raw)?);
        }
        if let Some(filter) = lookup("SURVEY_LOG").filter(|f| !f.trim().is_empty()) {
            self.telemetry.filter = filter;
        }
        if let Some(raw) = lookup("SURVEY_LOG_FORMAT") {
            self.telemetry.format = raw.parse()?;
        }
        Ok(())
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `SurveyError::Settings` for a zero or out-of-range lease duration
    pub fn validate(&self) -> Result<(), SurveyError> {
        self.lease_duration().map(|_| ())
    }

    /// Lease length
    ///
    /// # Errors
    /// - `SurveyError::Settings` for zero or out-of-range durations
    pub fn lease_duration(&self) -> Result<TimeDelta, SurveyError> {
        i64::try_from(self.lease_duration_secs)
            .ok()
            .filter(|&secs| secs > 0)
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                SurveyError::Settings(format!(
                    "lease duration must be a positive number of seconds, got {}",
                    self.lease_duration_secs
                ))
            })
    }

    /// Random source for design generation
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T, SurveyError> {
    raw.trim()
        .parse()
        .map_err(|_| SurveyError::Settings(format!("{name}: cannot parse {raw:?}")))
}
