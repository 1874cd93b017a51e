//! Survey Core - project service, runtime settings and telemetry
//!
//! Ties the workspace together:
//! - [`SurveyService`]: generate a project's design and store its plots
//! - [`SurveySettings`]: lease length, seed and log settings from TOML and `SURVEY_*`
//! - [`telemetry::init`]: tracing subscriber installation
//!
//! The `survey` binary is a thin operator tool over this crate.

#![warn(unreachable_pub)]

pub mod error;
pub mod service;
pub mod settings;
pub mod telemetry;

pub use error::SurveyError;
pub use service::{ProjectRecord, SurveyService};
pub use settings::{LogFormat, SurveySettings, TelemetrySettings};

pub use survey_design as design;
pub use survey_geo as geo;
pub use survey_lease as lease;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
