//! Survey Design - sampling design generator
//!
//! Derives plot centers and per-plot sample points from a project
//! configuration:
//! - Plot placement: random, gridded, or external point lists
//! - Sample placement: random or gridded, clipped to circle or square plots
//! - Settings parsing and validation into [`ProjectConfig`]
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use survey_design::{DesignGenerator, ProjectConfig};
//!
//! let config = ProjectConfig::from_toml_str(r#"
//!     plot_distribution = "random"
//!     lon_min = 0.0
//!     lat_min = 0.0
//!     lon_max = 0.01
//!     lat_max = 0.01
//!     num_plots = 5
//!     plot_shape = "circle"
//!     plot_size = 30.0
//!     sample_distribution = "random"
//!     samples_per_plot = 3
//! "#).unwrap();
//!
//! let design = DesignGenerator::new()
//!     .generate(&config, &mut StdRng::seed_from_u64(42))
//!     .unwrap();
//! assert_eq!(design.plot_count(), 5);
//! assert_eq!(design.sample_count(), 15);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod external;
pub mod generator;
pub mod plots;
pub mod samples;

pub use config::{
    PlotPlacement, PlotShape, ProjectConfig, ProjectSettings, SamplePlacement,
    MAX_DESIGN_POINTS,
};
pub use error::DesignError;
pub use external::parse_point_csv;
pub use generator::{DesignGenerator, PlotDesign, SamplingDesign};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
