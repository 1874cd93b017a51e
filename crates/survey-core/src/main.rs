//! `survey` command line tool

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::path::{Path, PathBuf};
use survey_core::design::{parse_point_csv, ProjectConfig, ProjectSettings, SamplingDesign};
use survey_core::geo::Bounds;
use survey_core::lease::{ProjectId, ProjectSummary};
use survey_core::{telemetry, SurveyService, SurveySettings};

#[derive(Debug, Serialize)]
struct GenerateReport {
    plot_count: usize,
    sample_count: usize,
    boundary: Bounds,
    boundary_ring: [[f64; 2]; 5],
    summary: ProjectSummary,
    design: SamplingDesign,
}

fn cli() -> Command {
    Command::new("survey")
        .version(survey_core::VERSION)
        .about("Survey sampling design generator")
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Runtime settings file (TOML)"),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate plots and samples for a project")
                .arg(
                    Arg::new("settings")
                        .long("settings")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Project settings file (TOML, or JSON with a .json extension)"),
                )
                .arg(
                    Arg::new("points")
                        .long("points")
                        .value_parser(value_parser!(PathBuf))
                        .help("CSV of lon,lat plot centers; implies external placement"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the full design as JSON"),
                ),
        )
}

fn load_project(settings_path: &Path, points_path: Option<&PathBuf>) -> Result<ProjectConfig> {
    let text = std::fs::read_to_string(settings_path)
        .with_context(|| format!("reading {}", settings_path.display()))?;
    let mut settings: ProjectSettings = if settings_path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text)?
    } else {
        toml::from_str(&text)?
    };

    if let Some(points_path) = points_path {
        let csv = std::fs::read_to_string(points_path)
            .with_context(|| format!("reading {}", points_path.display()))?;
        settings.plot_distribution = "external".to_string();
        settings.lon_min = None;
        settings.lat_min = None;
        settings.lon_max = None;
        settings.lat_max = None;
        settings.plot_centers = parse_point_csv(&csv)?.into_iter().map(Into::into).collect();
    }
    Ok(ProjectConfig::try_from(settings)?)
}

async fn generate(args: &ArgMatches, mut runtime: SurveySettings) -> Result<()> {
    if let Some(seed) = args.get_one::<u64>("seed") {
        runtime.seed = Some(*seed);
    }
    let settings_path = args
        .get_one::<PathBuf>("settings")
        .context("--settings is required")?;
    let config = load_project(settings_path, args.get_one::<PathBuf>("points"))?;

    let service = SurveyService::in_memory(&runtime)?;
    let design = service.generate(&config, &mut runtime.rng())?;
    let record = service
        .insert_design(ProjectId(1), config, design.clone())
        .await?;
    let summary = service.project_summary(record.project_id).await?;

    let report = GenerateReport {
        plot_count: design.plot_count(),
        sample_count: design.sample_count(),
        boundary: design.boundary,
        boundary_ring: design.boundary_ring(),
        summary,
        design,
    };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Plots: {}", report.plot_count);
        println!("Samples: {}", report.sample_count);
        println!(
            "Boundary: [{:.6}, {:.6}] - [{:.6}, {:.6}]",
            report.boundary.left, report.boundary.bottom, report.boundary.right, report.boundary.top
        );
        println!("Available for review: {}", report.summary.available);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let runtime = SurveySettings::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    telemetry::init(&runtime.telemetry);

    match matches.subcommand() {
        Some(("generate", args)) => generate(args, runtime).await,
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}
