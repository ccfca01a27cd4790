//! One end-to-end run: register a G-code, simulate or optimize it, then
//! download the results.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use helio_client::artifacts::{ArtifactResolver, DownloadedArtifact};
use helio_client::convert::{ColumnarConverter, NoConverter, ParquetCsvConverter};
use helio_client::optimization::run_optimization;
use helio_client::registration::{upload_and_register, RegistrationTarget};
use helio_client::simulation::run_simulation;
use helio_client::{ArtifactTransfer, HelioError, PollContext, Transport};
use helio_core::config::PollConfig;
use helio_core::job::JobKind;
use helio_core::progress::{NoProgress, ProgressSink};
use helio_core::settings::{OptimizationInputs, OptimizationSettings, SimulationSettings};

use crate::progress_bar::TerminalProgress;

/// What to run after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Simulate,
    Optimize,
}

impl Mode {
    pub fn parse(value: &str) -> Result<Self, HelioError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulate" | "simulation" => Ok(Self::Simulate),
            "optimize" | "optimization" => Ok(Self::Optimize),
            other => Err(HelioError::Config(format!(
                "HELIO_MODE must be 'simulate' or 'optimize', got '{other}'"
            ))),
        }
    }

    pub fn kind(self) -> JobKind {
        match self {
            Self::Simulate => JobKind::Simulation,
            Self::Optimize => JobKind::Optimization,
        }
    }
}

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub gcode_path: PathBuf,
    pub printer_id: String,
    pub material_id: String,
    pub mode: Mode,
    pub output_dir: PathBuf,
    pub chamber_temp_c: Option<f64>,
    pub bed_temp_c: Option<f64>,
    pub optimization: OptimizationInputs,
    /// Layer whose thermal history should also be exported.
    pub thermal_layer: Option<i64>,
    /// Write a CSV next to each downloaded Parquet export.
    pub convert_csv: bool,
    pub registration_poll: PollConfig,
    pub job_poll: PollConfig,
}

impl WorkflowConfig {
    /// Load the run from environment variables.
    ///
    /// | Env Var                | Required | Default    |
    /// |------------------------|----------|------------|
    /// | `HELIO_GCODE_PATH`     | yes      | --         |
    /// | `HELIO_PRINTER_ID`     | yes      | --         |
    /// | `HELIO_MATERIAL_ID`    | yes      | --         |
    /// | `HELIO_MODE`           | no       | `simulate` |
    /// | `HELIO_OUTPUT_DIR`     | no       | `.`        |
    /// | `HELIO_CHAMBER_TEMP`   | no       | --         |
    /// | `HELIO_BED_TEMP`       | no       | --         |
    /// | `HELIO_PRINT_PRIORITY` | no       | --         |
    /// | `HELIO_FROM_LAYER`     | no       | --         |
    /// | `HELIO_TO_LAYER`       | no       | --         |
    /// | `HELIO_THERMAL_LAYER`  | no       | --         |
    /// | `HELIO_CONVERT_CSV`    | no       | `true`     |
    pub fn from_env() -> Result<Self, HelioError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HelioError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                HelioError::Config(format!("{key} environment variable is required"))
            })
        };

        let mode = match get("HELIO_MODE") {
            Some(raw) => Mode::parse(&raw)?,
            None => Mode::default(),
        };

        Ok(Self {
            gcode_path: PathBuf::from(required("HELIO_GCODE_PATH")?),
            printer_id: required("HELIO_PRINTER_ID")?,
            material_id: required("HELIO_MATERIAL_ID")?,
            mode,
            output_dir: get("HELIO_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            chamber_temp_c: parse_opt(get("HELIO_CHAMBER_TEMP"), "HELIO_CHAMBER_TEMP")?,
            bed_temp_c: parse_opt(get("HELIO_BED_TEMP"), "HELIO_BED_TEMP")?,
            optimization: OptimizationInputs {
                print_priority: get("HELIO_PRINT_PRIORITY"),
                from_layer: parse_opt(get("HELIO_FROM_LAYER"), "HELIO_FROM_LAYER")?,
                to_layer: parse_opt(get("HELIO_TO_LAYER"), "HELIO_TO_LAYER")?,
                ..OptimizationInputs::default()
            },
            thermal_layer: parse_opt(get("HELIO_THERMAL_LAYER"), "HELIO_THERMAL_LAYER")?,
            convert_csv: parse_opt(get("HELIO_CONVERT_CSV"), "HELIO_CONVERT_CSV")?.unwrap_or(true),
            registration_poll: PollConfig::registration(),
            job_poll: PollConfig::job(),
        })
    }
}

fn parse_opt<T: std::str::FromStr>(
    raw: Option<String>,
    key: &str,
) -> Result<Option<T>, HelioError> {
    raw.map(|v| {
        v.parse()
            .map_err(|_| HelioError::Config(format!("{key} has an invalid value: '{v}'")))
    })
    .transpose()
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub gcode_id: String,
    pub job_id: String,
    pub kind: JobKind,
    /// Primary result, when the finished job exposed one.
    pub artifact: Option<PathBuf>,
    pub thermal_history: Option<DownloadedArtifact>,
}

/// Run register → simulate/optimize → download, strictly in that order.
pub async fn run(
    config: &WorkflowConfig,
    transport: &dyn Transport,
    transfer: &ArtifactTransfer,
    cancel: &CancellationToken,
    show_progress: bool,
) -> Result<WorkflowReport, HelioError> {
    let bar = |label: &'static str| -> Box<dyn ProgressSink> {
        if show_progress {
            Box::new(TerminalProgress::new(label))
        } else {
            Box::new(NoProgress)
        }
    };

    let target = RegistrationTarget {
        printer_id: config.printer_id.clone(),
        material_id: config.material_id.clone(),
    };
    let gcode = {
        let progress = bar("Registering");
        let ctx = PollContext::new(transport, progress.as_ref(), cancel);
        upload_and_register(&ctx, transfer, &config.registration_poll, &config.gcode_path, &target)
            .await?
    };
    tracing::info!(gcode_id = %gcode.id, "G-code registered");

    let simulation_settings =
        SimulationSettings::from_temperatures(config.chamber_temp_c, config.bed_temp_c);
    let kind = config.mode.kind();
    let (job_id, result_url) = {
        let progress = bar(match kind {
            JobKind::Optimization => "Optimizing",
            _ => "Simulating",
        });
        let ctx = PollContext::new(transport, progress.as_ref(), cancel);
        match config.mode {
            Mode::Simulate => {
                let finished =
                    run_simulation(&ctx, &config.job_poll, &gcode.id, &simulation_settings).await?;
                log_simulation(&finished.job);
                (finished.job.id, finished.result_url)
            }
            Mode::Optimize => {
                let settings = OptimizationSettings::build(&config.optimization);
                let finished = run_optimization(
                    &ctx,
                    &config.job_poll,
                    &gcode.id,
                    &simulation_settings,
                    &settings,
                )
                .await?;
                tracing::info!(
                    job_id = %finished.job.id,
                    quality_mean_improvement = finished.job.quality_mean_improvement,
                    quality_std_improvement = finished.job.quality_std_improvement,
                    "Optimization results",
                );
                (finished.job.id, finished.result_url)
            }
        }
    };

    tokio::fs::create_dir_all(&config.output_dir).await?;
    let converter: &dyn ColumnarConverter = if config.convert_csv {
        &ParquetCsvConverter
    } else {
        &NoConverter
    };
    let resolver =
        ArtifactResolver::new(transport, transfer, converter, config.output_dir.as_path());

    let artifact = match result_url {
        Some(url) => {
            let progress = bar("Downloading");
            let path = resolver
                .download_primary(&url, &config.gcode_path, kind, progress.as_ref())
                .await?;
            tracing::info!(path = %path.display(), "Result saved");
            Some(path)
        }
        None => {
            tracing::warn!(job_id = %job_id, "Finished job exposed no result URL");
            None
        }
    };

    let thermal_history = match config.thermal_layer {
        Some(layer) => {
            let progress = bar("Thermal history");
            let is_optimized = kind == JobKind::Optimization;
            match resolver
                .download_thermal_history(layer, is_optimized, &job_id, progress.as_ref())
                .await
            {
                Ok(downloaded) => downloaded,
                Err(e @ HelioError::ArtifactNotFound { .. }) => {
                    tracing::warn!(job_id = %job_id, layer, error = %e, "Thermal history skipped");
                    None
                }
                Err(e) => return Err(e),
            }
        }
        None => None,
    };

    Ok(WorkflowReport {
        gcode_id: gcode.id,
        job_id,
        kind,
        artifact,
        thermal_history,
    })
}

fn log_simulation(simulation: &helio_core::job::Simulation) {
    if let Some(info) = &simulation.print_info {
        tracing::info!(
            job_id = %simulation.id,
            outcome = info.print_outcome.as_deref().unwrap_or("N/A"),
            temperature_direction = info.temperature_direction.as_deref().unwrap_or("N/A"),
            "Simulation results",
        );
        for caveat in info.caveats.iter().flatten() {
            tracing::info!(caveat = %caveat.caveat_type, "{}", caveat.description);
        }
    }
    for fix in simulation.suggested_fixes.iter().flatten() {
        tracing::info!(category = %fix.category, "Suggested fix: {}", fix.fix);
    }
}
