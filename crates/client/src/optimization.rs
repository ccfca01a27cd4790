//! Toolpath optimization pipeline.

use chrono::Utc;
use serde_json::json;

use helio_core::config::{PollConfig, DEFAULT_CLIENT_NAME};
use helio_core::error::HelioError;
use helio_core::job::{JobKind, JobStatus, Optimization};
use helio_core::naming::timestamped_name;
use helio_core::settings::{OptimizationSettings, SimulationSettings};

use crate::operations::{RemoteOperation, MUTATION_CREATE_OPTIMIZATION, QUERY_POLL_OPTIMIZATION};
use crate::polling::{poll_once, poll_until_terminal, FinishedJob, JobAdapter, PollContext};
use crate::transport::{take_field, Transport};

pub struct OptimizationAdapter;

impl JobAdapter for OptimizationAdapter {
    type Job = Optimization;

    const KIND: JobKind = JobKind::Optimization;
    const POLL_OPERATION: &'static str = "Optimization";
    const POLL_QUERY: &'static str = QUERY_POLL_OPTIMIZATION;
    const ROOT_FIELD: &'static str = "optimization";

    fn status(job: &Optimization) -> &JobStatus {
        &job.status
    }

    fn progress(job: &Optimization) -> Option<f64> {
        job.progress
    }

    fn result_url(job: &Optimization) -> Option<&str> {
        job.optimized_gcode_with_thermal_indexes_url.as_deref()
    }
}

/// Create an optimization for a registered G-code.
pub async fn create_optimization(
    transport: &dyn Transport,
    gcode_id: &str,
    simulation: &SimulationSettings,
    optimization: &OptimizationSettings,
) -> Result<Optimization, HelioError> {
    const OP: &str = "CreateOptimization";
    let op = RemoteOperation::new(
        OP,
        MUTATION_CREATE_OPTIMIZATION,
        json!({
            "input": {
                "name": timestamped_name(DEFAULT_CLIENT_NAME, Utc::now()),
                "gcodeId": gcode_id,
                "simulationSettings": simulation,
                "optimizationSettings": optimization,
            }
        }),
    );
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let created: Optimization = take_field(&mut data, "createOptimization", OP)?;
    tracing::info!(
        job_id = %created.id,
        name = created.name.as_deref().unwrap_or_default(),
        "Optimization created",
    );
    Ok(created)
}

/// Create an optimization and poll it to `FINISHED`.
pub async fn run_optimization(
    ctx: &PollContext<'_>,
    config: &PollConfig,
    gcode_id: &str,
    simulation: &SimulationSettings,
    optimization: &OptimizationSettings,
) -> Result<FinishedJob<Optimization>, HelioError> {
    let created = create_optimization(ctx.transport, gcode_id, simulation, optimization).await?;
    poll_until_terminal::<OptimizationAdapter>(ctx, config, &created.id, created.status).await
}

/// One status check of an existing optimization, without looping.
pub async fn fetch_optimization(
    transport: &dyn Transport,
    optimization_id: &str,
) -> Result<Optimization, HelioError> {
    poll_once::<OptimizationAdapter>(transport, optimization_id).await
}
