//! Thermal simulation pipeline.

use chrono::Utc;
use serde_json::json;

use helio_core::config::{PollConfig, DEFAULT_CLIENT_NAME};
use helio_core::error::HelioError;
use helio_core::job::{JobKind, JobStatus, Simulation};
use helio_core::naming::timestamped_name;
use helio_core::settings::SimulationSettings;

use crate::operations::{RemoteOperation, MUTATION_CREATE_SIMULATION, QUERY_POLL_SIMULATION};
use crate::polling::{poll_once, poll_until_terminal, FinishedJob, JobAdapter, PollContext};
use crate::transport::{take_field, Transport};

pub struct SimulationAdapter;

impl JobAdapter for SimulationAdapter {
    type Job = Simulation;

    const KIND: JobKind = JobKind::Simulation;
    const POLL_OPERATION: &'static str = "Simulation";
    const POLL_QUERY: &'static str = QUERY_POLL_SIMULATION;
    const ROOT_FIELD: &'static str = "simulation";

    fn status(job: &Simulation) -> &JobStatus {
        &job.status
    }

    fn progress(job: &Simulation) -> Option<f64> {
        job.progress
    }

    fn result_url(job: &Simulation) -> Option<&str> {
        job.thermal_index_gcode_url.as_deref()
    }
}

/// Create a simulation for a registered G-code.
pub async fn create_simulation(
    transport: &dyn Transport,
    gcode_id: &str,
    settings: &SimulationSettings,
) -> Result<Simulation, HelioError> {
    const OP: &str = "CreateSimulation";
    let op = RemoteOperation::new(
        OP,
        MUTATION_CREATE_SIMULATION,
        json!({
            "input": {
                "name": timestamped_name(DEFAULT_CLIENT_NAME, Utc::now()),
                "gcodeId": gcode_id,
                "simulationSettings": settings,
            }
        }),
    );
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let simulation: Simulation = take_field(&mut data, "createSimulation", OP)?;
    tracing::info!(
        job_id = %simulation.id,
        name = simulation.name.as_deref().unwrap_or_default(),
        "Simulation created",
    );
    Ok(simulation)
}

/// Create a simulation and poll it to `FINISHED`.
pub async fn run_simulation(
    ctx: &PollContext<'_>,
    config: &PollConfig,
    gcode_id: &str,
    settings: &SimulationSettings,
) -> Result<FinishedJob<Simulation>, HelioError> {
    let created = create_simulation(ctx.transport, gcode_id, settings).await?;
    poll_until_terminal::<SimulationAdapter>(ctx, config, &created.id, created.status).await
}

/// One status check of an existing simulation, without looping.
pub async fn fetch_simulation(
    transport: &dyn Transport,
    simulation_id: &str,
) -> Result<Simulation, HelioError> {
    poll_once::<SimulationAdapter>(transport, simulation_id).await
}
