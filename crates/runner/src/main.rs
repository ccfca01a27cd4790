//! `helio-runner` -- registers a G-code with Helio Additive, runs a
//! simulation or optimization, and downloads the result.
//!
//! # Environment variables
//!
//! | Variable                     | Required | Default    | Description                         |
//! |------------------------------|----------|------------|-------------------------------------|
//! | `HELIO_PAT`                  | no       | --         | Access token, else `~/.helio_config` |
//! | `HELIO_API_URL`              | no       | --         | Endpoint override                   |
//! | `HELIO_REGION`               | no       | `global`   | `global` or `china`                 |
//! | `HELIO_REQUEST_TIMEOUT_SECS` | no       | `60`       | Per-request timeout                 |
//! | `HELIO_GCODE_PATH`           | yes      | --         | Input G-code                        |
//! | `HELIO_PRINTER_ID`           | yes      | --         | Printer id                          |
//! | `HELIO_MATERIAL_ID`          | yes      | --         | Material id                         |
//! | `HELIO_MODE`                 | no       | `simulate` | `simulate` or `optimize`            |
//! | `HELIO_OUTPUT_DIR`           | no       | `.`        | Where results are written           |
//!
//! See [`helio_runner::workflow::WorkflowConfig::from_env`] for the
//! optional tuning variables.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helio_client::{ArtifactTransfer, HelioClient, HelioError};
use helio_core::config::{ClientConfig, TransferConfig};
use helio_core::credentials::load_token;
use helio_runner::workflow::{self, WorkflowConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helio_runner=info,helio_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(
            error = %e,
            correlation_id = e.correlation_id().unwrap_or_default(),
            "Workflow failed",
        );
        std::process::exit(1);
    }
}

async fn run() -> Result<(), HelioError> {
    let (token, _source) = load_token()?;
    let client = HelioClient::new(ClientConfig::from_env(token)?)?;
    let config = WorkflowConfig::from_env()?;
    let transfer = ArtifactTransfer::new(TransferConfig::default());

    tracing::info!(
        api_url = client.api_url(),
        gcode = %config.gcode_path.display(),
        mode = ?config.mode,
        "Starting helio-runner",
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current poll");
            on_signal.cancel();
        }
    });

    let report = workflow::run(&config, &client, &transfer, &cancel, true).await?;

    tracing::info!(
        gcode_id = %report.gcode_id,
        job_id = %report.job_id,
        kind = %report.kind,
        artifact = ?report.artifact,
        "Workflow complete",
    );
    Ok(())
}
