//! G-code registration: presigned upload, create, then poll until the
//! service has validated the file.

use std::path::Path;

use serde::Deserialize;
use serde_json::json;

use helio_core::config::PollConfig;
use helio_core::error::HelioError;
use helio_core::job::{Gcode, JobKind, JobPhase, JobStatus};
use helio_core::naming::gcode_name_from_key;

use crate::operations::{
    RemoteOperation, MUTATION_CREATE_GCODE, QUERY_POLL_GCODE, QUERY_PRESIGNED_URL,
};
use crate::polling::{poll_until_terminal, JobAdapter, PollContext};
use crate::transfer::ArtifactTransfer;
use crate::transport::{take_field, Transport};

/// File name sent when requesting a write location. The service derives
/// the storage key from it; the real file name plays no part.
pub const UPLOAD_FILE_NAME: &str = "test.gcode";

/// Downstream configuration a G-code is registered against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationTarget {
    pub printer_id: String,
    pub material_id: String,
}

/// Write location issued by `getPresignedUrl`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub url: String,
    pub key: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Request a presigned write location.
pub async fn get_presigned_url(transport: &dyn Transport) -> Result<PresignedUpload, HelioError> {
    const OP: &str = "GetPresignedUrl";
    let op = RemoteOperation::new(OP, QUERY_PRESIGNED_URL, json!({ "fileName": UPLOAD_FILE_NAME }));
    let mut data = transport.execute(&op).await.into_data(OP)?;
    take_field(&mut data, "getPresignedUrl", OP)
}

/// Register an uploaded key. Returns the job with its initial status.
pub async fn create_gcode(
    transport: &dyn Transport,
    key: &str,
    target: &RegistrationTarget,
) -> Result<Gcode, HelioError> {
    const OP: &str = "CreateGcode";
    let op = RemoteOperation::new(
        OP,
        MUTATION_CREATE_GCODE,
        json!({
            "input": {
                "name": gcode_name_from_key(key),
                "printerId": target.printer_id,
                "materialId": target.material_id,
                "gcodeKey": key,
                "isSingleShell": true,
            }
        }),
    );
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let gcode: Gcode = take_field(&mut data, "createGcodeV2", OP)?;
    tracing::info!(job_id = %gcode.id, status = %gcode.status, "G-code created");
    Ok(gcode)
}

/// Polling capabilities of a registration.
pub struct GcodeAdapter;

impl JobAdapter for GcodeAdapter {
    type Job = Gcode;

    const KIND: JobKind = JobKind::Registration;
    const POLL_OPERATION: &'static str = "GcodeV2";
    const POLL_QUERY: &'static str = QUERY_POLL_GCODE;
    const ROOT_FIELD: &'static str = "gcodeV2";

    fn status(job: &Gcode) -> &JobStatus {
        &job.status
    }

    fn progress(job: &Gcode) -> Option<f64> {
        job.progress
    }

    fn diagnostics(job: &Gcode) -> Vec<String> {
        job.diagnostics()
    }

    fn terminal_failure(job_id: &str, job: &Gcode) -> HelioError {
        HelioError::RegistrationRejected {
            job_id: job_id.to_string(),
            status: job.status.clone(),
        }
    }
}

/// Upload a local G-code and drive its registration to `READY`.
///
/// Steps run strictly in order: write location, upload, create, poll.
/// A create response that is already terminal skips polling.
pub async fn upload_and_register(
    ctx: &PollContext<'_>,
    transfer: &ArtifactTransfer,
    config: &PollConfig,
    path: &Path,
    target: &RegistrationTarget,
) -> Result<Gcode, HelioError> {
    tracing::info!(path = %path.display(), "Registering G-code");

    let presigned = get_presigned_url(ctx.transport).await?;
    transfer.upload_file(&presigned.url, path).await?;

    let gcode = create_gcode(ctx.transport, &presigned.key, target).await?;
    match JobKind::Registration.phase(&gcode.status) {
        JobPhase::Succeeded => return Ok(gcode),
        JobPhase::Failed => return Err(GcodeAdapter::terminal_failure(&gcode.id, &gcode)),
        JobPhase::Pending => {}
    }

    let job_id = gcode.id.clone();
    let finished = poll_until_terminal::<GcodeAdapter>(ctx, config, &job_id, gcode.status).await?;
    tracing::info!(job_id = %job_id, "G-code ready");
    Ok(finished.job)
}
