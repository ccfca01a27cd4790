//! Job status model and typed records for the three remote job kinds.
//!
//! The client never writes `status` or `progress`; these types are only
//! ever deserialized from service responses.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Kinds and statuses
// ---------------------------------------------------------------------------

/// The three kinds of remote asynchronous work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobKind {
    /// Uploaded G-code being validated and processed.
    Registration,
    Simulation,
    Optimization,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registration => "G-code registration",
            Self::Simulation => "Simulation",
            Self::Optimization => "Optimization",
        };
        f.write_str(label)
    }
}

/// Status value reported by the service.
///
/// Known terminal values get their own variant; anything else (`SUBMITTED`,
/// `PROCESSING`, `RUNNING`, ...) is kept verbatim in [`JobStatus::Other`].
/// A `null` status decodes to the empty (unknown) status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum JobStatus {
    Ready,
    Error,
    Restricted,
    Finished,
    Failed,
    Other(String),
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "READY" => Self::Ready,
            "ERROR" => Self::Error,
            "RESTRICTED" => Self::Restricted,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<Option<String>> for JobStatus {
    fn from(s: Option<String>) -> Self {
        s.map(Self::from).unwrap_or_default()
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ready => "READY",
            Self::Error => "ERROR",
            Self::Restricted => "RESTRICTED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }

    /// The service did not report a status.
    pub fn is_unknown(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a status sits in a kind's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Keep polling.
    Pending,
    /// Terminal success.
    Succeeded,
    /// Terminal failure.
    Failed,
}

impl JobKind {
    /// Classify a status for this kind. Terminal values differ per kind:
    /// registrations end in `READY`/`ERROR`/`RESTRICTED`, simulations and
    /// optimizations in `FINISHED`/`FAILED`.
    pub fn phase(self, status: &JobStatus) -> JobPhase {
        match (self, status) {
            (Self::Registration, JobStatus::Ready) => JobPhase::Succeeded,
            (Self::Registration, JobStatus::Error | JobStatus::Restricted) => JobPhase::Failed,
            (Self::Simulation | Self::Optimization, JobStatus::Finished) => JobPhase::Succeeded,
            (Self::Simulation | Self::Optimization, JobStatus::Failed) => JobPhase::Failed,
            _ => JobPhase::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Registration (G-code) records
// ---------------------------------------------------------------------------

/// Structured diagnostic attached to a G-code during processing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GcodeDiagnostic {
    #[serde(default)]
    pub line: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A registered G-code as returned by `createGcodeV2` / `gcodeV2`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gcode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size_kb: Option<f64>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub errors_v2: Option<Vec<GcodeDiagnostic>>,
}

impl Gcode {
    /// Flatten both diagnostic lists into human-readable lines.
    ///
    /// Structured entries render as `"<type> (line N)"`; entries with
    /// neither a type nor a line are dropped.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut out: Vec<String> = self.errors.clone().unwrap_or_default();
        for diag in self.errors_v2.iter().flatten() {
            let mut detail = diag.kind.clone();
            if let Some(line) = diag.line {
                detail.push_str(&format!(" (line {line})"));
            }
            if !detail.is_empty() {
                out.push(detail);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Simulation records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Caveat {
    #[serde(default)]
    pub caveat_type: String,
    #[serde(default)]
    pub description: String,
}

/// Print outcome summary of a simulation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintInfo {
    #[serde(default)]
    pub print_outcome: Option<String>,
    #[serde(default)]
    pub print_outcome_description: Option<String>,
    #[serde(default)]
    pub temperature_direction: Option<String>,
    #[serde(default)]
    pub temperature_direction_description: Option<String>,
    #[serde(default)]
    pub caveats: Option<Vec<Caveat>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedFix {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub fix: String,
    #[serde(default)]
    pub extra_details: Option<Vec<String>>,
    #[serde(default)]
    pub order_index: Option<i64>,
}

/// A thermal simulation job.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    /// Presigned URL of the thermal-index G-code, set once finished.
    #[serde(default)]
    pub thermal_index_gcode_url: Option<String>,
    #[serde(default)]
    pub print_info: Option<PrintInfo>,
    #[serde(default)]
    pub speed_factor: Option<f64>,
    #[serde(default)]
    pub suggested_fixes: Option<Vec<SuggestedFix>>,
}

// ---------------------------------------------------------------------------
// Optimization records
// ---------------------------------------------------------------------------

/// A toolpath optimization job.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    /// Presigned URL of the optimized G-code, set once finished.
    #[serde(default)]
    pub optimized_gcode_with_thermal_indexes_url: Option<String>,
    #[serde(default)]
    pub quality_std_improvement: Option<f64>,
    #[serde(default)]
    pub quality_mean_improvement: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_strings() {
        let parsed: JobStatus = serde_json::from_str("\"RESTRICTED\"").unwrap();
        assert_eq!(parsed, JobStatus::Restricted);

        let other: JobStatus = serde_json::from_str("\"PROCESSING\"").unwrap();
        assert_eq!(other, JobStatus::Other("PROCESSING".into()));
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"PROCESSING\"");
    }

    #[test]
    fn terminal_statuses_depend_on_kind() {
        assert_eq!(JobKind::Registration.phase(&JobStatus::Ready), JobPhase::Succeeded);
        assert_eq!(JobKind::Registration.phase(&JobStatus::Restricted), JobPhase::Failed);
        assert_eq!(JobKind::Registration.phase(&JobStatus::Finished), JobPhase::Pending);
        assert_eq!(JobKind::Simulation.phase(&JobStatus::Finished), JobPhase::Succeeded);
        assert_eq!(JobKind::Optimization.phase(&JobStatus::Failed), JobPhase::Failed);
        assert_eq!(JobKind::Simulation.phase(&JobStatus::Ready), JobPhase::Pending);
        assert_eq!(
            JobKind::Simulation.phase(&JobStatus::from("RUNNING")),
            JobPhase::Pending
        );
    }

    #[test]
    fn gcode_diagnostics_merge_both_lists() {
        let gcode: Gcode = serde_json::from_value(serde_json::json!({
            "id": "g1",
            "status": "PROCESSING",
            "errors": ["unsupported slicer"],
            "errorsV2": [
                {"type": "INVALID_COMMAND", "line": 12},
                {"type": "MISSING_HEADER", "line": null},
                {"type": "", "line": null}
            ]
        }))
        .unwrap();

        assert_eq!(
            gcode.diagnostics(),
            vec![
                "unsupported slicer".to_string(),
                "INVALID_COMMAND (line 12)".to_string(),
                "MISSING_HEADER".to_string(),
            ]
        );
    }

    #[test]
    fn null_lists_mean_no_diagnostics() {
        let gcode: Gcode = serde_json::from_value(serde_json::json!({
            "id": "g1",
            "status": "READY",
            "progress": 100,
            "errors": null,
            "errorsV2": null
        }))
        .unwrap();
        assert!(gcode.diagnostics().is_empty());
        assert_eq!(gcode.progress, Some(100.0));
    }

    #[test]
    fn missing_status_defaults_to_empty_other() {
        let sim: Simulation = serde_json::from_value(serde_json::json!({"id": "s1"})).unwrap();
        assert_eq!(sim.status, JobStatus::Other(String::new()));
        assert!(sim.status.is_unknown());
        assert!(sim.thermal_index_gcode_url.is_none());
    }

    #[test]
    fn null_status_is_unknown_not_an_error() {
        let sim: Simulation = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "status": null,
            "progress": 5
        }))
        .unwrap();
        assert!(sim.status.is_unknown());
        assert_eq!(sim.progress, Some(5.0));
        assert_eq!(JobKind::Simulation.phase(&sim.status), JobPhase::Pending);
    }
}
