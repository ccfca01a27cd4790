//! Result artifact resolution and download.
//!
//! Each URL lookup is one envelope call. A missing URL means the data is
//! not available for this job and is returned as `None`; a download that
//! answers 404 is surfaced as [`HelioError::ArtifactNotFound`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::json;

use helio_core::error::HelioError;
use helio_core::job::JobKind;
use helio_core::progress::ProgressSink;

use crate::convert::{convert_or_keep, csv_sibling, ColumnarConverter};
use crate::operations::{
    RemoteOperation, QUERY_OPTIMIZATION_MESH, QUERY_SIMULATION_MESH, QUERY_THERMAL_HISTORIES,
};
use crate::transfer::ArtifactTransfer;
use crate::transport::{take_field, take_optional_field, Transport};

/// Which mesh an optimization export refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshVariant {
    /// Mesh of the input toolpath.
    Original,
    /// Mesh after optimization.
    Optimized,
}

impl MeshVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Optimized => "optimized",
        }
    }
}

impl fmt::Display for MeshVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job whose mesh export is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshSource<'a> {
    Simulation(&'a str),
    Optimization(&'a str, MeshVariant),
}

impl MeshSource<'_> {
    /// Variant used in the local file name. Simulations only have one mesh.
    pub fn variant(&self) -> MeshVariant {
        match self {
            Self::Simulation(_) => MeshVariant::Original,
            Self::Optimization(_, variant) => *variant,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Asset {
    #[serde(default)]
    url: Option<String>,
}

fn non_blank(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

// ---------------------------------------------------------------------------
// URL resolution
// ---------------------------------------------------------------------------

/// Thermal history export of one layer. `job_id` may be a simulation or an
/// optimization id.
pub async fn thermal_history_url(
    transport: &dyn Transport,
    layer: i64,
    is_optimized: bool,
    job_id: &str,
) -> Result<Option<String>, HelioError> {
    const OP: &str = "ThermalHistories";
    let op = RemoteOperation::new(
        OP,
        QUERY_THERMAL_HISTORIES,
        json!({ "isOptimized": is_optimized, "layer": layer, "optimizationId": job_id }),
    );
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let asset: Asset = take_field(&mut data, "thermalHistories", OP)?;
    Ok(non_blank(asset.url))
}

pub async fn simulation_mesh_url(
    transport: &dyn Transport,
    simulation_id: &str,
) -> Result<Option<String>, HelioError> {
    const OP: &str = "SimulationMesh";
    let op = RemoteOperation::new(OP, QUERY_SIMULATION_MESH, json!({ "id": simulation_id }));
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let mut simulation: serde_json::Value = take_field(&mut data, "simulation", OP)?;
    let asset: Option<Asset> = take_optional_field(&mut simulation, "meshUrl", OP)?;
    Ok(non_blank(asset.and_then(|a| a.url)))
}

pub async fn optimization_mesh_url(
    transport: &dyn Transport,
    optimization_id: &str,
    variant: MeshVariant,
) -> Result<Option<String>, HelioError> {
    const OP: &str = "OptimizationMesh";
    let op = RemoteOperation::new(OP, QUERY_OPTIMIZATION_MESH, json!({ "id": optimization_id }));
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let mut optimization: serde_json::Value = take_field(&mut data, "optimization", OP)?;
    let field = match variant {
        MeshVariant::Original => "originalMeshAsset",
        MeshVariant::Optimized => "optimizedMeshAsset",
    };
    let asset: Option<Asset> = take_optional_field(&mut optimization, field, OP)?;
    Ok(non_blank(asset.and_then(|a| a.url)))
}

pub async fn mesh_url(
    transport: &dyn Transport,
    source: MeshSource<'_>,
) -> Result<Option<String>, HelioError> {
    match source {
        MeshSource::Simulation(id) => simulation_mesh_url(transport, id).await,
        MeshSource::Optimization(id, variant) => {
            optimization_mesh_url(transport, id, variant).await
        }
    }
}

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

pub fn thermal_history_file_name(layer: i64) -> String {
    format!("thermal_history_layer{layer}.parquet")
}

pub fn mesh_file_name(variant: MeshVariant) -> String {
    format!("mesh_{variant}.parquet")
}

/// Local path of a job's primary artifact, derived from the input file's
/// stem: `<stem>_thermal_index.gcode` or `<stem>_optimized.gcode`.
pub fn primary_artifact_path(output_dir: &Path, input: &Path, kind: JobKind) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");
    let suffix = match kind {
        JobKind::Optimization => "optimized",
        JobKind::Simulation | JobKind::Registration => "thermal_index",
    };
    output_dir.join(format!("{stem}_{suffix}.gcode"))
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

/// A downloaded export and its optional converted sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub raw_path: PathBuf,
    /// `None` when no converter ran or conversion failed.
    pub converted_path: Option<PathBuf>,
    pub bytes: u64,
}

/// Resolves export URLs and downloads them into `output_dir`.
pub struct ArtifactResolver<'a> {
    transport: &'a dyn Transport,
    transfer: &'a ArtifactTransfer,
    converter: &'a dyn ColumnarConverter,
    output_dir: PathBuf,
}

impl<'a> ArtifactResolver<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        transfer: &'a ArtifactTransfer,
        converter: &'a dyn ColumnarConverter,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            transfer,
            converter,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download one layer's thermal history. `None` when the service has no
    /// URL for it.
    pub async fn download_thermal_history(
        &self,
        layer: i64,
        is_optimized: bool,
        job_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Option<DownloadedArtifact>, HelioError> {
        let Some(url) = thermal_history_url(self.transport, layer, is_optimized, job_id).await?
        else {
            tracing::info!(job_id, layer, "No thermal history URL available");
            return Ok(None);
        };
        let raw_path = self.output_dir.join(thermal_history_file_name(layer));
        self.fetch_columnar(&url, raw_path, progress).await.map(Some)
    }

    /// Download a mesh export. `None` when the service has no URL for it.
    pub async fn download_mesh(
        &self,
        source: MeshSource<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<Option<DownloadedArtifact>, HelioError> {
        let Some(url) = mesh_url(self.transport, source).await? else {
            tracing::info!(variant = %source.variant(), "No mesh URL available");
            return Ok(None);
        };
        let raw_path = self.output_dir.join(mesh_file_name(source.variant()));
        self.fetch_columnar(&url, raw_path, progress).await.map(Some)
    }

    /// Download a finished job's primary artifact next to `input`'s name.
    pub async fn download_primary(
        &self,
        url: &str,
        input: &Path,
        kind: JobKind,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, HelioError> {
        let dest = primary_artifact_path(&self.output_dir, input, kind);
        self.transfer.download(url, &dest, progress).await?;
        Ok(dest)
    }

    async fn fetch_columnar(
        &self,
        url: &str,
        raw_path: PathBuf,
        progress: &dyn ProgressSink,
    ) -> Result<DownloadedArtifact, HelioError> {
        let bytes = self.transfer.download(url, &raw_path, progress).await?;
        let converted_path = convert_or_keep(self.converter, &raw_path, &csv_sibling(&raw_path));
        Ok(DownloadedArtifact {
            raw_path,
            converted_path,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_names_follow_input_stem() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            primary_artifact_path(out, Path::new("/data/benchy.gcode"), JobKind::Simulation),
            PathBuf::from("/tmp/out/benchy_thermal_index.gcode")
        );
        assert_eq!(
            primary_artifact_path(out, Path::new("benchy.gcode"), JobKind::Optimization),
            PathBuf::from("/tmp/out/benchy_optimized.gcode")
        );
    }

    #[test]
    fn export_file_names() {
        assert_eq!(thermal_history_file_name(12), "thermal_history_layer12.parquet");
        assert_eq!(mesh_file_name(MeshVariant::Optimized), "mesh_optimized.parquet");
        assert_eq!(
            MeshSource::Simulation("s1").variant(),
            MeshVariant::Original
        );
    }
}
