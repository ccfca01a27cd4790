//! Result artifact resolution and download.

mod common;

use std::path::Path;

use assert_matches::assert_matches;
use serde_json::json;

use common::{data, ObjectStore, ScriptedTransport};
use helio_client::artifacts::{
    optimization_mesh_url, thermal_history_url, ArtifactResolver, MeshSource, MeshVariant,
};
use helio_client::convert::{ColumnarConverter, ConversionError, NoConverter};
use helio_client::{ArtifactTransfer, HelioError, OperationOutcome};
use helio_core::config::TransferConfig;
use helio_core::job::JobKind;
use helio_core::progress::NoProgress;

fn transfer() -> ArtifactTransfer {
    ArtifactTransfer::new(TransferConfig::default())
}

/// Writes a fixed CSV, standing in for a real columnar reader.
struct FixedCsv;

impl ColumnarConverter for FixedCsv {
    fn convert(&self, _source: &Path, target: &Path) -> Result<(), ConversionError> {
        std::fs::write(target, "x,y,z\n").map_err(|e| ConversionError::Failed(e.to_string()))
    }
}

#[tokio::test]
async fn thermal_history_request_and_missing_url() {
    let transport = ScriptedTransport::new([data(
        "thermalHistories",
        json!({ "assetType": "PARQUET", "url": null }),
    )]);

    let url = thermal_history_url(&transport, 12, true, "o-1").await.unwrap();
    assert!(url.is_none());
    assert_eq!(
        transport.calls()[0].variables,
        json!({ "isOptimized": true, "layer": 12, "optimizationId": "o-1" })
    );
}

#[tokio::test]
async fn optimization_mesh_selects_variant() {
    let payload = json!({
        "optimizedMeshAsset": { "url": "https://s/optimized" },
        "originalMeshAsset": null
    });
    let transport = ScriptedTransport::new([
        data("optimization", payload.clone()),
        data("optimization", payload),
    ]);

    assert_eq!(
        optimization_mesh_url(&transport, "o-1", MeshVariant::Optimized).await.unwrap().as_deref(),
        Some("https://s/optimized")
    );
    assert!(optimization_mesh_url(&transport, "o-1", MeshVariant::Original)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn missing_job_is_unexpected_response() {
    let transport = ScriptedTransport::new([data("simulation", serde_json::Value::Null)]);
    let dir = tempfile::tempdir().unwrap();
    let transfer = transfer();
    let resolver = ArtifactResolver::new(&transport, &transfer, &NoConverter, dir.path());

    let err = resolver
        .download_mesh(MeshSource::Simulation("s-404"), &NoProgress)
        .await
        .unwrap_err();
    assert_matches!(err, HelioError::UnexpectedResponse { operation: "SimulationMesh", .. });
}

#[tokio::test]
async fn protocol_error_is_not_retried() {
    let transport = ScriptedTransport::new([
        OperationOutcome::service_errors(vec!["Forbidden".into()], "t-9"),
        data("thermalHistories", json!({ "url": "https://never" })),
    ]);
    let err = thermal_history_url(&transport, 1, false, "s-1").await.unwrap_err();
    assert_matches!(err, HelioError::Protocol { .. });
    assert_eq!(transport.remaining(), 1);
}

#[tokio::test]
async fn thermal_history_downloads_and_converts() {
    let store = ObjectStore::default();
    store.insert("th", b"PAR1-bytes".to_vec());
    let base = store.start().await;
    let transport = ScriptedTransport::new([data(
        "thermalHistories",
        json!({ "url": format!("{base}/objects/th?X-Amz-Signature=s") }),
    )]);
    let dir = tempfile::tempdir().unwrap();
    let transfer = transfer();
    let resolver = ArtifactResolver::new(&transport, &transfer, &FixedCsv, dir.path());

    let artifact = resolver
        .download_thermal_history(7, false, "s-1", &NoProgress)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.raw_path, dir.path().join("thermal_history_layer7.parquet"));
    assert_eq!(artifact.converted_path, Some(dir.path().join("thermal_history_layer7.csv")));
    assert_eq!(artifact.bytes, 10);
    assert_eq!(std::fs::read(&artifact.raw_path).unwrap(), b"PAR1-bytes");
}

#[tokio::test]
async fn mesh_without_converter_keeps_raw_file() {
    let store = ObjectStore::default();
    store.insert("mesh", vec![1u8; 64]);
    let base = store.start().await;
    let transport = ScriptedTransport::new([data(
        "simulation",
        json!({ "meshUrl": { "assetType": "PARQUET", "url": format!("{base}/objects/mesh") } }),
    )]);
    let dir = tempfile::tempdir().unwrap();
    let transfer = transfer();
    let resolver = ArtifactResolver::new(&transport, &transfer, &NoConverter, dir.path());

    let artifact = resolver
        .download_mesh(MeshSource::Simulation("s-1"), &NoProgress)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.raw_path, dir.path().join("mesh_original.parquet"));
    assert!(artifact.converted_path.is_none());
    assert!(artifact.raw_path.exists());
}

#[tokio::test]
async fn gated_export_surfaces_not_found() {
    let store = ObjectStore::default();
    let base = store.start().await;
    let transport = ScriptedTransport::new([data(
        "optimization",
        json!({ "optimizedMeshAsset": { "url": format!("{base}/objects/gone") } }),
    )]);
    let dir = tempfile::tempdir().unwrap();
    let transfer = transfer();
    let resolver = ArtifactResolver::new(&transport, &transfer, &NoConverter, dir.path());

    let err = resolver
        .download_mesh(MeshSource::Optimization("o-1", MeshVariant::Optimized), &NoProgress)
        .await
        .unwrap_err();
    assert_matches!(err, HelioError::ArtifactNotFound { .. });
}

#[tokio::test]
async fn absent_mesh_url_is_none() {
    let transport = ScriptedTransport::new([data("simulation", json!({ "meshUrl": null }))]);
    let dir = tempfile::tempdir().unwrap();
    let transfer = transfer();
    let resolver = ArtifactResolver::new(&transport, &transfer, &NoConverter, dir.path());

    let artifact = resolver
        .download_mesh(MeshSource::Simulation("s-1"), &NoProgress)
        .await
        .unwrap();
    assert!(artifact.is_none());
}

#[tokio::test]
async fn primary_artifact_lands_next_to_input_name() {
    let store = ObjectStore::default();
    store.insert("opt", b"G1 X5\n".to_vec());
    let base = store.start().await;
    let transport = ScriptedTransport::default();
    let dir = tempfile::tempdir().unwrap();
    let transfer = transfer();
    let resolver = ArtifactResolver::new(&transport, &transfer, &NoConverter, dir.path());

    let path = resolver
        .download_primary(
            &format!("{base}/objects/opt"),
            Path::new("/jobs/benchy.gcode"),
            JobKind::Optimization,
            &NoProgress,
        )
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("benchy_optimized.gcode"));
    assert_eq!(std::fs::read(path).unwrap(), b"G1 X5\n");
}
