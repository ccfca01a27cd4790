//! Catalog and account queries: printers, materials, print priorities,
//! quota, default optimization settings, recent runs.
//!
//! Single-shot calls; nothing here is retried.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use helio_core::error::HelioError;
use helio_core::job::{Optimization, Simulation};

use crate::operations::{
    RemoteOperation, QUERY_DEFAULT_OPT_SETTINGS, QUERY_MATERIALS, QUERY_PRINTERS,
    QUERY_PRINT_PRIORITY_OPTIONS, QUERY_RECENT_RUNS, QUERY_USER_QUOTA,
};
use crate::transport::{take_field, take_optional_field, Transport};

/// Only this feedstock is offered for FDM workflows.
pub const FILAMENT_FEEDSTOCK: &str = "FILAMENT";

#[derive(Debug, Clone, Default, Deserialize)]
struct AlternativeNames {
    #[serde(default)]
    bambustudio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    feedstock: Option<String>,
    #[serde(default)]
    alternative_names: Option<AlternativeNames>,
}

impl CatalogEntry {
    fn slicer_name(&self) -> String {
        self.alternative_names
            .as_ref()
            .and_then(|a| a.bambustudio.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PageInfo {
    #[serde(default, rename = "hasNextPage")]
    has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page {
    #[serde(default)]
    objects: Vec<CatalogEntry>,
    #[serde(default)]
    page_info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Printer {
    pub id: String,
    pub name: String,
    /// Name used by Bambu Studio, empty when unknown.
    pub bambustudio_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub feedstock: String,
    pub bambustudio_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintPriorityOption {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserQuota {
    pub remaining_opts_this_month: i64,
    pub add_on_optimizations: i64,
    pub subscription_name: String,
    pub is_free_trial_active: bool,
    pub is_free_trial_claimed: bool,
    pub free_trial_eligible: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(default)]
    remaining_opts_this_month: Option<i64>,
    #[serde(default)]
    add_on_optimizations: Option<i64>,
    #[serde(default)]
    is_free_trial_active: Option<bool>,
    #[serde(default)]
    is_free_trial_claimed: Option<bool>,
    #[serde(default)]
    subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Subscription {
    #[serde(default)]
    name: Option<String>,
}

/// Recent jobs from the account history.
#[derive(Debug, Clone, Default)]
pub struct RecentRuns {
    pub optimizations: Vec<Optimization>,
    pub simulations: Vec<Simulation>,
}

#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    objects: Vec<T>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetch every page of a paginated catalog, in order.
async fn fetch_all_pages(
    transport: &dyn Transport,
    operation: &'static str,
    query: &'static str,
    root: &str,
) -> Result<Vec<CatalogEntry>, HelioError> {
    let mut entries = Vec::new();
    let mut page = 1u32;
    loop {
        let op = RemoteOperation::new(operation, query, json!({ "page": page }));
        let mut data = transport.execute(&op).await.into_data(operation)?;
        let Some(chunk) = take_optional_field::<Page>(&mut data, root, operation)? else {
            break;
        };
        entries.extend(chunk.objects);
        if !chunk.page_info.has_next_page {
            break;
        }
        page += 1;
    }
    tracing::debug!(operation, pages = page, count = entries.len(), "Fetched catalog");
    Ok(entries)
}

pub async fn list_printers(transport: &dyn Transport) -> Result<Vec<Printer>, HelioError> {
    let entries = fetch_all_pages(transport, "GetPrinters", QUERY_PRINTERS, "printers").await?;
    Ok(entries
        .into_iter()
        .map(|e| Printer {
            bambustudio_name: e.slicer_name(),
            id: e.id,
            name: e.name,
        })
        .collect())
}

/// Filament materials only.
pub async fn list_materials(transport: &dyn Transport) -> Result<Vec<Material>, HelioError> {
    let entries = fetch_all_pages(transport, "GetMaterials", QUERY_MATERIALS, "materials").await?;
    Ok(entries
        .into_iter()
        .filter(|e| e.feedstock.as_deref() == Some(FILAMENT_FEEDSTOCK))
        .map(|e| Material {
            bambustudio_name: e.slicer_name(),
            feedstock: FILAMENT_FEEDSTOCK.to_string(),
            id: e.id,
            name: e.name,
        })
        .collect())
}

pub async fn print_priority_options(
    transport: &dyn Transport,
    material_id: &str,
) -> Result<Vec<PrintPriorityOption>, HelioError> {
    const OP: &str = "GetPrintPriorityOptions";
    let op = RemoteOperation::new(
        OP,
        QUERY_PRINT_PRIORITY_OPTIONS,
        json!({ "materialId": material_id }),
    );
    let mut data = transport.execute(&op).await.into_data(OP)?;
    Ok(take_optional_field(&mut data, "printPriorityOptions", OP)?.unwrap_or_default())
}

pub async fn user_quota(transport: &dyn Transport) -> Result<UserQuota, HelioError> {
    const OP: &str = "GetUserRemainingOpts";
    let op = RemoteOperation::bare(OP, QUERY_USER_QUOTA);
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let user: UserRecord = take_field(&mut data, "user", OP)?;
    let free_trial_eligible: Option<bool> =
        take_optional_field(&mut data, "freeTrialEligibility", OP)?;

    Ok(UserQuota {
        remaining_opts_this_month: user.remaining_opts_this_month.unwrap_or(0),
        add_on_optimizations: user.add_on_optimizations.unwrap_or(0),
        subscription_name: user
            .subscription
            .and_then(|s| s.name)
            .unwrap_or_default(),
        is_free_trial_active: user.is_free_trial_active.unwrap_or(false),
        is_free_trial_claimed: user.is_free_trial_claimed.unwrap_or(false),
        free_trial_eligible: free_trial_eligible.unwrap_or(false),
    })
}

/// Server-recommended optimization settings for a G-code, passed through
/// as returned.
pub async fn default_optimization_settings(
    transport: &dyn Transport,
    gcode_id: &str,
) -> Result<Option<Value>, HelioError> {
    const OP: &str = "DefaultOptimizationSettings";
    let op = RemoteOperation::new(OP, QUERY_DEFAULT_OPT_SETTINGS, json!({ "gcodeId": gcode_id }));
    let mut data = transport.execute(&op).await.into_data(OP)?;
    take_optional_field(&mut data, "defaultOptimizationSettings", OP)
}

pub async fn recent_runs(transport: &dyn Transport) -> Result<RecentRuns, HelioError> {
    const OP: &str = "GetRecentRuns";
    let op = RemoteOperation::bare(OP, QUERY_RECENT_RUNS);
    let mut data = transport.execute(&op).await.into_data(OP)?;
    let optimizations: Option<ObjectList<Optimization>> =
        take_optional_field(&mut data, "optimizations", OP)?;
    let simulations: Option<ObjectList<Simulation>> =
        take_optional_field(&mut data, "simulations", OP)?;

    Ok(RecentRuns {
        optimizations: optimizations.map(|l| l.objects).unwrap_or_default(),
        simulations: simulations.map(|l| l.objects).unwrap_or_default(),
    })
}
