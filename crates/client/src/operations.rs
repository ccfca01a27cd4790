//! GraphQL operation texts and the [`RemoteOperation`] value sent per call.

use serde_json::Value;

/// An immutable (query text, variables) pair plus a short name used in
/// error messages and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOperation {
    pub name: &'static str,
    pub query: &'static str,
    pub variables: Value,
}

impl RemoteOperation {
    pub fn new(name: &'static str, query: &'static str, variables: Value) -> Self {
        Self {
            name,
            query,
            variables,
        }
    }

    /// An operation without variables.
    pub fn bare(name: &'static str, query: &'static str) -> Self {
        Self::new(name, query, Value::Null)
    }

    /// Whether any variables should be sent with the request.
    pub fn has_variables(&self) -> bool {
        match &self.variables {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

pub const QUERY_PRESIGNED_URL: &str = r#"
query getPresignedUrl($fileName: String!) {
  getPresignedUrl(fileName: $fileName) {
    mimeType
    url
    key
  }
}
"#;

pub const MUTATION_CREATE_GCODE: &str = r#"
mutation CreateGcode($input: CreateGcodeInputV2!) {
  createGcodeV2(input: $input) {
    id
    name
    sizeKb
    status
    progress
  }
}
"#;

pub const QUERY_POLL_GCODE: &str = r#"
query GcodeV2($id: ID!) {
  gcodeV2(id: $id) {
    id
    name
    sizeKb
    status
    progress
    errors
    errorsV2 {
      line
      type
    }
  }
}
"#;

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub const MUTATION_CREATE_SIMULATION: &str = r#"
mutation CreateSimulation($input: CreateSimulationInput!) {
  createSimulation(input: $input) {
    id
    name
    progress
    status
    gcode { id name }
    printer { id name }
    material { id name }
    reportJsonUrl
    thermalIndexGcodeUrl
    estimatedSimulationDurationSeconds
    insertedAt
    updatedAt
  }
}
"#;

pub const QUERY_POLL_SIMULATION: &str = r#"
query Simulation($id: ID!) {
  simulation(id: $id) {
    id
    name
    progress
    status
    thermalIndexGcodeUrl
    printInfo {
      printOutcome
      printOutcomeDescription
      temperatureDirection
      temperatureDirectionDescription
      caveats {
        caveatType
        description
      }
    }
    speedFactor
    suggestedFixes {
      category
      extraDetails
      fix
      orderIndex
    }
  }
}
"#;

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

pub const MUTATION_CREATE_OPTIMIZATION: &str = r#"
mutation CreateOptimization($input: CreateOptimizationInput!) {
  createOptimization(input: $input) {
    id
    name
    progress
    status
    gcode { id name }
    printer { id name }
    material { id name }
    insertedAt
    updatedAt
  }
}
"#;

pub const QUERY_POLL_OPTIMIZATION: &str = r#"
query Optimization($id: ID!) {
  optimization(id: $id) {
    id
    name
    progress
    status
    optimizedGcodeWithThermalIndexesUrl
    qualityStdImprovement
    qualityMeanImprovement
  }
}
"#;

// ---------------------------------------------------------------------------
// Result artifacts
// ---------------------------------------------------------------------------

/// Thermal histories are an account-gated export; `optimizationId`
/// accepts simulation ids as well.
pub const QUERY_THERMAL_HISTORIES: &str = r#"
query ThermalHistories($isOptimized: Boolean!, $layer: Int!, $optimizationId: ID!) {
  thermalHistories(isOptimized: $isOptimized, layer: $layer, optimizationId: $optimizationId) {
    assetType
    url
  }
}
"#;

pub const QUERY_SIMULATION_MESH: &str = r#"
query SimulationMesh($id: ID!) {
  simulation(id: $id) {
    meshUrl {
      assetType
      url
    }
  }
}
"#;

pub const QUERY_OPTIMIZATION_MESH: &str = r#"
query OptimizationMesh($id: ID!) {
  optimization(id: $id) {
    optimizedMeshAsset {
      assetType
      url
    }
    originalMeshAsset {
      assetType
      url
    }
  }
}
"#;

// ---------------------------------------------------------------------------
// Catalog and account
// ---------------------------------------------------------------------------

pub const QUERY_PRINTERS: &str = r#"
query GetPrinters($page: Int) {
  printers(page: $page, pageSize: 20) {
    pages
    pageInfo { hasNextPage }
    objects {
      ... on Printer {
        id
        name
        alternativeNames { bambustudio }
      }
    }
  }
}
"#;

pub const QUERY_MATERIALS: &str = r#"
query GetMaterials($page: Int) {
  materials(page: $page, pageSize: 20) {
    pages
    pageInfo { hasNextPage }
    objects {
      ... on Material {
        id
        name
        feedstock
        alternativeNames { bambustudio }
      }
    }
  }
}
"#;

pub const QUERY_PRINT_PRIORITY_OPTIONS: &str = r#"
query GetPrintPriorityOptions($materialId: ID!) {
  printPriorityOptions(materialId: $materialId) {
    value
    label
    isAvailable
    description
  }
}
"#;

pub const QUERY_USER_QUOTA: &str = r#"
query GetUserRemainingOpts {
  user {
    remainingOptsThisMonth
    addOnOptimizations
    isFreeTrialActive
    isFreeTrialClaimed
    subscription { name }
  }
  freeTrialEligibility
}
"#;

pub const QUERY_DEFAULT_OPT_SETTINGS: &str = r#"
query DefaultOptimizationSettings($gcodeId: ID!) {
  defaultOptimizationSettings(gcodeId: $gcodeId) {
    minVelocity
    maxVelocity
    minVelocityIncrement
    minExtruderFlowRate
    maxExtruderFlowRate
    tolerance
    maxIterations
    reductionStrategySettings {
      strategy
      autolinearDoCriticality
      autolinearDoFitness
      autolinearDoInterpolation
      autolinearCriticalityMaxNodesDensity
      autolinearCriticalityThreshold
      autolinearFitnessMaxNodesDensity
      autolinearFitnessThreshold
      autolinearInterpolationLevels
      linearNodesLimit
    }
    residualStrategySettings {
      strategy
      exponentialPenaltyHigh
      exponentialPenaltyLow
    }
    layersToOptimize {
      fromLayer
      toLayer
    }
    optimizer
  }
}
"#;

pub const QUERY_RECENT_RUNS: &str = r#"
query GetRecentRuns {
  optimizations {
    objects {
      ... on Optimization {
        id
        name
        status
        optimizedGcodeWithThermalIndexesUrl
        qualityMeanImprovement
        qualityStdImprovement
      }
    }
  }
  simulations {
    objects {
      ... on Simulation {
        id
        name
        status
        thermalIndexGcodeUrl
      }
    }
  }
}
"#;
