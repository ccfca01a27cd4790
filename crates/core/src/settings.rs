//! Simulation and optimization settings builders.
//!
//! Inputs arrive in slicer units (Celsius, mm/s, mm³/s) and leave in the
//! SI units the service expects.

use serde::Serialize;

/// Offset between Celsius and Kelvin.
const KELVIN_OFFSET: f64 = 273.15;

/// Default temperature stabilization height: 20 mm.
const STABILIZATION_HEIGHT_M: f64 = 0.020;

/// Lowest layer the optimizer accepts as the start of a range.
pub const MIN_FROM_LAYER: i64 = 2;

/// `toLayer` sentinel meaning "through the last layer".
pub const LAST_LAYER: i64 = -1;

/// Convert mm/s to m/s, rounded to 9 decimal places.
pub fn convert_speed_mm_to_m(mm_per_s: f64) -> f64 {
    (mm_per_s / 1_000.0 * 1e9).round() / 1e9
}

/// Convert mm³/s to m³/s.
pub fn convert_volumetric_mm3_to_m3(mm3_per_s: f64) -> f64 {
    mm3_per_s / 1e9
}

// ---------------------------------------------------------------------------
// Simulation settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_stabilization_height: Option<f64>,
    /// Kelvin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_temperature_above_build_plate: Option<f64>,
    /// Kelvin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stabilized_air_temperature: Option<f64>,
}

impl SimulationSettings {
    /// Build settings from optional chamber and bed temperatures (°C).
    ///
    /// Non-positive temperatures are treated as absent. The air temperature
    /// above the build plate needs both values.
    pub fn from_temperatures(chamber_c: Option<f64>, bed_c: Option<f64>) -> Self {
        let mut settings = Self {
            temperature_stabilization_height: Some(STABILIZATION_HEIGHT_M),
            ..Self::default()
        };

        if let Some(chamber) = chamber_c.filter(|t| *t > 0.0) {
            if let Some(bed) = bed_c.filter(|t| *t > 0.0) {
                settings.air_temperature_above_build_plate =
                    Some((chamber + bed) / 2.0 + KELVIN_OFFSET);
            }
            settings.stabilized_air_temperature = Some(chamber + KELVIN_OFFSET);
        }

        settings
    }
}

// ---------------------------------------------------------------------------
// Optimization settings
// ---------------------------------------------------------------------------

/// Caller-facing optimization inputs, in slicer units.
#[derive(Debug, Clone, Default)]
pub struct OptimizationInputs {
    /// Print priority value such as `QUALITY` or `SPEED`.
    pub print_priority: Option<String>,
    /// Legacy flag, only used when no print priority is set.
    pub optimize_outerwall: Option<bool>,
    pub min_velocity_mm_s: Option<f64>,
    pub max_velocity_mm_s: Option<f64>,
    pub min_volumetric_mm3_s: Option<f64>,
    pub max_volumetric_mm3_s: Option<f64>,
    pub from_layer: Option<i64>,
    pub to_layer: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualStrategySettings {
    pub strategy: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRange {
    pub from_layer: i64,
    pub to_layer: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize_outerwall: Option<bool>,
    /// m/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_velocity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_velocity: Option<f64>,
    /// m³/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_extruder_flow_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_extruder_flow_rate: Option<f64>,
    pub residual_strategy_settings: ResidualStrategySettings,
    /// Always `HYBRID`.
    pub optimizer: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers_to_optimize: Option<Vec<LayerRange>>,
}

impl OptimizationSettings {
    pub fn build(inputs: &OptimizationInputs) -> Self {
        let positive = |v: Option<f64>| v.filter(|x| *x > 0.0);

        let (print_priority, optimize_outerwall) =
            match inputs.print_priority.as_deref().filter(|p| !p.is_empty()) {
                Some(priority) => (Some(priority.to_string()), None),
                None => (None, inputs.optimize_outerwall),
            };

        let layers_to_optimize = match (inputs.from_layer, inputs.to_layer) {
            (Some(from), Some(to)) => Some(vec![LayerRange {
                from_layer: from.max(MIN_FROM_LAYER),
                to_layer: to,
            }]),
            _ => None,
        };

        Self {
            print_priority,
            optimize_outerwall,
            min_velocity: positive(inputs.min_velocity_mm_s).map(convert_speed_mm_to_m),
            max_velocity: positive(inputs.max_velocity_mm_s).map(convert_speed_mm_to_m),
            min_extruder_flow_rate: positive(inputs.min_volumetric_mm3_s)
                .map(convert_volumetric_mm3_to_m3),
            max_extruder_flow_rate: positive(inputs.max_volumetric_mm3_s)
                .map(convert_volumetric_mm3_to_m3),
            residual_strategy_settings: ResidualStrategySettings { strategy: "LINEAR" },
            optimizer: "HYBRID",
            layers_to_optimize,
        }
    }
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self::build(&OptimizationInputs::default())
    }
}
