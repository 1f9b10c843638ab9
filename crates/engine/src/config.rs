//! Engine configuration with configurable regulatory constants
//!
//! All regulatory parameters are configurable via file, not hardcoded.
//! This allows target revisions (the intensity target tightens over the
//! regulation's life) without recompilation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for the compliance engine
///
/// Defaults are the 2025 FuelEU Maritime parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // === Regulatory parameters ===
    /// Carbon-intensity target in gCO2e/MJ
    #[serde(default = "default_target_intensity")]
    pub target_intensity_gco2e_per_mj: Decimal,

    /// Energy content of one ton of fuel, in MJ
    #[serde(default = "default_energy_factor")]
    pub energy_factor_mj_per_ton: Decimal,

    // === Banking rules ===
    /// Minimum surplus that may be banked (amounts must be strictly above it)
    #[serde(default = "default_banking_min_surplus")]
    pub banking_min_surplus_threshold: Decimal,

    /// Policy when banked surplus cannot cover a requested application
    #[serde(default)]
    pub shortfall_policy: ShortfallPolicy,

    // === Pooling rules ===
    /// Minimum total CB required to form a valid pool
    #[serde(default = "default_pool_min_total_cb")]
    pub pool_min_total_cb: Decimal,

    /// Tolerance for the conservation post-check after redistribution
    #[serde(default = "default_conservation_epsilon")]
    pub conservation_epsilon: Decimal,
}

/// Policy when a requested surplus application exceeds what is banked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Apply what is available and report the shortfall as `remaining` (DEFAULT)
    #[default]
    Partial,

    /// Reject the request before mutating any entry
    Reject,
}

// Default value functions for serde
fn default_target_intensity() -> Decimal {
    // 89.3368 gCO2e/MJ (2025 target)
    Decimal::new(893_368, 4)
}

fn default_energy_factor() -> Decimal {
    // 1 ton fuel = 41,000 MJ
    Decimal::new(41_000, 0)
}

fn default_banking_min_surplus() -> Decimal {
    Decimal::ZERO
}

fn default_pool_min_total_cb() -> Decimal {
    Decimal::ZERO
}

fn default_conservation_epsilon() -> Decimal {
    // 0.0001 gCO2eq
    Decimal::new(1, 4)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_intensity_gco2e_per_mj: default_target_intensity(),
            energy_factor_mj_per_ton: default_energy_factor(),
            banking_min_surplus_threshold: default_banking_min_surplus(),
            shortfall_policy: ShortfallPolicy::default(),
            pool_min_total_cb: default_pool_min_total_cb(),
            conservation_epsilon: default_conservation_epsilon(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
