//! YAML-based layout configuration.
//!
//! Every knob of the engine lives here: scoring weights, grouping thresholds,
//! placement search bounds, router fallbacks and the optimizer budget. All
//! fields have defaults, so an empty file (or [`LayoutConfig::default`]) is a
//! valid configuration.
//!
//! ```yaml
//! weights:
//!   crossing: 10.0
//!   wire_length: 1.0
//! routing:
//!   l_route_crossing_threshold: 1
//! optimizer:
//!   iterations: 64
//!   time_budget_ms: 2000
//! power:
//!   voltage: 9.0
//!   positive_supply: 9V
//! ```

use crate::error::ConfigError;
use crate::platform::PowerRailConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub power: PowerRailConfig,
}

/// Weights of the scoring formula. Lower scores are better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_crossing_weight")]
    pub crossing: f64,
    #[serde(default = "default_length_weight")]
    pub wire_length: f64,
    /// Cost of every unplaced component and unrouted net.
    #[serde(default = "default_penalty_weight")]
    pub penalty: f64,
}

fn default_crossing_weight() -> f64 { 10.0 }
fn default_length_weight() -> f64 { 1.0 }
fn default_penalty_weight() -> f64 { 1.0e6 }

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            crossing: default_crossing_weight(),
            wire_length: default_length_weight(),
            penalty: default_penalty_weight(),
        }
    }
}

/// Depth thresholds for splitting the signal chain into blocks.
///
/// Each threshold is an upper bound on the normalised depth
/// `depth / max_depth` of a component reached from the input net.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupingConfig {
    #[serde(default = "default_input_max")]
    pub input_max: f64,
    #[serde(default = "default_gain_max")]
    pub gain_max: f64,
    #[serde(default = "default_tone_max")]
    pub tone_max: f64,
}

fn default_input_max() -> f64 { 0.25 }
fn default_gain_max() -> f64 { 0.6 }
fn default_tone_max() -> f64 { 0.85 }

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            input_max: default_input_max(),
            gain_max: default_gain_max(),
            tone_max: default_tone_max(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Column distance searched on either side of a block's anchor.
    #[serde(default = "default_search_radius")]
    pub search_radius: usize,
    /// Upper bound on candidate positions examined for one component.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Empty columns left between consecutive blocks.
    #[serde(default = "default_block_gap")]
    pub block_gap: usize,
}

fn default_search_radius() -> usize { 16 }
fn default_max_attempts() -> usize { 4096 }
fn default_block_gap() -> usize { 1 }

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            search_radius: default_search_radius(),
            max_attempts: default_max_attempts(),
            block_gap: default_block_gap(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Grid search is attempted when both L-routes cross more wires than this.
    #[serde(default = "default_l_threshold")]
    pub l_route_crossing_threshold: usize,
    /// Extra cost of stepping onto a grid cell already covered by a wire.
    #[serde(default = "default_overlap_penalty")]
    pub wire_overlap_penalty: u32,
    /// Extra cost of changing direction during grid search.
    #[serde(default = "default_bend_penalty")]
    pub bend_penalty: u32,
    /// Maximum nodes expanded by one grid search.
    #[serde(default = "default_search_budget")]
    pub search_budget: usize,
}

fn default_l_threshold() -> usize { 1 }
fn default_overlap_penalty() -> u32 { 4 }
fn default_bend_penalty() -> u32 { 1 }
fn default_search_budget() -> usize { 20_000 }

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            l_route_crossing_threshold: default_l_threshold(),
            wire_overlap_penalty: default_overlap_penalty(),
            bend_penalty: default_bend_penalty(),
            search_budget: default_search_budget(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Wall-clock budget in milliseconds. `None` runs every iteration.
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    /// First seed of the schedule; iteration `i` uses `base_seed + i`.
    #[serde(default)]
    pub base_seed: u64,
    /// Worker threads. `0` lets rayon pick.
    #[serde(default)]
    pub workers: usize,
}

fn default_iterations() -> usize { 32 }

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            time_budget_ms: None,
            base_seed: 0,
            workers: 0,
        }
    }
}

impl OptimizerConfig {
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    /// The fixed seed sequence used by the optimizer.
    pub fn seeds(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.iterations as u64).map(move |i| self.base_seed.wrapping_add(i))
    }
}

impl LayoutConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: LayoutConfig = if yaml.trim().is_empty() {
            LayoutConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (name, value) in [
            ("weights.crossing", w.crossing),
            ("weights.wire_length", w.wire_length),
            ("weights.penalty", w.penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        let g = &self.grouping;
        if !(0.0 <= g.input_max && g.input_max <= g.gain_max && g.gain_max <= g.tone_max && g.tone_max <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "grouping thresholds must satisfy 0 <= input_max <= gain_max <= tone_max <= 1, got {} / {} / {}",
                g.input_max, g.gain_max, g.tone_max
            )));
        }

        if self.placement.max_attempts == 0 {
            return Err(ConfigError::Invalid("placement.max_attempts must be positive".into()));
        }
        if self.routing.search_budget == 0 {
            return Err(ConfigError::Invalid("routing.search_budget must be positive".into()));
        }
        if self.optimizer.iterations == 0 {
            return Err(ConfigError::Invalid("optimizer.iterations must be positive".into()));
        }
        if !self.power.voltage.is_finite() {
            return Err(ConfigError::Invalid("power.voltage must be finite".into()));
        }
        if self.power.positive_supply == self.power.ground {
            return Err(ConfigError::Invalid(
                "power.positive_supply and power.ground must be different jumpers".into(),
            ));
        }
        Ok(())
    }
}
