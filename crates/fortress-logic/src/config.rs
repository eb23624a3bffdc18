//! Fortress configuration and validation.
//!
//! The harness (or any other front end) fills in a [`FortressConfig`], checks
//! it with [`validate_config`], and hands it to the pipeline. Every field has
//! a default, so a JSON file only needs the values it wants to change.
//!
//! ```
//! use fortress_logic::catalog::AreaKind;
//! use fortress_logic::config::{validate_config, FortressConfig};
//!
//! let mut config = FortressConfig::default();
//! config.dwarves = 12;
//! config.requested_areas = vec![AreaKind::Bedroom, AreaKind::Kitchen];
//! assert!(validate_config(&config).is_empty());
//! assert_eq!(config.room_quota(), 2 + 6);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::AreaKind;
use crate::layout::LayoutConfig;
use crate::requirements::{required_areas, room_quota};

/// Narrowest layer that still fits an entrance away from both corners.
pub const MIN_WIDTH: i32 = 4;

/// Largest accepted width, height, or depth.
pub const MAX_DIMENSION: i32 = 1024;

/// Tuning for the area-type optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Per-gene probability of re-rolling its kind in a child.
    pub mutation_chance: f64,
    /// Children spawned from each population member per generation.
    pub children_per_parent: u32,
    /// Number of mutation rounds.
    pub generations: u32,
    /// Independent population members evolved over the same layout.
    pub population_size: u32,
    /// Fitness subtracted per missing required area, before scaling.
    pub missing_area_penalty: f64,
    /// Extra penalty per missing area for every generation elapsed.
    pub penalty_scaling: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_chance: 0.30,
            children_per_parent: 10,
            generations: 100,
            population_size: 1,
            missing_area_penalty: 100.0,
            penalty_scaling: 2.0,
        }
    }
}

impl EvolutionConfig {
    /// Penalty for one missing area at `generation`.
    pub fn missing_penalty(&self, generation: u32) -> f64 {
        self.missing_area_penalty + self.penalty_scaling * generation as f64
    }
}

/// Everything needed to generate one or more fortresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortressConfig {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub dwarves: u32,
    /// Kinds the player wants to see. Order does not matter.
    pub requested_areas: Vec<AreaKind>,
    /// Master seed (None = pick one from OS entropy).
    pub seed: Option<u64>,
    /// Number of independent fortresses to generate.
    pub layout_count: u32,
    pub evolution: EvolutionConfig,
}

impl Default for FortressConfig {
    fn default() -> Self {
        Self {
            width: 40,
            height: 40,
            depth: 3,
            dwarves: 20,
            requested_areas: vec![
                AreaKind::Bedroom,
                AreaKind::DiningRoom,
                AreaKind::Kitchen,
                AreaKind::Food,
            ],
            seed: None,
            layout_count: 1,
            evolution: EvolutionConfig::default(),
        }
    }
}

impl FortressConfig {
    pub fn room_quota(&self) -> u32 {
        room_quota(&self.requested_areas, self.dwarves)
    }

    pub fn required_areas(&self) -> BTreeMap<AreaKind, u32> {
        required_areas(&self.requested_areas, self.dwarves)
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            width: self.width,
            height: self.height,
            depth: self.depth,
            room_quota: self.room_quota(),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{axis} must be at least 1 (got {value})")]
    ZeroDimension { axis: &'static str, value: i32 },
    #[error("{axis} must be at most {MAX_DIMENSION} (got {value})")]
    TooLarge { axis: &'static str, value: i32 },
    #[error("width {0} leaves no room for an entrance (minimum {MIN_WIDTH})")]
    TooNarrow(i32),
    #[error("mutation chance {0} is outside [0, 1]")]
    MutationChanceOutOfRange(f64),
    #[error("each parent must spawn at least one child")]
    ZeroChildren,
    #[error("population must contain at least one member")]
    ZeroPopulation,
    #[error("at least one layout must be generated")]
    ZeroLayouts,
    #[error("area kind {0} requested more than once")]
    DuplicateArea(AreaKind),
}

/// Validate a fortress configuration, returning all errors found.
///
/// An explicitly requested entrance is accepted and required once.
pub fn validate_config(config: &FortressConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    for (axis, value) in [
        ("width", config.width),
        ("height", config.height),
        ("depth", config.depth),
    ] {
        if value < 1 {
            errors.push(ConfigError::ZeroDimension { axis, value });
        } else if value > MAX_DIMENSION {
            errors.push(ConfigError::TooLarge { axis, value });
        }
    }
    if config.width >= 1 && config.width < MIN_WIDTH {
        errors.push(ConfigError::TooNarrow(config.width));
    }

    let evolution = &config.evolution;
    if !(0.0..=1.0).contains(&evolution.mutation_chance) {
        errors.push(ConfigError::MutationChanceOutOfRange(evolution.mutation_chance));
    }
    if evolution.children_per_parent == 0 {
        errors.push(ConfigError::ZeroChildren);
    }
    if evolution.population_size == 0 {
        errors.push(ConfigError::ZeroPopulation);
    }
    if config.layout_count == 0 {
        errors.push(ConfigError::ZeroLayouts);
    }

    let mut seen = HashSet::new();
    for &kind in &config.requested_areas {
        if !seen.insert(kind) && !errors.contains(&ConfigError::DuplicateArea(kind)) {
            errors.push(ConfigError::DuplicateArea(kind));
        }
    }

    errors
}
