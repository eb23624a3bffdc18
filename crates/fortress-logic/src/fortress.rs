//! Full generation pipeline.
//!
//! For every requested layout: generate rooms and stairs, measure the
//! distances between areas, evolve a kind assignment, then write the best
//! assignment back into the map. Layouts are independent and built in
//! parallel; each one draws from its own nested random streams, so the
//! output only depends on the master seed and the configuration.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::AreaKind;
use crate::config::{validate_config, ConfigError, FortressConfig};
use crate::distances::DistanceMatrix;
use crate::evolution::{Assignment, AreaTypeGenotype, FitnessContext, Optimizer};
use crate::grid::{AreaRef, Map, TileStatus};
use crate::layout::generate_layout;
use crate::rng::{RngStreams, Unit};

#[derive(Debug, Error)]
pub enum FortressError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A generated fortress with its assignment written back.
#[derive(Debug, Clone)]
pub struct Fortress {
    /// Position in the batch this fortress was generated in.
    pub index: u32,
    /// Master seed of the batch.
    pub seed: u64,
    pub map: Map,
    pub distances: DistanceMatrix,
    pub assignment: Assignment,
    pub room_quota: u32,
    pub rooms_placed: u32,
    pub rollbacks: u32,
}

/// Generate a single fortress (the first of the batch `config` describes).
pub fn generate_fortress(config: &FortressConfig) -> Result<Fortress, FortressError> {
    let streams = checked_streams(config)?;
    Ok(build_fortress(config, &streams, 0, &config.required_areas()))
}

/// Generate `config.layout_count` independent fortresses.
pub fn generate_fortresses(config: &FortressConfig) -> Result<Vec<Fortress>, FortressError> {
    let streams = checked_streams(config)?;
    let required = config.required_areas();
    log::info!(
        "Generating {} fortress(es) {}x{}x{} for {} dwarves (seed {})",
        config.layout_count,
        config.width,
        config.height,
        config.depth,
        config.dwarves,
        streams.master_seed()
    );

    Ok((0..config.layout_count)
        .into_par_iter()
        .map(|index| build_fortress(config, &streams, index, &required))
        .collect())
}

fn checked_streams(config: &FortressConfig) -> Result<RngStreams, FortressError> {
    let errors = validate_config(config);
    if !errors.is_empty() {
        return Err(FortressError::InvalidConfig(errors));
    }
    Ok(config
        .seed
        .map(RngStreams::new)
        .unwrap_or_else(RngStreams::from_entropy))
}

fn build_fortress(
    config: &FortressConfig,
    streams: &RngStreams,
    index: u32,
    required: &BTreeMap<AreaKind, u32>,
) -> Fortress {
    let local = streams.nested(index as u64);

    let layout = generate_layout(&config.layout_config(), &local);
    log::info!(
        "Layout {index}: {}/{} rooms placed, {} rollbacks, {} stair pairs",
        layout.rooms_placed,
        layout.room_quota,
        layout.rollbacks,
        layout.stairs.len()
    );
    let mut map = layout.map;

    let distances = DistanceMatrix::compute(&map, &mut local.stream(Unit::Distances, 0));
    log::info!(
        "Layout {index}: distances computed for {} areas ({} unreachable pairs)",
        distances.len(),
        distances.unreachable_pairs()
    );

    let areas: Vec<(AreaRef, AreaKind)> = map
        .all_areas()
        .into_iter()
        .filter_map(|r| map.area(r).map(|a| (r, a.kind)))
        .collect();

    let mut optimizer = Optimizer::new(&areas, &distances, required, &config.evolution, &local);
    let assignment = match optimizer.run() {
        Some(best) => best.clone(),
        None => {
            let ctx = FitnessContext {
                distances: &distances,
                required,
                config: &config.evolution,
            };
            let genes = areas
                .iter()
                .map(|&(area, kind)| AreaTypeGenotype { area, kind })
                .collect();
            Assignment::scored(genes, &ctx, 0)
        }
    };
    log::info!(
        "Layout {index}: evolution finished after {} generations, best fitness {:.2} (born in generation {})",
        optimizer.generation(),
        assignment.fitness(),
        assignment.generation
    );

    for gene in &assignment.genes {
        map.assign_kind(gene.area, gene.kind);
    }

    Fortress {
        index,
        seed: streams.master_seed(),
        map,
        distances,
        assignment,
        room_quota: layout.room_quota,
        rooms_placed: layout.rooms_placed,
        rollbacks: layout.rollbacks,
    }
}

/// Serializable summary of one fortress.
#[derive(Debug, Clone, Serialize)]
pub struct FortressReport {
    pub index: u32,
    pub seed: u64,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub room_quota: u32,
    pub rooms_placed: u32,
    /// Levels with anything dug on them, top first.
    pub levels: Vec<LevelReport>,
    /// Areas in distance-matrix order.
    pub areas: Vec<AreaReport>,
    pub fitness: f64,
    pub fitness_generation: u32,
    pub unreachable_pairs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    pub z: usize,
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaReport {
    pub index: usize,
    pub level: usize,
    pub glyph: char,
    pub kind: AreaKind,
    pub name: &'static str,
    pub tiles: usize,
}

impl Fortress {
    pub fn fitness(&self) -> f64 {
        self.assignment.fitness()
    }

    pub fn quota_met(&self) -> bool {
        self.rooms_placed >= self.room_quota
    }

    pub fn report(&self) -> FortressReport {
        let levels = self
            .map
            .layers()
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, layer)| layer.count_status(TileStatus::NotDug) < layer.tile_count())
            .map(|(z, layer)| LevelReport {
                z,
                rows: layer.render_rows(),
            })
            .collect();

        let areas = self
            .map
            .all_areas()
            .into_iter()
            .enumerate()
            .filter_map(|(index, r)| {
                self.map.area(r).map(|area| AreaReport {
                    index,
                    level: r.z,
                    glyph: area.glyph(),
                    kind: area.kind,
                    name: area.kind.name(),
                    tiles: area.tiles.len(),
                })
            })
            .collect();

        FortressReport {
            index: self.index,
            seed: self.seed,
            width: self.map.width(),
            height: self.map.height(),
            depth: self.map.depth(),
            room_quota: self.room_quota,
            rooms_placed: self.rooms_placed,
            levels,
            areas,
            fitness: self.fitness(),
            fitness_generation: self.assignment.generation,
            unreachable_pairs: self.distances.unreachable_pairs(),
        }
    }
}
