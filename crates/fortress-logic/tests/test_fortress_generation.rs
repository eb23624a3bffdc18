//! Integration tests for the full fortress generation pipeline.
//!
//! Exercises: FortressConfig → layout → DistanceMatrix → Optimizer
//! → assignment written back into the map → report
//!
//! Every test uses a fixed seed, so failures reproduce exactly.

use fortress_logic::catalog::AreaKind;
use fortress_logic::config::{EvolutionConfig, FortressConfig};
use fortress_logic::distances::DistanceMatrix;
use fortress_logic::evolution::{fitness, pair_score, AreaTypeGenotype, Optimizer};
use fortress_logic::grid::{AreaRef, Map, TileStatus};
use fortress_logic::layout::{generate_layout, LayoutConfig};
use fortress_logic::pathfinding::{find_path, is_walkable, Goal, Mode};
use fortress_logic::requirements::room_quota;
use fortress_logic::rng::{RngStreams, Unit};
use fortress_logic::{generate_fortress, generate_fortresses, FortressError};

// ── Helpers ────────────────────────────────────────────────────────────

fn config(width: i32, height: i32, depth: i32, dwarves: u32, seed: u64) -> FortressConfig {
    FortressConfig {
        width,
        height,
        depth,
        dwarves,
        requested_areas: vec![
            AreaKind::Bedroom,
            AreaKind::DiningRoom,
            AreaKind::Kitchen,
            AreaKind::Food,
        ],
        seed: Some(seed),
        layout_count: 1,
        evolution: EvolutionConfig {
            generations: 30,
            ..EvolutionConfig::default()
        },
    }
}

fn layout_map(width: i32, height: i32, depth: i32, quota: u32, seed: u64) -> Map {
    let streams = RngStreams::new(seed);
    let layout = generate_layout(
        &LayoutConfig {
            width,
            height,
            depth,
            room_quota: quota,
        },
        &streams,
    );
    layout.map
}

fn assert_rooms_reach_entrance(map: &Map) {
    for layer in map.layers() {
        let entrance = layer.entrance_tiles();
        for tile in layer.tiles() {
            if tile.status != TileStatus::Room {
                continue;
            }
            assert!(
                !entrance.is_empty(),
                "room tile {} on level without entrance",
                tile.position
            );
            let path = find_path(map, tile.position, &Goal::AnyOf(&entrance), Mode::Open)
                .unwrap_or_else(|| panic!("room tile {} cannot reach its entrance", tile.position));
            for step in &path {
                assert!(is_walkable(map.status(*step).unwrap()));
            }
        }
    }
}

// ── Layout properties ──────────────────────────────────────────────────

#[test]
fn every_room_tile_reaches_its_entrance() {
    for seed in [1, 2, 3, 4, 5] {
        let map = layout_map(30, 30, 3, 40, seed);
        assert_rooms_reach_entrance(&map);
    }
}

#[test]
fn area_tiles_are_rooms_pointing_back() {
    let map = layout_map(30, 30, 2, 20, 8);
    for area_ref in map.all_areas() {
        let area = map.area(area_ref).unwrap();
        assert!(!area.tiles.is_empty());
        for pos in &area.tiles {
            let tile = map.tile(*pos).unwrap();
            assert_eq!(tile.status, TileStatus::Room);
            assert_eq!(tile.area, Some(area_ref.index));
            assert_eq!(pos.z as usize, area_ref.z);
        }
    }
}

#[test]
fn rooms_are_four_by_four() {
    let map = layout_map(30, 30, 1, 10, 21);
    for area_ref in map.all_areas().into_iter().skip(1) {
        let area = map.area(area_ref).unwrap();
        assert_eq!(area.kind, AreaKind::Unassigned);
        let xs: Vec<i32> = area.tiles.iter().map(|p| p.x).collect();
        let ys: Vec<i32> = area.tiles.iter().map(|p| p.y).collect();
        assert_eq!(xs.iter().max().unwrap() - xs.iter().min().unwrap(), 3);
        assert_eq!(ys.iter().max().unwrap() - ys.iter().min().unwrap(), 3);
    }
}

#[test]
fn rendering_is_idempotent() {
    let map = layout_map(20, 20, 2, 6, 13);
    for layer in map.layers() {
        let first = layer.render();
        assert_eq!(first, layer.render());
        assert_eq!(first.lines().count(), 20);
        assert!(first.lines().all(|l| l.chars().count() == 20));
    }
    assert_eq!(map.to_string(), map.layer(map.top_z()).unwrap().render());
}

#[test]
fn scenario_four_dwarves_two_rooms() {
    let config = FortressConfig {
        width: 20,
        height: 20,
        depth: 1,
        dwarves: 4,
        requested_areas: Vec::new(),
        seed: Some(4),
        layout_count: 1,
        evolution: EvolutionConfig::default(),
    };
    assert_eq!(config.room_quota(), 2);

    let fortress = generate_fortress(&config).unwrap();
    let areas = fortress.map.all_areas();
    let non_entrance: Vec<AreaRef> = areas
        .iter()
        .copied()
        .filter(|r| fortress.map.area(*r).unwrap().kind != AreaKind::Entrance)
        .collect();
    assert_eq!(non_entrance.len(), 2);
    assert_eq!(fortress.rooms_placed, 2);
    for i in 1..areas.len() {
        assert!(fortress.distances.get(0, i).unwrap() > 0);
    }
    assert_rooms_reach_entrance(&fortress.map);
}

// ── Requirements ───────────────────────────────────────────────────────

#[test]
fn quota_boundaries() {
    assert_eq!(room_quota(&[], 0), 0);
    assert_eq!(room_quota(&[AreaKind::Bedroom], 1), 1);
    assert_eq!(room_quota(&[AreaKind::Bedroom, AreaKind::DiningRoom], 1), 2);
}

// ── Distances ──────────────────────────────────────────────────────────

#[test]
fn distance_matrix_symmetric_zero_diagonal() {
    let map = layout_map(30, 30, 2, 16, 31);
    let matrix = DistanceMatrix::compute(&map, &mut RngStreams::new(31).stream(Unit::Distances, 0));
    assert_eq!(matrix.len(), map.all_areas().len());
    for i in 0..matrix.len() {
        assert_eq!(matrix.get(i, i), Some(0));
        for j in 0..matrix.len() {
            assert_eq!(matrix.get(i, j), matrix.get(j, i));
        }
    }
    // Every area connects to the entrance, so nothing is unreachable.
    assert_eq!(matrix.unreachable_pairs(), 0);
}

// ── Fitness ────────────────────────────────────────────────────────────

#[test]
fn close_and_far_pairs_score_distance() {
    assert_eq!(pair_score(3, AreaKind::Barracks, AreaKind::Entrance), -3.0);
    assert_eq!(pair_score(3, AreaKind::Barracks, AreaKind::Bedroom), 3.0);
}

#[test]
fn fitness_reproducible_for_fixed_assignment() {
    let map = layout_map(24, 24, 1, 6, 5);
    let matrix = DistanceMatrix::compute(&map, &mut RngStreams::new(5).stream(Unit::Distances, 0));
    let kinds = [AreaKind::Kitchen, AreaKind::Food, AreaKind::Bedroom, AreaKind::Brewery];
    let genes: Vec<AreaTypeGenotype> = map
        .all_areas()
        .into_iter()
        .enumerate()
        .map(|(i, area)| AreaTypeGenotype {
            area,
            kind: if i == 0 {
                AreaKind::Entrance
            } else {
                kinds[i % kinds.len()]
            },
        })
        .collect();
    let required = config(24, 24, 1, 6, 5).required_areas();
    let evolution = EvolutionConfig::default();
    let a = fitness(&genes, &matrix, &required, 3, &evolution);
    let b = fitness(&genes, &matrix, &required, 3, &evolution);
    assert_eq!(a, b);
}

#[test]
fn optimizer_never_loses_fitness() {
    let map = layout_map(30, 30, 2, 14, 44);
    let streams = RngStreams::new(44);
    let matrix = DistanceMatrix::compute(&map, &mut streams.stream(Unit::Distances, 0));
    let areas: Vec<(AreaRef, AreaKind)> = map
        .all_areas()
        .into_iter()
        .map(|r| (r, map.area(r).unwrap().kind))
        .collect();
    let required = config(30, 30, 2, 14, 44).required_areas();
    let evolution = EvolutionConfig {
        population_size: 2,
        generations: 30,
        ..EvolutionConfig::default()
    };
    let mut optimizer = Optimizer::new(&areas, &matrix, &required, &evolution, &streams);
    let mut previous: Vec<f64> = optimizer.members().map(|m| m.fitness()).collect();
    for _ in 0..evolution.generations {
        optimizer.step();
        let current: Vec<f64> = optimizer.members().map(|m| m.fitness()).collect();
        for (before, after) in previous.iter().zip(&current) {
            assert!(after >= before);
        }
        previous = current;
    }
}

// ── Pipeline ───────────────────────────────────────────────────────────

#[test]
fn pipeline_deterministic_with_seed() {
    let config = config(30, 30, 2, 12, 77);
    let a = generate_fortress(&config).unwrap();
    let b = generate_fortress(&config).unwrap();
    assert_eq!(a.map, b.map);
    assert_eq!(a.assignment, b.assignment);
    assert_eq!(a.report().levels.len(), b.report().levels.len());
}

#[test]
fn pipeline_keeps_single_entrance() {
    let fortress = generate_fortress(&config(30, 30, 2, 12, 3)).unwrap();
    let entrances = fortress
        .map
        .all_areas()
        .into_iter()
        .filter(|r| fortress.map.area(*r).unwrap().kind == AreaKind::Entrance)
        .count();
    assert_eq!(entrances, 1);
    let report = fortress.report();
    assert_eq!(report.areas[0].name, AreaKind::Entrance.name());
    assert_eq!(report.areas[0].level, 1);
}

#[test]
fn batch_produces_independent_layouts() {
    let config = FortressConfig {
        layout_count: 2,
        ..config(24, 24, 1, 8, 9)
    };
    let fortresses = generate_fortresses(&config).unwrap();
    assert_eq!(fortresses.len(), 2);
    assert_eq!(fortresses[0].index, 0);
    assert_eq!(fortresses[1].index, 1);
    assert_eq!(fortresses[0].seed, fortresses[1].seed);
}

#[test]
fn invalid_config_is_an_error() {
    let config = FortressConfig {
        depth: 0,
        ..config(20, 20, 1, 4, 1)
    };
    match generate_fortress(&config) {
        Err(FortressError::InvalidConfig(errors)) => assert_eq!(errors.len(), 1),
        Ok(_) => panic!("depth 0 must be rejected"),
    }
}

#[test]
fn report_serializes_to_json() {
    let fortress = generate_fortress(&config(20, 20, 1, 4, 6)).unwrap();
    let json = serde_json::to_value(fortress.report()).unwrap();
    assert_eq!(json["width"], 20);
    assert_eq!(json["areas"][0]["kind"], "entrance");
    assert_eq!(json["levels"][0]["rows"].as_array().unwrap().len(), 20);
}
