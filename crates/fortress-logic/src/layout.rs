//! Layout generation — entrance, rooms, corridors, and stairs.
//!
//! Levels are processed top-down. Each level runs through three phases:
//!   1. `PlacingRooms`     -- pick random corners, stamp walled 4×4 rooms,
//!                            carve a corridor from a wall to the entrance
//!   2. `ConnectingStairs` -- dig a stair pair connected to the entrance and
//!                            mirror it as the entrance of the level below
//!   3. `Done`
//!
//! Every level draws from its own stream (`Unit::Layout`, index `z`), so a
//! level's rooms only depend on the master seed and what was dug above it.
//! A room whose corridor cannot be carved is rolled back by restoring the
//! layer snapshot taken before the attempt. Nothing here is fatal: the
//! generator always returns a complete map, possibly short of its quota.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::AreaKind;
use crate::grid::{Entrance, Map, Position, TileStatus};
use crate::pathfinding::{find_path, Goal, Mode};
use crate::rng::{RngStreams, Unit};

/// Side length of a room including its walls, minus one.
pub const ROOM_SPAN: i32 = 5;

/// A level is finished once untried corners drop to this share of its tiles.
pub const OPEN_FRACTION_LIMIT: f64 = 0.1;

const DIAGONALS: [(i32, i32); 4] = [(-1, 1), (-1, -1), (1, 1), (1, -1)];
const ORTHOGONALS: [(i32, i32); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

/// Dimensions and room quota for one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub room_quota: u32,
}

/// Per-level generation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelPhase {
    PlacingRooms,
    ConnectingStairs,
    Done,
}

/// Result of a layout run.
#[derive(Debug, Clone)]
pub struct GeneratedLayout {
    pub map: Map,
    pub room_quota: u32,
    pub rooms_placed: u32,
    /// Room attempts undone because no corridor could be carved.
    pub rollbacks: u32,
    /// Stair pairs, keyed by the upper level they start on.
    pub stairs: Vec<(usize, [Position; 2])>,
}

impl GeneratedLayout {
    pub fn quota_met(&self) -> bool {
        self.rooms_placed >= self.room_quota
    }
}

/// Places the entrance, rooms, corridors, and stairs on a map.
pub struct LayoutGenerator {
    map: Map,
    streams: RngStreams,
    /// Stream of the level currently being dug.
    rng: ChaCha8Rng,
    room_quota: u32,
    remaining: u32,
    rollbacks: u32,
    stairs: Vec<(usize, [Position; 2])>,
}

impl LayoutGenerator {
    pub fn new(config: &LayoutConfig, streams: &RngStreams) -> Self {
        Self::with_map(
            Map::new(config.width, config.height, config.depth),
            config.room_quota,
            streams,
        )
    }

    /// Generate on top of an existing map, e.g. one with a hand-placed entrance.
    pub fn with_map(map: Map, room_quota: u32, streams: &RngStreams) -> Self {
        let top = map.top_z() as u64;
        Self {
            map,
            streams: *streams,
            rng: streams.stream(Unit::Layout, top),
            room_quota,
            remaining: room_quota,
            rollbacks: 0,
            stairs: Vec::new(),
        }
    }

    /// Run the whole top-down generation.
    pub fn generate(mut self) -> GeneratedLayout {
        if self.map.layers().is_empty() {
            return self.finish();
        }

        let top = self.map.top_z();
        for z in (0..=top).rev() {
            let connected = self.generate_level(z);
            if self.remaining == 0 || !connected {
                break;
            }
        }

        if self.remaining > 0 {
            log::warn!(
                "Layout finished {} rooms short of its quota of {}",
                self.remaining,
                self.room_quota
            );
        }
        self.finish()
    }

    fn finish(self) -> GeneratedLayout {
        GeneratedLayout {
            map: self.map,
            room_quota: self.room_quota,
            rooms_placed: self.room_quota - self.remaining,
            rollbacks: self.rollbacks,
            stairs: self.stairs,
        }
    }

    /// Two adjacent entrance tiles on row 0 of level `z`, away from the corners.
    fn place_entrance(&mut self, z: usize) {
        let Some(layer) = self.map.layer_mut(z) else {
            return;
        };
        let width = layer.width();
        if width < 3 || layer.height() < 1 {
            log::warn!("Level {z} is too narrow for an entrance");
            return;
        }

        let first = self.rng.gen_range(1..=width - 2);
        let second = if first == width - 2 && width > 3 {
            first - 1
        } else if first == 1 {
            2
        } else if self.rng.gen_bool(0.5) {
            first + 1
        } else {
            first - 1
        };

        let index = layer.generate_area((second, 0), (first, 0), AreaKind::Entrance);
        layer.entrance = Some(Entrance::Surface(index));
    }

    /// Run the phase machine for one level. Returns false when the stairs to
    /// the next level could not be placed.
    ///
    /// The top level gets a surface entrance first unless it already has one.
    pub fn generate_level(&mut self, z: usize) -> bool {
        self.rng = self.streams.stream(Unit::Layout, z as u64);
        if z == self.map.top_z() && self.map.layer(z).is_some_and(|l| l.entrance.is_none()) {
            self.place_entrance(z);
        }

        let Some(layer) = self.map.layer(z) else {
            return false;
        };
        let tile_count = layer.tile_count();
        let mut open = layer.not_dug_positions();
        let mut phase = LevelPhase::PlacingRooms;
        let mut connected = true;

        while phase != LevelPhase::Done {
            phase = match phase {
                LevelPhase::PlacingRooms => {
                    while !self.level_finished(open.len(), tile_count) {
                        self.attempt_room(z, &mut open);
                    }
                    log::debug!(
                        "Level {z}: rooms placed, {} still required, {} open positions left",
                        self.remaining,
                        open.len()
                    );
                    if self.remaining == 0 || z == 0 {
                        LevelPhase::Done
                    } else {
                        LevelPhase::ConnectingStairs
                    }
                }
                LevelPhase::ConnectingStairs => {
                    connected = self.connect_stairs(z, &open);
                    if !connected {
                        log::warn!("Level {z}: no room left for stairs, stopping descent");
                    }
                    LevelPhase::Done
                }
                LevelPhase::Done => LevelPhase::Done,
            };
        }

        connected
    }

    fn level_finished(&self, open: usize, tile_count: usize) -> bool {
        self.remaining == 0
            || open == 0
            || open as f64 <= tile_count as f64 * OPEN_FRACTION_LIMIT
    }

    /// Try to place one room using a random corner. The corner is consumed
    /// whether or not a room results.
    fn attempt_room(&mut self, z: usize, open: &mut Vec<Position>) {
        if open.is_empty() {
            return;
        }
        let start = open[self.rng.gen_range(0..open.len())];
        let Some(snapshot) = self.map.layer(z).cloned() else {
            return;
        };

        let mut directions = DIAGONALS;
        directions.shuffle(&mut self.rng);

        for (dx, dy) in directions {
            let corner = start.offset(dx * ROOM_SPAN, dy * ROOM_SPAN);
            if !self.map.within_map(corner) || !self.rect_open(start, corner) {
                continue;
            }

            let Some(layer) = self.map.layer_mut(z) else {
                return;
            };
            let area = layer.generate_area(
                (start.x + dx, start.y + dy),
                (corner.x - dx, corner.y - dy),
                AreaKind::Unassigned,
            );
            let interior = layer.areas[area].tiles.clone();
            let walls = self.stamp_walls(start, dx, dy);

            if self.carve_to_entrance(z, walls) {
                open.retain(|p| !interior.contains(p));
                self.remaining = self.remaining.saturating_sub(1);
            } else {
                self.map.restore_layer(z, snapshot);
                self.rollbacks += 1;
                log::debug!("Level {z}: no corridor from room at {start}, rolled back");
            }
            break;
        }

        if let Some(i) = open.iter().position(|p| *p == start) {
            open.swap_remove(i);
        }
    }

    /// Every tile in the rectangle is still undug or a reusable wall.
    fn rect_open(&self, a: Position, b: Position) -> bool {
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        (y0..=y1).all(|y| {
            (x0..=x1).all(|x| {
                matches!(
                    self.map.status(Position::new(x, y, a.z)),
                    Some(TileStatus::NotDug | TileStatus::RoomWall)
                )
            })
        })
    }

    /// Wall in the room whose outer corner is `start`. Returns the non-corner
    /// wall tiles, which are the candidates for the room's door.
    fn stamp_walls(&mut self, start: Position, dx: i32, dy: i32) -> Vec<Position> {
        let mut candidates = Vec::with_capacity(4 * (ROOM_SPAN as usize - 1));
        for i in 0..=ROOM_SPAN {
            let edge = i != 0 && i != ROOM_SPAN;
            for pos in [
                start.offset(dx * i, 0),
                start.offset(dx * i, dy * ROOM_SPAN),
                start.offset(0, dy * i),
                start.offset(dx * ROOM_SPAN, dy * i),
            ] {
                self.map.set_tile(pos, TileStatus::RoomWall, None);
                if edge {
                    candidates.push(pos);
                }
            }
        }
        candidates
    }

    /// Dig a corridor from one of `candidates` (tried in random order, without
    /// replacement) to a random entrance tile of level `z`. The map is only
    /// touched on success.
    fn carve_to_entrance(&mut self, z: usize, mut candidates: Vec<Position>) -> bool {
        let entrance = match self.map.layer(z) {
            Some(layer) => layer.entrance_tiles(),
            None => return false,
        };
        if entrance.is_empty() {
            return false;
        }

        while !candidates.is_empty() {
            let from = candidates.swap_remove(self.rng.gen_range(0..candidates.len()));
            let goal = entrance[self.rng.gen_range(0..entrance.len())];
            let Some(path) = find_path(&self.map, from, &Goal::Tile(goal), Mode::Diggable) else {
                continue;
            };
            for pos in path {
                if !matches!(
                    self.map.status(pos),
                    Some(TileStatus::Room | TileStatus::Stairs)
                ) {
                    self.map.set_tile(pos, TileStatus::Dug, None);
                }
            }
            return true;
        }
        false
    }

    /// Place a stair pair on level `z` connected to its entrance and make it
    /// the entrance of level `z - 1`.
    fn connect_stairs(&mut self, z: usize, open: &[Position]) -> bool {
        let mut starts: Vec<Position> = open
            .iter()
            .copied()
            .filter(|p| self.map.status(*p) == Some(TileStatus::NotDug))
            .collect();

        while !starts.is_empty() {
            let start = starts.swap_remove(self.rng.gen_range(0..starts.len()));
            let mut directions = ORTHOGONALS;
            directions.shuffle(&mut self.rng);

            let Some(other) = directions
                .iter()
                .map(|&(dx, dy)| start.offset(dx, dy))
                .find(|p| self.map.status(*p) == Some(TileStatus::NotDug))
            else {
                continue;
            };

            if !self.carve_to_entrance(z, vec![start, other]) {
                continue;
            }

            for pos in [start, other] {
                self.map.set_tile(pos, TileStatus::Stairs, None);
                self.map.set_tile(pos.vertical(-1), TileStatus::Stairs, None);
            }
            if let Some(below) = self.map.layer_mut(z - 1) {
                below.entrance = Some(Entrance::Stairs(vec![
                    start.vertical(-1),
                    other.vertical(-1),
                ]));
            }
            self.stairs.push((z, [start, other]));
            log::debug!("Level {z}: stairs down at {start} and {other}");
            return true;
        }
        false
    }
}

/// Convenience wrapper: build a fresh map and run the generator on it.
pub fn generate_layout(config: &LayoutConfig, streams: &RngStreams) -> GeneratedLayout {
    LayoutGenerator::new(config, streams).generate()
}
