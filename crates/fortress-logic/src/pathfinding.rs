//! Breadth-first pathfinding over the tile grid.
//!
//! Every edge costs 1, so BFS order already yields the shortest hop count.
//! Two neighbourhoods are supported:
//! - [`Mode::Open`]: the 8 surrounding tiles that are walkable (dug, room, or
//!   stairs), plus the tiles directly above and below when standing on stairs.
//!   Used for connectivity checks and distance measurement.
//! - [`Mode::Diggable`]: the 4 orthogonal tiles that are not room walls,
//!   staying on the start level. Used to carve corridors.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::grid::{Map, Position, TileStatus};

/// Distance reported when no path exists.
pub const UNREACHABLE: i32 = -1;

/// Which edges the search may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Open,
    Diggable,
}

/// What the search is looking for. The first match in BFS order wins.
#[derive(Debug, Clone)]
pub enum Goal<'a> {
    Tile(Position),
    Status(TileStatus),
    AnyOf(&'a [Position]),
}

/// True for tiles a dwarf can walk on.
pub fn is_walkable(status: TileStatus) -> bool {
    matches!(
        status,
        TileStatus::Dug | TileStatus::Room | TileStatus::Stairs
    )
}

/// True for tiles a corridor may be dug through.
pub fn is_diggable(status: TileStatus) -> bool {
    status != TileStatus::RoomWall
}

fn neighbours(map: &Map, pos: Position, mode: Mode) -> Vec<Position> {
    let mut out = Vec::with_capacity(10);
    match mode {
        Mode::Open => {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let next = pos.offset(dx, dy);
                    if map.status(next).is_some_and(is_walkable) {
                        out.push(next);
                    }
                }
            }
            if map.status(pos) == Some(TileStatus::Stairs) {
                for dz in [1, -1] {
                    let next = pos.vertical(dz);
                    if map.status(next).is_some_and(is_walkable) {
                        out.push(next);
                    }
                }
            }
        }
        Mode::Diggable => {
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                let next = pos.offset(dx, dy);
                if map.status(next).is_some_and(is_diggable) {
                    out.push(next);
                }
            }
        }
    }
    out
}

/// Find the shortest path from `start` to the first tile satisfying `goal`.
///
/// Returns the tiles from start to goal inclusive, or `None` if unreachable.
/// The start tile itself may have any status.
pub fn find_path(map: &Map, start: Position, goal: &Goal<'_>, mode: Mode) -> Option<Vec<Position>> {
    if !map.within_map(start) {
        return None;
    }

    let targets: HashSet<Position> = match goal {
        Goal::AnyOf(tiles) => tiles.iter().copied().collect(),
        _ => HashSet::new(),
    };
    let reached = |pos: Position| match goal {
        Goal::Tile(target) => pos == *target,
        Goal::Status(status) => map.status(pos) == Some(*status),
        Goal::AnyOf(_) => targets.contains(&pos),
    };

    let mut parents: HashMap<Position, Position> = HashMap::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if reached(current) {
            return Some(rebuild(&parents, start, current));
        }
        for next in neighbours(map, current, mode) {
            if visited.insert(next) {
                parents.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    None
}

fn rebuild(parents: &HashMap<Position, Position>, start: Position, end: Position) -> Vec<Position> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        match parents.get(&current) {
            Some(&parent) => {
                path.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Number of tiles on the shortest path (start and goal included), or
/// [`UNREACHABLE`] when there is none.
pub fn find_distance(map: &Map, start: Position, goal: &Goal<'_>, mode: Mode) -> i32 {
    match find_path(map, start, goal, mode) {
        Some(path) => path.len() as i32,
        None => UNREACHABLE,
    }
}
