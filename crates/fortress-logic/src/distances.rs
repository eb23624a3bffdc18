//! Pairwise walking distances between areas, computed once the layout is frozen.
//!
//! Areas are indexed in [`Map::all_areas`] order. For each unordered pair a
//! random tile of the first area is chosen as the start and the search stops
//! at the first tile of the second area it reaches. The result is stored in
//! both directions so the matrix is symmetric by construction.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid::{AreaRef, Map, Position};
use crate::pathfinding::{find_distance, Goal, Mode, UNREACHABLE};

/// Symmetric `n × n` matrix of tile distances, `-1` where no path exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    len: usize,
    cells: Vec<i32>,
}

impl DistanceMatrix {
    /// Measure every pair of areas on `map`.
    ///
    /// Start tiles are drawn from `rng` up front, then the searches run in
    /// parallel; the result does not depend on thread scheduling.
    pub fn compute(map: &Map, rng: &mut impl Rng) -> Self {
        let areas = map.all_areas();
        let len = areas.len();

        let mut jobs: Vec<(usize, usize, Position)> = Vec::with_capacity(len * len.saturating_sub(1) / 2);
        for i in 0..len {
            let Some(tiles) = area_tiles(map, areas[i]) else {
                continue;
            };
            for j in (i + 1)..len {
                if tiles.is_empty() {
                    continue;
                }
                let start = tiles[rng.gen_range(0..tiles.len())];
                jobs.push((i, j, start));
            }
        }

        let measured: Vec<(usize, usize, i32)> = jobs
            .par_iter()
            .map(|&(i, j, start)| {
                let distance = match area_tiles(map, areas[j]) {
                    Some(targets) if !targets.is_empty() => {
                        find_distance(map, start, &Goal::AnyOf(targets), Mode::Open)
                    }
                    _ => UNREACHABLE,
                };
                (i, j, distance)
            })
            .collect();

        let mut matrix = Self::unreachable(len);
        for (i, j, distance) in measured {
            matrix.set(i, j, distance);
        }
        log::debug!("Measured {} area pairs", len * len.saturating_sub(1) / 2);
        matrix
    }

    /// A matrix with a zero diagonal and every other pair unreachable.
    pub fn unreachable(len: usize) -> Self {
        let mut cells = vec![UNREACHABLE; len * len];
        for i in 0..len {
            cells[i * len + i] = 0;
        }
        Self { len, cells }
    }

    /// Build from explicit rows. Returns `None` unless the rows form a
    /// square, symmetric matrix with a zero diagonal.
    pub fn from_rows(rows: &[Vec<i32>]) -> Option<Self> {
        let len = rows.len();
        if rows.iter().any(|r| r.len() != len) {
            return None;
        }
        let cells: Vec<i32> = rows.iter().flatten().copied().collect();
        let matrix = Self { len, cells };
        let valid = (0..len).all(|i| {
            matrix.cells[i * len + i] == 0
                && (0..len).all(|j| matrix.cells[i * len + j] == matrix.cells[j * len + i])
        });
        valid.then_some(matrix)
    }

    /// Store `distance` for both `(i, j)` and `(j, i)`. Ignored on the diagonal.
    pub fn set(&mut self, i: usize, j: usize, distance: i32) {
        if i == j || i >= self.len || j >= self.len {
            return;
        }
        self.cells[i * self.len + j] = distance;
        self.cells[j * self.len + i] = distance;
    }

    pub fn get(&self, i: usize, j: usize) -> Option<i32> {
        if i >= self.len || j >= self.len {
            return None;
        }
        Some(self.cells[i * self.len + j])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distances from area `i` to every area, itself included.
    pub fn row(&self, i: usize) -> &[i32] {
        if i >= self.len {
            return &[];
        }
        &self.cells[i * self.len..(i + 1) * self.len]
    }

    /// Number of off-diagonal pairs with no path.
    pub fn unreachable_pairs(&self) -> usize {
        let mut count = 0;
        for i in 0..self.len {
            for j in (i + 1)..self.len {
                if self.cells[i * self.len + j] == UNREACHABLE {
                    count += 1;
                }
            }
        }
        count
    }
}

fn area_tiles(map: &Map, area: AreaRef) -> Option<&[Position]> {
    map.area(area).map(|a| a.tiles.as_slice())
}
