//! The 3D tile grid: positions, tiles, areas, layers, and the whole map.
//!
//! A [`Map`] owns one [`TileLayer`] per z-level (index 0 is the bottom).
//! Each layer stores its tiles in a flat row-major `Vec`, so snapshotting a
//! layer before a risky edit is a plain `clone()` and rolling back is a move.
//! Areas live in their layer's `areas` list; tiles point at them by index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{AreaKind, SizeBounds};

/// Integer grid coordinate. `x` is the column, `y` the row, `z` the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Same level, shifted by `(dx, dy)`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z)
    }

    /// Same column and row, shifted by `dz` levels.
    pub const fn vertical(self, dz: i32) -> Self {
        Self::new(self.x, self.y, self.z + dz)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// What a tile currently contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileStatus {
    #[default]
    NotDug,
    Dug,
    Room,
    RoomWall,
    Stairs,
}

impl TileStatus {
    /// Glyph for every status except `Room`, which renders as its area's glyph.
    pub fn glyph(self) -> char {
        match self {
            TileStatus::NotDug => '.',
            TileStatus::Dug => ' ',
            TileStatus::Stairs => '|',
            TileStatus::RoomWall => '#',
            TileStatus::Room => '?',
        }
    }
}

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub status: TileStatus,
    /// Index into the owning layer's `areas`. Only set when `status == Room`.
    pub area: Option<usize>,
    pub position: Position,
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Self {
            status: TileStatus::NotDug,
            area: None,
            position,
        }
    }
}

/// A placed room, workshop, stockpile, or entrance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub kind: AreaKind,
    pub bounds: SizeBounds,
    /// Positions of the tiles this area occupies, in stamping order.
    pub tiles: Vec<Position>,
}

impl Area {
    pub fn new(kind: AreaKind) -> Self {
        Self {
            kind,
            bounds: kind.size_bounds(),
            tiles: Vec::new(),
        }
    }

    pub fn glyph(&self) -> char {
        self.kind.glyph()
    }

    /// Level the area sits on, taken from its first tile.
    pub fn level(&self) -> Option<i32> {
        self.tiles.first().map(|p| p.z)
    }
}

/// How a layer connects upward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entrance {
    /// The fortress entrance area on the top level (index into `areas`).
    Surface(usize),
    /// Stair tiles mirrored from the level above.
    Stairs(Vec<Position>),
}

/// One z-level of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    width: i32,
    height: i32,
    z: i32,
    tiles: Vec<Tile>,
    pub areas: Vec<Area>,
    pub entrance: Option<Entrance>,
}

impl TileLayer {
    pub fn new(width: i32, height: i32, z: i32) -> Self {
        let mut tiles = Vec::with_capacity(width.max(0) as usize * height.max(0) as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(Tile::new(Position::new(x, y, z)));
            }
        }
        Self {
            width,
            height,
            z,
            tiles,
            areas: Vec::new(),
            entrance: None,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.within_layer(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// True if `(x, y)` lies inside this layer.
    pub fn within_layer(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.index(x, y).map(|i| &self.tiles[i])
    }

    pub fn status(&self, x: i32, y: i32) -> Option<TileStatus> {
        self.tile(x, y).map(|t| t.status)
    }

    /// Set a tile's status and occupying area. Returns false when out of bounds.
    pub fn set_tile(&mut self, x: i32, y: i32, status: TileStatus, area: Option<usize>) -> bool {
        match self.index(x, y) {
            Some(i) => {
                let tile = &mut self.tiles[i];
                tile.status = status;
                tile.area = area;
                true
            }
            None => false,
        }
    }

    /// Append an area and return its index.
    pub fn add_area(&mut self, area: Area) -> usize {
        self.areas.push(area);
        self.areas.len() - 1
    }

    /// Stamp the rectangle spanned by two inclusive corners (in any order) as
    /// `Room` tiles belonging to a new area of `kind`. Out-of-bounds cells
    /// are skipped. Returns the new area's index.
    pub fn generate_area(&mut self, start: (i32, i32), end: (i32, i32), kind: AreaKind) -> usize {
        let index = self.areas.len();
        let mut area = Area::new(kind);
        let (x0, x1) = (start.0.min(end.0), start.0.max(end.0));
        let (y0, y1) = (start.1.min(end.1), start.1.max(end.1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                if self.set_tile(x, y, TileStatus::Room, Some(index)) {
                    area.tiles.push(Position::new(x, y, self.z));
                }
            }
        }
        self.areas.push(area);
        index
    }

    /// Positions of the tiles that make up this layer's entrance.
    pub fn entrance_tiles(&self) -> Vec<Position> {
        match &self.entrance {
            Some(Entrance::Surface(index)) => self
                .areas
                .get(*index)
                .map(|a| a.tiles.clone())
                .unwrap_or_default(),
            Some(Entrance::Stairs(tiles)) => tiles.clone(),
            None => Vec::new(),
        }
    }

    /// Positions still `NotDug`, row-major.
    pub fn not_dug_positions(&self) -> Vec<Position> {
        self.tiles
            .iter()
            .filter(|t| t.status == TileStatus::NotDug)
            .map(|t| t.position)
            .collect()
    }

    pub fn count_status(&self, status: TileStatus) -> usize {
        self.tiles.iter().filter(|t| t.status == status).count()
    }

    /// Glyph shown for the tile at `(x, y)`.
    pub fn glyph_at(&self, x: i32, y: i32) -> Option<char> {
        let tile = self.tile(x, y)?;
        Some(match tile.status {
            TileStatus::Room => tile
                .area
                .and_then(|i| self.areas.get(i))
                .map(Area::glyph)
                .unwrap_or('?'),
            other => other.glyph(),
        })
    }

    /// Render as text: one line per row, one glyph per tile.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.tiles.len() + self.height.max(0) as usize);
        for row in self.tiles.chunks(self.width.max(1) as usize) {
            for tile in row {
                out.push(
                    self.glyph_at(tile.position.x, tile.position.y)
                        .unwrap_or('?'),
                );
            }
            out.push('\n');
        }
        out
    }

    /// Rendered rows without line terminators.
    pub fn render_rows(&self) -> Vec<String> {
        self.render().lines().map(str::to_string).collect()
    }
}

impl fmt::Display for TileLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Map-wide handle to an area: its level and its index in that level's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaRef {
    pub z: usize,
    pub index: usize,
}

/// The whole fortress: `depth` layers of `width × height` tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    width: i32,
    height: i32,
    depth: i32,
    layers: Vec<TileLayer>,
    /// Level shown by `Display`.
    current_z: usize,
}

impl Map {
    /// Build a map with every tile `NotDug`. The view starts on the top level.
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        let layers: Vec<TileLayer> = (0..depth).map(|z| TileLayer::new(width, height, z)).collect();
        Self {
            width,
            height,
            depth,
            current_z: layers.len().saturating_sub(1),
            layers,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn top_z(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn layer(&self, z: usize) -> Option<&TileLayer> {
        self.layers.get(z)
    }

    pub fn layer_mut(&mut self, z: usize) -> Option<&mut TileLayer> {
        self.layers.get_mut(z)
    }

    /// True if the position lies inside the map in all three axes.
    pub fn within_map(&self, pos: Position) -> bool {
        pos.z >= 0
            && (pos.z as usize) < self.layers.len()
            && pos.x >= 0
            && pos.x < self.width
            && pos.y >= 0
            && pos.y < self.height
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        if pos.z < 0 {
            return None;
        }
        self.layers.get(pos.z as usize)?.tile(pos.x, pos.y)
    }

    pub fn status(&self, pos: Position) -> Option<TileStatus> {
        self.tile(pos).map(|t| t.status)
    }

    /// Set a tile's status and area. Returns false when out of bounds.
    pub fn set_tile(&mut self, pos: Position, status: TileStatus, area: Option<usize>) -> bool {
        if pos.z < 0 {
            return false;
        }
        match self.layers.get_mut(pos.z as usize) {
            Some(layer) => layer.set_tile(pos.x, pos.y, status, area),
            None => false,
        }
    }

    /// Replace a layer wholesale with a snapshot taken earlier.
    pub fn restore_layer(&mut self, z: usize, snapshot: TileLayer) {
        if let Some(layer) = self.layers.get_mut(z) {
            *layer = snapshot;
        }
    }

    /// Every area, top level first, each level in placement order.
    ///
    /// The top level's entrance is created before any room, so it is always
    /// index 0 when present.
    pub fn all_areas(&self) -> Vec<AreaRef> {
        self.layers
            .iter()
            .enumerate()
            .rev()
            .flat_map(|(z, layer)| (0..layer.areas.len()).map(move |index| AreaRef { z, index }))
            .collect()
    }

    pub fn area(&self, area: AreaRef) -> Option<&Area> {
        self.layers.get(area.z)?.areas.get(area.index)
    }

    /// Retag an area in place. Its tiles keep pointing at it, only the glyph changes.
    pub fn assign_kind(&mut self, area: AreaRef, kind: AreaKind) -> bool {
        match self
            .layers
            .get_mut(area.z)
            .and_then(|l| l.areas.get_mut(area.index))
        {
            Some(a) => {
                a.kind = kind;
                a.bounds = kind.size_bounds();
                true
            }
            None => false,
        }
    }

    pub fn current_level(&self) -> usize {
        self.current_z
    }

    /// Change the level rendered by `Display`. Returns false if `z` is out of range.
    pub fn set_current_level(&mut self, z: usize) -> bool {
        if z < self.layers.len() {
            self.current_z = z;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layers.get(self.current_z) {
            Some(layer) => write!(f, "{layer}"),
            None => Ok(()),
        }
    }
}
