//! Area catalog — every kind of room, workshop, and stockpile a fortress can hold.
//!
//! Each kind carries a single-character glyph (the map is rendered as text),
//! informational size bounds, and a directed adjacency-weight table used by
//! the evolution fitness. Negative weights mean "keep close", positive
//! weights mean "keep apart".

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weight for pairs that should end up near each other.
pub const CLOSE: f64 = -1.0;
/// Weight for pairs that should end up far from each other.
pub const FAR: f64 = 1.0;

/// Broad family an area kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaGroup {
    Special,
    Room,
    Workshop,
    Stockpile,
}

/// A semantic area type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Entrance,
    /// Freshly placed room that has not been given a type yet.
    Unassigned,
    // Rooms
    Barracks,
    Bedroom,
    DiningRoom,
    Farm,
    Office,
    // Workshops
    Brewery,
    Carpenter,
    Craftdwarf,
    Fishery,
    Kitchen,
    Mason,
    Metalsmith,
    Smelter,
    WoodFurnace,
    // Stockpiles
    BarBlock,
    Cloth,
    FinishedGoods,
    Food,
    Furniture,
    Leather,
    Stone,
    Weaponry,
    Wood,
}

/// Minimum and maximum footprint of an area, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl SizeBounds {
    const fn square(min: u32, max: u32) -> Self {
        Self {
            min_width: min,
            min_height: min,
            max_width: max,
            max_height: max,
        }
    }
}

impl AreaKind {
    /// Every kind in the catalog.
    pub const ALL: [AreaKind; 25] = [
        AreaKind::Entrance,
        AreaKind::Unassigned,
        AreaKind::Barracks,
        AreaKind::Bedroom,
        AreaKind::DiningRoom,
        AreaKind::Farm,
        AreaKind::Office,
        AreaKind::Brewery,
        AreaKind::Carpenter,
        AreaKind::Craftdwarf,
        AreaKind::Fishery,
        AreaKind::Kitchen,
        AreaKind::Mason,
        AreaKind::Metalsmith,
        AreaKind::Smelter,
        AreaKind::WoodFurnace,
        AreaKind::BarBlock,
        AreaKind::Cloth,
        AreaKind::FinishedGoods,
        AreaKind::Food,
        AreaKind::Furniture,
        AreaKind::Leather,
        AreaKind::Stone,
        AreaKind::Weaponry,
        AreaKind::Wood,
    ];

    /// Kinds the optimizer may roll. Entrance is fixed and Unassigned is a placeholder.
    pub const ASSIGNABLE: [AreaKind; 23] = [
        AreaKind::Barracks,
        AreaKind::Bedroom,
        AreaKind::DiningRoom,
        AreaKind::Farm,
        AreaKind::Office,
        AreaKind::Brewery,
        AreaKind::Carpenter,
        AreaKind::Craftdwarf,
        AreaKind::Fishery,
        AreaKind::Kitchen,
        AreaKind::Mason,
        AreaKind::Metalsmith,
        AreaKind::Smelter,
        AreaKind::WoodFurnace,
        AreaKind::BarBlock,
        AreaKind::Cloth,
        AreaKind::FinishedGoods,
        AreaKind::Food,
        AreaKind::Furniture,
        AreaKind::Leather,
        AreaKind::Stone,
        AreaKind::Weaponry,
        AreaKind::Wood,
    ];

    /// Single-character glyph used when rendering room tiles.
    pub fn glyph(self) -> char {
        match self {
            AreaKind::Entrance => '@',
            AreaKind::Unassigned => '1',
            AreaKind::Barracks => 'r',
            AreaKind::Bedroom => 'b',
            AreaKind::DiningRoom => 'd',
            AreaKind::Farm => 'f',
            AreaKind::Office => 'o',
            AreaKind::Brewery => 'q',
            AreaKind::Carpenter => 'c',
            AreaKind::Craftdwarf => '¤',
            AreaKind::Fishery => 'e',
            AreaKind::Kitchen => 'k',
            AreaKind::Mason => 'm',
            AreaKind::Metalsmith => 'h',
            AreaKind::Smelter => 's',
            AreaKind::WoodFurnace => 'u',
            AreaKind::BarBlock => 'B',
            AreaKind::Cloth => 'C',
            AreaKind::FinishedGoods => 'G',
            AreaKind::Food => 'D',
            AreaKind::Furniture => 'U',
            AreaKind::Leather => 'L',
            AreaKind::Stone => 'S',
            AreaKind::Weaponry => 'W',
            AreaKind::Wood => 'T',
        }
    }

    /// Reverse lookup of [`AreaKind::glyph`].
    pub fn from_glyph(glyph: char) -> Option<AreaKind> {
        Self::ALL.iter().copied().find(|k| k.glyph() == glyph)
    }

    /// Snake-case name, identical to the serde representation.
    pub fn name(self) -> &'static str {
        match self {
            AreaKind::Entrance => "entrance",
            AreaKind::Unassigned => "unassigned",
            AreaKind::Barracks => "barracks",
            AreaKind::Bedroom => "bedroom",
            AreaKind::DiningRoom => "dining_room",
            AreaKind::Farm => "farm",
            AreaKind::Office => "office",
            AreaKind::Brewery => "brewery",
            AreaKind::Carpenter => "carpenter",
            AreaKind::Craftdwarf => "craftdwarf",
            AreaKind::Fishery => "fishery",
            AreaKind::Kitchen => "kitchen",
            AreaKind::Mason => "mason",
            AreaKind::Metalsmith => "metalsmith",
            AreaKind::Smelter => "smelter",
            AreaKind::WoodFurnace => "wood_furnace",
            AreaKind::BarBlock => "bar_block",
            AreaKind::Cloth => "cloth",
            AreaKind::FinishedGoods => "finished_goods",
            AreaKind::Food => "food",
            AreaKind::Furniture => "furniture",
            AreaKind::Leather => "leather",
            AreaKind::Stone => "stone",
            AreaKind::Weaponry => "weaponry",
            AreaKind::Wood => "wood",
        }
    }

    pub fn group(self) -> AreaGroup {
        use AreaKind::*;
        match self {
            Entrance | Unassigned => AreaGroup::Special,
            Barracks | Bedroom | DiningRoom | Farm | Office => AreaGroup::Room,
            Brewery | Carpenter | Craftdwarf | Fishery | Kitchen | Mason | Metalsmith
            | Smelter | WoodFurnace => AreaGroup::Workshop,
            BarBlock | Cloth | FinishedGoods | Food | Furniture | Leather | Stone | Weaponry
            | Wood => AreaGroup::Stockpile,
        }
    }

    /// Footprint bounds. Only consulted during placement, never enforced afterwards.
    pub fn size_bounds(self) -> SizeBounds {
        match self.group() {
            AreaGroup::Special | AreaGroup::Room => SizeBounds::square(4, 4),
            AreaGroup::Workshop => SizeBounds::square(3, 3),
            AreaGroup::Stockpile => SizeBounds::square(3, 20),
        }
    }

    pub fn is_assignable(self) -> bool {
        !matches!(self, AreaKind::Entrance | AreaKind::Unassigned)
    }
}

impl fmt::Display for AreaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown area kind '{0}'")]
pub struct UnknownAreaKind(pub String);

impl FromStr for AreaKind {
    type Err = UnknownAreaKind;

    /// Accepts the snake-case name (case-insensitive) or the single glyph.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lowered = trimmed.to_ascii_lowercase().replace('-', "_");
        if let Some(kind) = AreaKind::ALL.iter().copied().find(|k| k.name() == lowered) {
            return Ok(kind);
        }
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(kind) = AreaKind::from_glyph(c) {
                return Ok(kind);
            }
        }
        Err(UnknownAreaKind(trimmed.to_string()))
    }
}

/// Directed adjacency weight from `from` towards `to`.
///
/// Returns `None` when the catalog defines no relation; callers treat that
/// as a zero contribution.
pub fn adjacency_weight(from: AreaKind, to: AreaKind) -> Option<f64> {
    use AreaKind::*;
    let weight = match (from, to) {
        // ── Rooms ──
        (Barracks, Barracks | Entrance) => CLOSE,
        (Barracks, Bedroom | DiningRoom) => FAR,
        (Bedroom, Bedroom) => CLOSE,
        (Bedroom, Barracks | Entrance) => FAR,
        (DiningRoom, DiningRoom) => CLOSE,
        (DiningRoom, Barracks | Entrance) => FAR,
        (Entrance, Entrance | Barracks) => CLOSE,
        (Entrance, Bedroom | DiningRoom) => FAR,
        (Farm, Farm) => CLOSE,
        (Office, Office) => CLOSE,
        // ── Workshops ──
        (Brewery, Brewery | Food) => CLOSE,
        (Carpenter, Carpenter | Furniture | Wood) => CLOSE,
        (Craftdwarf, Craftdwarf | FinishedGoods | Stone | Wood) => CLOSE,
        (Fishery, Fishery | Food) => CLOSE,
        (Kitchen, Kitchen | Food) => CLOSE,
        (Mason, Mason | Furniture | Stone) => CLOSE,
        (Metalsmith, Metalsmith | BarBlock | Weaponry) => CLOSE,
        (Smelter, Smelter | WoodFurnace | BarBlock) => CLOSE,
        (WoodFurnace, WoodFurnace | Smelter | BarBlock | Wood) => CLOSE,
        // ── Stockpiles ──
        (BarBlock, BarBlock | Smelter | Metalsmith | WoodFurnace) => CLOSE,
        (Cloth, Cloth) => CLOSE,
        (FinishedGoods, FinishedGoods | Craftdwarf) => CLOSE,
        (Food, Food | DiningRoom | Fishery | Kitchen | Brewery) => CLOSE,
        (Furniture, Furniture | Carpenter | Mason) => CLOSE,
        (Leather, Leather) => CLOSE,
        (Stone, Stone | Craftdwarf | Mason) => CLOSE,
        (Weaponry, Weaponry | Metalsmith) => CLOSE,
        (Wood, Wood | Carpenter | Craftdwarf | WoodFurnace) => CLOSE,
        _ => return None,
    };
    Some(weight)
}

/// Uniformly pick one of the [`AreaKind::ASSIGNABLE`] kinds.
pub fn random_assignable(rng: &mut impl Rng) -> AreaKind {
    AreaKind::ASSIGNABLE[rng.gen_range(0..AreaKind::ASSIGNABLE.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_glyphs_unique() {
        let glyphs: HashSet<char> = AreaKind::ALL.iter().map(|k| k.glyph()).collect();
        assert_eq!(glyphs.len(), AreaKind::ALL.len());
    }

    #[test]
    fn test_glyph_roundtrip() {
        for kind in AreaKind::ALL {
            assert_eq!(AreaKind::from_glyph(kind.glyph()), Some(kind));
        }
        assert_eq!(AreaKind::from_glyph('?'), None);
    }

    #[test]
    fn test_glyphs_avoid_tile_glyphs() {
        for kind in AreaKind::ALL {
            assert!(!matches!(kind.glyph(), '.' | ' ' | '|' | '#'), "{kind}");
        }
    }

    #[test]
    fn test_assignable_excludes_fixed_kinds() {
        assert!(!AreaKind::ASSIGNABLE.contains(&AreaKind::Entrance));
        assert!(!AreaKind::ASSIGNABLE.contains(&AreaKind::Unassigned));
        assert!(AreaKind::ASSIGNABLE.iter().all(|k| k.is_assignable()));
    }

    #[test]
    fn test_from_str_name_and_glyph() {
        assert_eq!("dining_room".parse::<AreaKind>(), Ok(AreaKind::DiningRoom));
        assert_eq!("Dining-Room".parse::<AreaKind>(), Ok(AreaKind::DiningRoom));
        assert_eq!("T".parse::<AreaKind>(), Ok(AreaKind::Wood));
        assert!("throne_room".parse::<AreaKind>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AreaKind::WoodFurnace).unwrap();
        assert_eq!(json, "\"wood_furnace\"");
        let back: AreaKind = serde_json::from_str("\"finished_goods\"").unwrap();
        assert_eq!(back, AreaKind::FinishedGoods);
    }

    #[test]
    fn test_weights_close_and_far() {
        assert_eq!(adjacency_weight(AreaKind::Barracks, AreaKind::Entrance), Some(CLOSE));
        assert_eq!(adjacency_weight(AreaKind::Barracks, AreaKind::Bedroom), Some(FAR));
        assert_eq!(adjacency_weight(AreaKind::Food, AreaKind::Kitchen), Some(CLOSE));
    }

    #[test]
    fn test_missing_weight_is_none() {
        assert_eq!(adjacency_weight(AreaKind::Farm, AreaKind::Smelter), None);
        assert_eq!(adjacency_weight(AreaKind::Unassigned, AreaKind::Unassigned), None);
    }

    #[test]
    fn test_weights_are_directed() {
        // Brewery wants Food nearby, and Food wants Brewery too, but Farm→Food is undefined.
        assert!(adjacency_weight(AreaKind::Brewery, AreaKind::Food).is_some());
        assert!(adjacency_weight(AreaKind::Food, AreaKind::Farm).is_none());
    }

    #[test]
    fn test_random_assignable_never_fixed() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(random_assignable(&mut rng).is_assignable());
        }
    }

    #[test]
    fn test_size_bounds_by_group() {
        assert_eq!(AreaKind::Bedroom.size_bounds().min_width, 4);
        assert_eq!(AreaKind::Kitchen.size_bounds().max_height, 3);
        let stock = AreaKind::Wood.size_bounds();
        assert!(stock.max_width > stock.min_width);
    }
}
