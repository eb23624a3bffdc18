//! Fortress sizing — how many rooms to dig and which area kinds must appear.
//!
//! Both numbers derive from the dwarf count and the kinds the player asked for:
//! - Room quota: how many rectangular rooms the layout generator must place.
//! - Required areas: the minimum count per kind the evolution tries to satisfy.

use std::collections::BTreeMap;

use crate::catalog::AreaKind;

/// Dwarves sharing one bedroom.
pub const DWARVES_PER_BEDROOM: u32 = 8;
/// Dwarves sharing one dining room.
pub const DWARVES_PER_DINING_ROOM: u32 = 6;
/// Baseline: one room for every this many dwarves, whatever was requested.
pub const DWARVES_PER_ROOM: u32 = 2;

/// Number of rooms the layout must contain (the entrance is not counted).
///
/// Bedrooms and dining rooms round up, the baseline rounds down.
pub fn room_quota(requested: &[AreaKind], dwarves: u32) -> u32 {
    let mut rooms = 0;
    if requested.contains(&AreaKind::Bedroom) {
        rooms += dwarves.div_ceil(DWARVES_PER_BEDROOM);
    }
    if requested.contains(&AreaKind::DiningRoom) {
        rooms += dwarves.div_ceil(DWARVES_PER_DINING_ROOM);
    }
    rooms + dwarves / DWARVES_PER_ROOM
}

/// Minimum count per requested area kind.
///
/// Only requested kinds appear. The entrance is dug by the layout and never
/// mutated, so it needs no entry unless the caller asks for it explicitly.
pub fn required_areas(requested: &[AreaKind], dwarves: u32) -> BTreeMap<AreaKind, u32> {
    let mut required = BTreeMap::new();
    for &kind in requested {
        let count = match kind {
            AreaKind::Bedroom => dwarves.div_ceil(DWARVES_PER_BEDROOM),
            AreaKind::DiningRoom => dwarves.div_ceil(DWARVES_PER_DINING_ROOM),
            AreaKind::Unassigned => continue,
            _ => 1,
        };
        required.insert(kind, count);
    }
    required
}
