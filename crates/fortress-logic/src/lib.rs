//! Pure fortress generation logic.
//!
//! This crate contains everything needed to dig a multi-level fortress and
//! decide what each room is for, independent of any UI or runtime. Functions
//! take plain data plus an explicit random stream and return results, so a
//! fixed seed always produces the same fortress.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Area kinds: glyphs, groups, size bounds, adjacency weights |
//! | [`config`] | Fortress and evolution configuration, validation |
//! | [`distances`] | Symmetric walking-distance matrix between areas |
//! | [`evolution`] | Fitness function and mutation/selection optimizer |
//! | [`fortress`] | End-to-end pipeline and serializable report |
//! | [`grid`] | 3D tile grid: positions, tiles, areas, layers, map |
//! | [`layout`] | Entrance, room placement, corridor carving, stairs |
//! | [`pathfinding`] | BFS over open or diggable tiles, across stairs |
//! | [`requirements`] | Room quota and required area counts from dwarf count |
//! | [`rng`] | Reproducible per-unit random streams from one master seed |

pub mod catalog;
pub mod config;
pub mod distances;
pub mod evolution;
pub mod fortress;
pub mod grid;
pub mod layout;
pub mod pathfinding;
pub mod requirements;
pub mod rng;

pub use config::{validate_config, ConfigError, EvolutionConfig, FortressConfig};
pub use fortress::{generate_fortress, generate_fortresses, Fortress, FortressError, FortressReport};
