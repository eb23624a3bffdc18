//! Fortress Headless Generation Harness
//!
//! Runs the full pipeline in-process, prints every dug level as text with
//! the final area assignment, and checks the generated fortresses for
//! structural problems (unreachable rooms, asymmetric distances).
//!
//! Usage:
//!   cargo run -p fortress-simtest
//!   cargo run -p fortress-simtest -- --width 30 --height 30 --dwarves 12 --areas bedroom,kitchen
//!   cargo run -p fortress-simtest -- --config fortress.json --json
//!   cargo run -p fortress-simtest -- --verbose

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fortress_logic::catalog::AreaKind;
use fortress_logic::grid::TileStatus;
use fortress_logic::pathfinding::{find_path, Goal, Mode};
use fortress_logic::{generate_fortresses, Fortress, FortressConfig};

#[derive(Debug, Parser)]
#[command(author, version, about = "Dig a dwarf fortress and assign its rooms")]
struct Cli {
    /// JSON configuration file (missing fields use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<i32>,

    #[arg(long)]
    height: Option<i32>,

    /// Number of levels
    #[arg(long)]
    depth: Option<i32>,

    #[arg(long)]
    dwarves: Option<u32>,

    /// Requested area kinds, comma separated (names or glyphs)
    #[arg(long, value_delimiter = ',')]
    areas: Option<Vec<AreaKind>>,

    /// Master seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of mutation rounds
    #[arg(long)]
    generations: Option<u32>,

    /// Number of independent fortresses
    #[arg(long)]
    layouts: Option<u32>,

    /// Print the reports as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log pipeline progress and show passing checks
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn fortress_config(&self) -> Result<FortressConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
            }
            None => FortressConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(dwarves) = self.dwarves {
            config.dwarves = dwarves;
        }
        if let Some(areas) = &self.areas {
            config.requested_areas = areas.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(generations) = self.generations {
            config.evolution.generations = generations;
        }
        if let Some(layouts) = self.layouts {
            config.layout_count = layouts;
        }
        Ok(config)
    }
}

// ── Checks ──────────────────────────────────────────────────────────────

struct CheckResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check_fortress(fortress: &Fortress) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let map = &fortress.map;
    let tag = format!("fortress_{}", fortress.index);

    // Every room tile reaches its level's entrance
    let mut stranded = 0;
    for layer in map.layers() {
        let entrance = layer.entrance_tiles();
        for tile in layer.tiles().iter().filter(|t| t.status == TileStatus::Room) {
            if find_path(map, tile.position, &Goal::AnyOf(&entrance), Mode::Open).is_none() {
                stranded += 1;
            }
        }
    }
    results.push(CheckResult {
        name: format!("{tag}_rooms_connected"),
        passed: stranded == 0,
        detail: format!("{stranded} room tiles cannot reach their entrance"),
    });

    // Distance matrix is symmetric with a zero diagonal
    let d = &fortress.distances;
    let symmetric = (0..d.len()).all(|i| d.get(i, i) == Some(0) && (0..d.len()).all(|j| d.get(i, j) == d.get(j, i)));
    results.push(CheckResult {
        name: format!("{tag}_distances_symmetric"),
        passed: symmetric,
        detail: format!("{} areas measured", d.len()),
    });

    // Exactly one entrance survives evolution
    let entrances = map
        .all_areas()
        .into_iter()
        .filter(|r| map.area(*r).is_some_and(|a| a.kind == AreaKind::Entrance))
        .count();
    results.push(CheckResult {
        name: format!("{tag}_single_entrance"),
        passed: entrances == 1,
        detail: format!("{entrances} entrance areas"),
    });

    results
}

// ── Output ──────────────────────────────────────────────────────────────

fn print_fortress(fortress: &Fortress) {
    let report = fortress.report();
    println!(
        "--- Fortress {} ({}x{}x{}, seed {}) ---",
        report.index, report.width, report.height, report.depth, report.seed
    );
    println!(
        "Rooms: {}/{} placed, fitness {:.2} (generation {})",
        report.rooms_placed, report.room_quota, report.fitness, report.fitness_generation
    );

    for level in &report.levels {
        println!("\nLevel {}", level.z);
        for row in &level.rows {
            println!("{row}");
        }
    }

    println!("\nAreas:");
    for area in &report.areas {
        println!(
            "  {:>3}  z={}  {}  {:<15} {} tiles",
            area.index, area.level, area.glyph, area.name, area.tiles
        );
    }
    println!();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = cli.fortress_config()?;
    log::info!("Room quota {} for {} dwarves", config.room_quota(), config.dwarves);

    let fortresses = generate_fortresses(&config)?;

    if cli.json {
        let reports: Vec<_> = fortresses.iter().map(Fortress::report).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("=== Fortress Generation Harness ===\n");
        for fortress in &fortresses {
            print_fortress(fortress);
        }
    }

    let results: Vec<CheckResult> = fortresses.iter().flat_map(check_fortress).collect();
    let failed = results.iter().filter(|r| !r.passed).count();
    for r in &results {
        if !r.passed || cli.verbose {
            let icon = if r.passed { "✓" } else { "✗" };
            eprintln!("  {} {}: {}", icon, r.name, r.detail);
        }
    }
    if cli.verbose || failed > 0 {
        eprintln!(
            "=== CHECKS: {}/{} passed, {} failed ===",
            results.len() - failed,
            results.len(),
            failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
