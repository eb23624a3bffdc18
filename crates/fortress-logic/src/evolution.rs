//! Area-type optimizer — assigns kinds to placed areas by mutation and selection.
//!
//! The spatial layout is frozen before this runs; only the kind carried by
//! each area changes. An [`Assignment`] is one candidate labelling, scored by
//! [`fitness`]:
//!
//! - every required kind present fewer times than required costs
//!   `missing × (base + scaling × generation)`
//! - every ordered pair of areas adds `distance × weight(kind_a, kind_b)`
//!   where the catalog defines a weight (close = -1, far = +1)
//! - an area's pair sum is halved for each occurrence of its kind beyond
//!   the required count (or every occurrence, for kinds nobody asked for)
//!
//! Each generation every population member spawns mutated children and is
//! replaced by its best child when that child scores at least as well.

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::{adjacency_weight, random_assignable, AreaKind};
use crate::config::EvolutionConfig;
use crate::distances::DistanceMatrix;
use crate::grid::AreaRef;
use crate::pathfinding::UNREACHABLE;
use crate::rng::{RngStreams, Unit};

/// One area's slot in an assignment. Its index in the gene list is its
/// index in the distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaTypeGenotype {
    pub area: AreaRef,
    pub kind: AreaKind,
}

/// Contribution of one ordered pair. Unreachable pairs and pairs without a
/// catalog weight contribute nothing.
pub fn pair_score(distance: i32, from: AreaKind, to: AreaKind) -> f64 {
    if distance == UNREACHABLE {
        return 0.0;
    }
    adjacency_weight(from, to).map_or(0.0, |w| distance as f64 * w)
}

/// Score a labelling. Higher is better.
pub fn fitness(
    genes: &[AreaTypeGenotype],
    distances: &DistanceMatrix,
    required: &BTreeMap<AreaKind, u32>,
    generation: u32,
    config: &EvolutionConfig,
) -> f64 {
    let mut counts: BTreeMap<AreaKind, u32> = BTreeMap::new();
    for gene in genes {
        *counts.entry(gene.kind).or_default() += 1;
    }

    let mut total = 0.0;
    for (kind, &needed) in required {
        let present = counts.get(kind).copied().unwrap_or(0);
        if present < needed {
            total -= (needed - present) as f64 * config.missing_penalty(generation);
        }
    }

    let mut occurrences: BTreeMap<AreaKind, u32> = BTreeMap::new();
    for (a, gene) in genes.iter().enumerate() {
        let mut area_score = 0.0;
        for (b, other) in genes.iter().enumerate() {
            if a == b {
                continue;
            }
            let distance = distances.get(a, b).unwrap_or(UNREACHABLE);
            area_score += pair_score(distance, gene.kind, other.kind);
        }

        let seen = occurrences.entry(gene.kind).or_default();
        *seen += 1;
        let excess = match required.get(&gene.kind) {
            Some(&needed) => seen.saturating_sub(needed),
            None => *seen,
        };
        if excess > 0 {
            area_score /= 2f64.powi(excess as i32);
        }

        total += area_score;
    }
    total
}

/// Everything fitness needs besides the genes.
#[derive(Debug, Clone, Copy)]
pub struct FitnessContext<'a> {
    pub distances: &'a DistanceMatrix,
    pub required: &'a BTreeMap<AreaKind, u32>,
    pub config: &'a EvolutionConfig,
}

impl FitnessContext<'_> {
    pub fn score(&self, genes: &[AreaTypeGenotype], generation: u32) -> f64 {
        fitness(genes, self.distances, self.required, generation, self.config)
    }
}

/// A scored labelling of every area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub genes: Vec<AreaTypeGenotype>,
    fitness: f64,
    /// Generation this assignment was created in.
    pub generation: u32,
}

impl Assignment {
    /// Random labelling: the entrance keeps its kind, everything else draws
    /// uniformly from the assignable kinds.
    pub fn random(areas: &[(AreaRef, AreaKind)], ctx: &FitnessContext<'_>, rng: &mut impl Rng) -> Self {
        let genes: Vec<AreaTypeGenotype> = areas
            .iter()
            .map(|&(area, kind)| AreaTypeGenotype {
                area,
                kind: if kind == AreaKind::Entrance {
                    kind
                } else {
                    random_assignable(rng)
                },
            })
            .collect();
        Self::scored(genes, ctx, 0)
    }

    pub fn scored(genes: Vec<AreaTypeGenotype>, ctx: &FitnessContext<'_>, generation: u32) -> Self {
        let fitness = ctx.score(&genes, generation);
        Self {
            genes,
            fitness,
            generation,
        }
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Child where each non-entrance gene is re-rolled with the configured
    /// mutation chance, scored at `generation`.
    pub fn mutate(&self, ctx: &FitnessContext<'_>, generation: u32, rng: &mut impl Rng) -> Self {
        let chance = ctx.config.mutation_chance;
        let genes = self
            .genes
            .iter()
            .map(|gene| {
                let roll: f64 = rng.gen();
                if roll <= chance && gene.kind != AreaKind::Entrance {
                    AreaTypeGenotype {
                        kind: random_assignable(rng),
                        ..*gene
                    }
                } else {
                    *gene
                }
            })
            .collect();
        Self::scored(genes, ctx, generation)
    }

    /// How many genes carry `kind`.
    pub fn count(&self, kind: AreaKind) -> usize {
        self.genes.iter().filter(|g| g.kind == kind).count()
    }
}

/// A population member and the stream it mutates with.
#[derive(Debug, Clone)]
struct Member {
    assignment: Assignment,
    rng: ChaCha8Rng,
}

impl Member {
    fn step(&mut self, ctx: &FitnessContext<'_>, generation: u32, children: u32) {
        let mut best: Option<Assignment> = None;
        for _ in 0..children {
            let child = self.assignment.mutate(ctx, generation, &mut self.rng);
            // First child with the top score wins.
            if best.as_ref().map_or(true, |b| child.fitness > b.fitness) {
                best = Some(child);
            }
        }
        if let Some(best) = best {
            if self.assignment.fitness <= best.fitness {
                self.assignment = best;
            }
        }
    }
}

/// Evolves a population of assignments over one frozen layout.
pub struct Optimizer<'a> {
    ctx: FitnessContext<'a>,
    members: Vec<Member>,
    generation: u32,
}

impl<'a> Optimizer<'a> {
    /// Seed `config.population_size` random members, each with its own stream.
    pub fn new(
        areas: &[(AreaRef, AreaKind)],
        distances: &'a DistanceMatrix,
        required: &'a BTreeMap<AreaKind, u32>,
        config: &'a EvolutionConfig,
        streams: &RngStreams,
    ) -> Self {
        let ctx = FitnessContext {
            distances,
            required,
            config,
        };
        let members = (0..config.population_size.max(1))
            .map(|i| {
                let mut rng = streams.stream(Unit::Population, i as u64);
                let assignment = Assignment::random(areas, &ctx, &mut rng);
                Member { assignment, rng }
            })
            .collect();
        Self {
            ctx,
            members,
            generation: 0,
        }
    }

    /// Current generation (0 until the first step).
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Run one generation across all members in parallel.
    pub fn step(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let children = self.ctx.config.children_per_parent;
        let ctx = &self.ctx;
        self.members
            .par_iter_mut()
            .for_each(|member| member.step(ctx, generation, children));

        if let Some(best) = self.best() {
            log::debug!("Generation {generation}: best fitness {:.2}", best.fitness);
        }
    }

    /// Run the configured number of generations and return the best member.
    pub fn run(&mut self) -> Option<&Assignment> {
        while self.generation < self.ctx.config.generations {
            self.step();
        }
        self.best()
    }

    /// Highest-scoring member; the first one wins ties.
    pub fn best(&self) -> Option<&Assignment> {
        let mut best: Option<&Assignment> = None;
        for member in &self.members {
            if best.map_or(true, |b| member.assignment.fitness > b.fitness) {
                best = Some(&member.assignment);
            }
        }
        best
    }

    pub fn members(&self) -> impl Iterator<Item = &Assignment> {
        self.members.iter().map(|m| &m.assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn gene(index: usize, kind: AreaKind) -> AreaTypeGenotype {
        AreaTypeGenotype {
            area: AreaRef { z: 0, index },
            kind,
        }
    }

    fn two_area_matrix(distance: i32) -> DistanceMatrix {
        DistanceMatrix::from_rows(&[vec![0, distance], vec![distance, 0]]).unwrap()
    }

    fn no_requirements() -> BTreeMap<AreaKind, u32> {
        BTreeMap::new()
    }

    #[test]
    fn test_pair_score_close_and_far() {
        assert_eq!(pair_score(3, AreaKind::Food, AreaKind::Kitchen), -3.0);
        assert_eq!(pair_score(3, AreaKind::Bedroom, AreaKind::Barracks), 3.0);
        assert_eq!(pair_score(3, AreaKind::Office, AreaKind::Kitchen), 0.0);
        assert_eq!(pair_score(UNREACHABLE, AreaKind::Food, AreaKind::Kitchen), 0.0);
    }

    #[test]
    fn test_single_far_pair_contributes_distance() {
        // Entrance -> Bedroom is far (+3), halved because the entrance is not
        // required. Bedroom -> Entrance is far (+3) and the bedroom is required.
        let required = BTreeMap::from([(AreaKind::Bedroom, 1)]);
        let genes = [gene(0, AreaKind::Entrance), gene(1, AreaKind::Bedroom)];
        let score = fitness(&genes, &two_area_matrix(3), &required, 0, &EvolutionConfig::default());
        assert!((score - 4.5).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_entrance_halved_with_empty_request() {
        // Both directions are close (-3) and neither kind is required.
        let required = crate::requirements::required_areas(&[], 0);
        let genes = [gene(0, AreaKind::Entrance), gene(1, AreaKind::Barracks)];
        let score = fitness(&genes, &two_area_matrix(3), &required, 0, &EvolutionConfig::default());
        assert!((score - -3.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_requested_kind_beyond_requirement_halved() {
        // Bedroom -> Bedroom is close (-4) both ways. The first bedroom meets
        // the requirement; the second is one over and counts half.
        let required = BTreeMap::from([(AreaKind::Bedroom, 1)]);
        let genes = [gene(0, AreaKind::Bedroom), gene(1, AreaKind::Bedroom)];
        let score = fitness(&genes, &two_area_matrix(4), &required, 0, &EvolutionConfig::default());
        assert!((score - -6.0).abs() < 1e-9, "got {score}");

        // Two bedrooms required: neither copy is halved.
        let required = BTreeMap::from([(AreaKind::Bedroom, 2)]);
        let score = fitness(&genes, &two_area_matrix(4), &required, 0, &EvolutionConfig::default());
        assert!((score - -8.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_unrequested_kinds_are_halved() {
        // Kitchen -> Food close, Food -> Kitchen close; neither required.
        let genes = [gene(0, AreaKind::Kitchen), gene(1, AreaKind::Food)];
        let score = fitness(
            &genes,
            &two_area_matrix(4),
            &no_requirements(),
            0,
            &EvolutionConfig::default(),
        );
        assert!((score - (-2.0 + -2.0)).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_missing_penalty_scales_with_generation() {
        let mut required = BTreeMap::new();
        required.insert(AreaKind::Bedroom, 3);
        let genes = [gene(0, AreaKind::Bedroom)];
        let matrix = DistanceMatrix::unreachable(1);
        let config = EvolutionConfig::default();
        assert_eq!(fitness(&genes, &matrix, &required, 0, &config), -200.0);
        assert_eq!(fitness(&genes, &matrix, &required, 5, &config), -220.0);
    }

    #[test]
    fn test_unreachable_pairs_ignored() {
        let genes = [gene(0, AreaKind::Food), gene(1, AreaKind::Kitchen)];
        let score = fitness(
            &genes,
            &DistanceMatrix::unreachable(2),
            &no_requirements(),
            0,
            &EvolutionConfig::default(),
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_fitness_deterministic() {
        let matrix = DistanceMatrix::from_rows(&[
            vec![0, 5, 9],
            vec![5, 0, 4],
            vec![9, 4, 0],
        ])
        .unwrap();
        let genes = [
            gene(0, AreaKind::Entrance),
            gene(1, AreaKind::Barracks),
            gene(2, AreaKind::Bedroom),
        ];
        let required = BTreeMap::from([(AreaKind::Bedroom, 1)]);
        let config = EvolutionConfig::default();
        let a = fitness(&genes, &matrix, &required, 7, &config);
        let b = fitness(&genes, &matrix, &required, 7, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_mutation_keeps_entrance() {
        let matrix = DistanceMatrix::unreachable(4);
        let required = no_requirements();
        let config = EvolutionConfig {
            mutation_chance: 1.0,
            ..EvolutionConfig::default()
        };
        let ctx = FitnessContext {
            distances: &matrix,
            required: &required,
            config: &config,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let parent = Assignment::scored(
            vec![
                gene(0, AreaKind::Entrance),
                gene(1, AreaKind::Farm),
                gene(2, AreaKind::Farm),
                gene(3, AreaKind::Farm),
            ],
            &ctx,
            0,
        );
        for _ in 0..20 {
            let child = parent.mutate(&ctx, 1, &mut rng);
            assert_eq!(child.genes[0].kind, AreaKind::Entrance);
            assert_eq!(child.generation, 1);
            assert!(child.genes.iter().skip(1).all(|g| g.kind.is_assignable()));
            assert_eq!(child.genes[2].area, parent.genes[2].area);
        }
    }

    #[test]
    fn test_zero_mutation_chance_copies_parent() {
        let matrix = DistanceMatrix::unreachable(2);
        let required = no_requirements();
        let config = EvolutionConfig {
            mutation_chance: 0.0,
            ..EvolutionConfig::default()
        };
        let ctx = FitnessContext {
            distances: &matrix,
            required: &required,
            config: &config,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let parent = Assignment::scored(vec![gene(0, AreaKind::Mason), gene(1, AreaKind::Stone)], &ctx, 0);
        let child = parent.mutate(&ctx, 1, &mut rng);
        assert_eq!(child.genes, parent.genes);
    }

    fn sample_problem() -> (Vec<(AreaRef, AreaKind)>, DistanceMatrix, BTreeMap<AreaKind, u32>) {
        let areas: Vec<(AreaRef, AreaKind)> = (0..6)
            .map(|i| {
                let kind = if i == 0 {
                    AreaKind::Entrance
                } else {
                    AreaKind::Unassigned
                };
                (AreaRef { z: 0, index: i }, kind)
            })
            .collect();
        let rows: Vec<Vec<i32>> = (0..6)
            .map(|i: i32| (0..6).map(|j: i32| (i - j).abs() * 4).collect())
            .collect();
        let matrix = DistanceMatrix::from_rows(&rows).unwrap();
        let required = BTreeMap::from([(AreaKind::Bedroom, 2), (AreaKind::Kitchen, 1)]);
        (areas, matrix, required)
    }

    #[test]
    fn test_lineage_fitness_non_decreasing() {
        let (areas, matrix, required) = sample_problem();
        let config = EvolutionConfig {
            population_size: 3,
            generations: 40,
            ..EvolutionConfig::default()
        };
        let streams = RngStreams::new(17);
        let mut optimizer = Optimizer::new(&areas, &matrix, &required, &config, &streams);
        let mut previous: Vec<f64> = optimizer.members().map(|a| a.fitness()).collect();
        for _ in 0..config.generations {
            optimizer.step();
            let current: Vec<f64> = optimizer.members().map(|a| a.fitness()).collect();
            for (before, after) in previous.iter().zip(&current) {
                assert!(after >= before, "fitness dropped from {before} to {after}");
            }
            previous = current;
        }
        assert_eq!(optimizer.generation(), 40);
    }

    #[test]
    fn test_run_is_reproducible() {
        let (areas, matrix, required) = sample_problem();
        let config = EvolutionConfig {
            population_size: 4,
            generations: 25,
            ..EvolutionConfig::default()
        };
        let run = || {
            let streams = RngStreams::new(99);
            let mut optimizer = Optimizer::new(&areas, &matrix, &required, &config, &streams);
            optimizer.run().cloned().unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_evolution_fills_requirements() {
        let (areas, matrix, required) = sample_problem();
        let config = EvolutionConfig::default();
        let streams = RngStreams::new(5);
        let mut optimizer = Optimizer::new(&areas, &matrix, &required, &config, &streams);
        let best = optimizer.run().unwrap();
        // After 100 generations the missing-area penalty dominates any
        // adjacency gain, so every requirement is met.
        assert!(best.count(AreaKind::Bedroom) >= 2);
        assert!(best.count(AreaKind::Kitchen) >= 1);
        assert_eq!(best.count(AreaKind::Entrance), 1);
    }

    #[test]
    fn test_best_picks_highest_member() {
        let (areas, matrix, required) = sample_problem();
        let config = EvolutionConfig {
            population_size: 5,
            ..EvolutionConfig::default()
        };
        let optimizer = Optimizer::new(&areas, &matrix, &required, &config, &streams_for_test());
        let best = optimizer.best().unwrap().fitness();
        assert!(optimizer.members().all(|a| a.fitness() <= best));
    }

    fn streams_for_test() -> RngStreams {
        RngStreams::new(2)
    }
}
