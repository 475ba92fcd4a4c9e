//! Epoch orchestration over the soup.
//!
//! One epoch is Snapshot -> Pair -> Dispatch -> Collect -> Mutate&WriteBack
//! -> Aggregate. Pairing and mutation consume the simulation's own seeded
//! RNG and run single-threaded; the interpreter calls in between are pure
//! and RNG-free, so they fan out over a rayon pool without affecting
//! reproducibility. A run is bit-identical for any worker-pool size.

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::emulator::{execute, ExecOutcome, ExecState};
use crate::error::SoupError;
use crate::grid::{create_spatial_pairs, Grid, PairEntry, TokenGrid};
use crate::mutate::{mutate_program, mutate_tokens};
use crate::tracer::execute_traced;

/// Knobs shared by both orchestrator variants.
#[derive(Clone, Copy, Debug)]
pub struct SimulationParams {
    pub seed: u64,
    /// Per-byte substitution probability (single-locus probability on the
    /// token path).
    pub mutation_rate: f64,
    /// Interpreter step budget per pair.
    pub max_steps: usize,
    /// Manhattan radius for partner selection.
    pub neighbor_radius: usize,
    /// Initial head0 position on the concatenated tape.
    pub read_head: usize,
    /// Initial head1 position; `None` means the start of the second
    /// program.
    pub write_head: Option<usize>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            seed: 42,
            mutation_rate: 0.001,
            max_steps: 8192,
            neighbor_radius: 2,
            read_head: 0,
            write_head: None,
        }
    }
}

/// Per-epoch statistics over the pairs that actually executed.
///
/// Informational output only; nothing here feeds back into the
/// simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub executed_pairs: usize,
    /// Cells that found no free partner this epoch (mutation only).
    pub lone_cells: usize,
    pub mean_iterations: f64,
    pub mean_skipped: f64,
    pub finished_fraction: f64,
    pub terminated_fraction: f64,
}

#[derive(Default)]
struct StatsAcc {
    pairs: usize,
    iterations: usize,
    skipped: usize,
    finished: usize,
    terminated: usize,
}

impl StatsAcc {
    fn add(&mut self, state: ExecState, steps: usize, skipped: usize) {
        self.pairs += 1;
        self.iterations += steps;
        self.skipped += skipped;
        match state {
            ExecState::Finished => self.finished += 1,
            ExecState::Terminated => self.terminated += 1,
            _ => {}
        }
    }

    fn finish(self, epoch: usize, lone_cells: usize) -> EpochStats {
        let n = self.pairs;
        let denom = if n == 0 { 1.0 } else { n as f64 };
        EpochStats {
            epoch,
            executed_pairs: n,
            lone_cells,
            mean_iterations: self.iterations as f64 / denom,
            mean_skipped: self.skipped as f64 / denom,
            finished_fraction: self.finished as f64 / denom,
            terminated_fraction: self.terminated as f64 / denom,
        }
    }
}

/// Resolve and validate the per-pair head positions against the tape the
/// pair will actually run on.
fn resolve_heads(
    params: &SimulationParams,
    program_size: usize,
) -> Result<(usize, usize), SoupError> {
    if !(0.0..=1.0).contains(&params.mutation_rate) || !params.mutation_rate.is_finite() {
        return Err(SoupError::BadMutationRate(params.mutation_rate));
    }
    if params.neighbor_radius == 0 {
        return Err(SoupError::ZeroRadius);
    }
    if params.max_steps == 0 {
        return Err(SoupError::ZeroSteps);
    }
    let tape_len = 2 * program_size;
    let read_head = params.read_head;
    let write_head = params.write_head.unwrap_or(program_size);
    if read_head >= tape_len {
        return Err(SoupError::HeadOutOfRange { name: "read", pos: read_head, len: tape_len });
    }
    if write_head >= tape_len {
        return Err(SoupError::HeadOutOfRange { name: "write", pos: write_head, len: tape_len });
    }
    Ok((read_head, write_head))
}

/// Orchestrator over a plain byte population.
pub struct Simulation {
    grid: Grid,
    params: SimulationParams,
    read_head: usize,
    write_head: usize,
    epoch: usize,
    rng: StdRng,
}

impl Simulation {
    pub fn new(
        width: usize,
        height: usize,
        program_size: usize,
        params: SimulationParams,
    ) -> Result<Self, SoupError> {
        let (read_head, write_head) = resolve_heads(&params, program_size)?;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let grid = Grid::random(width, height, program_size, &mut rng)?;
        info!(
            "soup initialized: {}x{} programs of {} bytes, seed {}",
            width, height, program_size, params.seed
        );
        Ok(Self { grid, params, read_head, write_head, epoch: 0, rng })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Epochs completed so far.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// The whole soup, for metrics and reporting consumers.
    pub fn soup(&self) -> &[u8] {
        self.grid.bytes()
    }

    /// Run one full epoch and return its statistics.
    pub fn run_epoch(&mut self) -> EpochStats {
        let ps = self.grid.program_size();
        let pairs = create_spatial_pairs(
            self.grid.width(),
            self.grid.height(),
            self.params.neighbor_radius,
            &mut self.rng,
        );

        // Dispatch: each pair runs on its own copy of the two programs.
        // Pure and RNG-free, so pool size cannot reorder anything
        // observable; rayon's collect keeps pairing order.
        let (read_head, write_head, max_steps) = (self.read_head, self.write_head, self.params.max_steps);
        let grid = &self.grid;
        let outcomes: Vec<ExecOutcome> = pairs
            .par_iter()
            .filter_map(|entry| match *entry {
                PairEntry::Matched(a, b) => {
                    let mut tape = Vec::with_capacity(2 * ps);
                    tape.extend_from_slice(grid.program(a));
                    tape.extend_from_slice(grid.program(b));
                    Some(execute(tape, read_head, write_head, 0, max_steps))
                }
                PairEntry::Alone(_) => None,
            })
            .collect();

        // Collect is the epoch barrier: every result is in before any
        // write-back. Mutation and write-back run in pairing order on one
        // thread; a failed run still writes its tape state back.
        let mut acc = StatsAcc::default();
        let mut lone_cells = 0usize;
        let rate = self.params.mutation_rate;
        let mut results = outcomes.into_iter();
        for entry in &pairs {
            match *entry {
                PairEntry::Matched(a, b) => {
                    if let Some(outcome) = results.next() {
                        acc.add(outcome.state, outcome.steps, outcome.skipped);
                        let (first, second) = outcome.tape.split_at(ps);
                        self.grid.program_mut(a).copy_from_slice(first);
                        self.grid.program_mut(b).copy_from_slice(second);
                        mutate_program(self.grid.program_mut(a), rate, &mut self.rng);
                        mutate_program(self.grid.program_mut(b), rate, &mut self.rng);
                    }
                }
                PairEntry::Alone(a) => {
                    lone_cells += 1;
                    mutate_program(self.grid.program_mut(a), rate, &mut self.rng);
                }
            }
        }

        let epoch = self.epoch;
        self.epoch += 1;
        acc.finish(epoch, lone_cells)
    }
}

/// Orchestrator over a token population with lineage tracing.
///
/// Same epoch discipline as [`Simulation`]; mutation differs (at most one
/// locus per program per epoch) and freshly mutated cells are stamped
/// with the epoch they first exist in, `epoch + 1`.
pub struct TracerSimulation {
    grid: TokenGrid,
    params: SimulationParams,
    read_head: usize,
    write_head: usize,
    epoch: usize,
    rng: StdRng,
}

impl TracerSimulation {
    pub fn new(
        width: usize,
        height: usize,
        program_size: usize,
        params: SimulationParams,
    ) -> Result<Self, SoupError> {
        let (read_head, write_head) = resolve_heads(&params, program_size)?;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let grid = TokenGrid::random(width, height, program_size, &mut rng)?;
        info!(
            "traced soup initialized: {}x{} programs of {} bytes, seed {}",
            width, height, program_size, params.seed
        );
        Ok(Self { grid, params, read_head, write_head, epoch: 0, rng })
    }

    pub fn grid(&self) -> &TokenGrid {
        &self.grid
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Byte projection of the soup for metrics consumers.
    pub fn soup_bytes(&self) -> Vec<u8> {
        self.grid.to_bytes()
    }

    pub fn run_epoch(&mut self) -> EpochStats {
        let ps = self.grid.program_size();
        let pairs = create_spatial_pairs(
            self.grid.width(),
            self.grid.height(),
            self.params.neighbor_radius,
            &mut self.rng,
        );

        let (read_head, write_head, max_steps) = (self.read_head, self.write_head, self.params.max_steps);
        let grid = &self.grid;
        let outcomes: Vec<_> = pairs
            .par_iter()
            .filter_map(|entry| match *entry {
                PairEntry::Matched(a, b) => {
                    let mut tape = Vec::with_capacity(2 * ps);
                    tape.extend_from_slice(grid.program(a));
                    tape.extend_from_slice(grid.program(b));
                    Some(execute_traced(tape, read_head, write_head, 0, max_steps))
                }
                PairEntry::Alone(_) => None,
            })
            .collect();

        let mut acc = StatsAcc::default();
        let mut lone_cells = 0usize;
        let rate = self.params.mutation_rate;
        // A cell mutated while epoch e executes first exists at e + 1.
        let stamp = (self.epoch + 1) as u64;
        let mut results = outcomes.into_iter();
        for entry in &pairs {
            match *entry {
                PairEntry::Matched(a, b) => {
                    if let Some(outcome) = results.next() {
                        acc.add(outcome.state, outcome.steps, outcome.skipped);
                        let (first, second) = outcome.tape.split_at(ps);
                        self.grid.program_mut(a).copy_from_slice(first);
                        self.grid.program_mut(b).copy_from_slice(second);
                        mutate_tokens(self.grid.program_mut(a), rate, stamp, &mut self.rng);
                        mutate_tokens(self.grid.program_mut(b), rate, stamp, &mut self.rng);
                    }
                }
                PairEntry::Alone(a) => {
                    lone_cells += 1;
                    mutate_tokens(self.grid.program_mut(a), rate, stamp, &mut self.rng);
                }
            }
        }

        let epoch = self.epoch;
        self.epoch += 1;
        acc.finish(epoch, lone_cells)
    }
}
