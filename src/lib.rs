//! Primordial soup of two-head tape programs.
//!
//! A fixed 2D population of short byte programs evolves by repeatedly
//! pairing spatial neighbors, executing each pair as one concatenated
//! tape, mutating the result, and writing it back. No fitness function is
//! involved; the interesting question is whether self-replicating
//! structure emerges on its own, which the entropy/compressibility
//! metrics are there to detect.
//!
//! The `tracer` variant runs the same system over 64-bit provenance
//! tokens so every live byte can be traced back to the program cell and
//! epoch that created it.

pub mod config;
pub mod emulator;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod mutate;
pub mod simulation;
pub mod tracer;

pub use config::Config;
pub use emulator::{execute, ExecOutcome, ExecState};
pub use error::SoupError;
pub use grid::{create_spatial_pairs, Grid, PairEntry, TokenCell, TokenGrid};
pub use metrics::{complexity_estimate, higher_order_entropy, instruction_fraction, shannon_entropy};
pub use mutate::{mutate_program, mutate_tokens, random_program};
pub use simulation::{EpochStats, Simulation, SimulationParams, TracerSimulation};
pub use tracer::{execute_traced, program_bytes, stamp_program, Token, TracedOutcome};
