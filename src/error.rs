//! Construction-time and configuration errors.
//!
//! Interpreter outcomes (including unmatched-bracket failures) are ordinary
//! values carried in [`crate::emulator::ExecState`]; only errors that make a
//! run impossible to set up live here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoupError {
    #[error("grid dimensions {width}x{height} must both be nonzero")]
    EmptyGrid { width: usize, height: usize },

    #[error("program size must be nonzero")]
    EmptyProgram,

    #[error("program size {0} exceeds the 16-bit origin-position field (max 65536)")]
    ProgramTooLong(usize),

    #[error("buffer of {got} bytes does not match {expected} ({cells} programs of {program_size} bytes)")]
    BufferMismatch {
        got: usize,
        expected: usize,
        cells: usize,
        program_size: usize,
    },

    #[error("neighborhood radius must be at least 1")]
    ZeroRadius,

    #[error("mutation rate {0} is outside [0, 1]")]
    BadMutationRate(f64),

    #[error("max_steps must be at least 1")]
    ZeroSteps,

    #[error("{name} head position {pos} is outside the {len}-byte pair tape")]
    HeadOutOfRange {
        name: &'static str,
        pos: usize,
        len: usize,
    },

    #[error("epochs must be at least 1")]
    ZeroEpochs,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
