//! Point mutation and random program generation.
//!
//! The byte and token paths deliberately differ: byte programs take an
//! independent substitution trial per cell, token programs take at most
//! one substituted locus per call. The token path must mint a whole new
//! token so the mutated cell's lineage restarts at the mutation event.

use rand::Rng;

use crate::tracer::Token;

/// Independent per-byte substitution: each cell is replaced with a uniform
/// random byte with probability `rate`.
///
/// A rate of exactly 0.0 returns without touching the RNG, so disabling
/// mutation does not perturb the draw sequence of the rest of the epoch.
pub fn mutate_program<R: Rng>(program: &mut [u8], rate: f64, rng: &mut R) {
    if rate <= 0.0 {
        return;
    }
    for cell in program.iter_mut() {
        if rng.random::<f64>() < rate {
            *cell = rng.random();
        }
    }
}

/// Single-locus token substitution: with probability `rate`, one uniform
/// position is replaced by a freshly stamped token `(epoch, position,
/// random byte)`, discarding the cell's prior lineage.
///
/// Draw order is probability, then position, then byte.
pub fn mutate_tokens<R: Rng>(program: &mut [Token], rate: f64, epoch: u64, rng: &mut R) {
    if rate <= 0.0 || program.is_empty() {
        return;
    }
    if rng.random::<f64>() < rate {
        let pos = rng.random_range(0..program.len());
        program[pos] = Token::new(epoch, pos as u16, rng.random());
    }
}

/// A fresh uniform-random program.
pub fn random_program<R: Rng>(len: usize, rng: &mut R) -> Vec<u8> {
    (0..len).map(|_| rng.random()).collect()
}
