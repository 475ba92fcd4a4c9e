//! Population store and the per-epoch spatial pairing engine.
//!
//! Programs live in one flat buffer, `program_size` cells per slot,
//! addressed by `(x, y)` or the flat index `y * width + x`. The byte grid
//! and the token grid share the same layout; the token grid additionally
//! stamps epoch-0 provenance at creation and can export a per-cell lineage
//! snapshot.

use rand::Rng;

use crate::emulator;
use crate::error::SoupError;
use crate::tracer::{self, Token};

/// One entry of an epoch's pairing. Every population index appears in
/// exactly one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairEntry {
    /// Two neighbors that execute as a concatenated tape this epoch.
    Matched(usize, usize),
    /// No unclaimed neighbor was left: mutation only, no execution.
    Alone(usize),
}

/// Randomized, boundary-respecting neighbor matching for one epoch.
///
/// Visits all cells in a shuffled order; each unclaimed cell picks a
/// uniform unclaimed partner from its Manhattan neighborhood
/// (`1 <= |dx| + |dy| <= radius`, clipped at the grid edge, no wrap) or
/// falls back to a mutation-only singleton. Both the visitation order and
/// the neighbor enumeration order (rows outer, columns inner) are part of
/// the reproducibility contract: the same RNG stream yields the same
/// pairing.
pub fn create_spatial_pairs<R: Rng>(
    width: usize,
    height: usize,
    radius: usize,
    rng: &mut R,
) -> Vec<PairEntry> {
    use rand::seq::SliceRandom;

    let total = width * height;
    let mut order: Vec<usize> = (0..total).collect();
    order.shuffle(rng);

    let mut claimed = vec![false; total];
    let mut entries = Vec::with_capacity(total);
    let r = radius as i64;

    for &idx in &order {
        if claimed[idx] {
            continue;
        }
        let x = (idx % width) as i64;
        let y = (idx / width) as i64;

        let mut candidates = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let dist = dx.abs() + dy.abs();
                if dist == 0 || dist > r {
                    continue;
                }
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || nx >= width as i64 || ny < 0 || ny >= height as i64 {
                    continue;
                }
                let nidx = (ny as usize) * width + nx as usize;
                if !claimed[nidx] {
                    candidates.push(nidx);
                }
            }
        }

        claimed[idx] = true;
        if candidates.is_empty() {
            entries.push(PairEntry::Alone(idx));
        } else {
            let partner = candidates[rng.random_range(0..candidates.len())];
            claimed[partner] = true;
            entries.push(PairEntry::Matched(idx, partner));
        }
    }

    entries
}

fn check_dims(width: usize, height: usize, program_size: usize) -> Result<(), SoupError> {
    if width == 0 || height == 0 {
        return Err(SoupError::EmptyGrid { width, height });
    }
    if program_size == 0 {
        return Err(SoupError::EmptyProgram);
    }
    Ok(())
}

/// Fixed-size 2D population of byte programs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    program_size: usize,
    data: Vec<u8>,
}

impl Grid {
    /// New population with uniform-random byte programs.
    pub fn random<R: Rng>(
        width: usize,
        height: usize,
        program_size: usize,
        rng: &mut R,
    ) -> Result<Self, SoupError> {
        check_dims(width, height, program_size)?;
        let data = (0..width * height * program_size).map(|_| rng.random()).collect();
        Ok(Self { width, height, program_size, data })
    }

    /// Wrap an existing flat buffer; the length must be exactly
    /// `width * height * program_size`.
    pub fn from_bytes(
        width: usize,
        height: usize,
        program_size: usize,
        data: Vec<u8>,
    ) -> Result<Self, SoupError> {
        check_dims(width, height, program_size)?;
        let expected = width * height * program_size;
        if data.len() != expected {
            return Err(SoupError::BufferMismatch {
                got: data.len(),
                expected,
                cells: width * height,
                program_size,
            });
        }
        Ok(Self { width, height, program_size, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn program_size(&self) -> usize {
        self.program_size
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn program(&self, idx: usize) -> &[u8] {
        let start = idx * self.program_size;
        &self.data[start..start + self.program_size]
    }

    pub fn program_mut(&mut self, idx: usize) -> &mut [u8] {
        let start = idx * self.program_size;
        &mut self.data[start..start + self.program_size]
    }

    pub fn program_at(&self, x: usize, y: usize) -> &[u8] {
        self.program(self.index(x, y))
    }

    /// All programs in flat-index order.
    pub fn programs(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.program_size)
    }

    /// The whole soup as one byte buffer, for metrics and visualization
    /// consumers.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Render one program for terminal output.
    pub fn program_string(&self, idx: usize) -> String {
        emulator::program_to_string(self.program(idx))
    }
}

/// One live cell of a token grid, as exported by [`TokenGrid::snapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenCell {
    pub x: usize,
    pub y: usize,
    /// Index of the cell within its current program.
    pub pos: usize,
    pub origin_epoch: u64,
    pub origin_pos: u16,
    pub byte: u8,
}

/// Fixed-size 2D population of token programs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrid {
    width: usize,
    height: usize,
    program_size: usize,
    data: Vec<Token>,
}

impl TokenGrid {
    /// New population with uniform-random bytes, each cell stamped with
    /// epoch-0 provenance at its own position.
    pub fn random<R: Rng>(
        width: usize,
        height: usize,
        program_size: usize,
        rng: &mut R,
    ) -> Result<Self, SoupError> {
        check_dims(width, height, program_size)?;
        if program_size > u16::MAX as usize + 1 {
            return Err(SoupError::ProgramTooLong(program_size));
        }
        let mut data = Vec::with_capacity(width * height * program_size);
        for _ in 0..width * height {
            for i in 0..program_size {
                data.push(Token::new(0, i as u16, rng.random()));
            }
        }
        Ok(Self { width, height, program_size, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn program_size(&self) -> usize {
        self.program_size
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn program(&self, idx: usize) -> &[Token] {
        let start = idx * self.program_size;
        &self.data[start..start + self.program_size]
    }

    pub fn program_mut(&mut self, idx: usize) -> &mut [Token] {
        let start = idx * self.program_size;
        &mut self.data[start..start + self.program_size]
    }

    pub fn program_at(&self, x: usize, y: usize) -> &[Token] {
        self.program(self.index(x, y))
    }

    /// Byte projection of one program, dropping provenance.
    pub fn program_bytes(&self, x: usize, y: usize) -> Vec<u8> {
        tracer::program_bytes(self.program_at(x, y))
    }

    /// Byte projection of the whole soup, for consumers that only need
    /// current content (metrics, coloring).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().map(|t| t.byte()).collect()
    }

    /// Per-cell lineage export: one record per live cell, in row-major
    /// cell order then program position. Serialization to a tabular
    /// format is the consumer's job.
    pub fn snapshot(&self) -> impl Iterator<Item = TokenCell> + '_ {
        self.data.iter().enumerate().map(move |(i, t)| {
            let cell = i / self.program_size;
            TokenCell {
                x: cell % self.width,
                y: cell / self.width,
                pos: i % self.program_size,
                origin_epoch: t.origin_epoch(),
                origin_pos: t.origin_pos(),
                byte: t.byte(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manhattan(a: usize, b: usize, width: usize) -> usize {
        let (ax, ay) = (a % width, a / width);
        let (bx, by) = (b % width, b / width);
        ax.abs_diff(bx) + ay.abs_diff(by)
    }

    #[test]
    fn grid_construction_validates() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Grid::random(0, 4, 8, &mut rng),
            Err(SoupError::EmptyGrid { .. })
        ));
        assert!(matches!(Grid::random(4, 4, 0, &mut rng), Err(SoupError::EmptyProgram)));
        assert!(matches!(
            Grid::from_bytes(2, 2, 4, vec![0; 15]),
            Err(SoupError::BufferMismatch { .. })
        ));
        assert!(matches!(
            TokenGrid::random(2, 2, 70_000, &mut rng),
            Err(SoupError::ProgramTooLong(_))
        ));
    }

    #[test]
    fn grid_addressing_is_row_major() {
        let data: Vec<u8> = (0..24).collect();
        let grid = Grid::from_bytes(3, 2, 4, data).unwrap();
        assert_eq!(grid.index(2, 1), 5);
        assert_eq!(grid.program_at(2, 1), &[20, 21, 22, 23]);
        assert_eq!(grid.program(0), &[0, 1, 2, 3]);
        assert_eq!(grid.programs().count(), 6);
    }

    #[test]
    fn token_grid_stamps_epoch_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let grid = TokenGrid::random(4, 3, 8, &mut rng).unwrap();
        for idx in 0..grid.len() {
            for (i, t) in grid.program(idx).iter().enumerate() {
                assert_eq!(t.origin_epoch(), 0);
                assert_eq!(t.origin_pos(), i as u16);
            }
        }
    }

    #[test]
    fn snapshot_covers_every_cell_with_coordinates() {
        let mut rng = StdRng::seed_from_u64(2);
        let grid = TokenGrid::random(3, 2, 4, &mut rng).unwrap();
        let cells: Vec<TokenCell> = grid.snapshot().collect();
        assert_eq!(cells.len(), 3 * 2 * 4);
        // First cell of the slot at (2, 1).
        let c = cells[(grid.index(2, 1)) * 4];
        assert_eq!((c.x, c.y, c.pos), (2, 1, 0));
        assert_eq!(c.byte, grid.program_at(2, 1)[0].byte());
    }

    #[test]
    fn pairing_covers_every_index_exactly_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let (w, h) = (7, 5); // odd population forces at least one singleton
        let entries = create_spatial_pairs(w, h, 2, &mut rng);
        let mut seen = vec![0usize; w * h];
        for e in &entries {
            match *e {
                PairEntry::Matched(a, b) => {
                    seen[a] += 1;
                    seen[b] += 1;
                }
                PairEntry::Alone(a) => seen[a] += 1,
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn pairs_stay_within_the_neighborhood() {
        let mut rng = StdRng::seed_from_u64(4);
        for radius in 1..4usize {
            let entries = create_spatial_pairs(8, 8, radius, &mut rng);
            for e in &entries {
                if let PairEntry::Matched(a, b) = *e {
                    let d = manhattan(a, b, 8);
                    assert!(d >= 1 && d <= radius, "distance {d} exceeds radius {radius}");
                }
            }
        }
    }

    #[test]
    fn pairing_is_deterministic_for_a_seed() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        assert_eq!(
            create_spatial_pairs(16, 16, 2, &mut a),
            create_spatial_pairs(16, 16, 2, &mut b)
        );
    }

    #[test]
    fn single_cell_population_is_alone() {
        let mut rng = StdRng::seed_from_u64(5);
        let entries = create_spatial_pairs(1, 1, 2, &mut rng);
        assert_eq!(entries, vec![PairEntry::Alone(0)]);
    }
}
