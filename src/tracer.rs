//! Provenance tokens and the lineage-tracking interpreter variant.
//!
//! Every cell carries a 64-bit token packing the byte value together with
//! the (epoch, position) of the event that created it:
//!
//! ```text
//! bits  0..8   byte value
//! bits  8..24  origin position (index in the origin program)
//! bits 24..64  origin epoch (40 bits)
//! ```
//!
//! The traced interpreter reuses the control flow of [`crate::emulator`]
//! verbatim. The asymmetry that makes ancestry reconstructable from
//! snapshots: arithmetic rewrites only the byte field, copies move whole
//! tokens, and only mutation (outside the interpreter) mints a fresh
//! (epoch, position) pair.

use crate::emulator::{ExecState, ZERO};

const BYTE_MASK: u64 = 0xFF;
const POS_SHIFT: u32 = 8;
const EPOCH_SHIFT: u32 = 24;
const EPOCH_MASK: u64 = (1 << 40) - 1;

/// One tape cell: byte value plus its lineage stamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Token(u64);

impl Token {
    /// Pack a fresh token. Epochs are truncated to 40 bits.
    #[inline]
    pub fn new(epoch: u64, origin_pos: u16, byte: u8) -> Self {
        Token(((epoch & EPOCH_MASK) << EPOCH_SHIFT) | ((origin_pos as u64) << POS_SHIFT) | byte as u64)
    }

    #[inline]
    pub fn byte(self) -> u8 {
        (self.0 & BYTE_MASK) as u8
    }

    #[inline]
    pub fn origin_pos(self) -> u16 {
        ((self.0 >> POS_SHIFT) & 0xFFFF) as u16
    }

    #[inline]
    pub fn origin_epoch(self) -> u64 {
        self.0 >> EPOCH_SHIFT
    }

    /// Rewrite only the byte value, preserving the lineage stamp. This is
    /// what `+`/`-` use; it is the only legal partial update of a token.
    #[inline]
    pub fn with_byte(self, byte: u8) -> Self {
        Token((self.0 & !BYTE_MASK) | byte as u64)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Token(raw)
    }
}

/// Stamp each byte of a program with `(epoch, index, byte)`.
pub fn stamp_program(bytes: &[u8], epoch: u64) -> Vec<Token> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, &b)| Token::new(epoch, i as u16, b))
        .collect()
}

/// Byte projection, dropping provenance.
pub fn program_bytes(tokens: &[Token]) -> Vec<u8> {
    tokens.iter().map(|t| t.byte()).collect()
}

/// Result of [`execute_traced`].
#[derive(Clone, Debug)]
pub struct TracedOutcome {
    pub tape: Vec<Token>,
    pub state: ExecState,
    pub steps: usize,
    pub skipped: usize,
    pub head0: usize,
    pub head1: usize,
    pub pc: usize,
}

/// Run a token tape with the same control flow as [`crate::emulator::execute`].
///
/// Out-of-range starting positions are clamped to the tape.
pub fn execute_traced(
    mut tape: Vec<Token>,
    head0: usize,
    head1: usize,
    pc: usize,
    max_steps: usize,
) -> TracedOutcome {
    let len = tape.len();
    let mut steps = 0usize;
    let mut skipped = 0usize;
    let mut state = ExecState::Terminated;

    if len == 0 {
        return TracedOutcome { tape, state: ExecState::Finished, steps, skipped, head0: 0, head1: 0, pc: 0 };
    }

    let mut head0 = head0.min(len - 1);
    let mut head1 = head1.min(len - 1);
    let mut pc = pc.min(len - 1);

    while steps < max_steps {
        steps += 1;

        match tape[pc].byte() {
            b'<' => head0 = (head0 + len - 1) % len,
            b'>' => head0 = (head0 + 1) % len,
            b'{' => head1 = (head1 + len - 1) % len,
            b'}' => head1 = (head1 + 1) % len,
            b'-' => {
                let cell = tape[head0];
                tape[head0] = cell.with_byte(cell.byte().wrapping_sub(1));
            }
            b'+' => {
                let cell = tape[head0];
                tape[head0] = cell.with_byte(cell.byte().wrapping_add(1));
            }
            // Copies move the whole token, lineage included.
            b'.' => tape[head1] = tape[head0],
            b',' => tape[head0] = tape[head1],
            b'[' => {
                if tape[head0].byte() == ZERO {
                    let mut depth = 1i32;
                    let mut target = None;
                    for i in pc + 1..len {
                        match tape[i].byte() {
                            b'[' => depth += 1,
                            b']' => depth -= 1,
                            _ => {}
                        }
                        if depth == 0 {
                            target = Some(i);
                            break;
                        }
                    }
                    match target {
                        Some(i) => pc = i,
                        None => {
                            state = ExecState::ErrorUnmatchedOpen;
                            break;
                        }
                    }
                }
            }
            b']' => {
                if tape[head0].byte() != ZERO {
                    let mut depth = 1i32;
                    let mut target = None;
                    for i in (0..pc).rev() {
                        match tape[i].byte() {
                            b']' => depth += 1,
                            b'[' => depth -= 1,
                            _ => {}
                        }
                        if depth == 0 {
                            target = Some(i);
                            break;
                        }
                    }
                    match target {
                        Some(i) => pc = i,
                        None => {
                            state = ExecState::ErrorUnmatchedClose;
                            break;
                        }
                    }
                }
            }
            _ => skipped += 1,
        }

        pc += 1;
        if pc >= len {
            state = ExecState::Finished;
            break;
        }
    }

    TracedOutcome { tape, state, steps, skipped, head0, head1, pc }
}
