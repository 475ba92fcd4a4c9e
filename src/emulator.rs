//! Two-head tape interpreter.
//!
//! Instruction set:
//! head0 is the read/arithmetic head, head1 the write/copy head, and the
//! program counter walks the tape independently of both.
//!
//! ```text
//!     < head0 -= 1          > head0 += 1
//!     { head1 -= 1          } head1 += 1
//!     - tape[head0] -= 1    + tape[head0] += 1
//!     . tape[head1] = tape[head0]
//!     , tape[head0] = tape[head1]
//!     [ if tape[head0] == '0': jump forward to the matching ]
//!     ] if tape[head0] != '0': jump backward to the matching [
//! ```
//!
//! Head moves wrap modulo the tape length; the program counter does not
//! wrap — walking past the end is the normal "Finished" halt. Every other
//! byte value is a no-op that is counted and skipped.

/// The loop sentinel is ASCII `'0'` (48), not the zero byte. The bracket
/// instructions test against this value and nothing else.
pub const ZERO: u8 = b'0';

/// True for the ten recognized instruction bytes.
#[inline]
pub fn is_instruction(c: u8) -> bool {
    matches!(c, b'<' | b'>' | b'{' | b'}' | b'-' | b'+' | b'.' | b',' | b'[' | b']')
}

/// Terminal state of one interpreter run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecState {
    /// The program counter ran past the end of the tape.
    Finished,
    /// The step budget was exhausted while still running.
    Terminated,
    /// A `[` jump found no matching `]` before the tape end.
    ErrorUnmatchedOpen,
    /// A `]` jump found no matching `[` before the tape start.
    ErrorUnmatchedClose,
}

impl ExecState {
    pub fn is_error(self) -> bool {
        matches!(self, ExecState::ErrorUnmatchedOpen | ExecState::ErrorUnmatchedClose)
    }
}

impl std::fmt::Display for ExecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExecState::Finished => "Finished",
            ExecState::Terminated => "Terminated",
            ExecState::ErrorUnmatchedOpen => "Error, Unmatched [",
            ExecState::ErrorUnmatchedClose => "Error, Unmatched ]",
        };
        f.write_str(label)
    }
}

/// Result of [`execute`]: the final tape plus where and how the run ended.
#[derive(Clone, Debug)]
pub struct ExecOutcome {
    pub tape: Vec<u8>,
    pub state: ExecState,
    /// Iterations performed, counting skipped bytes.
    pub steps: usize,
    /// Bytes that were not recognized instructions.
    pub skipped: usize,
    pub head0: usize,
    pub head1: usize,
    pub pc: usize,
}

/// Run a tape until it halts, errors, or exhausts `max_steps`.
///
/// The caller owns the head and pc starting positions; for a program pair
/// the convention is head0 = 0, head1 = program length, pc = 0. `head0`,
/// `head1` and `pc` must be within the tape. The interpreter never touches
/// caller state: it consumes its tape and hands it back in the outcome.
pub fn execute(
    mut tape: Vec<u8>,
    mut head0: usize,
    mut head1: usize,
    mut pc: usize,
    max_steps: usize,
) -> ExecOutcome {
    let len = tape.len();
    let mut steps = 0usize;
    let mut skipped = 0usize;
    let mut state = ExecState::Terminated;

    if pc >= len {
        state = ExecState::Finished;
        return ExecOutcome { tape, state, steps, skipped, head0, head1, pc };
    }

    while steps < max_steps {
        steps += 1;

        match tape[pc] {
            b'<' => head0 = (head0 + len - 1) % len,
            b'>' => head0 = (head0 + 1) % len,
            b'{' => head1 = (head1 + len - 1) % len,
            b'}' => head1 = (head1 + 1) % len,
            b'-' => tape[head0] = tape[head0].wrapping_sub(1),
            b'+' => tape[head0] = tape[head0].wrapping_add(1),
            b'.' => tape[head1] = tape[head0],
            b',' => tape[head0] = tape[head1],
            b'[' => {
                if tape[head0] == ZERO {
                    let mut depth = 1i32;
                    let mut target = None;
                    for i in pc + 1..len {
                        match tape[i] {
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
                if tape[head0] != ZERO {
                    let mut depth = 1i32;
                    let mut target = None;
                    for i in (0..pc).rev() {
                        match tape[i] {
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

    ExecOutcome { tape, state, steps, skipped, head0, head1, pc }
}

/// Render a program for terminal output: printable bytes as themselves,
/// the zero byte as `␀`, anything else blank.
pub fn program_to_string(program: &[u8]) -> String {
    program
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else if b == 0 {
                '␀'
            } else {
                ' '
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_at_head() {
        // Three decrements applied to the '0' at position 3.
        let outcome = execute(b"---0".to_vec(), 3, 0, 0, 100);
        assert_eq!(outcome.tape, vec![b'-', b'-', b'-', 45]);
        assert_eq!(outcome.state, ExecState::Finished);
        assert_eq!(outcome.steps, 4);
        assert_eq!(outcome.skipped, 1); // the trailing '0' is not an instruction
    }

    #[test]
    fn increment_wraps_byte() {
        let mut tape = vec![0u8; 8];
        tape[0] = b'+';
        tape[4] = 255;
        let outcome = execute(tape, 4, 0, 0, 100);
        assert_eq!(outcome.tape[4], 0);
    }

    #[test]
    fn copy_between_heads() {
        let mut tape = vec![0u8; 8];
        tape[0] = b'.';
        tape[5] = 42;
        let outcome = execute(tape, 5, 7, 0, 100);
        assert_eq!(outcome.tape[7], 42);
        assert_eq!(outcome.state, ExecState::Finished);
    }

    #[test]
    fn head_moves_wrap_around_tape() {
        // '<' from position 0 wraps to the last cell, then ',' reads it back.
        let mut tape = vec![0u8; 8];
        tape[0] = b'<';
        tape[1] = b',';
        tape[7] = 9; // head1 parked here
        let outcome = execute(tape, 0, 7, 0, 100);
        assert_eq!(outcome.head0, 7);
        assert_eq!(outcome.tape[7], 9);
    }

    #[test]
    fn open_bracket_jumps_on_zero_sentinel() {
        // head0 sits on '0', so '[' skips to the matching ']'.
        let tape = vec![b'[', b'+', b']', b'0'];
        let outcome = execute(tape, 3, 0, 0, 100);
        assert_eq!(outcome.state, ExecState::Finished);
        assert_eq!(outcome.steps, 2); // '[' then the skipped '0'
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.tape[3], b'0'); // '+' was never executed on it
    }

    #[test]
    fn sentinel_is_ascii_zero_not_byte_zero() {
        // head0 on a zero BYTE must not trigger the jump.
        let tape = vec![b'[', b'+', b']', 0];
        let outcome = execute(tape, 3, 3, 0, 100);
        // '[' falls through, '+' bumps the cell, ']' jumps back (cell != '0'),
        // and the loop keeps incrementing until the cell reaches '0'.
        assert_eq!(outcome.tape[3], b'0');
        assert_eq!(outcome.state, ExecState::Finished);
    }

    #[test]
    fn loop_counts_down_to_sentinel() {
        // [-] with head0 on '2': decrements until the cell reads '0'.
        let tape = vec![b'[', b'-', b']', b'2'];
        let outcome = execute(tape, 3, 0, 0, 100);
        assert_eq!(outcome.tape[3], b'0');
        assert_eq!(outcome.state, ExecState::Finished);
        assert_eq!(outcome.steps, 6); // [ - ] - ] then the trailing '2' cell
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn unmatched_open_bracket_is_fatal() {
        let tape = vec![b'[', b'+', b'+', b'0'];
        let outcome = execute(tape, 3, 0, 0, 100);
        assert_eq!(outcome.state, ExecState::ErrorUnmatchedOpen);
        assert!(outcome.state.is_error());
        assert_eq!(outcome.steps, 1);
    }

    #[test]
    fn unmatched_close_bracket_is_fatal() {
        let tape = vec![b']', b'+', b'+', b'+'];
        let outcome = execute(tape, 3, 0, 0, 100);
        assert_eq!(outcome.state, ExecState::ErrorUnmatchedClose);
        assert_eq!(outcome.steps, 1);
    }

    #[test]
    fn nested_brackets_match_by_depth() {
        // [ [ ] ] with head0 on '0': the outer '[' must land on the LAST ']'.
        let tape = vec![b'[', b'[', b']', b']', b'0'];
        let outcome = execute(tape, 4, 0, 0, 100);
        assert_eq!(outcome.state, ExecState::Finished);
        assert_eq!(outcome.pc, 5);
        assert_eq!(outcome.steps, 2); // outer '[' jump, then the '0' byte
    }

    #[test]
    fn step_budget_exhaustion_terminates() {
        // '[' no-jump then ']' jumping back forever.
        let tape = vec![b'[', b']'];
        let outcome = execute(tape, 0, 0, 0, 64);
        assert_eq!(outcome.state, ExecState::Terminated);
        assert_eq!(outcome.steps, 64);
    }

    #[test]
    fn empty_step_budget_reports_terminated() {
        let outcome = execute(vec![b'+'; 4], 0, 0, 0, 0);
        assert_eq!(outcome.state, ExecState::Terminated);
        assert_eq!(outcome.steps, 0);
    }

    #[test]
    fn pc_never_escapes_the_tape() {
        // A handful of dense instruction tapes: whatever happens, the pc is
        // at most one past the end and the state is terminal.
        let programs: [&[u8]; 4] = [b"[[{.>]-]", b"]}>,<{+[", b"........", b"[]][[]]["];
        for p in programs {
            let mut tape = p.to_vec();
            tape.extend_from_slice(p);
            let len = tape.len();
            let outcome = execute(tape, 0, p.len(), 0, 4096);
            assert!(outcome.pc <= len);
            assert!(matches!(
                outcome.state,
                ExecState::Finished
                    | ExecState::Terminated
                    | ExecState::ErrorUnmatchedOpen
                    | ExecState::ErrorUnmatchedClose
            ));
        }
    }

    #[test]
    fn replicator_scenario_terminates() {
        // 32-byte copier run against a tape of '0' sentinels.
        let mut tape = b"[[{.>]-]                ]-]>.{[[".to_vec();
        tape.extend_from_slice(&[b'0'; 32]);
        let outcome = execute(tape, 0, 32, 0, 1024);
        assert!(matches!(outcome.state, ExecState::Finished | ExecState::Terminated));
        assert!(outcome.steps > 100, "copier loop should run for many steps");

        // Same seed-free inputs, same outcome: the interpreter is pure.
        let mut tape2 = b"[[{.>]-]                ]-]>.{[[".to_vec();
        tape2.extend_from_slice(&[b'0'; 32]);
        let outcome2 = execute(tape2, 0, 32, 0, 1024);
        assert_eq!(outcome.tape, outcome2.tape);
        assert_eq!(outcome.steps, outcome2.steps);
    }

    #[test]
    fn program_rendering() {
        assert_eq!(program_to_string(&[b'a', 0, 7, b' ']), "a␀  ");
    }
}
