// Copyright 2016 The Fancy Regex Authors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! The compiled-pattern representation the matcher executes.
//!
//! A program is a sequence of 32-bit words. Each word packs an 8-bit opcode
//! tag in the high byte and a 24-bit operand in the low bytes; `STRING` uses
//! a second word (`STRING_LEN`) for the literal's length. Literal text lives
//! in a shared UTF-16 pool referenced by absolute offset, so the instruction
//! stream itself stays fixed-width.
//!
//! [`Pattern`] is immutable once built and can be shared by any number of
//! matchers, on any number of threads. [`PatternBuilder`] is the assembler
//! used to construct programs instruction by instruction; producing programs
//! from a regex source string is the job of a separate compiler.

use std::ops::RangeInclusive;

use crate::matcher::Matcher;
use crate::unicode::CodeSet;

/// Opcode tags. The tag occupies the high byte of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// No effect.
    Nop = 0,
    /// Unconditional backtrack.
    Backtrack = 1,
    /// Successful end of program.
    End = 2,
    /// Unsuccessful end of program.
    Fail = 3,
    /// Match one code point; the operand is its UTF-32 value.
    OneChar = 4,
    /// Match a literal from the pattern's text pool; the operand is the
    /// offset and the following `StringLen` word carries the length, both in
    /// code units.
    String = 5,
    /// Second word of `String`.
    StringLen = 6,
    /// Push a saved state; the operand is the program offset to resume at
    /// when backtracking into this frame.
    StateSave = 7,
    /// Jump to the program offset in the operand.
    Jmp = 8,
    /// Record the input cursor as the start of the capture group in the
    /// operand (1-based).
    StartCapture = 9,
    /// Record the input cursor as the end of the capture group in the
    /// operand.
    EndCapture = 10,
    /// `^`: succeed only at the start of input.
    Caret = 11,
    /// `$`: succeed at end of input, before a final line terminator, or
    /// before a final CR LF.
    Dollar = 12,
    /// `\A`: succeed only at the start of input.
    BackslashA = 13,
    /// `\b` (operand 0) / `\B` (operand 1).
    BackslashB = 14,
    /// `\d` (operand 0) / `\D` (operand 1).
    BackslashD = 15,
    /// `\G`: succeed where the previous match ended.
    BackslashG = 16,
    /// `\X`: consume a combining character sequence.
    BackslashX = 17,
    /// `\z`: succeed only at the end of input.
    BackslashZ = 18,
    /// Test one code point against a predefined set; the operand is a
    /// [`StaticSet`] id, optionally flagged with [`NEG_SET`].
    StaticSetref = 19,
    /// Test one code point against a pattern-owned set; the operand indexes
    /// the pattern's set table.
    Setref = 20,
    /// `.`: any code point except a line terminator.
    DotAny = 21,
    /// `.` in dot-matches-all mode; CR LF is consumed as a unit.
    DotAnyAll = 22,
}

impl Op {
    pub(crate) fn from_tag(tag: u8) -> Option<Op> {
        Some(match tag {
            0 => Op::Nop,
            1 => Op::Backtrack,
            2 => Op::End,
            3 => Op::Fail,
            4 => Op::OneChar,
            5 => Op::String,
            6 => Op::StringLen,
            7 => Op::StateSave,
            8 => Op::Jmp,
            9 => Op::StartCapture,
            10 => Op::EndCapture,
            11 => Op::Caret,
            12 => Op::Dollar,
            13 => Op::BackslashA,
            14 => Op::BackslashB,
            15 => Op::BackslashD,
            16 => Op::BackslashG,
            17 => Op::BackslashX,
            18 => Op::BackslashZ,
            19 => Op::StaticSetref,
            20 => Op::Setref,
            21 => Op::DotAny,
            22 => Op::DotAnyAll,
            _ => return None,
        })
    }
}

/// Mask of the 24-bit operand field.
pub const OPERAND_MASK: u32 = 0x00FF_FFFF;

/// Negation flag for `STATIC_SETREF` operands: the reserved high bit of the
/// operand field.
pub const NEG_SET: u32 = 0x0080_0000;

/// Extracts the opcode tag from an instruction word.
#[inline]
#[must_use]
pub fn op_type(word: u32) -> u8 {
    (word >> 24) as u8
}

/// Extracts the 24-bit operand from an instruction word.
#[inline]
#[must_use]
pub fn op_value(word: u32) -> u32 {
    word & OPERAND_MASK
}

#[inline]
pub(crate) fn encode_op(op: Op, value: u32) -> u32 {
    debug_assert!(value <= OPERAND_MASK, "operand {value:#x} overflows 24 bits");
    (u32::from(op as u8) << 24) | value
}

/// Ids of the predefined sets consulted by `STATIC_SETREF` and the
/// word-boundary predicate. Ids are 1-based; 0 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StaticSet {
    /// Word characters: alphabetic, marks, decimal digits, connector
    /// punctuation, zero-width (non-)joiners.
    Word = 1,
    /// Decimal digits (general category Nd).
    Digit = 2,
    /// White space.
    Space = 3,
}

/// Number of static-set slots, including the reserved slot 0.
pub(crate) const STATIC_SET_COUNT: usize = 4;

/// A compiled regular-expression program.
///
/// Immutable and freely shareable; every matcher borrows the pattern it
/// executes. See the [module docs](self) for the instruction encoding.
#[derive(Debug)]
pub struct Pattern {
    pub(crate) ops: Vec<u32>,
    pub(crate) literal_text: Vec<u16>,
    pub(crate) n_groups: usize,
    pub(crate) max_capture_digits: u32,
    pub(crate) sets: Vec<CodeSet>,
}

impl Pattern {
    /// Starts assembling a new program.
    #[must_use]
    pub fn builder() -> PatternBuilder {
        PatternBuilder::default()
    }

    /// Number of explicit capture groups. Group 0, the whole match, is not
    /// counted.
    #[inline]
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.n_groups
    }

    /// Creates a matcher for this pattern over `input`. The pattern must
    /// outlive the matcher; the input must outlive both the matcher and any
    /// group slices taken from it.
    #[must_use]
    pub fn matcher<'p, 't>(&'p self, input: &'t [u16]) -> Matcher<'p, 't> {
        Matcher::new(self, input)
    }

    // for debugging only
    #[cfg(debug_assertions)]
    #[doc(hidden)]
    pub fn debug_print(&self) {
        let mut ix = 0;
        while ix < self.ops.len() {
            let word = self.ops[ix];
            println!("{ix:3}: {:?} {}", Op::from_tag(op_type(word)), op_value(word));
            ix += 1;
        }
    }
}

/// Instruction-level assembler for [`Pattern`]s.
///
/// Program offsets (for `state_save` and `jmp`) are word indices; note that
/// a multi-unit literal occupies two words. [`PatternBuilder::here`] reports
/// the offset the next instruction will land on.
#[derive(Debug, Default)]
pub struct PatternBuilder {
    ops: Vec<u32>,
    literal_text: Vec<u16>,
    n_groups: usize,
    sets: Vec<CodeSet>,
}

impl PatternBuilder {
    /// Declares the number of explicit capture groups.
    #[must_use]
    pub fn groups(mut self, n: usize) -> Self {
        self.n_groups = n;
        self
    }

    /// Adds a user set built from inclusive code-point ranges. Sets are
    /// indexed by `SETREF` in the order they are added, starting at 0.
    #[must_use]
    pub fn add_set<I>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = RangeInclusive<u32>>,
    {
        self.sets.push(CodeSet::from_ranges(ranges));
        self
    }

    /// Program offset of the next instruction.
    #[must_use]
    pub fn here(&self) -> usize {
        self.ops.len()
    }

    /// Appends a raw instruction word.
    #[must_use]
    pub fn op(mut self, op: Op, value: u32) -> Self {
        self.ops.push(encode_op(op, value));
        self
    }

    /// `NOP`.
    #[must_use]
    pub fn nop(self) -> Self {
        self.op(Op::Nop, 0)
    }

    /// Unconditional backtrack.
    #[must_use]
    pub fn backtrack(self) -> Self {
        self.op(Op::Backtrack, 0)
    }

    /// Successful end of program.
    #[must_use]
    pub fn end(self) -> Self {
        self.op(Op::End, 0)
    }

    /// Unsuccessful end of program.
    #[must_use]
    pub fn fail(self) -> Self {
        self.op(Op::Fail, 0)
    }

    /// Match a single code point.
    #[must_use]
    pub fn one_char(self, c: char) -> Self {
        self.op(Op::OneChar, u32::from(c))
    }

    /// Match a literal. A single code point becomes `ONECHAR`; anything
    /// longer is interned in the text pool behind `STRING` + `STRING_LEN`.
    #[must_use]
    pub fn literal(mut self, text: &str) -> Self {
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return self.one_char(c);
        }
        let offset = self.literal_text.len();
        self.literal_text.extend(text.encode_utf16());
        let len = self.literal_text.len() - offset;
        self.op(Op::String, offset as u32).op(Op::StringLen, len as u32)
    }

    /// Push a saved state resuming at `target` on backtrack.
    #[must_use]
    pub fn state_save(self, target: usize) -> Self {
        self.op(Op::StateSave, target as u32)
    }

    /// Jump to `target`.
    #[must_use]
    pub fn jmp(self, target: usize) -> Self {
        self.op(Op::Jmp, target as u32)
    }

    /// Open capture group `group` (1-based).
    #[must_use]
    pub fn start_capture(self, group: usize) -> Self {
        self.op(Op::StartCapture, group as u32)
    }

    /// Close capture group `group`.
    #[must_use]
    pub fn end_capture(self, group: usize) -> Self {
        self.op(Op::EndCapture, group as u32)
    }

    /// `^`.
    #[must_use]
    pub fn caret(self) -> Self {
        self.op(Op::Caret, 0)
    }

    /// `$`.
    #[must_use]
    pub fn dollar(self) -> Self {
        self.op(Op::Dollar, 0)
    }

    /// `\A`.
    #[must_use]
    pub fn backslash_a(self) -> Self {
        self.op(Op::BackslashA, 0)
    }

    /// `\b`, or `\B` when `negated`.
    #[must_use]
    pub fn backslash_b(self, negated: bool) -> Self {
        self.op(Op::BackslashB, u32::from(negated))
    }

    /// `\d`, or `\D` when `negated`.
    #[must_use]
    pub fn backslash_d(self, negated: bool) -> Self {
        self.op(Op::BackslashD, u32::from(negated))
    }

    /// `\G`.
    #[must_use]
    pub fn backslash_g(self) -> Self {
        self.op(Op::BackslashG, 0)
    }

    /// `\X`.
    #[must_use]
    pub fn backslash_x(self) -> Self {
        self.op(Op::BackslashX, 0)
    }

    /// `\z`.
    #[must_use]
    pub fn backslash_z(self) -> Self {
        self.op(Op::BackslashZ, 0)
    }

    /// Test against a predefined set, optionally negated.
    #[must_use]
    pub fn static_set(self, set: StaticSet, negated: bool) -> Self {
        let mut value = u32::from(set as u8);
        if negated {
            value |= NEG_SET;
        }
        self.op(Op::StaticSetref, value)
    }

    /// Test against the user set at `index`.
    #[must_use]
    pub fn set_ref(self, index: usize) -> Self {
        self.op(Op::Setref, index as u32)
    }

    /// `.` outside dot-matches-all mode.
    #[must_use]
    pub fn dot_any(self) -> Self {
        self.op(Op::DotAny, 0)
    }

    /// `.` in dot-matches-all mode.
    #[must_use]
    pub fn dot_any_all(self) -> Self {
        self.op(Op::DotAnyAll, 0)
    }

    /// Finishes assembly.
    ///
    /// # Panics
    ///
    /// In debug builds, panics on a structurally invalid program (dangling
    /// jump target, `STRING` without its length word, out-of-range group or
    /// set operand).
    #[must_use]
    pub fn build(self) -> Pattern {
        let mut max_capture_digits = 1;
        while 10usize.pow(max_capture_digits) <= self.n_groups {
            max_capture_digits += 1;
        }
        let pattern = Pattern {
            ops: self.ops,
            literal_text: self.literal_text,
            n_groups: self.n_groups,
            max_capture_digits,
            sets: self.sets,
        };
        pattern.validate();
        pattern
    }
}

impl Pattern {
    fn validate(&self) {
        let mut ix = 0;
        while ix < self.ops.len() {
            let word = self.ops[ix];
            let op = Op::from_tag(op_type(word)).expect("unrecognized opcode tag");
            let value = op_value(word) as usize;
            ix += 1;
            match op {
                Op::String => {
                    let len_word = self.ops.get(ix).copied();
                    let len = len_word.map_or(0, |w| op_value(w) as usize);
                    debug_assert!(
                        len_word.is_some_and(|w| op_type(w) == Op::StringLen as u8),
                        "STRING at {} lacks its STRING_LEN word",
                        ix - 1
                    );
                    debug_assert!(
                        value + len <= self.literal_text.len(),
                        "STRING at {} reads past the text pool",
                        ix - 1
                    );
                    ix += 1;
                }
                Op::StringLen => {
                    debug_assert!(false, "STRING_LEN at {} without a STRING", ix - 1);
                }
                Op::StateSave | Op::Jmp => {
                    debug_assert!(value < self.ops.len(), "target {value} is out of program");
                }
                Op::StartCapture | Op::EndCapture => {
                    debug_assert!(
                        value >= 1 && value <= self.n_groups,
                        "capture group {value} out of range"
                    );
                }
                Op::Setref => {
                    debug_assert!(value < self.sets.len(), "set index {value} out of range");
                }
                Op::StaticSetref => {
                    let id = value & !(NEG_SET as usize);
                    debug_assert!(
                        id >= 1 && id < STATIC_SET_COUNT,
                        "static set id {id} out of range"
                    );
                }
                _ => {}
            }
        }
    }
}
