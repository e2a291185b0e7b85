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

//! The backtracking interpreter and the matcher built around it.
//!
//! The interpreter executes a compiled program against a UTF-16 input. It
//! keeps a program counter (PC) into the instruction words and a cursor (IX)
//! into the input, both advancing as instructions consume text. When a guard
//! fails, the interpreter *backtracks*: it pops the most recent saved state
//! off an explicit stack and resumes there. With nothing left to pop, the
//! attempt has failed.
//!
//! A saved state is pushed by `STATE_SAVE` and records the capture extents of
//! every group, an alternative PC, and the current IX. A program for the
//! regex `ab|ac`:
//!
//! ```text
//! 0: StateSave(3)
//! 1: OneChar('a')
//! 2: Jmp(5)   -- unreachable here; illustrative
//! 3: OneChar('a')
//! 4: OneChar('c')
//! 5: End
//! ```
//!
//! Stepping through input `ac`: `StateSave(3)` pushes a frame with PC 3 and
//! IX 0; `OneChar('a')` matches and IX becomes 1; the next instruction fails
//! on `c`, so the frame is popped, restoring PC 3 and IX 0, and the second
//! branch matches through to `End`.
//!
//! Because every frame holds all capture extents, backing out of a branch
//! also backs out of any groups recorded inside it. A group whose start is
//! `-1` did not participate in the match, whether it was never entered or
//! was entered and then abandoned.
//!
//! The matcher wraps one interpreter invocation per candidate position and
//! adds the search drivers (`find`, `matches`, `looking_at`) and the
//! append/replace pipeline on top.

use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::program::{op_type, op_value, Op, Pattern, StaticSet, NEG_SET};
use crate::stack::{BacktrackStack, DEFAULT_MAX_STACK};
use crate::unicode;
use crate::utf16;

/// Enable tracing of the interpreter. Only for debugging/investigating.
const OPTION_TRACE: u32 = 1 << 0;

const BACKSLASH: u16 = 0x5C;
const DOLLAR_SIGN: u16 = 0x24;

const CR: u16 = 0x0D;
const LF: u16 = 0x0A;

/// A matcher: executes one compiled [`Pattern`] against one input string and
/// holds the state of the most recent match.
///
/// A matcher is single-threaded and strictly synchronous; the pattern it
/// borrows is immutable and may be shared by matchers on other threads.
///
/// `'p` is the lifetime of the pattern, `'t` the lifetime of the input text.
/// Group slices returned by [`Matcher::group`] borrow the input, not the
/// matcher.
#[derive(Debug)]
pub struct Matcher<'p, 't> {
    pattern: &'p Pattern,
    input: &'t [u16],
    matched: bool,
    match_start: usize,
    match_end: usize,
    last_match_end: usize,
    cap_starts: Vec<i32>,
    cap_ends: Vec<i32>,
    stack: BacktrackStack,
    options: u32,
}

impl<'p, 't> Matcher<'p, 't> {
    pub(crate) fn new(pattern: &'p Pattern, input: &'t [u16]) -> Matcher<'p, 't> {
        let n_groups = pattern.group_count();
        Matcher {
            pattern,
            input,
            matched: false,
            match_start: 0,
            match_end: 0,
            last_match_end: 0,
            cap_starts: vec![-1; n_groups + 1],
            cap_ends: vec![-1; n_groups + 1],
            stack: BacktrackStack::new(DEFAULT_MAX_STACK),
            options: 0,
        }
    }

    /// Caps the backtrack stack at `limit` 32-bit slots. Exceeding the cap
    /// aborts the match attempt with [`Error::StackOverflow`].
    ///
    /// Default is `1_000_000` (1 million).
    pub fn max_stack(&mut self, limit: usize) -> &mut Self {
        self.stack.set_limit(limit);
        self
    }

    #[doc(hidden)]
    pub fn enable_trace(&mut self) -> &mut Self {
        self.options |= OPTION_TRACE;
        self
    }

    /// The input text being searched.
    #[must_use]
    #[inline]
    pub fn input(&self) -> &'t [u16] {
        self.input
    }

    /// The pattern this matcher executes.
    #[must_use]
    #[inline]
    pub fn pattern(&self) -> &'p Pattern {
        self.pattern
    }

    /// Number of explicit capture groups in the pattern.
    #[must_use]
    #[inline]
    pub fn group_count(&self) -> usize {
        self.pattern.group_count()
    }

    /// Clears the current match and rewinds the search position to the start
    /// of the input.
    pub fn reset(&mut self) -> &mut Self {
        self.matched = false;
        self.match_start = 0;
        self.match_end = 0;
        self.last_match_end = 0;
        self.cap_starts.fill(-1);
        self
    }

    /// Rebinds the matcher to a new input, then resets.
    pub fn reset_input(&mut self, input: &'t [u16]) -> &mut Self {
        self.input = input;
        self.reset()
    }

    /// Finds the next match, continuing from where the previous one ended.
    /// After a reset the search begins at the start of the input.
    ///
    /// A zero-width match does not stall the search: the next call starts
    /// one code point further along.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::StackOverflow`] from the interpreter.
    pub fn find(&mut self) -> Result<bool> {
        let mut start_pos = self.match_end;
        if self.matched && self.match_start == self.match_end {
            if start_pos >= self.input.len() {
                return Ok(false);
            }
            start_pos = utf16::next_codepoint_ix(self.input, start_pos);
        }
        self.search(start_pos)
    }

    /// Resets, then finds the first match at or after `start` (a code-unit
    /// offset).
    ///
    /// `start == input.len()` is accepted and finds nothing; matches are only
    /// attempted at positions strictly inside the input.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] if `start > input.len()`; otherwise as
    /// [`Matcher::find`].
    pub fn find_from(&mut self, start: usize) -> Result<bool> {
        if start > self.input.len() {
            return Err(Error::IndexOutOfBounds(start));
        }
        self.reset();
        self.search(start)
    }

    /// Tests whether the pattern matches the entire input.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::StackOverflow`] from the interpreter.
    pub fn matches(&mut self) -> Result<bool> {
        self.reset();
        self.match_at(0)?;
        Ok(self.matched && self.match_end == self.input.len())
    }

    /// Tests whether the pattern matches a prefix of the input.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::StackOverflow`] from the interpreter.
    pub fn looking_at(&mut self) -> Result<bool> {
        self.reset();
        self.match_at(0)?;
        Ok(self.matched)
    }

    /// Returns an iterator over the spans of all non-overlapping matches,
    /// from the start of the input. Resets the matcher first.
    pub fn find_iter(&mut self) -> Matches<'_, 'p, 't> {
        self.reset();
        Matches {
            matcher: self,
            done: false,
        }
    }

    /// Start offset of a group in the current match, or `None` if the group
    /// did not participate. Group 0 is the whole match.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] without a current match;
    /// [`Error::IndexOutOfBounds`] for a group index above
    /// [`Matcher::group_count`].
    pub fn start(&self, group: usize) -> Result<Option<usize>> {
        if !self.matched {
            return Err(Error::InvalidState);
        }
        if group > self.pattern.group_count() {
            return Err(Error::IndexOutOfBounds(group));
        }
        if group == 0 {
            return Ok(Some(self.match_start));
        }
        let s = self.cap_starts[group];
        Ok((s >= 0).then_some(s as usize))
    }

    /// End offset of a group in the current match, or `None` if the group
    /// did not participate.
    ///
    /// When the engine backs out of a group it only rewinds the start; the
    /// recorded end is left behind and is never reported on its own.
    ///
    /// # Errors
    ///
    /// As [`Matcher::start`].
    pub fn end(&self, group: usize) -> Result<Option<usize>> {
        if !self.matched {
            return Err(Error::InvalidState);
        }
        if group > self.pattern.group_count() {
            return Err(Error::IndexOutOfBounds(group));
        }
        if group == 0 {
            return Ok(Some(self.match_end));
        }
        if self.cap_starts[group] < 0 {
            return Ok(None);
        }
        Ok(Some(self.cap_ends[group] as usize))
    }

    /// The text a group matched, as a slice of the input. A group that did
    /// not participate yields an empty slice.
    ///
    /// # Errors
    ///
    /// As [`Matcher::start`].
    pub fn group(&self, group: usize) -> Result<&'t [u16]> {
        let (start, end) = (self.start(group)?, self.end(group)?);
        match (start, end) {
            (Some(start), Some(end)) => Ok(&self.input[start..end]),
            _ => Ok(&[]),
        }
    }

    /// [`Matcher::group`] decoded to a `String`, replacing unpaired
    /// surrogates.
    ///
    /// # Errors
    ///
    /// As [`Matcher::start`].
    pub fn group_str(&self, group: usize) -> Result<String> {
        Ok(String::from_utf16_lossy(self.group(group)?))
    }

    /// Appends the input between the previous and the current match to
    /// `dest`, followed by `replacement` with its `$n` group references and
    /// `\` escapes expanded. Intended to be called once after each
    /// successful [`Matcher::find`].
    ///
    /// In the replacement, `\c` copies `c` through literally, `$` followed
    /// by decimal digits names a capture group, and a `$` not followed by a
    /// digit is a plain `$`. At most as many digits are taken as the largest
    /// group number needs.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] without a current match;
    /// [`Error::IndexOutOfBounds`] for a group reference above
    /// [`Matcher::group_count`].
    pub fn append_replacement(&mut self, dest: &mut Vec<u16>, replacement: &[u16]) -> Result<()> {
        if !self.matched {
            return Err(Error::InvalidState);
        }

        // the gap between the previous match and this one; nothing to copy
        // when append_replacement is called again without an intervening find
        if self.last_match_end < self.match_start {
            dest.extend_from_slice(&self.input[self.last_match_end..self.match_start]);
        }

        let mut ix = 0;
        while ix < replacement.len() {
            let unit = replacement[ix];
            ix += 1;
            if unit == BACKSLASH {
                // Copy the escaped unit through unexamined. Surrogate halves
                // need no special casing: the trailing half cannot be `$` or
                // `\` and passes through on the next iteration.
                if ix >= replacement.len() {
                    break;
                }
                dest.push(replacement[ix]);
                ix += 1;
                continue;
            }
            if unit != DOLLAR_SIGN {
                dest.push(unit);
                continue;
            }

            // A `$`: accumulate at most max_capture_digits digits.
            let mut n_digits = 0;
            let mut group_num = 0;
            while ix < replacement.len() {
                let c = utf16::char32_at(replacement, ix);
                let Some(digit) = char::from_u32(c).and_then(|c| c.to_digit(10)) else {
                    break;
                };
                ix = utf16::next_codepoint_ix(replacement, ix);
                group_num = group_num * 10 + digit as usize;
                n_digits += 1;
                if n_digits >= self.pattern.max_capture_digits {
                    break;
                }
            }
            if n_digits == 0 {
                // no group number at all; the `$` is substitution text
                dest.push(DOLLAR_SIGN);
                continue;
            }
            let text = self.group(group_num)?;
            dest.extend_from_slice(text);
        }

        self.last_match_end = self.match_end;
        Ok(())
    }

    /// Appends everything after the current match position to `dest`.
    /// Intended to follow the last [`Matcher::append_replacement`].
    pub fn append_tail(&self, dest: &mut Vec<u16>) {
        dest.extend_from_slice(&self.input[self.match_end..]);
    }

    /// Replaces every match with `replacement` and returns the result.
    /// Equivalent to a reset followed by a find/append loop and a final
    /// [`Matcher::append_tail`].
    ///
    /// # Errors
    ///
    /// As [`Matcher::find`] and [`Matcher::append_replacement`].
    pub fn replace_all(&mut self, replacement: &[u16]) -> Result<Vec<u16>> {
        self.reset();
        let mut dest = Vec::with_capacity(self.input.len());
        while self.find()? {
            self.append_replacement(&mut dest, replacement)?;
        }
        self.append_tail(&mut dest);
        Ok(dest)
    }

    /// Replaces the first match with `replacement`, or returns the input
    /// unchanged if there is none.
    ///
    /// # Errors
    ///
    /// As [`Matcher::find`] and [`Matcher::append_replacement`].
    pub fn replace_first(&mut self, replacement: &[u16]) -> Result<Vec<u16>> {
        self.reset();
        if !self.find()? {
            return Ok(self.input.to_vec());
        }
        let mut dest = Vec::with_capacity(self.input.len());
        self.append_replacement(&mut dest, replacement)?;
        self.append_tail(&mut dest);
        Ok(dest)
    }

    // Attempt matches at successive code points until one succeeds or the
    // candidates run out. Positions equal to the input length are never
    // attempted.
    fn search(&mut self, mut start_pos: usize) -> Result<bool> {
        while start_pos < self.input.len() {
            self.match_at(start_pos)?;
            if self.matched {
                return Ok(true);
            }
            start_pos = utf16::next_codepoint_ix(self.input, start_pos);
        }
        Ok(false)
    }

    // One interpreter invocation. On error the matcher must not expose a
    // partial match: the flag is dropped and the captures wiped.
    fn match_at(&mut self, start_idx: usize) -> Result<()> {
        match self.run(start_idx) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.matched = false;
                self.cap_starts.fill(-1);
                Err(error)
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn run(&mut self, start_idx: usize) -> Result<()> {
        let pattern = self.pattern;
        let input = self.input;
        let input_len = input.len();
        let n_groups = pattern.group_count();
        let frame_size = 2 * n_groups + 2;

        // Clear capture results from any previous attempt. Required for
        // groups inside alternations that the winning branch never enters.
        self.cap_starts.fill(-1);
        self.stack.clear();

        let mut input_idx = start_idx;
        let mut pat_idx = 0;
        let mut is_match = false;

        self.trace(format_args!("attempt at {start_idx}"));
        'matching: loop {
            // break from this loop to backtrack; a failed guard pops the
            // most recent saved state, or ends the attempt if there is none
            'fail: loop {
                let word = pattern.ops[pat_idx];
                let Some(op) = Op::from_tag(op_type(word)) else {
                    unreachable!("compiled pattern contains unrecognized opcode tag");
                };
                let operand = op_value(word);
                self.trace(format_args!("{input_idx}\t{pat_idx} {op:?} {operand}"));
                pat_idx += 1;

                match op {
                    Op::Nop => {}

                    Op::Backtrack => break 'fail,

                    Op::End => {
                        is_match = true;
                        break 'matching;
                    }

                    Op::Fail => break 'matching,

                    Op::OneChar => {
                        if input_idx >= input_len {
                            break 'fail;
                        }
                        let c = utf16::next_char32(input, &mut input_idx);
                        if c != operand {
                            break 'fail;
                        }
                    }

                    Op::String => {
                        // two-word form; the second word is the length
                        let text_start = operand as usize;
                        let len_word = pattern.ops[pat_idx];
                        debug_assert_eq!(op_type(len_word), Op::StringLen as u8);
                        pat_idx += 1;
                        let text_len = op_value(len_word) as usize;
                        let string_end = input_idx + text_len;
                        // raw code-unit comparison; the pool is well-formed
                        // UTF-16 produced together with the opcodes
                        if string_end <= input_len
                            && input[input_idx..string_end]
                                == pattern.literal_text[text_start..text_start + text_len]
                        {
                            input_idx = string_end;
                        } else {
                            break 'fail;
                        }
                    }

                    Op::StringLen => {
                        unreachable!("STRING_LEN reached without a preceding STRING");
                    }

                    Op::StateSave => {
                        let frame = self.stack.reserve_block(frame_size)?;
                        let mut slot = 0;
                        for group in (1..=n_groups).rev() {
                            frame[slot] = self.cap_starts[group];
                            frame[slot + 1] = self.cap_ends[group];
                            slot += 2;
                        }
                        frame[slot] = operand as i32;
                        frame[slot + 1] = input_idx as i32;
                    }

                    Op::Jmp => {
                        pat_idx = operand as usize;
                    }

                    Op::StartCapture => {
                        let group = operand as usize;
                        debug_assert!(group >= 1 && group <= n_groups);
                        self.cap_starts[group] = input_idx as i32;
                    }

                    Op::EndCapture => {
                        let group = operand as usize;
                        debug_assert!(group >= 1 && group <= n_groups);
                        debug_assert!(
                            self.cap_starts[group] >= 0,
                            "group {group} closed before it was opened"
                        );
                        self.cap_ends[group] = input_idx as i32;
                    }

                    Op::Caret => {
                        if input_idx != 0 {
                            break 'fail;
                        }
                    }

                    Op::Dollar => {
                        // End of input, just before a final line terminator,
                        // or just before a final CR LF.
                        let at_end = input_idx >= input_len;
                        let before_final_terminator = input_idx + 1 == input_len
                            && unicode::is_line_terminator(utf16::char32_at(input, input_idx));
                        let before_final_crlf = input_idx + 2 == input_len
                            && input[input_idx] == CR
                            && input[input_idx + 1] == LF;
                        if !(at_end || before_final_terminator || before_final_crlf) {
                            break 'fail;
                        }
                    }

                    Op::BackslashA => {
                        if input_idx != 0 {
                            break 'fail;
                        }
                    }

                    Op::BackslashB => {
                        // operand 1 flips the sense for \B
                        if self.is_word_boundary(input_idx) == (operand != 0) {
                            break 'fail;
                        }
                    }

                    Op::BackslashD => {
                        if input_idx >= input_len {
                            break 'fail;
                        }
                        let c = utf16::char32_at(input, input_idx);
                        if unicode::is_decimal_digit(c) == (operand != 0) {
                            break 'fail;
                        }
                        input_idx = utf16::next_codepoint_ix(input, input_idx);
                    }

                    Op::BackslashG => {
                        let anchored = (self.matched && input_idx == self.match_end)
                            || (!self.matched && input_idx == 0);
                        if !anchored {
                            break 'fail;
                        }
                    }

                    Op::BackslashX => {
                        // closer to a grapheme cluster than to Perl's \X
                        if input_idx >= input_len {
                            break 'fail;
                        }
                        let c = utf16::next_char32(input, &mut input_idx);
                        if c == u32::from(CR)
                            && input_idx < input_len
                            && input[input_idx] == LF
                        {
                            // CR LF is one cluster
                            input_idx += 1;
                        } else if !unicode::is_control(c) {
                            // consume combining marks trailing the base
                            while input_idx < input_len {
                                let mark = utf16::char32_at(input, input_idx);
                                if !unicode::is_mark(mark) {
                                    break;
                                }
                                input_idx = utf16::next_codepoint_ix(input, input_idx);
                            }
                        }
                    }

                    Op::BackslashZ => {
                        if input_idx < input_len {
                            break 'fail;
                        }
                    }

                    Op::StaticSetref => {
                        // The high bit of the operand is the polarity: set
                        // means succeed when the code point is NOT a member.
                        // At end of input the negated form succeeds without
                        // consuming anything.
                        let mut success = operand & NEG_SET != 0;
                        let set_id = operand & !NEG_SET;
                        if input_idx < input_len {
                            let c = utf16::next_char32(input, &mut input_idx);
                            if unicode::static_set(set_id).contains(c) {
                                success = !success;
                            }
                        }
                        if !success {
                            break 'fail;
                        }
                    }

                    Op::Setref => {
                        if input_idx >= input_len {
                            break 'fail;
                        }
                        let c = utf16::next_char32(input, &mut input_idx);
                        let set_ix = operand as usize;
                        debug_assert!(set_ix < pattern.sets.len());
                        if !pattern.sets[set_ix].contains(c) {
                            break 'fail;
                        }
                    }

                    Op::DotAny => {
                        if input_idx >= input_len {
                            break 'fail;
                        }
                        let c = utf16::next_char32(input, &mut input_idx);
                        if unicode::is_line_terminator(c) {
                            break 'fail;
                        }
                    }

                    Op::DotAnyAll => {
                        if input_idx >= input_len {
                            break 'fail;
                        }
                        let c = utf16::next_char32(input, &mut input_idx);
                        if c == u32::from(CR)
                            && input_idx < input_len
                            && input[input_idx] == LF
                        {
                            // CR LF counts as one
                            input_idx += 1;
                        }
                    }
                }
            }
            self.trace(format_args!("fail at {input_idx}"));

            if self.stack.is_empty() {
                break 'matching;
            }
            let frame = self.stack.pop_block(frame_size);
            let mut slot = 0;
            for group in (1..=n_groups).rev() {
                self.cap_starts[group] = frame[slot];
                self.cap_ends[group] = frame[slot + 1];
                slot += 2;
            }
            pat_idx = frame[slot] as usize;
            input_idx = frame[slot + 1] as usize;
        }

        self.matched = is_match;
        if is_match {
            self.last_match_end = self.match_end;
            self.match_start = start_idx;
            self.match_end = input_idx;
            self.trace(format_args!(
                "match {}..{}",
                self.match_start, self.match_end
            ));
        }
        Ok(())
    }

    // In "xab..cd..", a word boundary holds at positions 0, 3, 5 and 7.
    // A combining mark is never a boundary itself; scanning left, marks are
    // transparent, so the comparison is against the nearest non-mark
    // predecessor. Off the end of the input is not a boundary.
    fn is_word_boundary(&self, pos: usize) -> bool {
        if pos >= self.input.len() {
            return false;
        }
        let c = utf16::char32_at(self.input, pos);
        if unicode::is_mark(c) {
            return false;
        }
        let word = unicode::static_set(StaticSet::Word as u32);
        let c_is_word = word.contains(c);

        let mut prev_is_word = false;
        let mut prev_pos = pos;
        while prev_pos > 0 {
            prev_pos = utf16::prev_codepoint_ix(self.input, prev_pos);
            let prev = utf16::char32_at(self.input, prev_pos);
            if !unicode::is_mark(prev) {
                prev_is_word = word.contains(prev);
                break;
            }
        }
        c_is_word != prev_is_word
    }

    fn trace(&self, args: fmt::Arguments) {
        #[cfg(debug_assertions)]
        if self.options & OPTION_TRACE != 0 {
            Self::do_trace(args);
        }
        let _ = args;
    }

    #[cold]
    #[cfg(debug_assertions)]
    fn do_trace(args: fmt::Arguments) {
        eprintln!("{args}");
    }
}

/// An iterator over the spans of all non-overlapping matches in the input.
///
/// Yields `Result<Range<usize>>` in code units; stops permanently after the
/// first exhausted search or error.
#[derive(Debug)]
pub struct Matches<'m, 'p, 't> {
    matcher: &'m mut Matcher<'p, 't>,
    done: bool,
}

impl Iterator for Matches<'_, '_, '_> {
    type Item = Result<Range<usize>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.matcher.find() {
            Ok(true) => Some(Ok(self.matcher.match_start..self.matcher.match_end)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utf16::encode;

    fn spans(pattern: &Pattern, text: &str) -> Vec<Range<usize>> {
        let input = encode(text);
        let mut matcher = pattern.matcher(&input);
        matcher
            .find_iter()
            .collect::<Result<Vec<_>>>()
            .expect("search failed")
    }

    fn replaced_all(pattern: &Pattern, text: &str, replacement: &str) -> String {
        let input = encode(text);
        let repl = encode(replacement);
        let mut matcher = pattern.matcher(&input);
        String::from_utf16_lossy(&matcher.replace_all(&repl).expect("replace failed"))
    }

    fn replaced_first(pattern: &Pattern, text: &str, replacement: &str) -> String {
        let input = encode(text);
        let repl = encode(replacement);
        let mut matcher = pattern.matcher(&input);
        String::from_utf16_lossy(&matcher.replace_first(&repl).expect("replace failed"))
    }

    // a program for `(\d+)`: one digit, then a greedy digit loop
    fn digit_run() -> Pattern {
        Pattern::builder()
            .groups(1)
            .start_capture(1) // 0
            .backslash_d(false) // 1
            .state_save(5) // 2
            .backslash_d(false) // 3
            .jmp(2) // 4
            .end_capture(1) // 5
            .end() // 6
            .build()
    }

    #[test]
    fn simple_literal() {
        let pattern = Pattern::builder().literal("abc").end().build();
        let input = encode("xxabcyyabczz");
        let mut m = pattern.matcher(&input);

        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(2));
        assert_eq!(m.end(0).unwrap(), Some(5));
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(8));
        assert_eq!(m.end(0).unwrap(), Some(11));
        assert!(!m.find().unwrap());

        assert_eq!(replaced_all(&pattern, "xxabcyyabczz", "Q"), "xxQyyQzz");
    }

    #[test]
    fn group_expansion() {
        let pattern = Pattern::builder()
            .groups(2)
            .start_capture(1)
            .one_char('a')
            .end_capture(1)
            .start_capture(2)
            .one_char('b')
            .end_capture(2)
            .end()
            .build();
        let input = encode("ab");
        let mut m = pattern.matcher(&input);

        assert!(m.matches().unwrap());
        assert_eq!(m.group_str(0).unwrap(), "ab");
        assert_eq!(m.group_str(1).unwrap(), "a");
        assert_eq!(m.group_str(2).unwrap(), "b");

        assert_eq!(replaced_all(&pattern, "ab", "$2$1"), "ba");
    }

    #[test]
    fn word_boundary_pattern() {
        let pattern = Pattern::builder()
            .backslash_b(false)
            .literal("foo")
            .backslash_b(false)
            .end()
            .build();
        // `barfoo` must not match; the final `foo` is delimited by `!`
        assert_eq!(spans(&pattern, "foo barfoo foo!"), vec![0..3, 11..14]);
    }

    #[test]
    fn word_boundary_never_holds_at_end_of_input() {
        let pattern = Pattern::builder()
            .backslash_b(false)
            .literal("foo")
            .backslash_b(false)
            .end()
            .build();
        assert_eq!(spans(&pattern, "foo"), Vec::<Range<usize>>::new());
    }

    #[test]
    fn not_word_boundary() {
        // \Boo\B inside "food"
        let pattern = Pattern::builder()
            .backslash_b(true)
            .literal("oo")
            .backslash_b(true)
            .end()
            .build();
        assert_eq!(spans(&pattern, "food"), vec![1..3]);
        // at a real word boundary \B fails
        assert_eq!(spans(&pattern, "oops"), Vec::<Range<usize>>::new());
    }

    #[test]
    fn dot_does_not_cross_line_terminators() {
        let pattern = Pattern::builder()
            .one_char('a')
            .dot_any()
            .one_char('b')
            .end()
            .build();
        let input = encode("a\nb");
        assert!(!pattern.matcher(&input).find().unwrap());

        let dotall = Pattern::builder()
            .one_char('a')
            .dot_any_all()
            .one_char('b')
            .end()
            .build();
        let mut m = dotall.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(0));
        assert_eq!(m.end(0).unwrap(), Some(3));
    }

    #[test]
    fn dot_all_consumes_crlf_as_one() {
        let pattern = Pattern::builder().dot_any_all().end().build();
        let input = encode("\r\nx");
        let mut m = pattern.matcher(&input);
        assert!(m.looking_at().unwrap());
        assert_eq!(m.end(0).unwrap(), Some(2));
    }

    #[test]
    fn backtracking_through_a_star() {
        // a*ab
        let pattern = Pattern::builder()
            .state_save(3) // 0
            .one_char('a') // 1
            .jmp(0) // 2
            .one_char('a') // 3
            .one_char('b') // 4
            .end() // 5
            .build();
        let input = encode("aaab");
        let mut m = pattern.matcher(&input);

        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(0));
        assert_eq!(m.end(0).unwrap(), Some(4));
        // the loop saved one frame per `a` and the mismatches popped two
        assert_eq!(m.stack.high_water(), 8);
        assert_eq!(m.stack.slots_in_use(), 4);
    }

    #[test]
    fn replacement_parser() {
        let pattern = digit_run();
        assert_eq!(replaced_first(&pattern, "id=42", "<$1>"), "id=<42>");
        assert_eq!(replaced_first(&pattern, "id=42", "\\$1"), "id=$1");
        assert_eq!(replaced_first(&pattern, "id=42", "$$"), "id=$$");
        // a dangling backslash is dropped
        assert_eq!(replaced_first(&pattern, "id=42", "q\\"), "id=q");
    }

    #[test]
    fn replacement_digit_run_is_bounded() {
        // one group, so at most one digit is taken after `$`
        let pattern = digit_run();
        assert_eq!(replaced_first(&pattern, "id=42", "<$12>"), "id=<422>");
    }

    #[test]
    fn replacement_group_out_of_bounds() {
        let pattern = digit_run();
        let input = encode("id=42");
        let repl = encode("$9");
        let mut m = pattern.matcher(&input);
        assert!(m.find().unwrap());
        let mut dest = Vec::new();
        assert_eq!(
            m.append_replacement(&mut dest, &repl).unwrap_err(),
            Error::IndexOutOfBounds(9)
        );
    }

    #[test]
    fn replace_all_with_group_zero_is_identity() {
        let pattern = digit_run();
        assert_eq!(replaced_all(&pattern, "id=42 x=7", "$0"), "id=42 x=7");
    }

    #[test]
    fn replace_without_match_returns_input() {
        let pattern = Pattern::builder().literal("zzz").end().build();
        assert_eq!(replaced_all(&pattern, "abc", "Q"), "abc");
        assert_eq!(replaced_first(&pattern, "abc", "Q"), "abc");
    }

    #[test]
    fn observers_require_a_match() {
        let pattern = Pattern::builder().literal("zzz").end().build();
        let input = encode("abc");
        let mut m = pattern.matcher(&input);
        assert_eq!(m.start(0).unwrap_err(), Error::InvalidState);
        assert_eq!(m.end(0).unwrap_err(), Error::InvalidState);
        assert_eq!(m.group(0).unwrap_err(), Error::InvalidState);
        let mut dest = Vec::new();
        assert_eq!(
            m.append_replacement(&mut dest, &[]).unwrap_err(),
            Error::InvalidState
        );

        // still invalid after an unsuccessful find
        assert!(!m.find().unwrap());
        assert_eq!(m.start(0).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn group_index_out_of_bounds() {
        let pattern = digit_run();
        let input = encode("id=42");
        let mut m = pattern.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(2).unwrap_err(), Error::IndexOutOfBounds(2));
        assert_eq!(m.end(2).unwrap_err(), Error::IndexOutOfBounds(2));
    }

    #[test]
    fn find_from_bounds() {
        let pattern = Pattern::builder().literal("ab").end().build();
        let input = encode("abab");
        let mut m = pattern.matcher(&input);

        assert!(m.find_from(1).unwrap());
        assert_eq!(m.start(0).unwrap(), Some(2));
        // find_from resets: the first occurrence is reachable again
        assert!(m.find_from(0).unwrap());
        assert_eq!(m.start(0).unwrap(), Some(0));

        assert!(!m.find_from(4).unwrap());
        assert_eq!(m.find_from(5).unwrap_err(), Error::IndexOutOfBounds(5));
    }

    #[test]
    fn group_zero_mirrors_the_match() {
        let pattern = digit_run();
        let input = encode("id=42");
        let mut m = pattern.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(3));
        assert_eq!(m.end(0).unwrap(), Some(5));
        assert_eq!(m.group_str(0).unwrap(), "42");
    }

    #[test]
    fn matches_implies_find_of_the_whole_input() {
        let pattern = Pattern::builder()
            .groups(1)
            .start_capture(1)
            .literal("ab")
            .end_capture(1)
            .end()
            .build();
        let input = encode("ab");
        let mut m = pattern.matcher(&input);
        assert!(m.matches().unwrap());

        assert!(m.find_from(0).unwrap());
        assert_eq!(m.start(0).unwrap(), Some(0));
        assert_eq!(m.end(0).unwrap(), Some(input.len()));
    }

    #[test]
    fn looking_at_is_an_anchored_prefix_test() {
        let pattern = Pattern::builder().literal("ab").end().build();
        let input = encode("abc");
        let mut m = pattern.matcher(&input);
        assert!(m.looking_at().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(0));
        assert!(!m.matches().unwrap());

        let input = encode("xab");
        let mut m = pattern.matcher(&input);
        assert!(!m.looking_at().unwrap());
    }

    #[test]
    fn backed_out_group_reports_absent() {
        // (a)x|ab
        let pattern = Pattern::builder()
            .groups(1)
            .state_save(6) // 0
            .start_capture(1) // 1
            .one_char('a') // 2
            .end_capture(1) // 3
            .one_char('x') // 4
            .jmp(8) // 5
            .one_char('a') // 6
            .one_char('b') // 7
            .end() // 8
            .build();
        let input = encode("ab");
        let mut m = pattern.matcher(&input);

        assert!(m.matches().unwrap());
        // the first branch recorded group 1 and then backed out; the stale
        // end offset must not leak
        assert_eq!(m.start(1).unwrap(), None);
        assert_eq!(m.end(1).unwrap(), None);
        assert_eq!(m.group_str(1).unwrap(), "");
    }

    #[test]
    fn zero_width_matches_make_progress() {
        // a*
        let pattern = Pattern::builder()
            .state_save(3)
            .one_char('a')
            .jmp(0)
            .end()
            .build();
        assert_eq!(spans(&pattern, "bc"), vec![0..0, 1..1]);
        assert_eq!(spans(&pattern, "aab"), vec![0..2, 2..2]);
        assert_eq!(replaced_all(&pattern, "bc", "-"), "-b-c");
    }

    #[test]
    fn match_starts_strictly_increase() {
        let pattern = Pattern::builder().literal("aa").end().build();
        let starts: Vec<usize> = spans(&pattern, "aaaa aa").iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 2, 5]);
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reset_is_idempotent() {
        let pattern = Pattern::builder().literal("ab").end().build();
        let input = encode("xab");
        let mut m = pattern.matcher(&input);
        assert!(m.find().unwrap());

        m.reset();
        assert_eq!(m.start(0).unwrap_err(), Error::InvalidState);
        m.reset().reset();
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(1));
    }

    #[test]
    fn reset_input_rebinds() {
        let pattern = Pattern::builder().literal("ab").end().build();
        let first = encode("ab");
        let second = encode("xxab");
        let mut m = pattern.matcher(&first);
        assert!(m.find().unwrap());

        m.reset_input(&second);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), Some(2));
        assert_eq!(m.input(), &second[..]);
    }

    #[test]
    fn stack_limit_abandons_the_attempt() {
        // a*b against pure a's backtracks forever upward
        let pattern = Pattern::builder()
            .state_save(3)
            .one_char('a')
            .jmp(0)
            .one_char('b')
            .end()
            .build();
        let input = encode("aaaaaaaaaa");
        let mut m = pattern.matcher(&input);
        m.max_stack(8);

        assert_eq!(m.find().unwrap_err(), Error::StackOverflow);
        assert_eq!(m.start(0).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn caret_and_dollar() {
        let pattern = Pattern::builder().caret().literal("ab").dollar().end().build();

        let exact = encode("ab");
        assert!(pattern.matcher(&exact).matches().unwrap());

        // $ also holds just before a final line terminator or CR LF
        let newline = encode("ab\n");
        assert!(pattern.matcher(&newline).looking_at().unwrap());
        let crlf = encode("ab\r\n");
        assert!(pattern.matcher(&crlf).looking_at().unwrap());
        let sep = encode("ab\u{2028}");
        assert!(pattern.matcher(&sep).looking_at().unwrap());

        let trailing = encode("abx");
        assert!(!pattern.matcher(&trailing).looking_at().unwrap());
        let leading = encode("xab");
        assert!(!pattern.matcher(&leading).find().unwrap());
    }

    #[test]
    fn backslash_a_and_z_anchor_to_input_edges() {
        let pattern = Pattern::builder()
            .backslash_a()
            .literal("ab")
            .backslash_z()
            .end()
            .build();
        let exact = encode("ab");
        assert!(pattern.matcher(&exact).matches().unwrap());
        // unlike $, \z does not accept a trailing newline
        let newline = encode("ab\n");
        assert!(!pattern.matcher(&newline).looking_at().unwrap());
        let leading = encode("xab");
        assert!(!pattern.matcher(&leading).find().unwrap());
    }

    #[test]
    fn backslash_g_chains_matches() {
        // \Ga
        let pattern = Pattern::builder().backslash_g().one_char('a').end().build();
        assert_eq!(spans(&pattern, "aab"), vec![0..1, 1..2]);
        // without a previous match, \G only holds at the start
        let input = encode("ba");
        assert!(!pattern.matcher(&input).find().unwrap());
    }

    #[test]
    fn backslash_d_matches_unicode_digits() {
        let pattern = Pattern::builder().backslash_d(false).end().build();
        assert_eq!(spans(&pattern, "a4"), vec![1..2]);
        // ARABIC-INDIC DIGIT FOUR
        assert_eq!(spans(&pattern, "\u{0664}"), vec![0..1]);

        let negated = Pattern::builder().backslash_d(true).end().build();
        assert_eq!(spans(&negated, "4a"), vec![1..2]);
    }

    #[test]
    fn backslash_x_consumes_clusters() {
        let pattern = Pattern::builder().backslash_x().end().build();

        // base plus combining mark
        let accented = encode("e\u{0301}x");
        let mut m = pattern.matcher(&accented);
        assert!(m.looking_at().unwrap());
        assert_eq!(m.end(0).unwrap(), Some(2));

        // CR LF is one cluster
        let crlf = encode("\r\nx");
        let mut m = pattern.matcher(&crlf);
        assert!(m.looking_at().unwrap());
        assert_eq!(m.end(0).unwrap(), Some(2));

        // a control character takes no trailing marks
        let control = encode("\t\u{0301}");
        let mut m = pattern.matcher(&control);
        assert!(m.looking_at().unwrap());
        assert_eq!(m.end(0).unwrap(), Some(1));
    }

    #[test]
    fn static_set_word_characters() {
        let pattern = Pattern::builder()
            .static_set(StaticSet::Word, false)
            .end()
            .build();
        assert_eq!(spans(&pattern, "!a"), vec![1..2]);

        // negated form at end of input succeeds without consuming
        let trailing = Pattern::builder()
            .one_char('a')
            .static_set(StaticSet::Word, true)
            .end()
            .build();
        let input = encode("a");
        assert!(trailing.matcher(&input).matches().unwrap());
        let word_follows = encode("ab");
        assert!(!trailing.matcher(&word_follows).looking_at().unwrap());
    }

    #[test]
    fn user_set_membership() {
        let pattern = Pattern::builder()
            .add_set([u32::from('a')..=u32::from('z')])
            .set_ref(0)
            .end()
            .build();
        assert_eq!(spans(&pattern, "AbC"), vec![1..2]);
        assert_eq!(spans(&pattern, "ABC"), Vec::<Range<usize>>::new());
    }

    #[test]
    fn one_char_is_surrogate_aware() {
        let pattern = Pattern::builder().one_char('𝄞').end().build();
        // the match spans both halves of the pair
        assert_eq!(spans(&pattern, "a𝄞"), vec![1..3]);
    }

    #[test]
    fn nop_backtrack_and_fail() {
        // the first branch is cut off by an unconditional backtrack
        let pattern = Pattern::builder()
            .state_save(4) // 0
            .nop() // 1
            .one_char('a') // 2
            .backtrack() // 3
            .one_char('b') // 4
            .end() // 5
            .build();
        assert_eq!(spans(&pattern, "ab"), vec![1..2]);

        // FAIL ends the attempt outright
        let fail = Pattern::builder().one_char('a').fail().end().build();
        let input = encode("a");
        assert!(!fail.matcher(&input).find().unwrap());
    }

    #[test]
    fn string_respects_input_end() {
        let pattern = Pattern::builder().literal("abc").end().build();
        let input = encode("ab");
        assert!(!pattern.matcher(&input).find().unwrap());
    }

    #[test]
    fn empty_pattern_on_empty_input() {
        let pattern = Pattern::builder().end().build();
        let empty = encode("");
        let mut m = pattern.matcher(&empty);
        // matching is attempted only strictly inside the input, so find
        // has no candidate position here
        assert!(!m.find().unwrap());
        assert!(m.matches().unwrap());
        assert!(m.looking_at().unwrap());

        assert_eq!(spans(&pattern, "ab"), vec![0..0, 1..1]);
    }

    #[test]
    fn word_boundary_predicate_skips_marks() {
        let pattern = Pattern::builder().end().build();
        let input = encode("a\u{0301}!");
        let m = pattern.matcher(&input);
        assert!(m.is_word_boundary(0));
        // on the mark itself: never a boundary
        assert!(!m.is_word_boundary(1));
        // the mark is transparent scanning left: 'a' vs '!'
        assert!(m.is_word_boundary(2));
        // off the end
        assert!(!m.is_word_boundary(3));

        let inside = encode("ab");
        let m = pattern.matcher(&inside);
        assert!(!m.is_word_boundary(1));
    }
}
