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

//! The backtrack stack: a flat stack of 32-bit slots pushed and popped in
//! fixed-size blocks.
//!
//! Saved interpreter states are written as contiguous integer runs, so a
//! frame costs no allocation of its own. The backing storage is retained when
//! the stack is logically cleared, letting repeated match attempts reuse it.

use crate::error::{Error, Result};

/// Default cap on the stack, in 32-bit slots.
pub(crate) const DEFAULT_MAX_STACK: usize = 1_000_000;

#[derive(Debug)]
pub(crate) struct BacktrackStack {
    buf: Vec<i32>,
    len: usize,
    max_slots: usize,
    high_water: usize,
}

impl BacktrackStack {
    pub fn new(max_slots: usize) -> BacktrackStack {
        BacktrackStack {
            buf: Vec::new(),
            len: 0,
            max_slots,
            high_water: 0,
        }
    }

    pub fn set_limit(&mut self, max_slots: usize) {
        self.max_slots = max_slots;
    }

    /// Logically empties the stack and resets the high-water mark. The
    /// backing storage is kept for reuse.
    pub fn clear(&mut self) {
        self.len = 0;
        self.high_water = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[cfg(test)]
    pub fn slots_in_use(&self) -> usize {
        self.len
    }

    /// Largest number of slots in use since the last `clear`.
    #[cfg(test)]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Extends the stack by `n` slots and returns the new block for the
    /// caller to fill in order.
    pub fn reserve_block(&mut self, n: usize) -> Result<&mut [i32]> {
        let start = self.len;
        let end = start + n;
        if end > self.max_slots {
            return Err(Error::StackOverflow);
        }
        if self.buf.len() < end {
            self.buf.resize(end, 0);
        }
        self.len = end;
        self.high_water = self.high_water.max(end);
        Ok(&mut self.buf[start..end])
    }

    /// Returns the top `n` slots and logically removes them. The returned
    /// block stays valid until the next push.
    pub fn pop_block(&mut self, n: usize) -> &[i32] {
        debug_assert!(n <= self.len, "popping more slots than are on the stack");
        self.len -= n;
        &self.buf[self.len..self.len + n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{quickcheck, Arbitrary, Gen};

    fn push(stack: &mut BacktrackStack, values: &[i32]) {
        let block = stack.reserve_block(values.len()).unwrap();
        block.copy_from_slice(values);
    }

    #[test]
    fn blocks_pop_in_reverse_order() {
        let mut stack = BacktrackStack::new(DEFAULT_MAX_STACK);
        push(&mut stack, &[1, 2, 3]);
        push(&mut stack, &[4, 5]);
        assert_eq!(stack.pop_block(2), &[4, 5]);
        assert_eq!(stack.pop_block(3), &[1, 2, 3]);
        assert!(stack.is_empty());
    }

    #[test]
    fn storage_is_reused_after_clear() {
        let mut stack = BacktrackStack::new(DEFAULT_MAX_STACK);
        push(&mut stack, &[7; 16]);
        assert_eq!(stack.high_water(), 16);
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.high_water(), 0);
        push(&mut stack, &[8; 4]);
        assert_eq!(stack.pop_block(4), &[8; 4]);
    }

    #[test]
    fn limit_is_enforced() {
        let mut stack = BacktrackStack::new(8);
        push(&mut stack, &[0; 8]);
        assert_eq!(stack.reserve_block(1).unwrap_err(), Error::StackOverflow);
        // the failed reservation must not have grown the stack
        assert_eq!(stack.slots_in_use(), 8);
        assert_eq!(stack.pop_block(8).len(), 8);
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Push(Vec<i32>),
        Pop,
    }

    impl Arbitrary for Operation {
        fn arbitrary(g: &mut Gen) -> Self {
            if bool::arbitrary(g) {
                let n = *g.choose(&[1usize, 2, 4, 6]).unwrap();
                Operation::Push((0..n).map(|_| i32::arbitrary(g)).collect())
            } else {
                Operation::Pop
            }
        }
    }

    fn check_against_model(operations: Vec<Operation>) -> bool {
        let mut stack = BacktrackStack::new(DEFAULT_MAX_STACK);
        let mut model: Vec<Vec<i32>> = Vec::new();

        for operation in operations {
            match operation {
                Operation::Push(values) => {
                    push(&mut stack, &values);
                    model.push(values);
                }
                Operation::Pop => {
                    // ignore pops on an empty stack, as the generator does
                    // not balance them
                    if let Some(expected) = model.pop() {
                        if stack.pop_block(expected.len()) != expected.as_slice() {
                            return false;
                        }
                    }
                }
            }
        }
        stack.slots_in_use() == model.iter().map(Vec::len).sum::<usize>()
    }

    quickcheck! {
        fn blocks_mirror_a_vec_of_vecs(operations: Vec<Operation>) -> bool {
            check_against_model(operations)
        }
    }
}
