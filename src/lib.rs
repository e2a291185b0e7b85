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

/*!
A backtracking regular-expression engine for UTF-16 text.

The crate executes *compiled* regex programs: sequences of packed 32-bit
instruction words interpreted by a virtual machine with an explicit
backtracking stack. Producing such programs from a regex source string is the
job of a separate compiler; here, programs are built instruction by
instruction with [`PatternBuilder`], which makes the crate equally usable as
the execution tier under a compiler and as a standalone matching engine for
generated patterns.

Matching is Unicode-aware throughout: input is addressed in UTF-16 code
units, stepping is surrogate-pair aware, word boundaries treat combining
marks as transparent, and the character classes are backed by ICU4X property
data.

# Example: finding matches

```rust
use uregex::{utf16, Pattern};

// the program for `ab`
let pattern = Pattern::builder().literal("ab").end().build();

let haystack = utf16::encode("drab abbey");
let mut matcher = pattern.matcher(&haystack);

assert!(matcher.find().unwrap());
assert_eq!(matcher.start(0).unwrap(), Some(2));
assert_eq!(matcher.end(0).unwrap(), Some(4));

assert!(matcher.find().unwrap());
assert_eq!(matcher.start(0).unwrap(), Some(5));

assert!(!matcher.find().unwrap());
```

# Example: capture groups and replacement

```rust
use uregex::{utf16, Pattern};

// the program for `(\d)%`
let pattern = Pattern::builder()
    .groups(1)
    .start_capture(1)
    .backslash_d(false)
    .end_capture(1)
    .one_char('%')
    .end()
    .build();

let haystack = utf16::encode("load 7%");
let mut matcher = pattern.matcher(&haystack);

let replaced = matcher.replace_first(&utf16::encode("$1 percent")).unwrap();
assert_eq!(utf16::decode_lossy(&replaced), "load 7 percent");
```

A [`Pattern`] is immutable and can be shared across threads; each [`Matcher`]
owns its mutable search state and is strictly single-threaded. Pathological
programs can backtrack heavily; [`Matcher::max_stack`] bounds the memory the
engine will spend before giving up with [`Error::StackOverflow`].
*/

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::redundant_else)]

mod error;
mod matcher;
mod program;
mod stack;
mod unicode;
pub mod utf16;

pub use crate::error::{Error, Result};
pub use crate::matcher::{Matcher, Matches};
pub use crate::program::{
    op_type, op_value, Op, Pattern, PatternBuilder, StaticSet, NEG_SET, OPERAND_MASK,
};
pub use crate::unicode::CodeSet;
