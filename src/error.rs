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

//! Error types.

use std::fmt;

/// Result type for this crate with specific error enum.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while driving a [`Matcher`](crate::Matcher).
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An operation that requires a successful match was called while the
    /// matcher holds none. Recoverable: perform a new `find` and retry.
    InvalidState,
    /// A capture-group index or a search start position was outside the
    /// valid range. Carries the offending value.
    IndexOutOfBounds(usize),
    /// The backtrack stack could not grow within its configured limit. The
    /// match attempt was abandoned and the matcher reports no match.
    StackOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidState => write!(f, "no current match; call find() first"),
            Error::IndexOutOfBounds(index) => write!(f, "index {index} is out of bounds"),
            Error::StackOverflow => write!(f, "backtrack stack exceeded its limit"),
        }
    }
}

impl std::error::Error for Error {}
