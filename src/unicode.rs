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

//! Character classification backed by ICU4X property data.
//!
//! The matcher needs a handful of general-category predicates plus three
//! predefined sets (word, digit, space). The sets are built once, on first
//! use, from the compiled property data shipped with the `icu` crate.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use icu::collections::codepointinvlist::{CodePointInversionList, CodePointInversionListBuilder};
use icu::properties::props::{Alphabetic, GeneralCategory, WhiteSpace};
use icu::properties::{CodePointMapData, CodePointSetData};

use crate::program::STATIC_SET_COUNT;

/// An immutable set of code points with logarithmic membership tests.
#[derive(Clone)]
pub struct CodeSet(CodePointInversionList<'static>);

impl CodeSet {
    /// Builds a set from inclusive code-point ranges.
    #[must_use]
    pub fn from_ranges<I>(ranges: I) -> CodeSet
    where
        I: IntoIterator<Item = RangeInclusive<u32>>,
    {
        let mut builder = CodePointInversionListBuilder::new();
        for range in ranges {
            builder.add_range32(range);
        }
        CodeSet(builder.build())
    }

    /// Membership test for a code point.
    #[inline]
    #[must_use]
    pub fn contains(&self, c: u32) -> bool {
        self.0.contains32(c)
    }
}

impl std::fmt::Debug for CodeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CodeSet({} code points)", self.0.size())
    }
}

#[inline]
fn category(c: u32) -> GeneralCategory {
    CodePointMapData::<GeneralCategory>::new().get32(c)
}

/// Nonspacing or enclosing mark. These are transparent to word boundaries
/// and are consumed as grapheme trailers by `\X`.
#[inline]
pub(crate) fn is_mark(c: u32) -> bool {
    matches!(
        category(c),
        GeneralCategory::NonspacingMark | GeneralCategory::EnclosingMark
    )
}

#[inline]
pub(crate) fn is_control(c: u32) -> bool {
    category(c) == GeneralCategory::Control
}

#[inline]
pub(crate) fn is_decimal_digit(c: u32) -> bool {
    category(c) == GeneralCategory::DecimalNumber
}

/// The line terminators recognized by `$`, `.` and `DOTANY`:
/// LF, FF, CR, NEL, LINE SEPARATOR, PARAGRAPH SEPARATOR.
#[inline]
pub(crate) fn is_line_terminator(c: u32) -> bool {
    matches!(c, 0x0A | 0x0C | 0x0D | 0x85 | 0x2028 | 0x2029)
}

static STATIC_SETS: LazyLock<[CodeSet; STATIC_SET_COUNT]> = LazyLock::new(|| {
    [
        // slot 0 is reserved; set ids are 1-based
        CodeSet::from_ranges([]),
        word_set(),
        digit_set(),
        space_set(),
    ]
});

/// Looks up a predefined set by its 1-based id. The operand must already be
/// stripped of the negation flag.
#[inline]
pub(crate) fn static_set(id: u32) -> &'static CodeSet {
    let id = id as usize;
    debug_assert!(id >= 1 && id < STATIC_SET_COUNT, "bad static set id {id}");
    &STATIC_SETS[id]
}

fn add_category(builder: &mut CodePointInversionListBuilder, category: GeneralCategory) {
    let set = CodePointMapData::<GeneralCategory>::new().get_set_for_value(category);
    for range in set.as_borrowed().iter_ranges() {
        builder.add_range32(range);
    }
}

/// Word characters: alphabetic, marks, decimal digits, connector
/// punctuation, and the zero-width (non-)joiners.
fn word_set() -> CodeSet {
    let mut builder = CodePointInversionListBuilder::new();
    for range in CodePointSetData::new::<Alphabetic>().iter_ranges() {
        builder.add_range32(range);
    }
    add_category(&mut builder, GeneralCategory::NonspacingMark);
    add_category(&mut builder, GeneralCategory::SpacingMark);
    add_category(&mut builder, GeneralCategory::EnclosingMark);
    add_category(&mut builder, GeneralCategory::DecimalNumber);
    add_category(&mut builder, GeneralCategory::ConnectorPunctuation);
    builder.add_char('\u{200C}');
    builder.add_char('\u{200D}');
    CodeSet(builder.build())
}

fn digit_set() -> CodeSet {
    let mut builder = CodePointInversionListBuilder::new();
    add_category(&mut builder, GeneralCategory::DecimalNumber);
    CodeSet(builder.build())
}

fn space_set() -> CodeSet {
    let mut builder = CodePointInversionListBuilder::new();
    for range in CodePointSetData::new::<WhiteSpace>().iter_ranges() {
        builder.add_range32(range);
    }
    CodeSet(builder.build())
}
