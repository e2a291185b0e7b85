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

//! Code-point stepping over UTF-16 code-unit slices.
//!
//! All input stepping in the matcher goes through these helpers, which treat
//! a surrogate pair as a single code point. An unpaired surrogate half
//! decodes as its own code-unit value and occupies one position, so arbitrary
//! (even ill-formed) UTF-16 can be searched without panicking.

/// Whether `unit` is a lead (high) surrogate.
#[inline]
#[must_use]
pub fn is_lead_surrogate(unit: u16) -> bool {
    unit & 0xFC00 == 0xD800
}

/// Whether `unit` is a trail (low) surrogate.
#[inline]
#[must_use]
pub fn is_trail_surrogate(unit: u16) -> bool {
    unit & 0xFC00 == 0xDC00
}

#[inline]
fn decode_pair(lead: u16, trail: u16) -> u32 {
    0x10000 + ((u32::from(lead) - 0xD800) << 10) + (u32::from(trail) - 0xDC00)
}

/// Returns the code point starting at `ix`, combining a lead surrogate with
/// a following trail surrogate.
///
/// # Panics
///
/// Panics if `ix` is out of bounds.
#[inline]
#[must_use]
pub fn char32_at(s: &[u16], ix: usize) -> u32 {
    let unit = s[ix];
    if is_lead_surrogate(unit) {
        if let Some(&trail) = s.get(ix + 1) {
            if is_trail_surrogate(trail) {
                return decode_pair(unit, trail);
            }
        }
    }
    u32::from(unit)
}

/// Reads the code point at `*ix` and advances `*ix` past it.
///
/// # Panics
///
/// Panics if `*ix` is out of bounds.
#[inline]
pub fn next_char32(s: &[u16], ix: &mut usize) -> u32 {
    let unit = s[*ix];
    *ix += 1;
    if is_lead_surrogate(unit) {
        if let Some(&trail) = s.get(*ix) {
            if is_trail_surrogate(trail) {
                *ix += 1;
                return decode_pair(unit, trail);
            }
        }
    }
    u32::from(unit)
}

/// Index of the code point following the one starting at `ix`.
///
/// # Panics
///
/// Panics if `ix` is out of bounds.
#[inline]
#[must_use]
pub fn next_codepoint_ix(s: &[u16], ix: usize) -> usize {
    if is_lead_surrogate(s[ix]) && s.get(ix + 1).is_some_and(|&t| is_trail_surrogate(t)) {
        ix + 2
    } else {
        ix + 1
    }
}

/// Index of the code point preceding the one starting at `ix`.
///
/// # Panics
///
/// Panics if `ix` is zero or out of bounds.
#[inline]
#[must_use]
pub fn prev_codepoint_ix(s: &[u16], ix: usize) -> usize {
    let ix = ix - 1;
    if ix > 0 && is_trail_surrogate(s[ix]) && is_lead_surrogate(s[ix - 1]) {
        ix - 1
    } else {
        ix
    }
}

/// Moves `ix` by `delta` code points, clamping at both ends of the slice.
#[must_use]
pub fn move_index(s: &[u16], ix: usize, delta: isize) -> usize {
    let mut ix = ix.min(s.len());
    if delta >= 0 {
        for _ in 0..delta {
            if ix >= s.len() {
                break;
            }
            ix = next_codepoint_ix(s, ix);
        }
    } else {
        for _ in 0..delta.unsigned_abs() {
            if ix == 0 {
                break;
            }
            ix = prev_codepoint_ix(s, ix);
        }
    }
    ix
}

/// Appends one code point to a UTF-16 destination buffer. Values in the
/// surrogate range are written as a single raw unit.
#[inline]
pub fn append_char32(dest: &mut Vec<u16>, c: u32) {
    if c <= 0xFFFF {
        dest.push(c as u16);
    } else {
        let c = c - 0x10000;
        dest.push(0xD800 + (c >> 10) as u16);
        dest.push(0xDC00 + (c & 0x3FF) as u16);
    }
}

/// Encodes a string as UTF-16 code units.
#[must_use]
pub fn encode(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Decodes UTF-16 code units to a `String`, replacing unpaired surrogates.
#[must_use]
pub fn decode_lossy(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}
