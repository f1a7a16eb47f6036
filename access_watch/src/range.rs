// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Address ranges handed to the watch.

use std::iter::Peekable;
use std::ops::Range;

/// A page aligned `[start, start + length)` range of host virtual memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchedRange {
    /// First byte of the range.
    pub start: usize,
    /// Length in bytes.
    pub length: usize,
}

impl WatchedRange {
    /// Creates a range. It is validated when registered.
    pub fn new(start: usize, length: usize) -> Self {
        WatchedRange { start, length }
    }

    /// One past the last byte of the range.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    /// The range as a [`Range`] of addresses.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Iterator merging runs of adjacent ranges into single ranges.
///
/// Snapshot indexes list guest RAM page by page; registering maximal contiguous runs keeps the
/// number of registrations proportional to the number of RAM blocks instead of pages.
pub struct RangeCoalescer<I: Iterator<Item = WatchedRange>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = WatchedRange>> Iterator for RangeCoalescer<I> {
    type Item = WatchedRange;

    fn next(&mut self) -> Option<WatchedRange> {
        let mut current = self.inner.next()?;
        while let Some(next) = self.inner.next_if(|next| next.start == current.end()) {
            current.length += next.length;
        }
        Some(current)
    }
}

/// Merges adjacent ranges of `ranges`, keeping their order.
pub fn coalesce_ranges<I>(ranges: I) -> RangeCoalescer<I::IntoIter>
where
    I: IntoIterator<Item = WatchedRange>,
{
    RangeCoalescer {
        inner: ranges.into_iter().peekable(),
    }
}
