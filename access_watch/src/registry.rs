// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bookkeeping of the ranges registered to a fault channel.

use base::debug;
use base::warn;

use crate::channel::FaultChannel;
use crate::channel::Result;
use crate::pagesize::bytes_to_pages;
use crate::WatchedRange;

/// The ranges currently registered to a channel, in registration order.
///
/// Overlapping or duplicated ranges are not detected; the caller registers disjoint ranges.
#[derive(Debug, Default)]
pub(crate) struct RangeRegistry {
    ranges: Vec<WatchedRange>,
}

impl RangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `range` to `channel` and records it.
    ///
    /// # Safety
    ///
    /// Same contract as [`FaultChannel::register`].
    pub unsafe fn register<C: FaultChannel>(
        &mut self,
        channel: &C,
        range: WatchedRange,
    ) -> Result<()> {
        range.validate()?;
        // SAFETY:
        // The caller upholds the channel's registration contract.
        unsafe { channel.register(&range) }?;
        debug!(
            "registered {:#x}..{:#x} ({} pages)",
            range.start,
            range.end(),
            bytes_to_pages(range.length)
        );
        self.ranges.push(range);
        Ok(())
    }

    /// Unregisters every recorded range and forgets them.
    ///
    /// Failures are logged and do not stop the remaining ranges from being unregistered.
    pub fn unregister_all<C: FaultChannel>(&mut self, channel: &C) {
        for range in self.ranges.drain(..) {
            if let Err(e) = channel.unregister(&range) {
                warn!(
                    "failed to unregister {:#x}..{:#x}: {}",
                    range.start,
                    range.end(),
                    e
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
