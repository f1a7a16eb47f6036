// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::Arc;

use base::debug;
use base::error;
use base::trace;

use crate::channel::Error;
use crate::channel::FaultChannel;
use crate::channel::Result;
use crate::WatchedRange;

/// Handle filling pages of registered ranges.
///
/// Cloning is cheap and every clone shares the channel, so the VMM may fill pages from the
/// watch callbacks or from any of its own threads.
pub struct PageFiller<C: FaultChannel> {
    channel: Arc<C>,
}

impl<C: FaultChannel> Clone for PageFiller<C> {
    fn clone(&self) -> Self {
        PageFiller {
            channel: self.channel.clone(),
        }
    }
}

impl<C: FaultChannel> PageFiller<C> {
    pub(crate) fn new(channel: Arc<C>) -> Self {
        PageFiller { channel }
    }

    pub(crate) fn channel(&self) -> &C {
        &self.channel
    }

    /// Populates the missing page(s) `[addr, addr + len)` and wakes threads faulting on them.
    ///
    /// Copies the first `len` bytes of `data`, or zero fills when `data` is `None`. A page that is
    /// already present counts as filled. `is_quickboot` is passed through for the caller's
    /// bookkeeping and does not change how the page is filled.
    ///
    /// Returns false when the kernel refused the fill. The page then stays missing.
    pub fn fill_page(
        &self,
        addr: usize,
        len: usize,
        data: Option<&[u8]>,
        is_quickboot: bool,
    ) -> bool {
        trace!(
            "fill {:#x} bytes at {:#x} (quickboot: {})",
            len,
            addr,
            is_quickboot
        );
        self.fill(addr, len, data).is_ok()
    }

    /// Same as [`fill_page`](Self::fill_page), used by idle-time bulk population.
    pub fn fill_page_bulk(
        &self,
        addr: usize,
        len: usize,
        data: Option<&[u8]>,
        is_quickboot: bool,
    ) -> bool {
        self.fill_page(addr, len, data, is_quickboot)
    }

    /// Prepares `[start, start + length)` for bulk filling while the guest is stopped.
    pub fn init_bulk_fill(&self, start: usize, length: usize) -> bool {
        let range = WatchedRange::new(start, length);
        match self.channel.prepare_bulk_fill(&range) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "failed to prepare {:#x}..{:#x} for bulk fill: {}",
                    range.start,
                    range.end(),
                    e
                );
                false
            }
        }
    }

    fn fill(&self, addr: usize, len: usize, data: Option<&[u8]>) -> Result<()> {
        let res = match data {
            Some(data) => match data.get(..len) {
                Some(src) => self.channel.copy(addr, src),
                None => Err(Error::ShortData(data.len(), len)),
            },
            None => self.channel.zero(addr, len),
        };
        match res {
            Ok(_) => Ok(()),
            Err(Error::PageExist) => {
                debug!("page {:#x} is already filled", addr);
                Ok(())
            }
            Err(e) => {
                match data {
                    Some(data) => error!(
                        "failed to copy {:#x} bytes from {:p} to {:#x}: {}",
                        len,
                        data.as_ptr(),
                        addr,
                        e
                    ),
                    None => error!("failed to zero {:#x} bytes at {:#x}: {}", len, addr, e),
                }
                Err(e)
            }
        }
    }
}
