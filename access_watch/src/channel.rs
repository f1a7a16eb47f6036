// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The kernel facility that reports page faults on registered ranges and fills the faulted pages.

use base::AsRawDescriptor;
use remain::sorted;
use thiserror::Error as ThisError;

use crate::pagesize::is_page_aligned;
use crate::WatchConfig;
use crate::WatchedRange;

/// Result for fault channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors for fault channel operations.
#[sorted]
#[derive(ThisError, Debug)]
pub enum Error {
    /// Ranges can only be registered before the worker starts.
    #[error("the watch worker is already running")]
    AlreadyStarted,
    /// The range is empty, overflows or is not page aligned.
    #[error("invalid range: start {0:#x}, length {1:#x}")]
    InvalidRange(usize, usize),
    /// The page was already filled.
    #[error("the page is already filled")]
    PageExist,
    /// The copy stopped part way.
    #[error("copy partially succeeded: {0} bytes copied")]
    PartiallyCopied(usize),
    /// The source buffer is smaller than the requested fill length.
    #[error("source holds {0} bytes but {1} bytes were requested")]
    ShortData(usize, usize),
    /// The host has no usable page fault interception.
    #[error("page fault interception is not supported on this host")]
    Unsupported,
    /// An unrecoverable userfaultfd error.
    #[cfg(feature = "uffd")]
    #[error("userfaultfd error: {0}")]
    Userfaultfd(userfaultfd::Error),
    /// Waiting on the exit signal and the channel failed.
    #[error("failed to wait for events: {0}")]
    Wait(base::Error),
}

impl WatchedRange {
    /// Checks the range is non-empty, does not wrap and is page aligned at both ends.
    pub fn validate(&self) -> Result<()> {
        if self.length == 0
            || self.start.checked_add(self.length).is_none()
            || !is_page_aligned(self.start)
            || !is_page_aligned(self.length)
        {
            return Err(Error::InvalidRange(self.start, self.length));
        }
        Ok(())
    }
}

/// A fault reported on a registered range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultEvent {
    /// The faulting address.
    pub address: usize,
}

/// A descriptor based page fault interception facility.
///
/// The descriptor returned by [`AsRawDescriptor`] must become readable whenever at least one fault
/// is pending and stay readable until [`read_fault`](Self::read_fault) drained it.
///
/// Every operation is a single kernel call, so one channel is shared between the worker thread
/// (reading faults, unregistering) and any thread filling pages without extra locking.
pub trait FaultChannel: AsRawDescriptor + Send + Sync + 'static {
    /// Opens a new non-blocking channel.
    fn open(config: &WatchConfig) -> Result<Self>
    where
        Self: Sized;

    /// Returns whether a channel supporting range registration and unregistration can be opened.
    ///
    /// Must not leave anything behind: any handle opened for the query is closed before returning.
    fn probe(config: &WatchConfig) -> bool
    where
        Self: Sized;

    /// Registers `range` in missing-page mode.
    ///
    /// # Safety
    ///
    /// `range` must lie within a mapping owned by the caller that outlives the registration. Pages
    /// of the range may be discarded, so their current contents must not be relied upon.
    unsafe fn register(&self, range: &WatchedRange) -> Result<()>;

    /// Unregisters `range`. Threads blocked on a fault inside it are woken up.
    fn unregister(&self, range: &WatchedRange) -> Result<()>;

    /// Reads the next pending fault, or `None` when no fault is pending.
    fn read_fault(&self) -> Result<Option<FaultEvent>>;

    /// Copies `data` into the missing page(s) at `addr` and wakes the faulting threads.
    fn copy(&self, addr: usize, data: &[u8]) -> Result<usize>;

    /// Fills the missing page(s) at `addr` with zeroes and wakes the faulting threads.
    fn zero(&self, addr: usize, len: usize) -> Result<usize>;

    /// Prepares `range` for idle-time bulk filling.
    fn prepare_bulk_fill(&self, _range: &WatchedRange) -> Result<()> {
        Ok(())
    }
}
