// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Memory access watch for hosts without page fault interception. Every operation is a no-op.

use std::marker::PhantomData;

use crate::IdleCallbackResult;
use crate::WatchConfig;
use crate::WatchedRange;

/// Always false on this host.
pub fn is_supported() -> bool {
    false
}

/// Always false on this host.
pub fn is_supported_with(_config: &WatchConfig) -> bool {
    false
}

/// Page filler that never fills anything.
#[derive(Clone, Debug, Default)]
pub struct PageFiller {
    _private: PhantomData<()>,
}

impl PageFiller {
    /// Always fails.
    pub fn fill_page(&self, _: usize, _: usize, _: Option<&[u8]>, _: bool) -> bool {
        false
    }

    /// Always fails.
    pub fn fill_page_bulk(&self, _: usize, _: usize, _: Option<&[u8]>, _: bool) -> bool {
        false
    }

    /// Always fails.
    pub fn init_bulk_fill(&self, _: usize, _: usize) -> bool {
        false
    }
}

/// A memory access watch that is never valid.
#[derive(Debug, Default)]
pub struct MemoryAccessWatch {
    _private: PhantomData<()>,
}

impl MemoryAccessWatch {
    /// Creates an invalid watch. The callbacks are dropped without being called.
    pub fn new<A, I>(on_access: A, on_idle: I) -> Self
    where
        A: FnMut(&PageFiller, usize) + Send + 'static,
        I: FnMut(&PageFiller) -> IdleCallbackResult + Send + 'static,
    {
        Self::with_config(WatchConfig::default(), on_access, on_idle)
    }

    /// Creates an invalid watch. The callbacks are dropped without being called.
    pub fn with_config<A, I>(_config: WatchConfig, _on_access: A, _on_idle: I) -> Self
    where
        A: FnMut(&PageFiller, usize) + Send + 'static,
        I: FnMut(&PageFiller) -> IdleCallbackResult + Send + 'static,
    {
        Self::default()
    }

    /// Always false.
    pub fn is_supported(_config: &WatchConfig) -> bool {
        false
    }

    /// Always false.
    pub fn valid(&self) -> bool {
        false
    }

    /// Always fails.
    ///
    /// # Safety
    ///
    /// Nothing is registered, kept `unsafe` to match the supported hosts.
    pub unsafe fn register_memory_range(&mut self, _start: usize, _length: usize) -> bool {
        false
    }

    /// Always fails.
    ///
    /// # Safety
    ///
    /// Nothing is registered, kept `unsafe` to match the supported hosts.
    pub unsafe fn register_memory_ranges<R>(&mut self, _ranges: R) -> bool
    where
        R: IntoIterator<Item = WatchedRange>,
    {
        false
    }

    /// Does nothing.
    pub fn done_registering(&mut self) {}

    /// Always fails.
    pub fn fill_page(&self, _: usize, _: usize, _: Option<&[u8]>, _: bool) -> bool {
        false
    }

    /// Always fails.
    pub fn fill_page_bulk(&self, _: usize, _: usize, _: Option<&[u8]>, _: bool) -> bool {
        false
    }

    /// Always fails.
    pub fn init_bulk_fill(&self, _: usize, _: usize) -> bool {
        false
    }

    /// Always `None`.
    pub fn filler(&self) -> Option<PageFiller> {
        None
    }

    /// Returns immediately.
    pub fn join(&mut self) {}

    /// Returns immediately.
    pub fn stop(&mut self) {}
}
