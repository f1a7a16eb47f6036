// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The [`MemoryAccessWatch`] façade used by the VMM.

use std::mem;
use std::panic;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use anyhow::Context;
use base::error;
use base::info;
use base::Event;

use crate::channel::Error;
use crate::channel::FaultChannel;
use crate::coalesce_ranges;
use crate::filler::PageFiller;
use crate::registry::RangeRegistry;
use crate::sys::PlatformChannel;
use crate::worker::Worker;
use crate::IdleCallbackResult;
use crate::WatchConfig;
use crate::WatchedRange;

/// Called on the worker thread with the page address of every fault.
///
/// The VMM is expected to fill that page, usually right away through the given [`PageFiller`].
pub type AccessCallback<C> = Box<dyn FnMut(&PageFiller<C>, usize) + Send>;

/// Called on the worker thread whenever no fault is pending.
pub type IdleCallback<C> = Box<dyn FnMut(&PageFiller<C>) -> IdleCallbackResult + Send>;

/// Returns whether this host can serve guest memory on demand with the default configuration.
///
/// Cheap and free of side effects; callable before any watch exists.
pub fn is_supported() -> bool {
    is_supported_with(&WatchConfig::default())
}

/// Returns whether this host can serve guest memory on demand with `config`.
pub fn is_supported_with(config: &WatchConfig) -> bool {
    PlatformChannel::probe(config)
}

/// Lazily populates registered guest memory ranges on access.
///
/// Usage:
///
/// 1. construct it with the access and idle callbacks and check [`valid`](Self::valid),
/// 2. register every range with [`register_memory_range`](Self::register_memory_range),
/// 3. call [`done_registering`](Self::done_registering) to start the worker thread,
/// 4. fill pages from the callbacks or any thread,
/// 5. drop it (or [`stop`](Self::stop) it) to shut the worker down.
///
/// An invalid watch turns every operation into a no-op that reports failure.
pub struct MemoryAccessWatch<C: FaultChannel = PlatformChannel> {
    config: WatchConfig,
    filler: Option<PageFiller<C>>,
    exit_event: Option<Event>,
    registry: RangeRegistry,
    // Taken by the worker; `None` once it started.
    callbacks: Option<(AccessCallback<C>, IdleCallback<C>)>,
    worker: Option<JoinHandle<()>>,
}

impl MemoryAccessWatch<PlatformChannel> {
    /// Opens the platform fault channel with the default configuration.
    pub fn new<A, I>(on_access: A, on_idle: I) -> Self
    where
        A: FnMut(&PageFiller<PlatformChannel>, usize) + Send + 'static,
        I: FnMut(&PageFiller<PlatformChannel>) -> IdleCallbackResult + Send + 'static,
    {
        Self::with_config(WatchConfig::default(), on_access, on_idle)
    }
}

impl<C: FaultChannel> MemoryAccessWatch<C> {
    /// Opens a `C` channel configured by `config`.
    ///
    /// When the channel cannot be opened the watch is invalid.
    pub fn with_config<A, I>(config: WatchConfig, on_access: A, on_idle: I) -> Self
    where
        A: FnMut(&PageFiller<C>, usize) + Send + 'static,
        I: FnMut(&PageFiller<C>) -> IdleCallbackResult + Send + 'static,
    {
        let channel = match C::open(&config) {
            Ok(channel) => Some(Arc::new(channel)),
            Err(e) => {
                info!("memory access watch is unavailable: {}", e);
                None
            }
        };
        Self::build(config, channel, Box::new(on_access), Box::new(on_idle))
    }

    /// Builds a watch over an already opened channel.
    pub fn from_channel<A, I>(
        channel: Arc<C>,
        config: WatchConfig,
        on_access: A,
        on_idle: I,
    ) -> Self
    where
        A: FnMut(&PageFiller<C>, usize) + Send + 'static,
        I: FnMut(&PageFiller<C>) -> IdleCallbackResult + Send + 'static,
    {
        Self::build(config, Some(channel), Box::new(on_access), Box::new(on_idle))
    }

    fn build(
        config: WatchConfig,
        channel: Option<Arc<C>>,
        on_access: AccessCallback<C>,
        on_idle: IdleCallback<C>,
    ) -> Self {
        let exit_event = match channel {
            Some(_) => match Event::new() {
                Ok(event) => Some(event),
                Err(e) => {
                    error!("failed to create memory access watch exit event: {}", e);
                    None
                }
            },
            None => None,
        };
        let filler = match exit_event {
            Some(_) => channel.map(PageFiller::new),
            None => None,
        };
        MemoryAccessWatch {
            config,
            filler,
            exit_event,
            registry: RangeRegistry::new(),
            callbacks: Some((on_access, on_idle)),
            worker: None,
        }
    }

    /// Returns whether a `C` channel supporting the watch can be opened with `config`.
    pub fn is_supported(config: &WatchConfig) -> bool {
        C::probe(config)
    }

    /// Returns whether the fault channel is open and usable.
    pub fn valid(&self) -> bool {
        self.filler.is_some()
    }

    /// Registers `[start, start + length)` for fault interception.
    ///
    /// Both ends must be page aligned. Any failure is fatal for the whole session: the watch
    /// unregisters what it had and becomes invalid. Registering once the worker started fails.
    ///
    /// # Safety
    ///
    /// The range must lie within a mapping owned by the caller that outlives this watch, and its
    /// current contents are discarded.
    pub unsafe fn register_memory_range(&mut self, start: usize, length: usize) -> bool {
        let filler = match &self.filler {
            Some(filler) => filler,
            None => return false,
        };
        if self.callbacks.is_none() {
            error!(
                "failed to register memory range {:#x}..{:#x}: {}",
                start,
                start.saturating_add(length),
                Error::AlreadyStarted
            );
            return false;
        }

        let range = WatchedRange::new(start, length);
        // SAFETY:
        // The caller upholds the registration contract.
        match unsafe { self.registry.register(filler.channel(), range) } {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "failed to register memory range {:#x}..{:#x}: {}",
                    range.start,
                    range.end(),
                    e
                );
                self.invalidate();
                false
            }
        }
    }

    /// Registers `ranges`, merging adjacent ones first. Stops at the first failure.
    ///
    /// # Safety
    ///
    /// Same contract as [`register_memory_range`](Self::register_memory_range) for every range.
    pub unsafe fn register_memory_ranges<R>(&mut self, ranges: R) -> bool
    where
        R: IntoIterator<Item = WatchedRange>,
    {
        for range in coalesce_ranges(ranges) {
            // SAFETY:
            // The caller upholds the registration contract for every range.
            if !unsafe { self.register_memory_range(range.start, range.length) } {
                return false;
            }
        }
        true
    }

    /// Starts the worker thread. Does nothing on an invalid watch or once the worker started.
    pub fn done_registering(&mut self) {
        if !self.valid() {
            return;
        }
        let (on_access, on_idle) = match self.callbacks.take() {
            Some(callbacks) => callbacks,
            None => return,
        };
        if let Err(e) = self.spawn_worker(on_access, on_idle) {
            error!("failed to start memory access watch: {:#}", e);
            self.invalidate();
        }
    }

    fn spawn_worker(
        &mut self,
        on_access: AccessCallback<C>,
        on_idle: IdleCallback<C>,
    ) -> anyhow::Result<()> {
        let (filler, exit_event) = match (&self.filler, &self.exit_event) {
            (Some(filler), Some(exit_event)) => (filler.clone(), exit_event),
            _ => anyhow::bail!("the watch is invalid"),
        };
        let worker = Worker {
            filler,
            exit_event: exit_event.try_clone().context("clone exit event")?,
            registry: mem::take(&mut self.registry),
            on_access,
            on_idle,
            idle_backoff: self.config.idle_backoff(),
        };
        let handle = thread::Builder::new()
            .name("memory access watch".into())
            .spawn(move || worker.run())
            .context("spawn worker thread")?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Populates the missing page(s) at `addr`. See [`PageFiller::fill_page`].
    pub fn fill_page(
        &self,
        addr: usize,
        len: usize,
        data: Option<&[u8]>,
        is_quickboot: bool,
    ) -> bool {
        match &self.filler {
            Some(filler) => filler.fill_page(addr, len, data, is_quickboot),
            None => false,
        }
    }

    /// Populates the missing page(s) at `addr` during bulk loading. See
    /// [`PageFiller::fill_page_bulk`].
    pub fn fill_page_bulk(
        &self,
        addr: usize,
        len: usize,
        data: Option<&[u8]>,
        is_quickboot: bool,
    ) -> bool {
        match &self.filler {
            Some(filler) => filler.fill_page_bulk(addr, len, data, is_quickboot),
            None => false,
        }
    }

    /// Prepares `[start, start + length)` for bulk filling. See [`PageFiller::init_bulk_fill`].
    pub fn init_bulk_fill(&self, start: usize, length: usize) -> bool {
        match &self.filler {
            Some(filler) => filler.init_bulk_fill(start, length),
            None => false,
        }
    }

    /// Returns a handle to fill pages from other threads, if the watch is valid.
    pub fn filler(&self) -> Option<PageFiller<C>> {
        self.filler.clone()
    }

    /// Blocks until the worker thread exited on its own, i.e. the idle callback reported
    /// [`IdleCallbackResult::AllDone`]. Returns immediately if no worker is running.
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.join() {
                panic::resume_unwind(e);
            }
        }
    }

    /// Asks the worker to exit after one last pass over pending faults and waits for it.
    pub fn stop(&mut self) {
        if self.worker.is_some() {
            if let Some(exit_event) = &self.exit_event {
                // Without the signal the worker only exits through `AllDone`.
                if let Err(e) = exit_event.signal() {
                    error!("failed to signal memory access watch exit: {}", e);
                }
            }
        }
        self.join();
    }

    fn invalidate(&mut self) {
        if let Some(filler) = self.filler.take() {
            self.registry.unregister_all(filler.channel());
        }
        self.exit_event = None;
    }
}

impl<C: FaultChannel> Drop for MemoryAccessWatch<C> {
    fn drop(&mut self) {
        self.stop();
        // Ranges registered without ever starting the worker.
        if let Some(filler) = &self.filler {
            self.registry.unregister_all(filler.channel());
        }
    }
}
