// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::ptr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;
use std::time::Duration;

use access_watch::Error;
use access_watch::FaultChannel;
use access_watch::FaultEvent;
use access_watch::Result;
use access_watch::WatchConfig;
use access_watch::WatchedRange;
use base::AsRawDescriptor;
use base::Event;
use base::RawDescriptor;

/// How the scripted channel answers and what it observed.
#[derive(Default)]
pub struct ChannelState {
    pub pending: VecDeque<FaultEvent>,
    pub registered: Vec<WatchedRange>,
    pub unregistered: Vec<WatchedRange>,
    /// Filled bytes keyed by their address.
    pub memory: BTreeMap<usize, Vec<u8>>,
    /// Registering the n-th range (0 based) fails.
    pub fail_register_at: Option<usize>,
    pub fail_unregister: bool,
    /// Reading a fault fails and leaves the channel readable.
    pub fail_read: bool,
}

/// An in-process fault channel. Faults are injected by the test, fills land in `memory`.
///
/// A page that was already filled is refused with `PageExist`, like the kernel does.
pub struct ScriptedChannel {
    ready: Event,
    state: Mutex<ChannelState>,
}

impl ScriptedChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::open(&WatchConfig::default()).unwrap())
    }

    pub fn state(&self) -> MutexGuard<ChannelState> {
        self.state.lock().unwrap()
    }

    /// Queues a fault and makes the channel readable.
    pub fn inject_fault(&self, address: usize) {
        let mut state = self.state();
        state.pending.push_back(FaultEvent { address });
        self.ready.signal().unwrap();
    }

    /// Queues a fault without making the channel readable, as if it raced with a shutdown.
    pub fn inject_fault_quietly(&self, address: usize) {
        self.state().pending.push_back(FaultEvent { address });
    }

    /// Bytes filled at `[addr, addr + len)`, if that exact fill happened.
    pub fn read(&self, addr: usize, len: usize) -> Option<Vec<u8>> {
        self.state()
            .memory
            .get(&addr)
            .filter(|bytes| bytes.len() == len)
            .cloned()
    }

    fn store(&self, addr: usize, bytes: Vec<u8>) -> Result<usize> {
        let mut state = self.state();
        if state.memory.contains_key(&addr) {
            return Err(Error::PageExist);
        }
        let len = bytes.len();
        state.memory.insert(addr, bytes);
        Ok(len)
    }
}

impl FaultChannel for ScriptedChannel {
    fn open(_config: &WatchConfig) -> Result<Self> {
        Ok(ScriptedChannel {
            ready: Event::new().map_err(Error::Wait)?,
            state: Mutex::new(ChannelState::default()),
        })
    }

    fn probe(_config: &WatchConfig) -> bool {
        true
    }

    unsafe fn register(&self, range: &WatchedRange) -> Result<()> {
        let mut state = self.state();
        if state.fail_register_at == Some(state.registered.len()) {
            return Err(Error::Unsupported);
        }
        state.registered.push(*range);
        Ok(())
    }

    fn unregister(&self, range: &WatchedRange) -> Result<()> {
        let mut state = self.state();
        state.unregistered.push(*range);
        if state.fail_unregister {
            return Err(Error::Unsupported);
        }
        Ok(())
    }

    fn read_fault(&self) -> Result<Option<FaultEvent>> {
        let mut state = self.state();
        if state.fail_read {
            return Err(Error::Unsupported);
        }
        let fault = state.pending.pop_front();
        if state.pending.is_empty() {
            self.ready.reset().map_err(Error::Wait)?;
        }
        Ok(fault)
    }

    fn copy(&self, addr: usize, data: &[u8]) -> Result<usize> {
        self.store(addr, data.to_vec())
    }

    fn zero(&self, addr: usize, len: usize) -> Result<usize> {
        self.store(addr, vec![0; len])
    }
}

impl AsRawDescriptor for ScriptedChannel {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.ready.as_raw_descriptor()
    }
}

/// A config whose idle backoff is `millis`.
pub fn config_with_backoff(millis: u64) -> WatchConfig {
    WatchConfig {
        idle_backoff_ms: millis,
        ..Default::default()
    }
}

/// Runs `f` on another thread and fails the test if it does not finish within `timeout_millis`.
pub fn run_with_timeout<T, F>(timeout_millis: u64, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let join_handle = thread::spawn(f);
    for _ in 0..timeout_millis {
        if join_handle.is_finished() {
            return join_handle.join().unwrap();
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("thread join timeout");
}

/// Private anonymous read/write memory, unmapped on drop.
pub struct AnonymousMapping {
    pub addr: usize,
    pub len: usize,
}

impl AnonymousMapping {
    pub fn new(len: usize) -> Self {
        // SAFETY:
        // Safe because a fresh anonymous mapping does not alias any Rust object and the result is
        // checked.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        assert_ne!(addr, libc::MAP_FAILED, "mmap failed");
        AnonymousMapping {
            addr: addr as usize,
            len,
        }
    }
}

impl Drop for AnonymousMapping {
    fn drop(&mut self) {
        // SAFETY:
        // Safe because the mapping is owned by this object.
        unsafe { libc::munmap(self.addr as *mut libc::c_void, self.len) };
    }
}

/// Reads the byte at `addr`. Blocks while the page is registered but missing.
pub fn read_byte(addr: usize) -> u8 {
    // SAFETY:
    // Callers only pass addresses inside a live `AnonymousMapping`.
    unsafe { ptr::read_volatile(addr as *const u8) }
}
