// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::mem;
use std::ptr;
use std::time::Duration;

use libc::c_void;
use libc::eventfd;
use libc::EFD_CLOEXEC;
use libc::POLLIN;

use crate::descriptor::AsRawDescriptor;
use crate::descriptor::FromRawDescriptor;
use crate::descriptor::RawDescriptor;
use crate::descriptor::SafeDescriptor;
use crate::errno_result;
use crate::sys::duration_to_timespec;
use crate::Result;

/// A cross-thread wait/notify mechanism backed by an eventfd (man 2 eventfd). Writes signal the
/// event. Reads block until the event is signaled and then clear the signal.
///
/// Supports multiple simultaneous signalers but only one waiter. The event is level triggered
/// when polled through a `WaitContext`: it stays readable until someone reads it.
#[derive(Debug, PartialEq, Eq)]
pub struct Event {
    event_handle: SafeDescriptor,
}

#[derive(PartialEq, Eq, Debug)]
pub enum EventWaitResult {
    /// The `Event` was signaled.
    Signaled,
    /// Timeout limit reached.
    TimedOut,
}

impl Event {
    /// Creates new event in an unsignaled state.
    pub fn new() -> Result<Event> {
        // SAFETY:
        // This is safe because eventfd merely allocated an eventfd for our process and we handle
        // the error case.
        let ret = unsafe { eventfd(0, EFD_CLOEXEC) };
        if ret < 0 {
            return errno_result();
        }
        Ok(Event {
            // SAFETY:
            // This is safe because we checked ret for success and know the kernel gave us an fd
            // that we own.
            event_handle: unsafe { SafeDescriptor::from_raw_descriptor(ret) },
        })
    }

    /// Signals the event.
    pub fn signal(&self) -> Result<()> {
        let v: u64 = 1;
        // SAFETY:
        // This is safe because we made this fd and the pointer we pass can not overflow because we
        // give the syscall's size parameter properly.
        let ret = unsafe {
            libc::write(
                self.as_raw_descriptor(),
                &v as *const u64 as *const c_void,
                mem::size_of::<u64>(),
            )
        };
        if ret <= 0 {
            return errno_result();
        }
        Ok(())
    }

    /// Blocks until the event is signaled and clears the signal.
    pub fn wait(&self) -> Result<()> {
        self.read_count().map(|_| ())
    }

    /// Blocks until the event is signaled and clears the signal, or until the timeout duration
    /// expires.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<EventWaitResult> {
        let mut pfd = libc::pollfd {
            fd: self.as_raw_descriptor(),
            events: POLLIN,
            revents: 0,
        };
        let timeoutspec = duration_to_timespec(timeout);
        // SAFETY:
        // Safe because this only modifies |pfd| and we check the return value
        let ret = unsafe { libc::ppoll(&mut pfd, 1, &timeoutspec, ptr::null()) };
        if ret < 0 {
            return errno_result();
        }

        // no return events (revents) means we got a timeout
        if pfd.revents == 0 {
            return Ok(EventWaitResult::TimedOut);
        }

        self.read_count()?;
        Ok(EventWaitResult::Signaled)
    }

    /// Clears the signal without blocking if the event is not signaled.
    pub fn reset(&self) -> Result<()> {
        self.wait_timeout(Duration::ZERO).map(|_| ())
    }

    /// Clones the event. The event's state is shared between cloned instances.
    pub fn try_clone(&self) -> Result<Event> {
        self.event_handle
            .try_clone()
            .map(|event_handle| Event { event_handle })
    }

    fn read_count(&self) -> Result<u64> {
        let mut buf: u64 = 0;
        // SAFETY:
        // This is safe because we made this fd and the pointer we pass can not overflow because
        // we give the syscall's size parameter properly.
        let ret = unsafe {
            libc::read(
                self.as_raw_descriptor(),
                &mut buf as *mut u64 as *mut c_void,
                mem::size_of::<u64>(),
            )
        };
        if ret <= 0 {
            return errno_result();
        }
        Ok(buf)
    }
}

impl AsRawDescriptor for Event {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.event_handle.as_raw_descriptor()
    }
}
