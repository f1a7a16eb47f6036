// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::os::unix::io::RawFd;

use crate::errno_result;
use crate::Result;

pub type RawDescriptor = RawFd;

/// Trait for returning the underlying raw descriptor, without giving up ownership of the
/// descriptor.
pub trait AsRawDescriptor {
    fn as_raw_descriptor(&self) -> RawDescriptor;
}

pub trait FromRawDescriptor {
    /// # Safety
    /// Safe only if the caller ensures nothing has access to the descriptor after passing it to
    /// `from_raw_descriptor`
    unsafe fn from_raw_descriptor(descriptor: RawDescriptor) -> Self;
}

/// Wraps a RawDescriptor and safely closes it when self falls out of scope.
#[derive(Debug, PartialEq, Eq)]
pub struct SafeDescriptor {
    descriptor: RawDescriptor,
}

impl SafeDescriptor {
    /// Clones this descriptor, internally creating a new descriptor. The new descriptor will share
    /// the same underlying count within the kernel.
    pub fn try_clone(&self) -> Result<SafeDescriptor> {
        // SAFETY:
        // Safe because this doesn't modify any memory and we check the return value.
        let descriptor = unsafe { libc::fcntl(self.descriptor, libc::F_DUPFD_CLOEXEC, 0) };
        if descriptor < 0 {
            errno_result()
        } else {
            Ok(SafeDescriptor { descriptor })
        }
    }
}

impl Drop for SafeDescriptor {
    fn drop(&mut self) {
        // SAFETY:
        // Safe because we own the descriptor and nothing else can close it.
        let _ = unsafe { libc::close(self.descriptor) };
    }
}

impl AsRawDescriptor for SafeDescriptor {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.descriptor
    }
}

impl FromRawDescriptor for SafeDescriptor {
    unsafe fn from_raw_descriptor(descriptor: RawDescriptor) -> Self {
        SafeDescriptor { descriptor }
    }
}

impl<T: AsRawDescriptor + ?Sized> AsRawDescriptor for &T {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        (**self).as_raw_descriptor()
    }
}

impl<T: AsRawDescriptor + ?Sized> AsRawDescriptor for std::sync::Arc<T> {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        (**self).as_raw_descriptor()
    }
}
