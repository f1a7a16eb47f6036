// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Fault channel backed by userfaultfd(2).

use std::os::unix::io::AsRawFd;

use base::info;
use base::warn;
use base::AsRawDescriptor;
use base::RawDescriptor;
use libc::c_void;
use userfaultfd::Error as UffdError;
use userfaultfd::Event as UffdEvent;
use userfaultfd::IoctlFlags;
use userfaultfd::Uffd;
use userfaultfd::UffdBuilder;

use crate::channel::Error;
use crate::channel::FaultChannel;
use crate::channel::FaultEvent;
use crate::channel::Result;
use crate::WatchConfig;
use crate::WatchedRange;

impl From<UffdError> for Error {
    fn from(e: UffdError) -> Self {
        match e {
            UffdError::PartiallyCopied(copied) => Self::PartiallyCopied(copied),
            UffdError::CopyFailed(errno) if errno as i32 == libc::EEXIST => Self::PageExist,
            UffdError::ZeropageFailed(errno) if errno as i32 == libc::EEXIST => Self::PageExist,
            other => Self::Userfaultfd(other),
        }
    }
}

/// Creates a non-blocking userfaultfd that supports registering and unregistering ranges.
fn create_uffd(config: &WatchConfig) -> std::result::Result<Uffd, UffdError> {
    #[cfg(test)]
    tests::UFFD_CREATED.with(|created| created.set(created.get() + 1));
    UffdBuilder::new()
        .close_on_exec(true)
        .non_blocking(true)
        .user_mode_only(config.user_mode_only)
        .require_ioctls(IoctlFlags::REGISTER | IoctlFlags::UNREGISTER)
        .create()
}

/// Wrapper of [`userfaultfd::Uffd`] serving missing-page faults of guest memory.
///
/// # Safety
///
/// `UFFDIO_COPY` and `UFFDIO_ZEROPAGE` write page contents directly, but they only ever populate
/// pages that are missing: an already present page makes them fail with `EEXIST`. Populating a
/// never-touched page cannot break Rust memory safety, so those are safe methods. Registration is
/// the unsafe step because it discards the current contents of the range.
#[derive(Debug)]
pub struct Userfaultfd {
    uffd: Uffd,
}

impl FaultChannel for Userfaultfd {
    fn open(config: &WatchConfig) -> Result<Self> {
        if config.file_backed_ram {
            return Err(Error::Unsupported);
        }
        let uffd = create_uffd(config)?;
        Ok(Userfaultfd { uffd })
    }

    fn probe(config: &WatchConfig) -> bool {
        if config.file_backed_ram {
            info!("userfaultfd is not used for file-backed guest RAM");
            return false;
        }
        // The uffd is dropped, and therefore closed, right after the capability query.
        if let Err(e) = create_uffd(config) {
            info!("userfaultfd is not available: {}", e);
            return false;
        }
        true
    }

    unsafe fn register(&self, range: &WatchedRange) -> Result<()> {
        // Drop whatever is mapped now so the next access reliably faults.
        // SAFETY:
        // The caller owns the mapping and gave up its contents.
        let ret = unsafe {
            libc::madvise(
                range.start as *mut c_void,
                range.length,
                libc::MADV_DONTNEED,
            )
        };
        if ret < 0 {
            warn!(
                "failed to discard pages of {:#x}..{:#x}: {}",
                range.start,
                range.end(),
                base::Error::last()
            );
        }

        let ioctls = self
            .uffd
            .register(range.start as *mut c_void, range.length)?;
        if !ioctls.contains(IoctlFlags::COPY | IoctlFlags::ZEROPAGE) {
            warn!(
                "range {:#x}..{:#x} cannot be filled: {:?}",
                range.start,
                range.end(),
                ioctls
            );
            self.unregister(range)?;
            return Err(Error::Unsupported);
        }
        Ok(())
    }

    fn unregister(&self, range: &WatchedRange) -> Result<()> {
        Ok(self
            .uffd
            .unregister(range.start as *mut c_void, range.length)?)
    }

    fn read_fault(&self) -> Result<Option<FaultEvent>> {
        // Userfaultfd is edge triggered from the reader's point of view: keep reading until no
        // page fault is left, skipping events nobody asked for.
        loop {
            match self.uffd.read_event()? {
                Some(UffdEvent::Pagefault { addr, .. }) => {
                    return Ok(Some(FaultEvent {
                        address: addr as usize,
                    }))
                }
                Some(event) => warn!("unexpected userfaultfd event: {:?}", event),
                None => return Ok(None),
            }
        }
    }

    fn copy(&self, addr: usize, data: &[u8]) -> Result<usize> {
        Ok(
            // SAFETY:
            // Safe because UFFDIO_COPY only populates missing pages, see the type docs.
            unsafe {
                self.uffd.copy(
                    data.as_ptr() as *const c_void,
                    addr as *mut c_void,
                    data.len(),
                    true,
                )
            }?,
        )
    }

    fn zero(&self, addr: usize, len: usize) -> Result<usize> {
        // SAFETY:
        // Safe because UFFDIO_ZEROPAGE only populates missing pages, see the type docs.
        Ok(unsafe { self.uffd.zeropage(addr as *mut c_void, len, true) }?)
    }
}

impl AsRawDescriptor for Userfaultfd {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.uffd.as_raw_fd()
    }
}
