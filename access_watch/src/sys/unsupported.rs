// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use base::AsRawDescriptor;
use base::RawDescriptor;

use crate::channel::Error;
use crate::channel::FaultChannel;
use crate::channel::FaultEvent;
use crate::channel::Result;
use crate::WatchConfig;
use crate::WatchedRange;

/// Channel for hosts without page fault interception.
///
/// It can never be opened, so a watch built on it stays invalid and every operation is a no-op.
#[derive(Debug)]
pub enum UnsupportedChannel {}

impl FaultChannel for UnsupportedChannel {
    fn open(_config: &WatchConfig) -> Result<Self> {
        Err(Error::Unsupported)
    }

    fn probe(_config: &WatchConfig) -> bool {
        false
    }

    unsafe fn register(&self, _range: &WatchedRange) -> Result<()> {
        match *self {}
    }

    fn unregister(&self, _range: &WatchedRange) -> Result<()> {
        match *self {}
    }

    fn read_fault(&self) -> Result<Option<FaultEvent>> {
        match *self {}
    }

    fn copy(&self, _addr: usize, _data: &[u8]) -> Result<usize> {
        match *self {}
    }

    fn zero(&self, _addr: usize, _len: usize) -> Result<usize> {
        match *self {}
    }
}

impl AsRawDescriptor for UnsupportedChannel {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        match *self {}
    }
}
