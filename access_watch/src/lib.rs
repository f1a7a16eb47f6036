// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! On-demand population of guest memory restored from a snapshot.
//!
//! The VMM registers guest RAM ranges, then a worker thread reports every first touch of a
//! registered page through the access callback so the VMM can fill that page from the snapshot.
//! While no fault is pending the worker runs the idle callback, which pushes pages in the
//! background until everything is loaded.
//!
//! When the host cannot intercept page faults the whole subsystem degrades to no-ops and the
//! caller must populate guest memory eagerly.

#![deny(missing_docs)]

mod config;
mod range;

pub use config::WatchConfig;
pub use range::coalesce_ranges;
pub use range::RangeCoalescer;
pub use range::WatchedRange;

/// What the worker should do after the idle callback returns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdleCallbackResult {
    /// More idle work is ready; call again right after checking for faults.
    RunAgain,
    /// Nothing to do right now; sleep for the idle backoff unless a fault arrives.
    Wait,
    /// All idle work is finished; unregister every range and stop the worker.
    AllDone,
}

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "android", target_os = "linux"))] {
        mod channel;
        mod filler;
        pub mod pagesize;
        mod registry;
        // Only built for its own tests on this host.
        #[cfg(test)]
        mod stub;
        mod sys;
        mod watch;
        mod worker;

        pub use channel::Error;
        pub use channel::FaultChannel;
        pub use channel::FaultEvent;
        pub use channel::Result;
        pub use filler::PageFiller;
        #[cfg(feature = "uffd")]
        pub use sys::Userfaultfd;
        pub use sys::PlatformChannel;
        pub use sys::UnsupportedChannel;
        pub use watch::is_supported;
        pub use watch::is_supported_with;
        pub use watch::AccessCallback;
        pub use watch::IdleCallback;
        pub use watch::MemoryAccessWatch;
    } else {
        mod stub;

        pub use stub::is_supported;
        pub use stub::is_supported_with;
        pub use stub::MemoryAccessWatch;
        pub use stub::PageFiller;
    }
}
