// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Safe wrappers over the host primitives used by the memory access watch.

mod errno;
pub mod syslog;

pub use errno::errno_result;
pub use errno::Error;
pub use errno::Result;
pub use log::debug;
pub use log::error;
pub use log::info;
pub use log::trace;
pub use log::warn;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "android", target_os = "linux"))] {
        mod descriptor;
        mod event;
        mod sys;
        mod wait_context;

        pub use descriptor::AsRawDescriptor;
        pub use descriptor::FromRawDescriptor;
        pub use descriptor::RawDescriptor;
        pub use descriptor::SafeDescriptor;
        pub use event::Event;
        pub use event::EventWaitResult;
        pub use sys::pagesize;
        pub use wait_context::EventToken;
        pub use wait_context::TriggeredEvent;
        pub use wait_context::WaitContext;
    }
}
