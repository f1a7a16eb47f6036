// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Platform fault channels.

mod unsupported;

pub use unsupported::UnsupportedChannel;

cfg_if::cfg_if! {
    if #[cfg(feature = "uffd")] {
        mod linux;

        pub use linux::Userfaultfd;

        /// The fault channel of this build.
        pub type PlatformChannel = Userfaultfd;
    } else {
        /// The fault channel of this build.
        pub type PlatformChannel = UnsupportedChannel;
    }
}
