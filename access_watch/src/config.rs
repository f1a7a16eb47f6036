// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Tunables of a watch session, loadable from a JSON document.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;

/// Default sleep between idle callbacks that returned [`Wait`](crate::IdleCallbackResult::Wait).
pub const DEFAULT_IDLE_BACKOFF_MS: u64 = 500;

/// Tunables of a memory access watch session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Milliseconds the worker waits for a fault after the idle callback asked to wait.
    pub idle_backoff_ms: u64,
    /// Guest RAM is backed by a file mapping.
    ///
    /// Missing-page interception of file-backed memory is broken on affected host kernels even
    /// though they advertise it, so this forces the watch to report itself unsupported.
    pub file_backed_ram: bool,
    /// Only intercept faults raised from user mode.
    ///
    /// Leave this off when the hypervisor touches guest memory from the kernel (e.g. KVM copying
    /// into guest pages), otherwise those accesses bypass the watch and read zeroes.
    pub user_mode_only: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            idle_backoff_ms: DEFAULT_IDLE_BACKOFF_MS,
            file_backed_ram: false,
            user_mode_only: false,
        }
    }
}

impl WatchConfig {
    /// The idle backoff as a [`Duration`].
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Parses a JSON configuration document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parse memory access watch config")
    }

    /// Loads a JSON configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_json_str(&json)
    }
}
