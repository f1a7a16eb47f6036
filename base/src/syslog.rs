// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Process-wide log backend for the `log` macros re-exported from this crate.
//!
//! # Examples
//!
//! ```
//! use base::syslog;
//! use base::warn;
//!
//! if let Err(e) = syslog::init() {
//!     println!("failed to initiailize syslog: {}", e);
//!     return;
//! }
//! warn!("this is your {} warning", "final");
//! ```

use std::sync::Mutex;
use std::sync::Once;

use env_logger::Env;
use remain::sorted;
use thiserror::Error as ThisError;

/// Environment variable holding the log filter, in `env_logger` syntax.
pub const LOG_FILTER_ENV: &str = "MEMWATCH_LOG";

#[sorted]
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Another logger was installed before `init` ran.
    #[error("a different logger was already installed")]
    LoggerAlreadySet,
}

static INIT: Once = Once::new();
static INIT_RESULT: Mutex<Option<Error>> = Mutex::new(None);

/// Installs the log backend.
///
/// Only the first call does any work; every later call returns the first call's result.
pub fn init() -> Result<(), Error> {
    INIT.call_once(|| {
        let res = env_logger::Builder::from_env(Env::default().filter_or(LOG_FILTER_ENV, "info"))
            .try_init();
        if res.is_err() {
            if let Ok(mut slot) = INIT_RESULT.lock() {
                *slot = Some(Error::LoggerAlreadySet);
            }
        }
    });
    match INIT_RESULT.lock() {
        Ok(slot) => slot.clone().map_or(Ok(()), Err),
        Err(_) => Err(Error::LoggerAlreadySet),
    }
}

/// Installs a log backend that writes through the test harness capture. Never fails, and is
/// safe to call from every test.
pub fn init_for_test() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let first = init();
        assert_eq!(init(), first);
    }
}
