// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The thread servicing page faults and running idle-time work.

use std::time::Duration;

use base::debug;
use base::error;
use base::info;
use base::Event;
use base::WaitContext;

use crate::channel::Error;
use crate::channel::FaultChannel;
use crate::channel::Result;
use crate::filler::PageFiller;
use crate::pagesize::page_base_addr;
use crate::registry::RangeRegistry;
use crate::watch::AccessCallback;
use crate::watch::IdleCallback;
use crate::IdleCallbackResult;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Token {
    Exit,
    Fault,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Polling,
    // The exit event fired. One more pass over the channel, then stop.
    Draining,
}

/// Outcome of one pass over the channel.
#[derive(Debug, Default)]
struct Drained {
    serviced: usize,
    // Reading stopped on an error.
    failed: bool,
}

pub(crate) struct Worker<C: FaultChannel> {
    pub filler: PageFiller<C>,
    pub exit_event: Event,
    pub registry: RangeRegistry,
    pub on_access: AccessCallback<C>,
    pub on_idle: IdleCallback<C>,
    pub idle_backoff: Duration,
}

impl<C: FaultChannel> Worker<C> {
    /// Services faults until the exit event fires or the idle callback reports
    /// [`IdleCallbackResult::AllDone`], then unregisters every range.
    pub fn run(mut self) {
        info!(
            "memory access watch started on {} ranges",
            self.registry.len()
        );
        if let Err(e) = self.service_loop() {
            error!("memory access watch stopped: {}", e);
        }
        self.registry.unregister_all(self.filler.channel());
        info!("memory access watch exited");
    }

    fn service_loop(&mut self) -> Result<()> {
        let wait_ctx = WaitContext::build_with(&[
            (&self.exit_event, Token::Exit),
            (self.filler.channel(), Token::Fault),
        ])
        .map_err(Error::Wait)?;
        // Waited on instead of `wait_ctx` for one round after the channel failed.
        let exit_ctx =
            WaitContext::build_with(&[(&self.exit_event, Token::Exit)]).map_err(Error::Wait)?;

        let mut state = State::Polling;
        let mut timeout = Duration::ZERO;
        let mut channel_failed = false;
        loop {
            let ctx = if channel_failed { &exit_ctx } else { &wait_ctx };
            let events = ctx.wait_timeout(timeout).map_err(Error::Wait)?;
            let mut fault_pending = false;
            let mut exit_requested = false;
            channel_failed = false;
            for event in events.iter() {
                match event.token {
                    Token::Exit => exit_requested = true,
                    Token::Fault => {
                        fault_pending |= event.is_readable;
                        channel_failed |= event.is_hungup && !event.is_readable;
                    }
                }
            }

            // While draining, read the channel even if it did not look readable: a fault racing
            // with the exit event must still reach the access callback.
            let drained = if fault_pending || state == State::Draining {
                self.drain_faults()
            } else {
                Drained::default()
            };

            if state == State::Draining {
                debug!("serviced {} faults after the exit request", drained.serviced);
                return Ok(());
            }
            if exit_requested {
                state = State::Draining;
                continue;
            }
            if drained.serviced > 0 {
                timeout = Duration::ZERO;
                continue;
            }
            if drained.failed || channel_failed {
                // Keep the current timeout and only watch the exit event next round.
                channel_failed = true;
                continue;
            }

            match (self.on_idle)(&self.filler) {
                IdleCallbackResult::RunAgain => timeout = Duration::ZERO,
                IdleCallbackResult::Wait => timeout = self.idle_backoff,
                IdleCallbackResult::AllDone => {
                    info!("idle work finished");
                    return Ok(());
                }
            }
        }
    }

    /// Dispatches every pending fault to the access callback.
    fn drain_faults(&mut self) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.filler.channel().read_fault() {
                Ok(Some(fault)) => {
                    let addr = page_base_addr(fault.address);
                    debug!("page fault at {:#x}", fault.address);
                    (self.on_access)(&self.filler, addr);
                    drained.serviced += 1;
                }
                Ok(None) => return drained,
                Err(e) => {
                    error!("failed to read page fault: {}", e);
                    drained.failed = true;
                    return drained;
                }
            }
        }
    }
}

impl<C: FaultChannel> Drop for Worker<C> {
    // Only has work left when the worker never ran, e.g. the thread failed to spawn.
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            self.registry.unregister_all(self.filler.channel());
        }
    }
}
