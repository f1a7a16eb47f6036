// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::ptr;
use std::time::Duration;

use libc::POLLERR;
use libc::POLLHUP;
use libc::POLLIN;
use smallvec::SmallVec;

use crate::descriptor::AsRawDescriptor;
use crate::descriptor::RawDescriptor;
use crate::errno_result;
use crate::sys::duration_to_timespec;
use crate::Error;
use crate::Result;

/// Tokens identify which trigger fired. Any small copyable value works, typically a fieldless
/// enum.
pub trait EventToken: Copy {}
impl<T: Copy> EventToken for T {}

/// Represents an event that has been signaled and waited for via a wait function.
#[derive(Copy, Clone, Debug)]
pub struct TriggeredEvent<T: EventToken> {
    pub token: T,
    pub is_readable: bool,
    pub is_hungup: bool,
}

/// Used to wait for multiple descriptors to become readable, with a bounded timeout.
///
/// Level triggered: a descriptor that stays readable is reported by every wait until it is
/// drained.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use base::Event;
/// use base::WaitContext;
///
/// #[derive(Copy, Clone, Debug, PartialEq)]
/// enum Token {
///     Exit,
///     Work,
/// }
///
/// let exit = Event::new()?;
/// let work = Event::new()?;
/// let ctx = WaitContext::build_with(&[(&exit, Token::Exit), (&work, Token::Work)])?;
///
/// work.signal()?;
/// let events = ctx.wait_timeout(Duration::from_millis(100))?;
/// let tokens: Vec<Token> = events.iter().filter(|e| e.is_readable).map(|e| e.token).collect();
/// assert_eq!(tokens, [Token::Work]);
/// # Ok::<(), base::Error>(())
/// ```
pub struct WaitContext<T: EventToken> {
    triggers: Vec<(RawDescriptor, T)>,
}

impl<T: EventToken> WaitContext<T> {
    /// Creates a new WaitContext.
    pub fn new() -> Result<WaitContext<T>> {
        Ok(WaitContext {
            triggers: Vec::new(),
        })
    }

    /// Creates a new WaitContext with the the associated triggers.
    pub fn build_with(triggers: &[(&dyn AsRawDescriptor, T)]) -> Result<WaitContext<T>> {
        let mut ctx = WaitContext::new()?;
        for (descriptor, token) in triggers {
            ctx.add(*descriptor, *token)?;
        }
        Ok(ctx)
    }

    /// Adds a trigger to the WaitContext.
    ///
    /// The descriptor must stay open for as long as it is part of the context.
    pub fn add(&mut self, descriptor: &dyn AsRawDescriptor, token: T) -> Result<()> {
        let raw = descriptor.as_raw_descriptor();
        if raw < 0 {
            return Err(Error::new(libc::EBADF));
        }
        self.triggers.push((raw, token));
        Ok(())
    }

    /// Waits for at least one of the triggers to become readable, or for `timeout` to expire.
    ///
    /// Returns an empty list on timeout. `EINTR` restarts the wait with the full timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<SmallVec<[TriggeredEvent<T>; 16]>> {
        let mut pfds: SmallVec<[libc::pollfd; 16]> = self
            .triggers
            .iter()
            .map(|(fd, _)| libc::pollfd {
                fd: *fd,
                events: POLLIN,
                revents: 0,
            })
            .collect();
        let timeoutspec = duration_to_timespec(timeout);
        loop {
            // SAFETY:
            // Safe because we give a valid pointer to a list of pollfds with the right length and
            // check the return value.
            let ret = unsafe {
                libc::ppoll(
                    pfds.as_mut_ptr(),
                    pfds.len() as libc::nfds_t,
                    &timeoutspec,
                    ptr::null(),
                )
            };
            if ret >= 0 {
                break;
            }
            let err = Error::last();
            if err.errno() != libc::EINTR {
                return errno_result();
            }
        }

        Ok(pfds
            .iter()
            .zip(self.triggers.iter())
            .filter(|(pfd, _)| pfd.revents != 0)
            .map(|(pfd, (_, token))| TriggeredEvent {
                token: *token,
                is_readable: pfd.revents & POLLIN != 0,
                is_hungup: pfd.revents & (POLLHUP | POLLERR) != 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::Event;

    #[derive(Copy, Clone, Debug, PartialEq)]
    enum Token {
        First,
        Second,
    }

    #[test]
    fn wait_reports_only_signaled() {
        let evt1 = Event::new().unwrap();
        let evt2 = Event::new().unwrap();
        let ctx = WaitContext::build_with(&[(&evt1, Token::First), (&evt2, Token::Second)])
            .unwrap();

        evt2.signal().unwrap();
        let events = ctx.wait_timeout(Duration::from_secs(1)).unwrap();
        let tokens: Vec<Token> = events
            .iter()
            .filter(|e| e.is_readable)
            .map(|e| e.token)
            .collect();
        assert_eq!(tokens, [Token::Second]);
    }

    #[test]
    fn level_triggered_until_drained() {
        let evt = Event::new().unwrap();
        let ctx = WaitContext::build_with(&[(&evt, Token::First)]).unwrap();

        evt.signal().unwrap();
        assert_eq!(ctx.wait_timeout(Duration::ZERO).unwrap().len(), 1);
        assert_eq!(ctx.wait_timeout(Duration::ZERO).unwrap().len(), 1);
        evt.wait().unwrap();
        assert!(ctx.wait_timeout(Duration::ZERO).unwrap().is_empty());
    }

    #[test]
    fn timeout_elapses() {
        let evt = Event::new().unwrap();
        let ctx = WaitContext::build_with(&[(&evt, Token::First)]).unwrap();

        let start = Instant::now();
        let events = ctx.wait_timeout(Duration::from_millis(20)).unwrap();
        assert!(events.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
