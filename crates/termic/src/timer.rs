// SPDX-License-Identifier: MIT
//
// Timers multiplexed with terminal input.
//
// Safety: this module calls `timerfd_create`, `timerfd_settime` and `read`
// on descriptors it owns. There is no safe wrapper in std. Each unsafe
// block is a single FFI call.
#![allow(unsafe_code)]
//
// A timer is a Linux `timerfd`. The decoder polls every active timer
// descriptor together with the input descriptor, so a timer wakes the
// blocked read just like a keypress does, and its callback runs on the
// event-loop thread before any input is decoded. Nothing runs
// concurrently with event dispatch.
//
// The registry owns the descriptor and the callback. The application
// holds a `Timer` handle that shares only the statistics and the active
// flag with the registry entry. Cancelling through the handle clears the
// flag, and the registry drops the entry (closing the descriptor) at the
// start of the next wait. The handle's statistics stay readable after
// that.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

// ─── Stopwatch ───────────────────────────────────────────────────────────────

/// Elapsed time since construction or the last [`reset`](Self::reset).
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[must_use]
    pub fn elapsed_us(&self) -> u128 {
        self.elapsed().as_micros()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Timer Handle ────────────────────────────────────────────────────────────

/// Firing statistics of one timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerStats {
    /// Delay before the first expiration.
    pub initial: Duration,
    /// Period between expirations, zero for a single-shot timer.
    pub interval: Duration,
    pub creation_time: Instant,
    /// Times the callback ran.
    pub trigger_count: u64,
    /// Expirations that elapsed while the loop was busy. The callback runs
    /// once for all of them.
    pub triggers_missed: u64,
    pub last_trigger_time: Option<Instant>,
    /// How late the most recent expiration was handled.
    pub lag: Duration,
}

impl TimerStats {
    fn new(initial: Duration, interval: Duration) -> Self {
        Self {
            initial,
            interval,
            creation_time: Instant::now(),
            trigger_count: 0,
            triggers_missed: 0,
            last_trigger_time: None,
            lag: Duration::ZERO,
        }
    }

    /// Account for `expirations` timer ticks handled at `now`.
    fn record(&mut self, expirations: u64, now: Instant) {
        let total = self.trigger_count + self.triggers_missed + expirations;
        self.trigger_count += 1;
        self.triggers_missed += expirations.saturating_sub(1);
        self.last_trigger_time = Some(now);

        // The latest of the expirations was due at initial + (total-1) periods.
        let periods = u32::try_from(total.saturating_sub(1)).unwrap_or(u32::MAX);
        let due = self
            .creation_time
            .checked_add(self.initial)
            .and_then(|t| t.checked_add(self.interval.saturating_mul(periods)));
        self.lag = due.map_or(Duration::ZERO, |due| now.saturating_duration_since(due));
    }
}

/// State shared between a registry entry and its handle.
#[derive(Debug)]
struct Shared {
    stats: Cell<TimerStats>,
    active: Cell<bool>,
}

/// Handle to a registered timer.
///
/// Dropping the handle leaves the timer running unless
/// [`set_cancel_on_drop`](Self::set_cancel_on_drop) was turned on.
#[derive(Debug)]
pub struct Timer {
    id: u64,
    shared: Rc<Shared>,
    cancel_on_drop: bool,
}

impl Timer {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn stats(&self) -> TimerStats {
        self.shared.stats.get()
    }

    #[must_use]
    pub fn initial(&self) -> Duration {
        self.stats().initial
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.stats().interval
    }

    #[must_use]
    pub fn is_single_shot(&self) -> bool {
        self.interval().is_zero()
    }

    #[must_use]
    pub fn creation_time(&self) -> Instant {
        self.stats().creation_time
    }

    #[must_use]
    pub fn trigger_count(&self) -> u64 {
        self.stats().trigger_count
    }

    #[must_use]
    pub fn triggers_missed(&self) -> u64 {
        self.stats().triggers_missed
    }

    #[must_use]
    pub fn last_trigger_time(&self) -> Option<Instant> {
        self.stats().last_trigger_time
    }

    #[must_use]
    pub fn lag(&self) -> Duration {
        self.stats().lag
    }

    /// False once cancelled, or once a single-shot timer has fired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.active.get()
    }

    /// Stop the timer. Takes effect before the decoder's next wait.
    pub fn cancel(&self) {
        if self.shared.active.replace(false) {
            log::debug!("timer {} cancelled", self.id);
        }
    }

    pub fn set_cancel_on_drop(&mut self, on: bool) {
        self.cancel_on_drop = on;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if self.cancel_on_drop {
            self.cancel();
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Callback run when a timer expires.
pub type TimerCallback = Box<dyn FnMut()>;

#[cfg(unix)]
struct Entry {
    id: u64,
    fd: OwnedFd,
    callback: TimerCallback,
    shared: Rc<Shared>,
}

/// Active timers of one decoder.
#[cfg(unix)]
pub(crate) struct Timers {
    entries: Vec<Entry>,
    next_id: u64,
    max: usize,
}

#[cfg(unix)]
impl Timers {
    pub(crate) const fn new(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            max,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Register a timer that first fires after `initial` and then every
    /// `interval` (never again when `interval` is zero).
    pub(crate) fn add(
        &mut self,
        initial: Duration,
        interval: Duration,
        callback: TimerCallback,
    ) -> crate::Result<Timer> {
        self.prune();
        if self.entries.len() >= self.max {
            return Err(crate::Error::TooManyTimers { max: self.max });
        }

        let fd = sys::create(initial, interval)?;
        let id = self.next_id;
        self.next_id += 1;

        let shared = Rc::new(Shared {
            stats: Cell::new(TimerStats::new(initial, interval)),
            active: Cell::new(true),
        });
        self.entries.push(Entry {
            id,
            fd,
            callback,
            shared: Rc::clone(&shared),
        });
        log::debug!("timer {id} registered: initial {initial:?}, interval {interval:?}");

        Ok(Timer {
            id,
            shared,
            cancel_on_drop: false,
        })
    }

    /// Drop cancelled and finished entries, closing their descriptors.
    pub(crate) fn prune(&mut self) {
        self.entries.retain(|e| {
            let keep = e.shared.active.get();
            if !keep {
                log::trace!("timer {} removed", e.id);
            }
            keep
        });
    }

    /// Descriptors to poll, in entry order.
    pub(crate) fn fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.entries.iter().map(|e| e.fd.as_raw_fd())
    }

    /// Run the callbacks of the entries flagged in `ready` (same order as
    /// [`fds`](Self::fds)). Returns how many fired.
    pub(crate) fn fire(&mut self, ready: &[bool]) -> usize {
        let now = Instant::now();
        let mut fired = 0;

        for (entry, _) in self.entries.iter_mut().zip(ready).filter(|(_, r)| **r) {
            if !entry.shared.active.get() {
                continue;
            }
            let expirations = match sys::expirations(entry.fd.as_raw_fd()) {
                Ok(0) => continue,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    log::warn!("timer {} read failed: {e}", entry.id);
                    continue;
                }
            };

            let mut stats = entry.shared.stats.get();
            stats.record(expirations, now);
            entry.shared.stats.set(stats);
            if stats.interval.is_zero() {
                entry.shared.active.set(false);
            }
            if expirations > 1 {
                log::debug!(
                    "timer {} missed {} triggers, lag {:?}",
                    entry.id,
                    expirations - 1,
                    stats.lag
                );
            }

            (entry.callback)();
            fired += 1;
        }

        self.prune();
        fired
    }
}

// ─── timerfd ─────────────────────────────────────────────────────────────────

#[cfg(target_os = "linux")]
mod sys {
    use std::io;
    use std::os::fd::{FromRawFd, OwnedFd, RawFd};
    use std::time::Duration;

    fn timespec(d: Duration) -> libc::timespec {
        // SAFETY: timespec is plain data. Zeroing also covers padding
        // fields present on some targets.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        ts.tv_sec = libc::time_t::try_from(d.as_secs()).unwrap_or(libc::time_t::MAX);
        ts.tv_nsec = d.subsec_nanos().try_into().unwrap_or(0);
        ts
    }

    pub(super) fn create(initial: Duration, interval: Duration) -> io::Result<OwnedFd> {
        // SAFETY: plain syscall, the result is checked.
        let raw = unsafe {
            libc::timerfd_create(libc::CLOCK_MONOTONIC, libc::TFD_NONBLOCK | libc::TFD_CLOEXEC)
        };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `raw` is a fresh descriptor nobody else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // A zero it_value disarms the timer, so "now" becomes 1 ns.
        let first = if initial.is_zero() { Duration::from_nanos(1) } else { initial };
        // SAFETY: itimerspec is plain data.
        let mut spec: libc::itimerspec = unsafe { std::mem::zeroed() };
        spec.it_value = timespec(first);
        spec.it_interval = timespec(interval);

        // SAFETY: `fd` is a valid timerfd and `spec` outlives the call.
        let rc = unsafe { libc::timerfd_settime(raw, 0, &raw const spec, std::ptr::null_mut()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(fd)
    }

    /// Expirations since the last read. `WouldBlock` when none.
    pub(super) fn expirations(fd: RawFd) -> io::Result<u64> {
        let mut count: u64 = 0;
        // SAFETY: reads at most 8 bytes into `count`.
        let n = unsafe { libc::read(fd, (&raw mut count).cast::<libc::c_void>(), 8) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        if n != 8 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short timerfd read"));
        }
        Ok(count)
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
mod sys {
    use std::io;
    use std::os::fd::{OwnedFd, RawFd};
    use std::time::Duration;

    pub(super) fn create(_initial: Duration, _interval: Duration) -> crate::Result<OwnedFd> {
        Err(crate::Error::Unsupported("timers need timerfd (Linux)"))
    }

    pub(super) fn expirations(_fd: RawFd) -> io::Result<u64> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
