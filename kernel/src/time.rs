//! Time source and deadline-bounded polling.
//!
//! Reset handshakes on the USB host blocks are acknowledged by status bits
//! that the hardware sets some time after the request. Every wait in this
//! crate goes through [`Deadline::poll`] so that a wedged block can only
//! stall the caller for a bounded time.

use crate::error::{HwError, HwResult};

/// Monotonic microsecond clock plus the two delay primitives the drivers use.
pub trait TimeSource: Sync {
    /// Microseconds since an arbitrary epoch. Must never go backwards.
    fn now_us(&self) -> u64;

    /// Busy-wait for at least `us` microseconds.
    fn udelay(&self, us: u32);

    /// Back-off hint between two polls of a status register.
    #[inline]
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

/// Absolute point in time after which a poll gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_us: u64,
}

impl Deadline {
    /// Deadline `ms` milliseconds from now.
    pub fn after_ms<T: TimeSource + ?Sized>(time: &T, ms: u32) -> Self {
        Self {
            expires_us: time.now_us().saturating_add(u64::from(ms) * 1000),
        }
    }

    pub fn expired<T: TimeSource + ?Sized>(&self, time: &T) -> bool {
        time.now_us() > self.expires_us
    }

    /// Spin until `cond()` holds or the deadline passes.
    ///
    /// The condition is sampled before the clock, so a condition that is
    /// already true succeeds even on an expired deadline.
    pub fn poll<T, F>(&self, time: &T, mut cond: F) -> HwResult<()>
    where
        T: TimeSource + ?Sized,
        F: FnMut() -> bool,
    {
        loop {
            if cond() {
                return Ok(());
            }
            if self.expired(time) {
                return Err(HwError::Timeout);
            }
            time.relax();
        }
    }
}

/// Spin until `cond()` holds, failing with [`HwError::Timeout`] after
/// `timeout_ms` milliseconds.
pub fn poll_until<T, F>(time: &T, timeout_ms: u32, cond: F) -> HwResult<()>
where
    T: TimeSource + ?Sized,
    F: FnMut() -> bool,
{
    Deadline::after_ms(time, timeout_ms).poll(time, cond)
}
