//! Hardware bring-up error types
//!
//! Every fallible operation in this crate reports one of the [`HwError`]
//! kinds. Callers sitting on a C-style driver boundary convert them with
//! [`HwError::errno`].

use core::fmt;

/// POSIX errno values used by the bring-up paths.
pub mod errno {
    /// No such file or directory (named clock missing)
    pub const ENOENT: i32 = 2;

    /// Cannot allocate memory (register window mapping failed)
    pub const ENOMEM: i32 = 12;

    /// Device or resource busy
    pub const EBUSY: i32 = 16;

    /// Invalid argument
    pub const EINVAL: i32 = 22;

    /// Connection timed out
    pub const ETIMEDOUT: i32 = 110;
}

/// Bring-up error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwError {
    /// Missing device handle or out-of-range index
    InvalidArgument,
    /// A register window could not be mapped
    NoMemory,
    /// Hardware still in use, not yet probed, or already running
    Busy,
    /// Hardware never acknowledged a reset
    Timeout,
    /// Named clock lookup failed
    ClockUnavailable,
}

impl HwError {
    /// Negative errno for callers speaking the kernel's C convention.
    pub const fn errno(self) -> i32 {
        -match self {
            HwError::InvalidArgument => errno::EINVAL,
            HwError::NoMemory => errno::ENOMEM,
            HwError::Busy => errno::EBUSY,
            HwError::Timeout => errno::ETIMEDOUT,
            HwError::ClockUnavailable => errno::ENOENT,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            HwError::InvalidArgument => "invalid argument",
            HwError::NoMemory => "unable to map registers",
            HwError::Busy => "device busy",
            HwError::Timeout => "operation timed out",
            HwError::ClockUnavailable => "clock unavailable",
        }
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type HwResult<T> = Result<T, HwError>;
