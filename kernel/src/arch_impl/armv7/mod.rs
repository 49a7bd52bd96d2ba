//! ARMv7-A support for OMAP34xx/36xx and OMAP44xx.
//!
//! - `pmu`: cp15 performance monitor registers
//! - `cti`: cross trigger interface and the debug clock domains that feed it
//! - `irq`: interrupt line ownership
//! - `smp`: cross-CPU dispatch
//! - `exception_frame`: saved CPU state handed to the profiler

pub mod cti;
pub mod exception_frame;
pub mod irq;
pub mod pmu;
pub mod smp;

pub use exception_frame::{Armv7ExceptionFrame, Armv7PrivilegeLevel};
