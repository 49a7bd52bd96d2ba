//! Cross-CPU dispatch.
//!
//! PMU registers are banked per CPU, so programming them means running the
//! same routine on every core. [`on_each_cpu`] pins the caller, runs the
//! routine synchronously on the other CPUs and then locally.

use crate::error::HwResult;

/// Maximum number of CPUs supported (Cortex-A9 MPCore on OMAP44xx).
pub const MAX_CPUS: usize = 2;

/// A routine run on every CPU.
pub type PerCpuFn<'f> = &'f (dyn Fn() -> HwResult<()> + Sync);

pub trait SmpOps: Sync {
    /// Index of the executing CPU, below [`MAX_CPUS`].
    fn current_cpu(&self) -> usize;

    fn preempt_disable(&self);
    fn preempt_enable(&self);

    /// Run `f` on every other online CPU and wait for all of them.
    ///
    /// Returns the last error any of them reported.
    fn call_on_others(&self, f: PerCpuFn<'_>) -> HwResult<()>;
}

/// Run `f` on every online CPU, the calling one last.
///
/// The last error wins; the local result takes precedence over the
/// remote ones.
pub fn on_each_cpu(smp: &dyn SmpOps, f: PerCpuFn<'_>) -> HwResult<()> {
    smp.preempt_disable();
    let remote = smp.call_on_others(f);
    let local = f();
    smp.preempt_enable();
    local.and(remote)
}
