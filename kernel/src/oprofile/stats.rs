//! Per-CPU sampling statistics.
//!
//! Counters use lock-free atomics with relaxed ordering, so they can be
//! bumped from the overflow interrupt without any locking. Values are
//! approximate while sampling runs.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch_impl::armv7::smp::MAX_CPUS;

/// A cache-line aligned counter slot for a single CPU.
#[repr(C, align(64))]
pub struct CpuCounterSlot {
    pub value: AtomicU64,
    _padding: [u8; 56],
}

impl CpuCounterSlot {
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
            _padding: [0; 56],
        }
    }
}

impl Default for CpuCounterSlot {
    fn default() -> Self {
        Self::new()
    }
}

const _: () = assert!(
    core::mem::size_of::<CpuCounterSlot>() == 64,
    "CpuCounterSlot must be exactly 64 bytes (one cache line)"
);

/// A per-CPU event counter.
pub struct SampleCounter {
    pub name: &'static str,
    pub per_cpu: [CpuCounterSlot; MAX_CPUS],
}

impl SampleCounter {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            per_cpu: [const { CpuCounterSlot::new() }; MAX_CPUS],
        }
    }

    /// Increment the counter of `cpu`. Out-of-range CPUs are ignored.
    #[inline(always)]
    pub fn increment_cpu(&self, cpu: usize) {
        if let Some(slot) = self.per_cpu.get(cpu) {
            slot.value.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// The value for `cpu`, or 0 if `cpu` is out of range.
    #[inline]
    pub fn get_cpu(&self, cpu: usize) -> u64 {
        self.per_cpu.get(cpu).map_or(0, |slot| slot.value.load(Ordering::Relaxed))
    }

    /// Sum over all CPUs.
    pub fn aggregate(&self) -> u64 {
        self.per_cpu
            .iter()
            .fold(0u64, |total, slot| total.wrapping_add(slot.value.load(Ordering::Relaxed)))
    }

    pub fn reset(&self) {
        for slot in &self.per_cpu {
            slot.value.store(0, Ordering::Relaxed);
        }
    }
}

/// What the overflow handler has done so far.
pub struct PmuStats {
    /// Overflow interrupts taken
    pub interrupts: SampleCounter,
    /// Samples handed to the profiler
    pub samples: SampleCounter,
    /// Samples whose frame came from user mode
    pub user_samples: SampleCounter,
}

impl PmuStats {
    pub const fn new() -> Self {
        Self {
            interrupts: SampleCounter::new("pmu_interrupts"),
            samples: SampleCounter::new("pmu_samples"),
            user_samples: SampleCounter::new("pmu_user_samples"),
        }
    }

    pub fn reset(&self) {
        self.interrupts.reset();
        self.samples.reset();
        self.user_samples.reset();
    }
}

impl Default for PmuStats {
    fn default() -> Self {
        Self::new()
    }
}
