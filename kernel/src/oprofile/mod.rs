//! Hardware-counter profiling
//!
//! The profiling front end configures counters through a [`CounterTable`],
//! drives a CPU model through [`OpArmModel`], and receives one
//! [`SampleSink::add_sample`] call per counter overflow.
//!
//! Counter slots are addressed by `cpu * CNTMAX + counter`; see
//! [`cpu_counter`].

pub mod stats;
pub mod v7;

use spin::RwLock;

use crate::arch_impl::armv7::pmu::CNTMAX;
use crate::arch_impl::armv7::smp::MAX_CPUS;
use crate::arch_impl::armv7::Armv7ExceptionFrame;
use crate::error::{HwError, HwResult};

pub use v7::{Armv7Pmu, PmuServices};

/// Configuration of one counter slot, as set by the profiling front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterConfig {
    pub enabled: bool,
    /// Event number; only the low byte reaches the hardware
    pub event: u32,
    /// Events between two samples
    pub count: u32,
    pub kernel: bool,
    pub user: bool,
    pub unit_mask: u32,
}

impl CounterConfig {
    pub const DISABLED: Self = Self {
        enabled: false,
        event: 0,
        count: 0,
        kernel: true,
        user: true,
        unit_mask: 0,
    };

    /// An enabled slot sampling every `count` occurrences of `event`.
    pub const fn sampling(event: u32, count: u32) -> Self {
        Self {
            enabled: true,
            event,
            count,
            ..Self::DISABLED
        }
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Total counter slots across all CPUs.
pub const COUNTER_SLOTS: usize = MAX_CPUS * CNTMAX;

/// Slot index of counter `cnt` on `cpu`.
#[inline]
pub const fn cpu_counter(cpu: usize, cnt: usize) -> usize {
    cpu * CNTMAX + cnt
}

/// Counter configuration of every CPU.
pub struct CounterTable {
    slots: RwLock<[CounterConfig; COUNTER_SLOTS]>,
}

impl CounterTable {
    pub const fn new() -> Self {
        Self {
            slots: RwLock::new([CounterConfig::DISABLED; COUNTER_SLOTS]),
        }
    }

    pub fn get(&self, index: usize) -> Option<CounterConfig> {
        self.slots.read().get(index).copied()
    }

    pub fn set(&self, index: usize, config: CounterConfig) -> HwResult<()> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(index).ok_or(HwError::InvalidArgument)?;
        *slot = config;
        Ok(())
    }

    /// Apply `config` to counter `cnt` on every CPU.
    pub fn set_all_cpus(&self, cnt: usize, config: CounterConfig) -> HwResult<()> {
        if cnt >= CNTMAX {
            return Err(HwError::InvalidArgument);
        }
        for cpu in 0..MAX_CPUS {
            self.set(cpu_counter(cpu, cnt), config)?;
        }
        Ok(())
    }

    pub fn clear(&self) {
        *self.slots.write() = [CounterConfig::DISABLED; COUNTER_SLOTS];
    }
}

impl Default for CounterTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives samples from the overflow handler, in interrupt context.
pub trait SampleSink: Sync {
    fn add_sample(&self, frame: &Armv7ExceptionFrame, counter: usize);
}

/// CPU model table consumed by the profiling front end.
pub trait OpArmModel: Sync {
    fn name(&self) -> &'static str;

    fn num_counters(&self) -> usize;

    /// Probe the PMU.
    fn init(&self) -> HwResult<()>;

    /// Program the configured counters on every CPU.
    fn setup_ctrs(&self) -> HwResult<()>;

    /// Start sampling on every CPU.
    fn start(&self) -> HwResult<()>;

    /// Stop sampling on every CPU.
    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_addressing() {
        assert_eq!(cpu_counter(0, 0), 0);
        assert_eq!(cpu_counter(1, 3), 10);
        assert_eq!(COUNTER_SLOTS, 14);
    }

    #[test]
    fn table_set_and_get() {
        let table = CounterTable::new();
        assert_eq!(table.get(3), Some(CounterConfig::DISABLED));
        table.set(3, CounterConfig::sampling(0x44, 1000)).unwrap();
        assert_eq!(table.get(3).map(|c| c.event), Some(0x44));
        assert_eq!(table.set(COUNTER_SLOTS, CounterConfig::DISABLED), Err(HwError::InvalidArgument));
        assert_eq!(table.get(COUNTER_SLOTS), None);
    }

    #[test]
    fn set_all_cpus_fills_each_cpu() {
        let table = CounterTable::new();
        table.set_all_cpus(2, CounterConfig::sampling(0x10, 50)).unwrap();
        for cpu in 0..MAX_CPUS {
            assert!(table.get(cpu_counter(cpu, 2)).is_some_and(|c| c.enabled));
        }
        table.clear();
        assert!(!table.get(cpu_counter(1, 2)).is_some_and(|c| c.enabled));
        assert_eq!(table.set_all_cpus(CNTMAX, CounterConfig::DISABLED), Err(HwError::InvalidArgument));
    }
}
