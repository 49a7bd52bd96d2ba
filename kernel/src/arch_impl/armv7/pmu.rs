//! ARMv7 performance monitor unit.
//!
//! The PMU lives in cp15 c9 and is banked per CPU: every access reaches the
//! PMU of the CPU executing it. Slot 0 is the cycle counter (CCNT), slots
//! 1..=6 are the event counters (PMCNT0..PMCNT5).
//!
//! | Register | cp15 encoding |
//! |----------|---------------|
//! | PMNC | c9, c12, 0 |
//! | CNTENS / CNTENC | c9, c12, 1 / 2 |
//! | FLAG | c9, c12, 3 |
//! | SELECT | c9, c12, 5 |
//! | CCNT / EVTSEL / PMCNT | c9, c13, 0 / 1 / 2 |
//! | INTENS / INTENC | c9, c14, 1 / 2 |

use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::error::{HwError, HwResult};

register_bitfields![u32,
    /// Performance monitor control
    pub PMNC [
        /// Enable all counters
        E OFFSET(0) NUMBITS(1) [],
        /// Reset all event counters
        P OFFSET(1) NUMBITS(1) [],
        /// Reset the cycle counter
        C OFFSET(2) NUMBITS(1) [],
        /// Cycle counter counts every 64th cycle
        D OFFSET(3) NUMBITS(1) [],
        /// Export events to the ETM
        X OFFSET(4) NUMBITS(1) [],
        /// Disable CCNT in prohibited regions
        DP OFFSET(5) NUMBITS(1) [],
        /// Number of event counters implemented
        N OFFSET(11) NUMBITS(5) []
    ]
];

pub type Pmnc = LocalRegisterCopy<u32, PMNC::Register>;

/// Writable PMNC bits.
pub const PMNC_MASK: u32 = 0x3F;

/// Implemented bits of CNTENS, CNTENC, INTENS, INTENC and FLAG.
pub const COUNTER_MASK: u32 = 0x8000_003F;

/// Cycle counter bit in CNTENS, CNTENC, INTENS, INTENC and FLAG.
pub const FLAG_C: u32 = 1 << 31;

pub const SELECT_MASK: u32 = 0x1F;
pub const EVTSEL_MASK: u32 = 0xFF;

// Counter slots
pub const CCNT: usize = 0;
pub const CNT0: usize = 1;
pub const CNT1: usize = 2;
pub const CNT2: usize = 3;
pub const CNT3: usize = 4;
pub const CNT4: usize = 5;
pub const CNT5: usize = 6;
pub const CNTMAX: usize = 7;

/// Raw access to the executing CPU's PMU.
pub trait PmuRegisters: Sync {
    fn read_pmnc(&self) -> u32;
    fn write_pmnc(&self, value: u32);
    fn read_cntens(&self) -> u32;
    fn write_cntens(&self, value: u32);
    fn write_cntenc(&self, value: u32);
    fn read_intens(&self) -> u32;
    fn write_intens(&self, value: u32);
    fn write_intenc(&self, value: u32);
    fn read_flag(&self) -> u32;
    fn write_flag(&self, value: u32);
    fn read_select(&self) -> u32;
    fn write_select(&self, value: u32);
    /// Event of the counter SELECT points at.
    fn read_evtsel(&self) -> u32;
    fn write_evtsel(&self, value: u32);
    fn read_ccnt(&self) -> u32;
    fn write_ccnt(&self, value: u32);
    fn read_pmcnt(&self) -> u32;
    fn write_pmcnt(&self, value: u32);
}

/// Bit of slot `cnt` in the enable, interrupt and flag registers.
pub const fn counter_bit(cnt: usize) -> Option<u32> {
    match cnt {
        CCNT => Some(FLAG_C),
        CNT0..=CNT5 => Some(1 << (cnt - CNT0)),
        _ => None,
    }
}

fn slot_bit(cnt: usize, what: &str) -> HwResult<u32> {
    counter_bit(cnt).map(|bit| bit & COUNTER_MASK).ok_or_else(|| {
        log::error!("pmu: {}: invalid counter {}", what, cnt);
        HwError::InvalidArgument
    })
}

/// Two's-complement reload value: the counter overflows after `count`
/// events.
#[inline]
pub const fn reload_bias(count: u32) -> u32 {
    count.wrapping_neg()
}

#[inline]
pub fn pmnc_write<P: PmuRegisters + ?Sized>(pmu: &P, value: u32) {
    pmu.write_pmnc(value & PMNC_MASK);
}

/// Whether PMNC.E is set.
pub fn is_running<P: PmuRegisters + ?Sized>(pmu: &P) -> bool {
    Pmnc::new(pmu.read_pmnc()).is_set(PMNC::E)
}

/// Set PMNC.E.
pub fn start<P: PmuRegisters + ?Sized>(pmu: &P) {
    let mut pmnc = Pmnc::new(pmu.read_pmnc());
    pmnc.modify(PMNC::E::SET);
    pmnc_write(pmu, pmnc.get());
}

/// Clear PMNC.E.
pub fn stop<P: PmuRegisters + ?Sized>(pmu: &P) {
    let mut pmnc = Pmnc::new(pmu.read_pmnc());
    pmnc.modify(PMNC::E::CLEAR);
    pmnc_write(pmu, pmnc.get());
}

/// Event counters this PMU implements.
pub fn event_counter_count<P: PmuRegisters + ?Sized>(pmu: &P) -> u32 {
    Pmnc::new(pmu.read_pmnc()).read(PMNC::N)
}

pub fn enable_counter<P: PmuRegisters + ?Sized>(pmu: &P, cnt: usize) -> HwResult<()> {
    pmu.write_cntens(slot_bit(cnt, "enable")?);
    Ok(())
}

pub fn disable_counter<P: PmuRegisters + ?Sized>(pmu: &P, cnt: usize) -> HwResult<()> {
    pmu.write_cntenc(slot_bit(cnt, "disable")?);
    Ok(())
}

pub fn enable_interrupt<P: PmuRegisters + ?Sized>(pmu: &P, cnt: usize) -> HwResult<()> {
    pmu.write_intens(slot_bit(cnt, "enable interrupt")?);
    Ok(())
}

pub fn disable_interrupt<P: PmuRegisters + ?Sized>(pmu: &P, cnt: usize) -> HwResult<()> {
    pmu.write_intenc(slot_bit(cnt, "disable interrupt")?);
    Ok(())
}

/// Read the overflow flags and clear the ones that were set.
pub fn take_overflow_flags<P: PmuRegisters + ?Sized>(pmu: &P) -> u32 {
    let flags = pmu.read_flag() & COUNTER_MASK;
    pmu.write_flag(flags);
    flags
}

/// Point SELECT at event counter `cnt`. The cycle counter is not selectable.
pub fn select_counter<P: PmuRegisters + ?Sized>(pmu: &P, cnt: usize) -> HwResult<()> {
    if !(CNT0..=CNT5).contains(&cnt) {
        log::error!("pmu: select: invalid counter {}", cnt);
        return Err(HwError::InvalidArgument);
    }
    pmu.write_select((cnt - CNT0) as u32 & SELECT_MASK);
    Ok(())
}

/// Program the event that counter `cnt` counts.
pub fn set_event<P: PmuRegisters + ?Sized>(pmu: &P, cnt: usize, event: u32) -> HwResult<()> {
    select_counter(pmu, cnt)?;
    pmu.write_evtsel(event & EVTSEL_MASK);
    Ok(())
}

/// The event counter `cnt` is programmed with.
pub fn event_of<P: PmuRegisters + ?Sized>(pmu: &P, cnt: usize) -> HwResult<u32> {
    select_counter(pmu, cnt)?;
    Ok(pmu.read_evtsel() & EVTSEL_MASK)
}

/// Log every PMU register of the executing CPU. SELECT is restored
/// afterwards.
pub fn dump_regs<P: PmuRegisters + ?Sized>(pmu: &P) {
    let select = pmu.read_select();
    log::debug!("pmu: PMNC   = {:#010x}", pmu.read_pmnc());
    log::debug!("pmu: CNTENS = {:#010x}", pmu.read_cntens());
    log::debug!("pmu: INTENS = {:#010x}", pmu.read_intens());
    log::debug!("pmu: FLAGS  = {:#010x}", pmu.read_flag());
    log::debug!("pmu: SELECT = {:#010x}", select);
    log::debug!("pmu: CCNT   = {:#010x}", pmu.read_ccnt());
    for cnt in CNT0..=CNT5 {
        if let Ok(event) = event_of(pmu, cnt) {
            log::debug!("pmu: CNT[{}] = {:#010x} EVTSEL = {:#04x}", cnt - CNT0, pmu.read_pmcnt(), event);
        }
    }
    pmu.write_select(select);
}

// =============================================================================
// cp15 implementation
// =============================================================================

#[cfg(target_arch = "arm")]
pub use cp15::Cp15Pmu;

#[cfg(target_arch = "arm")]
mod cp15 {
    use super::PmuRegisters;

    macro_rules! cp15_c9_read {
        ($name:ident, $crm:literal, $op2:literal) => {
            #[inline]
            fn $name(&self) -> u32 {
                let value: u32;
                unsafe {
                    core::arch::asm!(
                        concat!("mrc p15, 0, {}, c9, ", $crm, ", ", $op2),
                        out(reg) value,
                        options(nomem, nostack)
                    );
                }
                value
            }
        };
    }

    macro_rules! cp15_c9_write {
        ($name:ident, $crm:literal, $op2:literal) => {
            #[inline]
            fn $name(&self, value: u32) {
                unsafe {
                    core::arch::asm!(
                        concat!("mcr p15, 0, {}, c9, ", $crm, ", ", $op2),
                        in(reg) value,
                        options(nomem, nostack)
                    );
                }
            }
        };
    }

    /// The executing CPU's PMU, reached through cp15.
    pub struct Cp15Pmu;

    impl PmuRegisters for Cp15Pmu {
        cp15_c9_read!(read_pmnc, "c12", "0");
        cp15_c9_write!(write_pmnc, "c12", "0");
        cp15_c9_read!(read_cntens, "c12", "1");
        cp15_c9_write!(write_cntens, "c12", "1");
        cp15_c9_write!(write_cntenc, "c12", "2");
        cp15_c9_read!(read_flag, "c12", "3");
        cp15_c9_write!(write_flag, "c12", "3");
        cp15_c9_read!(read_select, "c12", "5");
        cp15_c9_write!(write_select, "c12", "5");
        cp15_c9_read!(read_ccnt, "c13", "0");
        cp15_c9_write!(write_ccnt, "c13", "0");
        cp15_c9_read!(read_evtsel, "c13", "1");
        cp15_c9_write!(write_evtsel, "c13", "1");
        cp15_c9_read!(read_pmcnt, "c13", "2");
        cp15_c9_write!(write_pmcnt, "c13", "2");
        cp15_c9_read!(read_intens, "c14", "1");
        cp15_c9_write!(write_intens, "c14", "1");
        cp15_c9_write!(write_intenc, "c14", "2");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FakeCluster;

    #[test]
    fn counter_bits() {
        assert_eq!(counter_bit(CCNT), Some(1 << 31));
        assert_eq!(counter_bit(CNT0), Some(1));
        assert_eq!(counter_bit(CNT5), Some(1 << 5));
        assert_eq!(counter_bit(CNTMAX), None);
    }

    #[test]
    fn reload_bias_is_twos_complement() {
        assert_eq!(reload_bias(1), 0xFFFF_FFFF);
        assert_eq!(reload_bias(100_000), 0xFFFE_7960);
        assert_eq!(reload_bias(100_000).wrapping_add(100_000), 0);
    }

    #[test]
    fn start_and_stop_toggle_only_e() {
        let cluster = FakeCluster::new(1);
        cluster.pmu(0).pmnc = (5 << 11) | (1 << 3);
        start(&cluster);
        assert!(is_running(&cluster));
        assert_eq!(cluster.pmu(0).pmnc & PMNC_MASK, 0b1001);
        stop(&cluster);
        assert!(!is_running(&cluster));
        assert_eq!(event_counter_count(&cluster), 5);
    }

    #[test]
    fn invalid_slots_are_rejected() {
        let cluster = FakeCluster::new(1);
        assert_eq!(enable_counter(&cluster, CNTMAX), Err(HwError::InvalidArgument));
        assert_eq!(select_counter(&cluster, CCNT), Err(HwError::InvalidArgument));
        assert_eq!(cluster.pmu(0).cntens, 0);
    }

    #[test]
    fn set_event_selects_then_writes_low_byte() {
        let cluster = FakeCluster::new(1);
        set_event(&cluster, CNT3, 0x1FF).unwrap();
        assert_eq!(cluster.pmu(0).select, 3);
        assert_eq!(cluster.pmu(0).evtsel[3], 0xFF);
    }

    #[test]
    fn events_read_back_per_counter() {
        let cluster = FakeCluster::new(1);
        set_event(&cluster, CNT0, 0x08).unwrap();
        set_event(&cluster, CNT5, 0x44).unwrap();
        assert_eq!(event_of(&cluster, CNT0), Ok(0x08));
        assert_eq!(event_of(&cluster, CNT5), Ok(0x44));
        assert_eq!(event_of(&cluster, CCNT), Err(HwError::InvalidArgument));
    }

    #[test]
    fn dump_leaves_select_alone() {
        let cluster = FakeCluster::new(1);
        set_event(&cluster, CNT2, 0x11).unwrap();
        cluster.pmu(0).pmcnt[2] = 42;
        dump_regs(&cluster);
        let regs = cluster.pmu(0);
        assert_eq!(regs.select, 2);
        assert_eq!(regs.evtsel[2], 0x11);
        assert_eq!(regs.pmcnt[2], 42);
    }

    #[test]
    fn overflow_flags_are_cleared_on_read() {
        let cluster = FakeCluster::new(1);
        cluster.pmu(0).flag = FLAG_C | 0b10;
        assert_eq!(take_overflow_flags(&cluster), FLAG_C | 0b10);
        assert_eq!(cluster.pmu(0).flag, 0);
    }
}
