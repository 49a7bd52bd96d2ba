//! Cross trigger interface (CTI) routing for PMU overflow on OMAP44xx.
//!
//! The Cortex-A9 PMU overflow line is not wired to the GIC directly. It
//! enters the core's CTI on trigger input 1 and leaves on trigger output 6,
//! which the GIC sees as `OMAP44XX_IRQ_CTI0`/`CTI1`. Both triggers are put on
//! channel `2 + cpu`. The CTIs sit in the EMU clock domain, which must be
//! running before they can be programmed.

use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::error::{HwError, HwResult};
use crate::mmio::{IoMapper, MemResource, RegisterIo};
use crate::platform_config::{
    CM_EMU_BASE, CM_EMU_CLKSTCTRL, CM_L3INSTR_BASE, CM_L3INSTR_L3_3_CLKCTRL, CM_L3INSTR_L3_INSTR_CLKCTRL,
    CM_WINDOW_SIZE, CTI_BASE, CTI_WINDOW_SIZE,
};
use crate::time::{poll_until, TimeSource};

use super::smp::MAX_CPUS;

pub mod offset {
    pub const CTICONTROL: usize = 0x000;
    pub const CTIINTACK: usize = 0x010;
    pub const LAR: usize = 0xFB0;

    /// Trigger-input `n` to channel enable.
    pub const fn ctiinen(n: usize) -> usize {
        0x020 + 4 * n
    }

    /// Channel to trigger-output `n` enable.
    pub const fn ctiouten(n: usize) -> usize {
        0x0A0 + 4 * n
    }
}

/// CoreSight lock access key.
pub const LAR_KEY: u32 = 0xC5AC_CE55;

/// Trigger input carrying the PMU overflow.
pub const PMU_TRIGGER_IN: usize = 1;

/// Trigger output wired to the GIC.
pub const PMU_TRIGGER_OUT: usize = 6;

/// EMU domain reaches the ready state within this time.
pub const EMU_READY_TIMEOUT_MS: u32 = 1000;

register_bitfields![u32,
    /// Module clock control
    pub CM_CLKCTRL [
        MODULEMODE OFFSET(0) NUMBITS(2) [
            Disabled = 0,
            HwAuto = 1
        ]
    ],

    /// Clock domain state control
    pub CM_CLKSTCTRL [
        CLKTRCTRL OFFSET(0) NUMBITS(2) [
            NoSleep = 0,
            SwSleep = 1,
            SwWakeup = 2,
            HwAuto = 3
        ],
        CLKACTIVITY_EMU_SYS_CLK OFFSET(8) NUMBITS(1) [],
        CLKACTIVITY_CORE_DPLL_EMU_CLK OFFSET(9) NUMBITS(1) []
    ]
];

pub type CmClkctrl = LocalRegisterCopy<u32, CM_CLKCTRL::Register>;
pub type CmClkstctrl = LocalRegisterCopy<u32, CM_CLKSTCTRL::Register>;

/// Channel carrying `cpu`'s PMU overflow.
#[inline]
pub const fn channel_mask(cpu: usize) -> u32 {
    1 << (2 + cpu)
}

/// Route `cpu`'s PMU overflow through its CTI and enable the CTI.
pub fn route_pmu_overflow<R: RegisterIo>(cti: &R, cpu: usize) {
    cti.write32(offset::LAR, LAR_KEY);
    cti.write32(offset::ctiinen(PMU_TRIGGER_IN), channel_mask(cpu));
    cti.write32(offset::ctiouten(PMU_TRIGGER_OUT), channel_mask(cpu));
    cti.write32(offset::CTICONTROL, 1);
}

/// Acknowledge the PMU trigger output so the GIC line drops.
#[inline]
pub fn ack_pmu_trigger<R: RegisterIo>(cti: &R) {
    cti.write32(offset::CTIINTACK, 1 << PMU_TRIGGER_OUT);
}

/// Switch on the L3 instrumentation modules and force-wake the EMU domain,
/// then wait until both EMU clocks run.
pub fn enable_debug_clock_domains<R, T>(l3instr: &R, emu: &R, time: &T) -> HwResult<()>
where
    R: RegisterIo,
    T: TimeSource + ?Sized,
{
    let mut module = CmClkctrl::new(0);
    module.modify(CM_CLKCTRL::MODULEMODE::HwAuto);
    l3instr.write32(CM_L3INSTR_L3_3_CLKCTRL, module.get());
    l3instr.write32(CM_L3INSTR_L3_INSTR_CLKCTRL, module.get());

    let mut domain = CmClkstctrl::new(0);
    domain.modify(CM_CLKSTCTRL::CLKTRCTRL::SwWakeup);
    emu.write32(CM_EMU_CLKSTCTRL, domain.get());

    poll_until(time, EMU_READY_TIMEOUT_MS, || {
        CmClkstctrl::new(emu.read32(CM_EMU_CLKSTCTRL)).matches_all(
            CM_CLKSTCTRL::CLKACTIVITY_EMU_SYS_CLK::SET + CM_CLKSTCTRL::CLKACTIVITY_CORE_DPLL_EMU_CLK::SET,
        )
    })
    .map_err(|e| {
        log::error!("cti: EMU clock domain did not wake up");
        e
    })
}

/// Mapped register windows of the OMAP44xx debug routing path.
pub struct CtiRouting<R> {
    pub l3instr: R,
    pub emu: R,
    pub cti: [R; MAX_CPUS],
}

impl<R: RegisterIo> CtiRouting<R> {
    /// Map the clock-manager and CTI windows. Returns `None` if any mapping
    /// fails; windows mapped before the failure are unmapped again.
    pub fn map<M: IoMapper<Region = R>>(mapper: &M) -> Option<Self> {
        let resources = [
            MemResource::new(CM_L3INSTR_BASE, CM_WINDOW_SIZE),
            MemResource::new(CM_EMU_BASE, CM_WINDOW_SIZE),
            MemResource::new(CTI_BASE[0], CTI_WINDOW_SIZE),
            MemResource::new(CTI_BASE[1], CTI_WINDOW_SIZE),
        ];
        let mut mapped: [Option<R>; 4] = [None, None, None, None];
        for (i, res) in resources.iter().enumerate() {
            match mapper.ioremap(res) {
                Some(region) => mapped[i] = Some(region),
                None => {
                    log::error!("cti: unable to map {:#x}", res.start);
                    for region in mapped.into_iter().flatten() {
                        mapper.iounmap(region);
                    }
                    return None;
                }
            }
        }
        match mapped {
            [Some(l3instr), Some(emu), Some(cti0), Some(cti1)] => Some(Self {
                l3instr,
                emu,
                cti: [cti0, cti1],
            }),
            _ => None,
        }
    }

    pub fn unmap<M: IoMapper<Region = R>>(self, mapper: &M) {
        let [cti0, cti1] = self.cti;
        for region in [self.l3instr, self.emu, cti0, cti1] {
            mapper.iounmap(region);
        }
    }

    /// Clock the debug domains and route `cpu`'s overflow to the GIC.
    pub fn enable<T: TimeSource + ?Sized>(&self, cpu: usize, time: &T) -> HwResult<()> {
        let cti = self.cti.get(cpu).ok_or_else(|| {
            log::error!("cti: no CTI for CPU{}", cpu);
            HwError::InvalidArgument
        })?;
        enable_debug_clock_domains(&self.l3instr, &self.emu, time)?;
        route_pmu_overflow(cti, cpu);
        Ok(())
    }

    #[inline]
    pub fn ack(&self, cpu: usize) {
        match self.cti.get(cpu) {
            Some(cti) => ack_pmu_trigger(cti),
            None => log::warn!("cti: ack for CPU{} without a CTI", cpu),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HwError;
    use crate::mock::{FakeRegs, FakeTime};

    #[test]
    fn routing_writes_for_cpu1() {
        let cti = FakeRegs::new();
        route_pmu_overflow(&cti, 1);
        assert_eq!(
            cti.write_log(),
            [
                (0xFB0, 0xC5AC_CE55),
                (0x024, 1 << 3),
                (0x0B8, 1 << 3),
                (0x000, 1),
            ]
        );
    }

    #[test]
    fn ack_clears_trigger_six() {
        let cti = FakeRegs::new();
        ack_pmu_trigger(&cti);
        assert_eq!(cti.writes_to(0x010), [1 << 6]);
    }

    #[test]
    fn unknown_cpu_is_not_routed() {
        let routing = CtiRouting {
            l3instr: FakeRegs::new(),
            emu: FakeRegs::new(),
            cti: [FakeRegs::new(), FakeRegs::new()],
        };
        let time = FakeTime::new(100);

        assert_eq!(routing.enable(MAX_CPUS, &time), Err(HwError::InvalidArgument));
        assert!(routing.emu.write_log().is_empty(), "debug clocks left alone");
        routing.ack(MAX_CPUS);
        for cti in &routing.cti {
            assert!(cti.write_log().is_empty());
        }
    }

    #[test]
    fn clock_domains_enabled_and_polled() {
        let l3 = FakeRegs::new();
        let emu = FakeRegs::new();
        emu.set_after_reads(CM_EMU_CLKSTCTRL, 0x300, 3);
        let time = FakeTime::new(100);

        assert_eq!(enable_debug_clock_domains(&l3, &emu, &time), Ok(()));
        assert_eq!(l3.get(0x20), 1);
        assert_eq!(l3.get(0x28), 1);
        assert_eq!(emu.writes_to(0x00), [2]);
    }

    #[test]
    fn clock_domain_poll_is_bounded() {
        let l3 = FakeRegs::new();
        let emu = FakeRegs::new();
        // Only one of the two clocks ever comes up
        emu.set_after_reads(CM_EMU_CLKSTCTRL, 0x100, 0);
        let time = FakeTime::new(10_000);
        assert_eq!(enable_debug_clock_domains(&l3, &emu, &time), Err(HwError::Timeout));
    }
}
