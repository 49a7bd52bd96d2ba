//! ARMv7 PMU sampling driver.
//!
//! Every enabled counter slot is loaded with the two's complement of its
//! sampling period, counts up, and raises the overflow interrupt on wrap.
//! The handler reloads the same bias, so each slot samples at a fixed
//! period until the session stops.
//!
//! Setup, start and stop run on every CPU through
//! [`on_each_cpu`](crate::arch_impl::armv7::smp::on_each_cpu). The overflow
//! handler runs on the CPU that owns the interrupt. It never reads the
//! configuration table: setup leaves each slot's reload bias in a per-CPU
//! copy, so a writer holding the table cannot stall an overflow.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::arch_impl::armv7::cti::CtiRouting;
use crate::arch_impl::armv7::irq::{IrqChip, IrqReturn};
use crate::arch_impl::armv7::pmu::{
    self, PmuRegisters, Pmnc, CCNT, CNT0, CNT5, CNTMAX, FLAG_C, PMNC,
};
use crate::arch_impl::armv7::smp::{on_each_cpu, SmpOps, MAX_CPUS};
use crate::arch_impl::armv7::Armv7ExceptionFrame;
use crate::arch_impl::InterruptFrame;
use crate::error::{HwError, HwResult};
use crate::mmio::RegisterIo;
use crate::time::TimeSource;

use super::stats::PmuStats;
use super::{cpu_counter, CounterTable, OpArmModel, SampleSink};

pub const MODEL_NAME: &str = "arm/armv7";

/// Name the overflow interrupt is requested under.
pub const PMU_IRQ_NAME: &str = "CP15 PMNC";

/// Hardware services the driver runs on.
#[derive(Clone, Copy)]
pub struct PmuServices<'a> {
    pub regs: &'a dyn PmuRegisters,
    pub smp: &'a dyn SmpOps,
    pub irq: &'a dyn IrqChip,
    pub time: &'a dyn TimeSource,
}

pub struct Armv7Pmu<'a, R> {
    svc: PmuServices<'a>,
    config: &'a CounterTable,
    sink: &'a dyn SampleSink,
    /// Overflow interrupt of each CPU
    irqs: &'static [u32],
    /// CTI path, OMAP44xx only
    routing: Option<CtiRouting<R>>,
    cnt_en: [[AtomicBool; CNTMAX]; MAX_CPUS],
    /// Reload value of each slot, taken from the table by setup
    bias: [[AtomicU32; CNTMAX]; MAX_CPUS],
    stats: PmuStats,
}

impl<'a, R: RegisterIo + Sync> Armv7Pmu<'a, R> {
    pub fn new(
        svc: PmuServices<'a>,
        config: &'a CounterTable,
        sink: &'a dyn SampleSink,
        irqs: &'static [u32],
        routing: Option<CtiRouting<R>>,
    ) -> Self {
        Self {
            svc,
            config,
            sink,
            irqs,
            routing,
            cnt_en: [const { [const { AtomicBool::new(false) }; CNTMAX] }; MAX_CPUS],
            bias: [const { [const { AtomicU32::new(0) }; CNTMAX] }; MAX_CPUS],
            stats: PmuStats::new(),
        }
    }

    pub fn stats(&self) -> &PmuStats {
        &self.stats
    }

    /// Give back the CTI windows, e.g. to unmap them.
    pub fn into_routing(self) -> Option<CtiRouting<R>> {
        self.routing
    }

    /// Whether slot `cnt` of `cpu` was armed by the last setup.
    pub fn counter_enabled(&self, cpu: usize, cnt: usize) -> bool {
        self.cnt_en
            .get(cpu)
            .and_then(|slots| slots.get(cnt))
            .is_some_and(|en| en.load(Ordering::Relaxed))
    }

    fn cpu_slots(&self, cpu: usize) -> HwResult<(&[AtomicBool; CNTMAX], &[AtomicU32; CNTMAX])> {
        match (self.cnt_en.get(cpu), self.bias.get(cpu)) {
            (Some(armed), Some(bias)) => Ok((armed, bias)),
            _ => {
                log::error!("pmu: CPU{} has no counter slots", cpu);
                Err(HwError::InvalidArgument)
            }
        }
    }

    /// Log the number of event counters; the PMU is architectural on ARMv7.
    pub fn detect(&self) -> HwResult<()> {
        log::info!(
            "pmu: {} event counters plus cycle counter",
            pmu::event_counter_count(self.svc.regs)
        );
        Ok(())
    }

    /// Reload slot `cnt` of `cpu` with its sampling bias.
    ///
    /// Must run on `cpu`. The slot is re-enabled only if setup armed it.
    pub fn reset_counter(&self, cpu: usize, cnt: usize) -> HwResult<()> {
        let (armed, bias) = self.cpu_slots(cpu)?;
        let (Some(armed), Some(bias)) = (armed.get(cnt), bias.get(cnt)) else {
            log::error!("pmu: reset of invalid counter {} on CPU{}", cnt, cpu);
            return Err(HwError::InvalidArgument);
        };
        let bias = bias.load(Ordering::Relaxed);
        let regs = self.svc.regs;

        pmu::disable_counter(regs, cnt)?;
        if cnt == CCNT {
            regs.write_ccnt(bias);
        } else {
            pmu::select_counter(regs, cnt)?;
            regs.write_pmcnt(bias);
        }
        if armed.load(Ordering::Relaxed) {
            pmu::enable_counter(regs, cnt)?;
        }
        Ok(())
    }

    /// Program the executing CPU's counters from the configuration table.
    ///
    /// Refused with `Busy` while the PMU is running.
    pub fn setup(&self) -> HwResult<()> {
        let cpu = self.svc.smp.current_cpu();
        let regs = self.svc.regs;
        let (armed, bias) = self.cpu_slots(cpu)?;

        if pmu::is_running(regs) {
            log::error!("pmu: CPU{} counters already running", cpu);
            return Err(HwError::Busy);
        }

        let mut pmnc = Pmnc::new(0);
        pmnc.modify(PMNC::P::SET + PMNC::C::SET);
        pmu::pmnc_write(regs, pmnc.get());

        for cnt in CCNT..CNTMAX {
            pmu::disable_counter(regs, cnt)?;
            armed[cnt].store(false, Ordering::Relaxed);

            let config = self.config.get(cpu_counter(cpu, cnt)).ok_or(HwError::InvalidArgument)?;
            bias[cnt].store(pmu::reload_bias(config.count), Ordering::Relaxed);
            if !config.enabled {
                continue;
            }
            if cnt != CCNT {
                pmu::set_event(regs, cnt, config.event)?;
            }
            pmu::enable_interrupt(regs, cnt)?;
            self.reset_counter(cpu, cnt)?;
            pmu::enable_counter(regs, cnt)?;
            armed[cnt].store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Overflow interrupt of the executing CPU.
    pub fn handle_interrupt(&self, frame: &Armv7ExceptionFrame) -> IrqReturn {
        let cpu = self.svc.smp.current_cpu();
        let regs = self.svc.regs;
        if cpu >= MAX_CPUS {
            log::warn!("pmu: overflow interrupt on CPU{} ignored", cpu);
            return IrqReturn::None;
        }

        // Stop counting while the flags are serviced
        pmu::stop(regs);
        if let Some(routing) = &self.routing {
            routing.ack(cpu);
        }
        let flags = pmu::take_overflow_flags(regs);
        self.stats.interrupts.increment_cpu(cpu);

        if flags & FLAG_C != 0 {
            self.rearm_and_sample(cpu, CCNT, frame);
        }
        for cnt in CNT0..=CNT5 {
            if flags & (1 << (cnt - CNT0)) != 0 {
                self.rearm_and_sample(cpu, cnt, frame);
            }
        }

        pmu::start(regs);
        IrqReturn::Handled
    }

    fn rearm_and_sample(&self, cpu: usize, cnt: usize, frame: &Armv7ExceptionFrame) {
        if let Err(e) = self.reset_counter(cpu, cnt) {
            log::warn!("pmu: CPU{} counter {} not rearmed: {}", cpu, cnt, e);
        }
        self.sink.add_sample(frame, cpu_counter(cpu, cnt));
        self.stats.samples.increment_cpu(cpu);
        if frame.is_from_userspace() {
            self.stats.user_samples.increment_cpu(cpu);
        }
    }

    /// Claim `irqs` for the executing CPU and route the overflow to them.
    ///
    /// Lines claimed before a failure are released again.
    pub fn request_interrupts(&self, irqs: &[u32]) -> HwResult<()> {
        let cpu = self.svc.smp.current_cpu();
        let chip = self.svc.irq;

        for (i, &irq) in irqs.iter().enumerate() {
            if let Err(e) = chip.request_irq(irq, PMU_IRQ_NAME) {
                log::error!("pmu: unable to request IRQ{} for ARMv7 perf counters", irq);
                self.release_interrupts(&irqs[..i]);
                return Err(e);
            }
            if let Err(e) = chip.set_affinity(irq, cpu) {
                log::warn!("pmu: IRQ{} not pinned to CPU{}: {}", irq, cpu, e);
            }
        }

        if let Some(routing) = &self.routing {
            if let Err(e) = routing.enable(cpu, self.svc.time) {
                self.release_interrupts(irqs);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn release_interrupts(&self, irqs: &[u32]) {
        for &irq in irqs {
            self.svc.irq.free_irq(irq);
        }
    }

    fn cpu_irq(&self, cpu: usize) -> HwResult<&'static [u32]> {
        let irqs: &'static [u32] = self.irqs;
        irqs.get(cpu..=cpu).ok_or_else(|| {
            log::error!("pmu: no overflow interrupt for CPU{}", cpu);
            HwError::InvalidArgument
        })
    }

    /// Start sampling on the executing CPU.
    pub fn start_cpu(&self) -> HwResult<()> {
        let cpu = self.svc.smp.current_cpu();
        #[cfg(feature = "pmu_debug")]
        pmu::dump_regs(self.svc.regs);

        self.request_interrupts(self.cpu_irq(cpu)?)?;
        pmu::start(self.svc.regs);
        Ok(())
    }

    /// Stop sampling on the executing CPU. The overflow interrupts setup
    /// enabled are masked again; the next setup re-enables them.
    pub fn stop_cpu(&self) {
        let cpu = self.svc.smp.current_cpu();
        let regs = self.svc.regs;
        #[cfg(feature = "pmu_debug")]
        pmu::dump_regs(regs);

        pmu::stop(regs);
        for cnt in (CCNT..CNTMAX).filter(|&cnt| self.counter_enabled(cpu, cnt)) {
            if let Err(e) = pmu::disable_interrupt(regs, cnt) {
                log::warn!("pmu: CPU{} counter {} interrupt left on: {}", cpu, cnt, e);
            }
        }
        if let Ok(irq) = self.cpu_irq(cpu) {
            self.release_interrupts(irq);
        }
    }
}

impl<R: RegisterIo + Sync> OpArmModel for Armv7Pmu<'_, R> {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn num_counters(&self) -> usize {
        CNTMAX
    }

    fn init(&self) -> HwResult<()> {
        self.detect()
    }

    fn setup_ctrs(&self) -> HwResult<()> {
        on_each_cpu(self.svc.smp, &|| self.setup())
    }

    fn start(&self) -> HwResult<()> {
        on_each_cpu(self.svc.smp, &|| self.start_cpu())
    }

    fn stop(&self) {
        // Stopping cannot fail on any CPU
        let _ = on_each_cpu(self.svc.smp, &|| {
            self.stop_cpu();
            Ok(())
        });
    }
}
