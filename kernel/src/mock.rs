//! Host-side fakes of the hardware and kernel services.
//!
//! Every fake records what the drivers did to it so tests can assert on
//! register values, write order and resource balance.

use std::collections::BTreeMap;
use std::sync::Arc;

use core::sync::atomic::{AtomicIsize, AtomicU64, AtomicUsize, Ordering};

use spin::{Mutex, MutexGuard};

use crate::arch_impl::armv7::irq::IrqChip;
use crate::arch_impl::armv7::pmu::PmuRegisters;
use crate::arch_impl::armv7::smp::{PerCpuFn, SmpOps};
use crate::arch_impl::armv7::Armv7ExceptionFrame;
use crate::error::{HwError, HwResult};
use crate::mmio::{IoMapper, MemResource, RegisterIo};
use crate::oprofile::SampleSink;
use crate::platform::{
    Clk, ClockFramework, DeviceId, GpioController, PadMode, PinMux, PlatformDevice, Regulator,
    RegulatorFramework, RuntimePm, Services,
};
use crate::platform_config::{OMAP44XX_UHH_CONFIG_BASE, OMAP44XX_USBTLL_BASE, TLL_WINDOW_SIZE, UHH_WINDOW_SIZE};
use crate::time::TimeSource;

// =============================================================================
// Registers
// =============================================================================

/// Bits that read back only after a number of reads.
struct DelayedBits {
    bits: u32,
    reads_left: usize,
}

#[derive(Default)]
struct RegState {
    words: BTreeMap<usize, u32>,
    delayed: BTreeMap<usize, DelayedBits>,
    log: Vec<(usize, u32)>,
}

/// Memory-backed register window. Clones share the same registers.
#[derive(Clone, Default)]
pub struct FakeRegs {
    inner: Arc<Mutex<RegState>>,
}

impl FakeRegs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset a register without logging a write.
    pub fn set(&self, offset: usize, value: u32) {
        self.inner.lock().words.insert(offset, value);
    }

    /// Stored value, ignoring delayed bits.
    pub fn get(&self, offset: usize) -> u32 {
        self.inner.lock().words.get(&offset).copied().unwrap_or(0)
    }

    pub fn get8(&self, offset: usize) -> u8 {
        let word = self.get(offset & !3);
        (word >> ((offset & 3) * 8)) as u8
    }

    /// The first `reads` reads of `offset` return `bits` clear, every later
    /// read returns them set.
    pub fn set_after_reads(&self, offset: usize, bits: u32, reads: usize) {
        self.inner.lock().delayed.insert(offset, DelayedBits { bits, reads_left: reads });
    }

    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.inner
            .lock()
            .log
            .iter()
            .filter(|(off, _)| *off == offset)
            .map(|(_, value)| *value)
            .collect()
    }

    pub fn write_log(&self) -> Vec<(usize, u32)> {
        self.inner.lock().log.clone()
    }

    pub fn write_count(&self) -> usize {
        self.inner.lock().log.len()
    }
}

impl RegisterIo for FakeRegs {
    fn read32(&self, offset: usize) -> u32 {
        let mut state = self.inner.lock();
        let value = state.words.get(&offset).copied().unwrap_or(0);
        match state.delayed.get_mut(&offset) {
            Some(delayed) if delayed.reads_left > 0 => {
                delayed.reads_left -= 1;
                value & !delayed.bits
            }
            Some(delayed) => value | delayed.bits,
            None => value,
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        let mut state = self.inner.lock();
        state.words.insert(offset, value);
        state.log.push((offset, value));
    }

    fn read8(&self, offset: usize) -> u8 {
        self.get8(offset)
    }

    fn write8(&self, offset: usize, value: u8) {
        let mut state = self.inner.lock();
        let word = offset & !3;
        let shift = (offset & 3) * 8;
        let old = state.words.get(&word).copied().unwrap_or(0);
        let new = (old & !(0xFF << shift)) | (u32::from(value) << shift);
        state.words.insert(word, new);
        state.log.push((offset, u32::from(value)));
    }
}

/// Hands out [`FakeRegs`] windows; preset windows are returned for their
/// base address, anything else gets a fresh window.
#[derive(Default)]
pub struct FakeMapper {
    windows: Mutex<BTreeMap<u64, FakeRegs>>,
    failing: Mutex<Vec<u64>>,
    live: AtomicIsize,
}

impl FakeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(&self, start: u64, regs: FakeRegs) {
        self.windows.lock().insert(start, regs);
    }

    pub fn fail_at(&self, start: u64) {
        self.failing.lock().push(start);
    }

    /// Windows mapped and not yet unmapped.
    pub fn live(&self) -> isize {
        self.live.load(Ordering::Relaxed)
    }
}

impl IoMapper for FakeMapper {
    type Region = FakeRegs;

    fn ioremap(&self, res: &MemResource) -> Option<FakeRegs> {
        if self.failing.lock().contains(&res.start) {
            return None;
        }
        self.live.fetch_add(1, Ordering::Relaxed);
        Some(self.windows.lock().entry(res.start).or_default().clone())
    }

    fn iounmap(&self, _region: FakeRegs) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Time
// =============================================================================

/// Clock that only moves when the code under test waits.
pub struct FakeTime {
    now: AtomicU64,
    step_us: u64,
}

impl FakeTime {
    /// Each `relax()` advances the clock by `step_us`.
    pub fn new(step_us: u64) -> Self {
        Self {
            now: AtomicU64::new(0),
            step_us,
        }
    }
}

impl TimeSource for FakeTime {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }

    fn udelay(&self, us: u32) {
        self.now.fetch_add(u64::from(us), Ordering::Relaxed);
    }

    fn relax(&self) {
        self.now.fetch_add(self.step_us, Ordering::Relaxed);
    }
}

// =============================================================================
// Clocks
// =============================================================================

struct ClockEntry {
    name: String,
    held: bool,
    enabled: bool,
    parent: Option<Clk>,
}

#[derive(Default)]
struct ClockState {
    entries: Vec<ClockEntry>,
    fail_get: Vec<String>,
    fail_enable: Vec<String>,
    fail_parent: Vec<String>,
    releases: Vec<String>,
    events: usize,
}

#[derive(Default)]
pub struct FakeClocks {
    inner: Mutex<ClockState>,
}

impl FakeClocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_get(&self, name: &str) {
        self.inner.lock().fail_get.push(name.to_string());
    }

    pub fn fail_enable(&self, name: &str) {
        self.inner.lock().fail_enable.push(name.to_string());
    }

    pub fn fail_set_parent(&self, name: &str) {
        self.inner.lock().fail_parent.push(name.to_string());
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.inner.lock().entries.iter().any(|e| e.name == name && e.enabled)
    }

    /// Whether some reference to `name` is still held.
    pub fn is_held(&self, name: &str) -> bool {
        self.inner.lock().entries.iter().any(|e| e.name == name && e.held)
    }

    /// References taken and not yet put.
    pub fn held(&self) -> usize {
        self.inner.lock().entries.iter().filter(|e| e.held).count()
    }

    pub fn enabled(&self) -> usize {
        self.inner.lock().entries.iter().filter(|e| e.enabled).count()
    }

    /// Names of the clocks put, in order.
    pub fn releases(&self) -> Vec<String> {
        self.inner.lock().releases.clone()
    }

    /// Parent assigned to the most recent handle of `name`.
    pub fn parent_of(&self, name: &str) -> Option<String> {
        let state = self.inner.lock();
        let entry = state.entries.iter().rev().find(|e| e.name == name)?;
        entry.parent.map(|p| state.entries[p.0 as usize].name.clone())
    }

    /// Calls of any kind made so far.
    pub fn event_count(&self) -> usize {
        self.inner.lock().events
    }
}

impl ClockFramework for FakeClocks {
    fn get(&self, _dev: DeviceId, name: &str) -> HwResult<Clk> {
        let mut state = self.inner.lock();
        state.events += 1;
        if state.fail_get.iter().any(|n| n == name) {
            return Err(HwError::ClockUnavailable);
        }
        state.entries.push(ClockEntry {
            name: name.to_string(),
            held: true,
            enabled: false,
            parent: None,
        });
        Ok(Clk((state.entries.len() - 1) as u32))
    }

    fn enable(&self, clk: Clk) -> HwResult<()> {
        let mut state = self.inner.lock();
        state.events += 1;
        let failing = state.entries[clk.0 as usize].name.clone();
        if state.fail_enable.contains(&failing) {
            return Err(HwError::ClockUnavailable);
        }
        state.entries[clk.0 as usize].enabled = true;
        Ok(())
    }

    fn disable(&self, clk: Clk) {
        let mut state = self.inner.lock();
        state.events += 1;
        state.entries[clk.0 as usize].enabled = false;
    }

    fn put(&self, clk: Clk) {
        let mut state = self.inner.lock();
        state.events += 1;
        let entry = &mut state.entries[clk.0 as usize];
        assert!(entry.held, "{} put twice", entry.name);
        entry.held = false;
        let name = entry.name.clone();
        state.releases.push(name);
    }

    fn set_parent(&self, clk: Clk, parent: Clk) -> HwResult<()> {
        let mut state = self.inner.lock();
        state.events += 1;
        let name = state.entries[clk.0 as usize].name.clone();
        if state.fail_parent.contains(&name) {
            return Err(HwError::InvalidArgument);
        }
        state.entries[clk.0 as usize].parent = Some(parent);
        Ok(())
    }
}

// =============================================================================
// GPIO, regulators, runtime PM, pad mux
// =============================================================================

#[derive(Default)]
struct GpioState {
    held: BTreeMap<i32, &'static str>,
    driven: BTreeMap<i32, Vec<bool>>,
    fail_request: Vec<i32>,
    freed: Vec<i32>,
}

#[derive(Default)]
pub struct FakeGpio {
    inner: Mutex<GpioState>,
}

impl FakeGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_request(&self, gpio: i32) {
        self.inner.lock().fail_request.push(gpio);
    }

    /// Label the line is currently requested under.
    pub fn label(&self, gpio: i32) -> Option<&'static str> {
        self.inner.lock().held.get(&gpio).copied()
    }

    /// Every level driven onto `gpio`, in order.
    pub fn levels(&self, gpio: i32) -> Vec<bool> {
        self.inner.lock().driven.get(&gpio).cloned().unwrap_or_default()
    }

    pub fn freed(&self) -> Vec<i32> {
        self.inner.lock().freed.clone()
    }
}

impl GpioController for FakeGpio {
    fn request(&self, gpio: i32, label: &'static str) -> HwResult<()> {
        let mut state = self.inner.lock();
        if state.fail_request.contains(&gpio) || state.held.contains_key(&gpio) {
            return Err(HwError::Busy);
        }
        state.held.insert(gpio, label);
        Ok(())
    }

    fn direction_output(&self, gpio: i32, high: bool) -> HwResult<()> {
        let mut state = self.inner.lock();
        assert!(state.held.contains_key(&gpio), "gpio {} driven without request", gpio);
        state.driven.entry(gpio).or_default().push(high);
        Ok(())
    }

    fn set_value(&self, gpio: i32, high: bool) {
        let mut state = self.inner.lock();
        assert!(state.held.contains_key(&gpio), "gpio {} driven without request", gpio);
        state.driven.entry(gpio).or_default().push(high);
    }

    fn free(&self, gpio: i32) {
        let mut state = self.inner.lock();
        assert!(state.held.remove(&gpio).is_some(), "gpio {} freed without request", gpio);
        state.freed.push(gpio);
    }
}

#[derive(Default)]
struct RegulatorState {
    names: Vec<String>,
    held: Vec<bool>,
    enabled: Vec<bool>,
    missing: Vec<String>,
}

#[derive(Default)]
pub struct FakeRegulators {
    inner: Mutex<RegulatorState>,
}

impl FakeRegulators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `supply` absent from the board.
    pub fn remove_supply(&self, supply: &str) {
        self.inner.lock().missing.push(supply.to_string());
    }

    pub fn is_enabled(&self, supply: &str) -> bool {
        let state = self.inner.lock();
        state.names.iter().zip(&state.enabled).any(|(n, on)| n == supply && *on)
    }

    pub fn held(&self) -> usize {
        self.inner.lock().held.iter().filter(|h| **h).count()
    }
}

impl RegulatorFramework for FakeRegulators {
    fn get(&self, _dev: DeviceId, supply: &str) -> HwResult<Regulator> {
        let mut state = self.inner.lock();
        if state.missing.iter().any(|n| n == supply) {
            return Err(HwError::InvalidArgument);
        }
        state.names.push(supply.to_string());
        state.held.push(true);
        state.enabled.push(false);
        Ok(Regulator((state.names.len() - 1) as u32))
    }

    fn enable(&self, reg: Regulator) -> HwResult<()> {
        self.inner.lock().enabled[reg.0 as usize] = true;
        Ok(())
    }

    fn disable(&self, reg: Regulator) {
        self.inner.lock().enabled[reg.0 as usize] = false;
    }

    fn put(&self, reg: Regulator) {
        self.inner.lock().held[reg.0 as usize] = false;
    }
}

#[derive(Default)]
struct PmState {
    holds: BTreeMap<u32, i32>,
    enabled: BTreeMap<u32, i32>,
    put_calls: usize,
}

/// Runtime-PM core counting holds and enables per device.
#[derive(Default)]
pub struct FakePm {
    inner: Mutex<PmState>,
}

impl FakePm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self, dev: DeviceId) -> i32 {
        self.inner.lock().holds.get(&dev.0).copied().unwrap_or(0)
    }

    /// Enables minus disables.
    pub fn enable_depth(&self, dev: DeviceId) -> i32 {
        self.inner.lock().enabled.get(&dev.0).copied().unwrap_or(0)
    }

    pub fn put_calls(&self) -> usize {
        self.inner.lock().put_calls
    }
}

impl RuntimePm for FakePm {
    fn enable(&self, dev: DeviceId) {
        *self.inner.lock().enabled.entry(dev.0).or_default() += 1;
    }

    fn disable(&self, dev: DeviceId) {
        *self.inner.lock().enabled.entry(dev.0).or_default() -= 1;
    }

    fn get_sync(&self, dev: DeviceId) {
        *self.inner.lock().holds.entry(dev.0).or_default() += 1;
    }

    fn put_sync(&self, dev: DeviceId) {
        let mut state = self.inner.lock();
        state.put_calls += 1;
        *state.holds.entry(dev.0).or_default() -= 1;
    }
}

#[derive(Default)]
pub struct FakeMux {
    signals: Mutex<Vec<(&'static str, PadMode)>>,
    pads: Mutex<Vec<(u32, u16)>>,
}

impl FakeMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<(&'static str, PadMode)> {
        self.signals.lock().clone()
    }

    pub fn pads(&self) -> Vec<(u32, u16)> {
        self.pads.lock().clone()
    }
}

impl PinMux for FakeMux {
    fn init_signal(&self, signal: &'static str, mode: PadMode) {
        self.signals.lock().push((signal, mode));
    }

    fn write_pad(&self, addr: u32, value: u16) {
        self.pads.lock().push((addr, value));
    }
}

// =============================================================================
// Board
// =============================================================================

/// One OMAP board: UHH/TLL windows plus every platform service.
pub struct Board {
    pub uhh_dev: DeviceId,
    pub ehci_dev: DeviceId,
    pub ohci_dev: DeviceId,
    pub uhh: FakeRegs,
    pub tll: FakeRegs,
    pub mapper: FakeMapper,
    pub clocks: FakeClocks,
    pub gpio: FakeGpio,
    pub regulators: FakeRegulators,
    pub pm: FakePm,
    pub time: FakeTime,
    pub resources: [MemResource; 2],
}

impl Board {
    pub fn new() -> Self {
        let uhh = FakeRegs::new();
        let tll = FakeRegs::new();
        let mapper = FakeMapper::new();
        mapper.preset(OMAP44XX_UHH_CONFIG_BASE, uhh.clone());
        mapper.preset(OMAP44XX_USBTLL_BASE, tll.clone());
        Self {
            uhh_dev: DeviceId(1),
            ehci_dev: DeviceId(2),
            ohci_dev: DeviceId(3),
            uhh,
            tll,
            mapper,
            clocks: FakeClocks::new(),
            gpio: FakeGpio::new(),
            regulators: FakeRegulators::new(),
            pm: FakePm::new(),
            time: FakeTime::new(1000),
            resources: [
                MemResource::new(OMAP44XX_UHH_CONFIG_BASE, UHH_WINDOW_SIZE),
                MemResource::new(OMAP44XX_USBTLL_BASE, TLL_WINDOW_SIZE),
            ],
        }
    }

    /// Let every reset the sequencer requests complete immediately.
    pub fn resets_complete(&self) {
        self.uhh.set(crate::drivers::usb::uhhtll::regs::offset::UHH_SYSSTATUS, 0b111);
        self.tll.set(crate::drivers::usb::uhhtll::regs::offset::TLL_SYSSTATUS, 1);
    }

    pub fn services(&self) -> Services<'_> {
        Services {
            clocks: &self.clocks,
            gpio: &self.gpio,
            regulators: &self.regulators,
            pm: &self.pm,
            time: &self.time,
        }
    }

    pub fn pdev(&self) -> PlatformDevice<'_> {
        PlatformDevice {
            id: self.uhh_dev,
            name: "usbhs-omap",
            resources: &self.resources,
        }
    }
}

// =============================================================================
// CPU cluster
// =============================================================================

/// PMU registers of one CPU.
#[derive(Debug, Default)]
pub struct PmuState {
    pub pmnc: u32,
    pub cntens: u32,
    pub intens: u32,
    pub flag: u32,
    pub select: u32,
    pub evtsel: [u32; 6],
    pub pmcnt: [u32; 6],
    pub ccnt: u32,
}

/// A cluster of CPUs with banked PMUs. Register accesses reach the PMU of
/// the CPU set by [`FakeCluster::set_current`].
pub struct FakeCluster {
    pmus: Vec<Mutex<PmuState>>,
    current: AtomicUsize,
    preempt: AtomicIsize,
}

impl FakeCluster {
    pub fn new(cpus: usize) -> Self {
        Self {
            pmus: (0..cpus).map(|_| Mutex::new(PmuState::default())).collect(),
            current: AtomicUsize::new(0),
            preempt: AtomicIsize::new(0),
        }
    }

    pub fn pmu(&self, cpu: usize) -> MutexGuard<'_, PmuState> {
        self.pmus[cpu].lock()
    }

    pub fn set_current(&self, cpu: usize) {
        self.current.store(cpu, Ordering::Relaxed);
    }

    pub fn preempt_depth(&self) -> isize {
        self.preempt.load(Ordering::Relaxed)
    }

    fn local(&self) -> MutexGuard<'_, PmuState> {
        self.pmu(self.current.load(Ordering::Relaxed))
    }
}

impl PmuRegisters for FakeCluster {
    fn read_pmnc(&self) -> u32 {
        self.local().pmnc
    }

    fn write_pmnc(&self, value: u32) {
        let mut pmu = self.local();
        if value & (1 << 1) != 0 {
            pmu.pmcnt = [0; 6];
        }
        if value & (1 << 2) != 0 {
            pmu.ccnt = 0;
        }
        // P and C are self-clearing, N is read-only
        pmu.pmnc = (pmu.pmnc & !0x3F) | (value & 0x39);
    }

    fn read_cntens(&self) -> u32 {
        self.local().cntens
    }

    fn write_cntens(&self, value: u32) {
        self.local().cntens |= value;
    }

    fn write_cntenc(&self, value: u32) {
        self.local().cntens &= !value;
    }

    fn read_intens(&self) -> u32 {
        self.local().intens
    }

    fn write_intens(&self, value: u32) {
        self.local().intens |= value;
    }

    fn write_intenc(&self, value: u32) {
        self.local().intens &= !value;
    }

    fn read_flag(&self) -> u32 {
        self.local().flag
    }

    fn write_flag(&self, value: u32) {
        self.local().flag &= !value;
    }

    fn read_select(&self) -> u32 {
        self.local().select
    }

    fn write_select(&self, value: u32) {
        self.local().select = value;
    }

    fn read_evtsel(&self) -> u32 {
        let pmu = self.local();
        pmu.evtsel.get(pmu.select as usize).copied().unwrap_or(0)
    }

    fn write_evtsel(&self, value: u32) {
        let mut pmu = self.local();
        let sel = pmu.select as usize;
        if let Some(slot) = pmu.evtsel.get_mut(sel) {
            *slot = value;
        }
    }

    fn read_ccnt(&self) -> u32 {
        self.local().ccnt
    }

    fn write_ccnt(&self, value: u32) {
        self.local().ccnt = value;
    }

    fn read_pmcnt(&self) -> u32 {
        let pmu = self.local();
        pmu.pmcnt.get(pmu.select as usize).copied().unwrap_or(0)
    }

    fn write_pmcnt(&self, value: u32) {
        let mut pmu = self.local();
        let sel = pmu.select as usize;
        if let Some(slot) = pmu.pmcnt.get_mut(sel) {
            *slot = value;
        }
    }
}

impl SmpOps for FakeCluster {
    fn current_cpu(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    fn preempt_disable(&self) {
        self.preempt.fetch_add(1, Ordering::Relaxed);
    }

    fn preempt_enable(&self) {
        self.preempt.fetch_sub(1, Ordering::Relaxed);
    }

    fn call_on_others(&self, f: PerCpuFn<'_>) -> HwResult<()> {
        let me = self.current_cpu();
        let mut result = Ok(());
        for cpu in (0..self.pmus.len()).filter(|&cpu| cpu != me) {
            self.set_current(cpu);
            if let Err(e) = f() {
                result = Err(e);
            }
        }
        self.set_current(me);
        result
    }
}

// =============================================================================
// Interrupts and samples
// =============================================================================

#[derive(Default)]
struct IrqState {
    active: Vec<u32>,
    requested: Vec<(u32, &'static str)>,
    affinity: Vec<(u32, usize)>,
    freed: Vec<u32>,
    failing: Vec<u32>,
}

#[derive(Default)]
pub struct FakeIrq {
    inner: Mutex<IrqState>,
}

impl FakeIrq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `irq` look taken by another driver.
    pub fn fail_request(&self, irq: u32) {
        self.inner.lock().failing.push(irq);
    }

    /// Successful requests, in order.
    pub fn requested(&self) -> Vec<(u32, &'static str)> {
        self.inner.lock().requested.clone()
    }

    pub fn affinity(&self) -> Vec<(u32, usize)> {
        self.inner.lock().affinity.clone()
    }

    pub fn freed(&self) -> Vec<u32> {
        self.inner.lock().freed.clone()
    }

    pub fn active(&self) -> Vec<u32> {
        self.inner.lock().active.clone()
    }
}

impl IrqChip for FakeIrq {
    fn request_irq(&self, irq: u32, name: &'static str) -> HwResult<()> {
        let mut state = self.inner.lock();
        if state.failing.contains(&irq) || state.active.contains(&irq) {
            return Err(HwError::Busy);
        }
        state.active.push(irq);
        state.requested.push((irq, name));
        Ok(())
    }

    fn free_irq(&self, irq: u32) {
        let mut state = self.inner.lock();
        state.active.retain(|&i| i != irq);
        state.freed.push(irq);
    }

    fn set_affinity(&self, irq: u32, cpu: usize) -> HwResult<()> {
        self.inner.lock().affinity.push((irq, cpu));
        Ok(())
    }
}

/// Records `(pc, counter)` of every sample.
#[derive(Default)]
pub struct FakeSink {
    samples: Mutex<Vec<(u32, usize)>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<(u32, usize)> {
        self.samples.lock().clone()
    }
}

impl SampleSink for FakeSink {
    fn add_sample(&self, frame: &Armv7ExceptionFrame, counter: usize) {
        self.samples.lock().push((frame.pc, counter));
    }
}
