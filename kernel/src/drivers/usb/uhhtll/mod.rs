//! OMAP USB host subsystem (UHH + TLL)
//!
//! The EHCI and OHCI controllers on OMAP3/OMAP4 share one USB Host Hub
//! (UHH) and one Transceiver-Less Link (TLL). Neither controller driver
//! owns those blocks. Both go through [`UhhTll`], which keeps a usage count
//! and powers the blocks up for the first user and back down after the
//! last one.
//!
//! # Generations
//!
//! | SoC | Power-up |
//! |-----|----------|
//! | OMAP44xx | UHH idle/standby and burst bits only |
//! | OMAP34xx/36xx | three named clocks, TLL soft reset, then idle/burst bits |
//!
//! Every transition runs under one lock, so at most one enable, disable,
//! suspend or resume is in flight across both controllers.

mod ehci;
pub mod mux;
mod ohci;
pub mod port;
pub mod regs;
pub mod tll;

use spin::Mutex;

use crate::error::{HwError, HwResult};
use crate::mmio::{IoMapper, RegisterIo};
use crate::platform::clk::{self, Clk};
use crate::platform::{DeviceId, PlatformDevice, Regulator, Services};
use crate::platform_config::{SocInfo, OMAP3_HS_USB_PORTS};
use crate::time::Deadline;

pub use port::{DriverType, PortMode, UsbhsPlatformData};

use regs::{
    offset, UhhSysconfigOmap3, UhhSysconfigOmap4, UhhSysstatus, UHH_HOSTCONFIG, UHH_SYSCONFIG_OMAP3,
    UHH_SYSCONFIG_OMAP4, UHH_SYSSTATUS,
};

/// OMAP34xx shared clocks, in acquisition order.
const SHARED_CLOCKS: [&str; 3] = ["usbhost_ick", "usbhost_48m_fck", "usbtll_fck"];

/// Host ports with their own functional clock on OMAP44xx.
const OMAP4_CLOCKED_PORTS: usize = 2;

/// Per-port UTMI functional clocks on OMAP44xx.
const UTMI_CLOCKS: [&str; OMAP4_CLOCKED_PORTS] = ["utmi_p1_gfclk", "utmi_p2_gfclk"];

// =============================================================================
// API table
// =============================================================================

/// Entry points the EHCI and OHCI controller drivers call.
///
/// Every call fails with [`HwError::Busy`] until the UHH/TLL device has been
/// probed.
pub trait UhhTllApi {
    fn get_platform_data(&self) -> HwResult<UsbhsPlatformData>;
    fn enable(&self, ty: DriverType, dev: DeviceId) -> HwResult<()>;
    fn disable(&self, ty: DriverType, dev: DeviceId) -> HwResult<()>;
    fn suspend(&self, ty: DriverType, dev: DeviceId) -> HwResult<()>;
    fn resume(&self, ty: DriverType, dev: DeviceId) -> HwResult<()>;
}

// =============================================================================
// State
// =============================================================================

/// Clocks owned by one OMAP44xx host port while its controller runs.
#[derive(Debug, Default)]
struct PortClocks {
    /// `utmi_pN_gfclk`, enabled
    utmi: Option<Clk>,
    /// `xclk60mhspN_ck`, parent of `utmi` in PHY mode, never enabled here
    xclk60m: Option<Clk>,
}

/// Everything that exists between probe and remove.
struct HostState<R> {
    dev: DeviceId,
    uhh: R,
    tll: R,
    pdata: UsbhsPlatformData,
    /// Controllers currently holding the blocks powered
    count: u32,
    shared_clocks: [Option<Clk>; 3],
    port_clocks: [PortClocks; OMAP4_CLOCKED_PORTS],
    phy_supplies: [Option<Regulator>; OMAP3_HS_USB_PORTS],
    /// PHY reset GPIOs requested by the EHCI enable path
    reset_gpio_held: [bool; 2],
}

impl<R> HostState<R> {
    fn new(dev: DeviceId, uhh: R, tll: R, pdata: UsbhsPlatformData) -> Self {
        Self {
            dev,
            uhh,
            tll,
            pdata,
            count: 0,
            shared_clocks: [None; 3],
            port_clocks: Default::default(),
            phy_supplies: [None; OMAP3_HS_USB_PORTS],
            reset_gpio_held: [false; 2],
        }
    }
}

/// The shared UHH/TLL blocks of one SoC.
pub struct UhhTll<'a, M: IoMapper> {
    mapper: &'a M,
    services: Services<'a>,
    soc: SocInfo,
    state: Mutex<Option<HostState<M::Region>>>,
}

impl<'a, M: IoMapper> UhhTll<'a, M> {
    pub const fn new(mapper: &'a M, services: Services<'a>, soc: SocInfo) -> Self {
        Self {
            mapper,
            services,
            soc,
            state: Mutex::new(None),
        }
    }

    /// Bind to the UHH/TLL platform device.
    ///
    /// Resource 0 is the UHH window and resource 1 the TLL window.
    pub fn probe(&self, pdev: Option<&PlatformDevice<'_>>, pdata: UsbhsPlatformData) -> HwResult<()> {
        let pdev = pdev.ok_or_else(|| {
            log::error!("usbhs: probe without a platform device");
            HwError::InvalidArgument
        })?;

        let mut state = self.state.lock();
        if state.is_some() {
            log::error!("usbhs: {} already probed", pdev.name);
            return Err(HwError::Busy);
        }

        let (uhh_res, tll_res) = match (pdev.resource(0), pdev.resource(1)) {
            (Some(uhh), Some(tll)) => (uhh, tll),
            _ => {
                log::error!("usbhs: {} is missing a memory resource", pdev.name);
                return Err(HwError::InvalidArgument);
            }
        };

        let uhh = self.mapper.ioremap(uhh_res).ok_or_else(|| {
            log::error!("usbhs: UHH ioremap failed");
            HwError::NoMemory
        })?;
        let tll = match self.mapper.ioremap(tll_res) {
            Some(tll) => tll,
            None => {
                log::error!("usbhs: TLL ioremap failed");
                self.mapper.iounmap(uhh);
                return Err(HwError::NoMemory);
            }
        };

        self.services.pm.enable(pdev.id);
        *state = Some(HostState::new(pdev.id, uhh, tll, pdata));
        log::info!(
            "usbhs: {} probed, UHH at {:#x}, TLL at {:#x}",
            pdev.name,
            uhh_res.start,
            tll_res.start
        );
        Ok(())
    }

    /// Unbind. Refused while either controller still holds the blocks.
    pub fn remove(&self) -> HwResult<()> {
        let mut state = self.state.lock();
        if let Some(st) = state.as_ref() {
            if st.count != 0 {
                log::warn!("usbhs: remove refused, {} controller(s) still active", st.count);
                return Err(HwError::Busy);
            }
        }
        if let Some(st) = state.take() {
            self.services.pm.disable(st.dev);
            self.mapper.iounmap(st.uhh);
            self.mapper.iounmap(st.tll);
            log::info!("usbhs: removed");
        }
        Ok(())
    }

    pub fn is_probed(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Controllers currently holding the blocks powered, `None` before probe.
    pub fn usage_count(&self) -> Option<u32> {
        self.state.lock().as_ref().map(|st| st.count)
    }

    /// Whether the UHH/TLL power domain is currently held on.
    pub fn is_powered(&self) -> bool {
        self.usage_count().is_some_and(|count| count > 0)
    }

    pub fn soc(&self) -> SocInfo {
        self.soc
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut Session<'_, M::Region>) -> T) -> HwResult<T> {
        let mut guard = self.state.lock();
        let st = guard.as_mut().ok_or_else(|| {
            log::error!("usbhs: UHH not yet initialized");
            HwError::Busy
        })?;
        let mut session = Session {
            st,
            svc: self.services,
            soc: self.soc,
        };
        Ok(f(&mut session))
    }
}

impl<M: IoMapper> UhhTllApi for UhhTll<'_, M> {
    fn get_platform_data(&self) -> HwResult<UsbhsPlatformData> {
        self.with_session(|s| s.st.pdata)
    }

    fn enable(&self, ty: DriverType, dev: DeviceId) -> HwResult<()> {
        self.with_session(|s| match ty {
            DriverType::Ehci => s.ehci_enable(dev),
            DriverType::Ohci => s.ohci_enable(dev),
        })?
    }

    fn disable(&self, ty: DriverType, dev: DeviceId) -> HwResult<()> {
        self.with_session(|s| match ty {
            DriverType::Ehci => s.ehci_disable(dev),
            DriverType::Ohci => s.ohci_disable(dev),
        })
    }

    fn suspend(&self, ty: DriverType, dev: DeviceId) -> HwResult<()> {
        self.with_session(|s| match ty {
            DriverType::Ehci => s.ehci_suspend(dev),
            DriverType::Ohci => s.ohci_suspend(dev),
        })
    }

    fn resume(&self, ty: DriverType, dev: DeviceId) -> HwResult<()> {
        self.with_session(|s| match ty {
            DriverType::Ehci => s.ehci_resume(dev),
            DriverType::Ohci => s.ohci_resume(dev),
        })?
    }
}

// =============================================================================
// Shared power sequencing
// =============================================================================

/// Locked view of the host state for the duration of one transition.
struct Session<'s, R> {
    st: &'s mut HostState<R>,
    svc: Services<'s>,
    soc: SocInfo,
}

impl<R: RegisterIo> Session<'_, R> {
    /// Take a usage reference, powering the blocks up for the first user.
    ///
    /// On failure nothing stays acquired and the count is unchanged.
    fn enable_shared(&mut self) -> HwResult<()> {
        log::debug!("usbhs: enable UHH/TLL, {} user(s)", self.st.count);

        if self.st.count == 0 {
            self.svc.pm.get_sync(self.st.dev);
            let powered = if self.soc.is_omap4() {
                self.omap4_power_up();
                Ok(())
            } else {
                self.omap3_power_up()
            };
            if let Err(e) = powered {
                self.svc.pm.put_sync(self.st.dev);
                return Err(e);
            }
        }

        self.st.count += 1;
        Ok(())
    }

    /// Drop a usage reference, resetting the blocks and releasing their
    /// clocks after the last user. Never fails; reset timeouts are logged.
    fn disable_shared(&mut self) {
        log::debug!("usbhs: disable UHH/TLL, {} user(s)", self.st.count);

        if self.st.count == 0 {
            return;
        }
        self.st.count -= 1;
        if self.st.count > 0 {
            return;
        }

        self.reset_blocks();
        self.release_shared_clocks();
        self.svc.pm.put_sync(self.st.dev);
    }

    fn omap4_power_up(&mut self) {
        let uhh = &self.st.uhh;
        let mut sys = UhhSysconfigOmap4::new(uhh.read32(offset::UHH_SYSCONFIG));
        sys.modify(UHH_SYSCONFIG_OMAP4::IDLEMODE::NoIdle + UHH_SYSCONFIG_OMAP4::STANDBYMODE::NoStandby);
        uhh.write32(offset::UHH_SYSCONFIG, sys.get());

        self.program_burst();
    }

    fn omap3_power_up(&mut self) -> HwResult<()> {
        for (slot, name) in SHARED_CLOCKS.iter().enumerate() {
            match clk::get_enabled(self.svc.clocks, self.st.dev, name) {
                Ok(c) => self.st.shared_clocks[slot] = Some(c),
                Err(e) => {
                    log::error!("usbhs: {}: {}", name, e);
                    self.release_shared_clocks();
                    return Err(e);
                }
            }
        }

        if let Err(e) = tll::soft_reset(&self.st.tll, self.svc.time, tll::SHARED_RESET_TIMEOUT_MS) {
            log::error!("usbhs: TLL reset: {}", e);
            self.release_shared_clocks();
            return Err(e);
        }
        tll::configure_no_idle(&self.st.tll);

        let uhh = &self.st.uhh;
        let mut sys = UhhSysconfigOmap3::new(uhh.read32(offset::UHH_SYSCONFIG));
        sys.modify(
            UHH_SYSCONFIG_OMAP3::ENAWAKEUP::SET
                + UHH_SYSCONFIG_OMAP3::SIDLEMODE::NoIdle
                + UHH_SYSCONFIG_OMAP3::CACTIVITY::SET
                + UHH_SYSCONFIG_OMAP3::MIDLEMODE::NoStandby
                + UHH_SYSCONFIG_OMAP3::AUTOIDLE::CLEAR,
        );
        uhh.write32(offset::UHH_SYSCONFIG, sys.get());

        self.program_burst();
        Ok(())
    }

    /// INCR4/8/16 bursts without alignment; OMAP44xx also starts the
    /// application clock.
    fn program_burst(&mut self) {
        let mut cfg = regs::read_hostconfig(&self.st.uhh);
        cfg.modify(
            UHH_HOSTCONFIG::INCR4_BURST_EN::SET
                + UHH_HOSTCONFIG::INCR8_BURST_EN::SET
                + UHH_HOSTCONFIG::INCR16_BURST_EN::SET
                + UHH_HOSTCONFIG::INCRX_ALIGN_EN::CLEAR,
        );
        if self.soc.is_omap4() {
            cfg.modify(UHH_HOSTCONFIG::APP_START_CLK::SET);
        }
        regs::write_hostconfig(&self.st.uhh, cfg);
    }

    /// Soft reset UHH then TLL, all waits sharing one deadline.
    fn reset_blocks(&mut self) {
        let time = self.svc.time;
        let uhh = &self.st.uhh;
        let tll = &self.st.tll;

        if self.soc.is_omap4() {
            let mut sys = UhhSysconfigOmap4::new(0);
            sys.modify(UHH_SYSCONFIG_OMAP4::SOFTRESET::SET);
            uhh.write32(offset::UHH_SYSCONFIG, sys.get());
        } else {
            let mut sys = UhhSysconfigOmap3::new(0);
            sys.modify(UHH_SYSCONFIG_OMAP3::SOFTRESET::SET);
            uhh.write32(offset::UHH_SYSCONFIG, sys.get());
        }

        let deadline = Deadline::after_ms(time, tll::SHARED_RESET_TIMEOUT_MS);
        let uhh_done = [
            ("UHH", UHH_SYSSTATUS::RESETDONE),
            ("OHCI", UHH_SYSSTATUS::OHCI_RESETDONE),
            ("EHCI", UHH_SYSSTATUS::EHCI_RESETDONE),
        ];
        for (block, done) in uhh_done {
            let reset = deadline.poll(time, || {
                UhhSysstatus::new(uhh.read32(offset::UHH_SYSSTATUS)).is_set(done)
            });
            if reset.is_err() {
                log::warn!("usbhs: {} reset timed out, continuing teardown", block);
            }
        }

        tll::request_soft_reset(tll);
        if deadline.poll(time, || tll::reset_done(tll)).is_err() {
            log::warn!("usbhs: TLL reset timed out, continuing teardown");
        }
    }

    fn release_shared_clocks(&mut self) {
        for slot in self.st.shared_clocks.iter_mut().rev() {
            clk::release(self.svc.clocks, slot);
        }
    }

    /// Release the clocks of an OMAP44xx host port.
    fn release_port_clocks(&mut self, port: usize) {
        let clocks = &mut self.st.port_clocks[port];
        clk::release(self.svc.clocks, &mut clocks.utmi);
        clk::put(self.svc.clocks, &mut clocks.xclk60m);
    }

    /// Release the port clocks of every port `owner` drives. Ports of the
    /// other controller keep theirs.
    fn release_port_clocks_of(&mut self, owner: DriverType) {
        for port in (0..OMAP4_CLOCKED_PORTS).rev() {
            let mode = self.st.pdata.port_mode[port];
            let owned = match owner {
                DriverType::Ehci => mode.is_ehci(),
                DriverType::Ohci => mode.is_ohci(),
            };
            if owned {
                self.release_port_clocks(port);
            }
        }
    }
}
