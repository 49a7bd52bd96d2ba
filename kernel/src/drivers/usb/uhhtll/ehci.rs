//! EHCI side of the host sequencer: PHY supplies, PHY reset lines and
//! port routing for ULPI PHY and TLL ports.

use crate::error::HwResult;
use crate::mmio::RegisterIo;
use crate::platform::clk;
use crate::platform::DeviceId;

use super::regs::{self, port_routing};
use super::{tll, DriverType, PortMode, Session, OMAP4_CLOCKED_PORTS, UTMI_CLOCKS};

/// Regulator supply name of each host port's PHY.
const PHY_SUPPLIES: [&str; 3] = ["hsusb0", "hsusb1", "hsusb2"];

const PHY_RESET_LABELS: [&str; 2] = ["USB1 PHY reset", "USB2 PHY reset"];

/// PHY reset is held this long before and after the controller comes up.
const PHY_RESET_HOLD_US: u32 = 10;

const XCLK60M_CLOCKS: [&str; 2] = ["xclk60mhsp1_ck", "xclk60mhsp2_ck"];

impl<R: RegisterIo> Session<'_, R> {
    pub(super) fn ehci_enable(&mut self, dev: DeviceId) -> HwResult<()> {
        log::debug!("usbhs: enable EHCI");
        let phy_reset = self.st.pdata.phy_reset;

        self.acquire_phy_supplies();
        if phy_reset {
            self.assert_phy_reset();
            self.svc.time.udelay(PHY_RESET_HOLD_US);
        }

        self.svc.pm.enable(dev);
        if let Err(e) = self.ehci_resume(dev) {
            log::error!("usbhs: EHCI enable failed: {}", e);
            self.svc.pm.disable(dev);
            self.free_phy_reset();
            self.release_phy_supplies();
            return Err(e);
        }

        if phy_reset {
            self.svc.time.udelay(PHY_RESET_HOLD_US);
            self.deassert_phy_reset();
        }
        Ok(())
    }

    pub(super) fn ehci_disable(&mut self, dev: DeviceId) {
        log::debug!("usbhs: disable EHCI");
        self.ehci_suspend(dev);
        self.svc.pm.disable(dev);
        self.free_phy_reset();
        self.release_phy_supplies();
    }

    pub(super) fn ehci_suspend(&mut self, dev: DeviceId) {
        log::debug!("usbhs: suspend EHCI");
        self.release_port_clocks_of(DriverType::Ehci);
        self.svc.pm.put_sync(dev);
        self.disable_shared();
    }

    /// Power the shared blocks and route the EHCI ports.
    ///
    /// On failure the controller's and the sequencer's holds are both
    /// dropped again.
    pub(super) fn ehci_resume(&mut self, dev: DeviceId) -> HwResult<()> {
        log::debug!("usbhs: resume EHCI");
        if let Err(e) = self.enable_shared() {
            log::error!("usbhs: UHH/TLL enable failed: {}", e);
            return Err(e);
        }
        self.svc.pm.get_sync(dev);

        let routed = if self.soc.is_omap4() {
            self.ehci_route_omap4()
        } else {
            self.ehci_route_omap3();
            Ok(())
        };
        if let Err(e) = routed {
            self.svc.pm.put_sync(dev);
            self.disable_shared();
            return Err(e);
        }
        Ok(())
    }

    fn ehci_route_omap4(&mut self) -> HwResult<()> {
        let pdata = self.st.pdata;
        for port in 0..OMAP4_CLOCKED_PORTS {
            let mode = pdata.port_mode[port];
            if !mode.is_ehci() {
                continue;
            }
            if let Err(e) = self.ehci_port_up_omap4(port, mode) {
                self.release_port_clocks_of(DriverType::Ehci);
                return Err(e);
            }
        }

        let tll_mask = pdata.ports_in_mode(PortMode::EhciTll) & 0b11;
        if tll_mask != 0 {
            if let Err(e) = tll::soft_reset(&self.st.tll, self.svc.time, tll::PORT_RESET_TIMEOUT_MS) {
                log::error!("usbhs: TLL reset for EHCI ports: {}", e);
                self.release_port_clocks_of(DriverType::Ehci);
                return Err(e);
            }
            tll::configure_no_idle(&self.st.tll);
            tll::utmi_init(&self.st.tll, tll_mask, self.soc.tll_channel_count());
        }
        Ok(())
    }

    /// Clock and route one OMAP44xx EHCI port.
    ///
    /// PHY ports run their UTMI clock off the 60MHz PHY clock. The clocks
    /// land in the port's slots only once everything succeeded.
    fn ehci_port_up_omap4(&mut self, port: usize, mode: PortMode) -> HwResult<()> {
        let clocks = self.svc.clocks;
        let dev = self.st.dev;

        let utmi = clocks.get(dev, UTMI_CLOCKS[port]).map_err(|e| {
            log::error!("usbhs: {}: {}", UTMI_CLOCKS[port], e);
            e
        })?;

        let mut xclk60m = None;
        let routing = if mode == PortMode::EhciPhy {
            let xclk = match clocks.get(dev, XCLK60M_CLOCKS[port]) {
                Ok(xclk) => xclk,
                Err(e) => {
                    log::error!("usbhs: {}: {}", XCLK60M_CLOCKS[port], e);
                    clocks.put(utmi);
                    return Err(e);
                }
            };
            xclk60m = Some(xclk);
            if let Err(e) = clocks.set_parent(utmi, xclk) {
                log::error!("usbhs: {} parent: {}", UTMI_CLOCKS[port], e);
                clk::put(clocks, &mut xclk60m);
                clocks.put(utmi);
                return Err(e);
            }
            port_routing::ULPI_PHY
        } else {
            port_routing::ULPI_TLL
        };

        if let Err(e) = clocks.enable(utmi) {
            log::error!("usbhs: {} enable: {}", UTMI_CLOCKS[port], e);
            clk::put(clocks, &mut xclk60m);
            clocks.put(utmi);
            return Err(e);
        }
        let slots = &mut self.st.port_clocks[port];
        slots.utmi = Some(utmi);
        slots.xclk60m = xclk60m;

        let mut cfg = regs::read_hostconfig(&self.st.uhh);
        cfg.modify(regs::port_mode(port).val(routing));
        regs::write_hostconfig(&self.st.uhh, cfg);
        log::debug!("usbhs: port {} routed, HOSTCONFIG={:#010x}", port + 1, cfg.get());
        Ok(())
    }

    fn ehci_route_omap3(&mut self) {
        let pdata = self.st.pdata;
        let mut cfg = regs::read_hostconfig(&self.st.uhh);

        for (port, mode) in pdata.port_mode.iter().enumerate() {
            if mode.is_unused() {
                cfg.modify(regs::connect_status(port).val(0));
            }
        }

        if self.soc.has_global_ulpi_bypass_only() {
            // Only P1_ULPI_BYPASS exists and it covers every port
            let global = if pdata.any_port(PortMode::EhciPhy) { 0 } else { 1 };
            cfg.modify(
                regs::ulpi_bypass(0).val(global) + regs::ulpi_bypass(1).val(0) + regs::ulpi_bypass(2).val(0),
            );
        } else {
            for (port, mode) in pdata.port_mode.iter().enumerate() {
                match mode {
                    PortMode::EhciPhy => cfg.modify(regs::ulpi_bypass(port).val(0)),
                    PortMode::EhciTll => cfg.modify(regs::ulpi_bypass(port).val(1)),
                    _ => {}
                }
            }
        }
        regs::write_hostconfig(&self.st.uhh, cfg);
        log::debug!("usbhs: UHH setup done, HOSTCONFIG={:#010x}", cfg.get());

        let tll_mask = pdata.ports_in_mode(PortMode::EhciTll);
        if tll_mask != 0 {
            tll::utmi_init(&self.st.tll, tll_mask, self.soc.tll_channel_count());
        }
    }

    // =========================================================================
    // PHY supplies and reset lines
    // =========================================================================

    /// Enable the supply of every PHY port. A missing supply only means the
    /// board powers that PHY some other way.
    fn acquire_phy_supplies(&mut self) {
        let regulators = self.svc.regulators;
        let pdata = self.st.pdata;
        for (port, mode) in pdata.port_mode.iter().enumerate() {
            if *mode != PortMode::EhciPhy || self.st.phy_supplies[port].is_some() {
                continue;
            }
            let reg = match regulators.get(self.st.dev, PHY_SUPPLIES[port]) {
                Ok(reg) => reg,
                Err(_) => {
                    log::debug!("usbhs: no {} supply", PHY_SUPPLIES[port]);
                    continue;
                }
            };
            if let Err(e) = regulators.enable(reg) {
                log::debug!("usbhs: {} enable: {}", PHY_SUPPLIES[port], e);
                regulators.put(reg);
                continue;
            }
            self.st.phy_supplies[port] = Some(reg);
        }
    }

    fn release_phy_supplies(&mut self) {
        let regulators = self.svc.regulators;
        for slot in self.st.phy_supplies.iter_mut().rev() {
            if let Some(reg) = slot.take() {
                regulators.disable(reg);
                regulators.put(reg);
            }
        }
    }

    /// Request the PHY reset lines and drive them low.
    fn assert_phy_reset(&mut self) {
        let gpio = self.svc.gpio;
        let lines = self.st.pdata.reset_gpio_port;
        for (i, &line) in lines.iter().enumerate() {
            if !gpio.is_valid(line) || self.st.reset_gpio_held[i] {
                continue;
            }
            if let Err(e) = gpio.request(line, PHY_RESET_LABELS[i]) {
                log::warn!("usbhs: {} (gpio {}): {}", PHY_RESET_LABELS[i], line, e);
                continue;
            }
            self.st.reset_gpio_held[i] = true;
            if let Err(e) = gpio.direction_output(line, false) {
                log::warn!("usbhs: {} (gpio {}) direction: {}", PHY_RESET_LABELS[i], line, e);
            }
        }
    }

    fn deassert_phy_reset(&mut self) {
        for (i, &line) in self.st.pdata.reset_gpio_port.iter().enumerate() {
            if self.st.reset_gpio_held[i] {
                self.svc.gpio.set_value(line, true);
            }
        }
    }

    fn free_phy_reset(&mut self) {
        let lines = self.st.pdata.reset_gpio_port;
        for (i, &line) in lines.iter().enumerate() {
            if core::mem::take(&mut self.st.reset_gpio_held[i]) {
                self.svc.gpio.free(line);
            }
        }
    }
}
