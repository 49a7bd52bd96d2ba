//! OHCI side of the host sequencer. OHCI ports always run through the TLL
//! in FS/LS serial mode.

use crate::error::HwResult;
use crate::mmio::RegisterIo;
use crate::platform::clk;
use crate::platform::DeviceId;

use super::regs::{self, port_routing};
use super::{tll, DriverType, Session, OMAP4_CLOCKED_PORTS, UTMI_CLOCKS};

impl<R: RegisterIo> Session<'_, R> {
    pub(super) fn ohci_enable(&mut self, dev: DeviceId) -> HwResult<()> {
        log::debug!("usbhs: enable OHCI");
        self.svc.pm.enable(dev);
        if let Err(e) = self.ohci_resume(dev) {
            log::error!("usbhs: OHCI enable failed: {}", e);
            self.svc.pm.disable(dev);
            return Err(e);
        }
        Ok(())
    }

    pub(super) fn ohci_disable(&mut self, dev: DeviceId) {
        log::debug!("usbhs: disable OHCI");
        self.ohci_suspend(dev);
        self.svc.pm.disable(dev);
    }

    pub(super) fn ohci_suspend(&mut self, dev: DeviceId) {
        log::debug!("usbhs: suspend OHCI");
        self.release_port_clocks_of(DriverType::Ohci);
        self.svc.pm.put_sync(dev);
        self.disable_shared();
    }

    pub(super) fn ohci_resume(&mut self, dev: DeviceId) -> HwResult<()> {
        log::debug!("usbhs: resume OHCI");
        if let Err(e) = self.enable_shared() {
            log::error!("usbhs: UHH/TLL enable failed: {}", e);
            return Err(e);
        }
        self.svc.pm.get_sync(dev);

        let routed = if self.soc.is_omap4() {
            self.ohci_route_omap4()
        } else {
            self.ohci_route_omap3();
            Ok(())
        };
        if let Err(e) = routed {
            self.svc.pm.put_sync(dev);
            self.disable_shared();
            return Err(e);
        }
        Ok(())
    }

    fn ohci_route_omap4(&mut self) -> HwResult<()> {
        let pdata = self.st.pdata;
        let mut cfg = regs::read_hostconfig(&self.st.uhh);

        for port in 0..OMAP4_CLOCKED_PORTS {
            if !pdata.port_mode[port].is_ohci() {
                continue;
            }
            cfg.modify(regs::port_mode(port).val(port_routing::ULPI_TLL));
            match clk::get_enabled(self.svc.clocks, self.st.dev, UTMI_CLOCKS[port]) {
                Ok(utmi) => self.st.port_clocks[port].utmi = Some(utmi),
                Err(e) => {
                    log::error!("usbhs: {}: {}", UTMI_CLOCKS[port], e);
                    self.release_port_clocks_of(DriverType::Ohci);
                    return Err(e);
                }
            }
        }
        regs::write_hostconfig(&self.st.uhh, cfg);
        log::debug!("usbhs: UHH setup done, HOSTCONFIG={:#010x}", cfg.get());

        if let Err(e) = tll::soft_reset(&self.st.tll, self.svc.time, tll::PORT_RESET_TIMEOUT_MS) {
            log::error!("usbhs: TLL reset for OHCI ports: {}", e);
            self.release_port_clocks_of(DriverType::Ohci);
            return Err(e);
        }
        tll::configure_no_idle(&self.st.tll);
        tll::fsls_config(&self.st.tll, &pdata.port_mode, self.soc.tll_channel_count());
        Ok(())
    }

    fn ohci_route_omap3(&mut self) {
        let pdata = self.st.pdata;
        let mut cfg = regs::read_hostconfig(&self.st.uhh);

        cfg.modify(regs::connect_status(0).val(0) + regs::connect_status(1).val(0) + regs::connect_status(2).val(0));

        if pdata.es2_compatibility || self.soc.has_global_ulpi_bypass_only() {
            cfg.modify(regs::ulpi_bypass(0).val(1) + regs::ulpi_bypass(1).val(0) + regs::ulpi_bypass(2).val(0));
        } else {
            for (port, mode) in pdata.port_mode.iter().enumerate() {
                if mode.is_unused() {
                    cfg.modify(regs::ulpi_bypass(port).val(0));
                } else if mode.is_ohci() {
                    cfg.modify(regs::ulpi_bypass(port).val(1));
                }
            }
        }
        regs::write_hostconfig(&self.st.uhh, cfg);
        log::debug!("usbhs: UHH setup done, HOSTCONFIG={:#010x}", cfg.get());

        tll::fsls_config(&self.st.tll, &pdata.port_mode, self.soc.tll_channel_count());
    }
}
