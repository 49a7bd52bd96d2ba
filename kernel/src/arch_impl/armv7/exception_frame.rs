//! ARMv7 exception frame abstraction.
//!
//! Saved processor context on exceptions and interrupts.

use crate::arch_impl::traits::{InterruptFrame, PrivilegeLevel};

/// CPSR.M encoding of user mode.
const CPSR_MODE_USR: u32 = 0x10;
const CPSR_MODE_MASK: u32 = 0x1F;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Armv7PrivilegeLevel {
    Usr,
    Svc,
}

impl PrivilegeLevel for Armv7PrivilegeLevel {
    fn kernel() -> Self {
        Armv7PrivilegeLevel::Svc
    }

    fn user() -> Self {
        Armv7PrivilegeLevel::Usr
    }

    fn is_kernel(&self) -> bool {
        matches!(self, Armv7PrivilegeLevel::Svc)
    }

    fn is_user(&self) -> bool {
        matches!(self, Armv7PrivilegeLevel::Usr)
    }
}

#[repr(C)]
#[derive(Clone, Debug, Default)]
pub struct Armv7ExceptionFrame {
    // General-purpose registers r0-r12.
    pub r: [u32; 13],
    pub sp: u32,
    pub lr: u32,
    pub pc: u32,
    pub cpsr: u32,
}

impl InterruptFrame for Armv7ExceptionFrame {
    type Privilege = Armv7PrivilegeLevel;

    fn instruction_pointer(&self) -> u64 {
        u64::from(self.pc)
    }

    fn stack_pointer(&self) -> u64 {
        u64::from(self.sp)
    }

    fn privilege_level(&self) -> Self::Privilege {
        // Every mode other than USR is privileged
        if self.cpsr & CPSR_MODE_MASK == CPSR_MODE_USR {
            Armv7PrivilegeLevel::Usr
        } else {
            Armv7PrivilegeLevel::Svc
        }
    }
}
