//! Architecture-agnostic traits for hardware abstraction.
//!
//! These traits define the interface between architecture-specific code and
//! the rest of the crate. The profiling front end only sees saved CPU state
//! through them.

/// CPU privilege level abstraction.
///
/// Maps to USR/SVC mode on ARMv7.
pub trait PrivilegeLevel: Copy + Eq {
    /// Returns the kernel privilege level.
    fn kernel() -> Self;

    /// Returns the user privilege level.
    fn user() -> Self;

    /// Returns true if this is kernel privilege level.
    fn is_kernel(&self) -> bool;

    /// Returns true if this is user privilege level.
    fn is_user(&self) -> bool;
}

/// Interrupt/exception frame abstraction.
///
/// Represents the CPU state saved when an interrupt or exception occurs.
/// The exact layout varies by architecture.
pub trait InterruptFrame {
    /// The architecture's privilege level type.
    type Privilege: PrivilegeLevel;

    /// Returns the instruction pointer (PC on ARM).
    fn instruction_pointer(&self) -> u64;

    /// Returns the stack pointer (SP on ARM).
    fn stack_pointer(&self) -> u64;

    /// Returns the privilege level at the time of the interrupt.
    fn privilege_level(&self) -> Self::Privilege;

    /// Returns true if the interrupt came from userspace.
    #[inline]
    fn is_from_userspace(&self) -> bool {
        self.privilege_level().is_user()
    }
}
