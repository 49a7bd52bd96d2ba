//! Architecture abstraction layer.
//!
//! This module provides architecture-agnostic traits and the ARMv7
//! implementation the OMAP boards run on. Code outside this module should
//! use the traits defined here rather than architecture-specific types
//! directly.
//!
//! # Supported Architectures
//!
//! - `armv7`: Cortex-A8 (OMAP34xx/36xx) and Cortex-A9 MPCore (OMAP44xx)

pub mod armv7;
pub use armv7 as current;

pub mod traits;
pub use traits::*;
