//! Device binding for the trusted-execution kernel core.
//!
//! Devices are described by a flattened device tree handed over at boot. This crate matches
//! device nodes against the compiled-in drivers ([dev::driver]), resolves their register windows
//! and secure/non-secure status ([dev::dt]) and asks the memory mapper ([mm]) for a mapping of
//! the right security class before a driver touches the hardware.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

#[macro_use]
pub mod console;
pub mod dev;
pub mod error;
pub mod logging;
pub mod mm;
pub mod panic;
