//! Device binding: matching nodes to drivers and mapping their registers.
pub mod driver;
pub mod dt;
pub mod probe;
