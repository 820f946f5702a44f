//! Flattened device tree support.
//!
//! - [fdt::reader::FdtReader] parses a blob into a [DeviceTree], checking every offset against the
//!   blob bounds. The blob is boot data handed over by earlier firmware and is not trusted.
//! - [DeviceTree] owns a copy of all names and property bytes, so the blob can be released once
//!   parsed.
//! - [NodeRef] is a lightweight, copyable handle to one node. It borrows the tree and therefore
//!   cannot outlive it.
//! - [fdt::writer::FdtWriter] builds blobs, mostly for fixtures and host tooling.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod fdt;
pub mod node;
pub mod prop;

pub use node::{DeviceTree, NodeRef, NodeType};
pub use prop::{Property, PropertyError};
