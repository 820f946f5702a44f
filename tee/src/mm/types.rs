//! Address and memory class types shared by the mapper and its clients.

use core::fmt::Display;
use utils::{impl_basic, impl_hex_fmt};

/// A physical address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr {
    inner: usize,
}
impl_basic!(PhysAddr, usize);
impl_hex_fmt!(PhysAddr);

/// A virtual address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr {
    inner: usize,
}
impl_basic!(VirtAddr, usize);
impl_hex_fmt!(VirtAddr);

/// Memory class of an I/O mapping in the secure/non-secure partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemAreaType {
    /// Device registers only reachable from the secure world.
    IoSec,
    /// Device registers shared with the non-secure world.
    IoNsec,
}

impl Display for MemAreaType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IoSec => f.write_str("IO_SEC"),
            Self::IoNsec => f.write_str("IO_NSEC"),
        }
    }
}

/// A device register window mapped into the kernel address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRegion {
    pub va: VirtAddr,
    pub size: usize,
    pub mtype: MemAreaType,
}
