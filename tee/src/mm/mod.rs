//! Memory mapping services used for device register windows.

use crate::error::MappingError;

pub mod config;
pub mod io;
pub mod types;

pub use types::{MappedRegion, MemAreaType, PhysAddr, VirtAddr};

/// The mapping service: establishes I/O mappings and translates physical addresses.
///
/// Implementations own the mapping table and its locking; callers may share one mapper
/// between threads.
pub trait IoMapper: Sync {
    /// Whether the MMU is enabled. Mapping requests are only valid afterwards.
    fn mmu_enabled(&self) -> bool;

    /// Make sure `[pa, pa + size)` is mapped with class `mtype`.
    ///
    /// Idempotent: a range already covered by a mapping of the same class is reused.
    fn add_mapping(&self, mtype: MemAreaType, pa: PhysAddr, size: usize)
    -> Result<(), MappingError>;

    /// Virtual address of `pa` in a mapping of class `mtype`, if any.
    fn phys_to_virt(&self, pa: PhysAddr, mtype: MemAreaType) -> Option<VirtAddr>;
}
