//! Resolution of device nodes: activation status, register window and its mapping.
//!
//! A node may be enabled for the non-secure world (`status`), for the secure world
//! (`secure-status`), for both or for none. Its register window comes from `reg`, decoded with
//! the `#address-cells`/`#size-cells` of its parent. [map_dev] combines both to map the window
//! with the right security class.
use crate::{
    debug_ex,
    error::{MapDevError, RegError},
    mm::{IoMapper, MappedRegion, MemAreaType, PhysAddr},
};
use alloc::vec::Vec;
use bitflags::bitflags;
use dt::NodeRef;
use log::error;
use utils::endian::{BigEndian32, EndianData};

bitflags! {
    /// Activation state of a node, per security world.
    pub struct DtStatus: u32 {
        /// Usable by the non-secure world.
        const OK_NSEC = 0x01;
        /// Usable by the secure world.
        const OK_SEC = 0x02;
    }
}

impl DtStatus {
    /// Disabled for both worlds; such a node is never mapped.
    pub fn is_disabled(&self) -> bool {
        self.is_empty()
    }

    /// `status` is absent or okay.
    pub fn nonsecure_ok(&self) -> bool {
        self.contains(DtStatus::OK_NSEC)
    }

    /// `secure-status` is okay, or absent while `status` is okay.
    pub fn secure_ok(&self) -> bool {
        self.contains(DtStatus::OK_SEC)
    }

    /// Memory class of the node's registers: secure only when no non-secure user exists.
    pub fn io_mem_type(&self) -> MemAreaType {
        if self.secure_ok() && !self.nonsecure_ok() {
            MemAreaType::IoSec
        } else {
            MemAreaType::IoNsec
        }
    }
}

/// Whether a status value is exactly "ok" or "okay", optionally followed by one NUL.
fn is_okay(value: &[u8]) -> bool {
    let value = value.strip_suffix(b"\0").unwrap_or(value);
    value == b"ok" || value == b"okay"
}

/// Whether `node` carries the property `name`, whatever its value.
pub fn dt_have_prop(node: NodeRef<'_>, name: &str) -> bool {
    node.has_property(name)
}

/// Compute the activation state of `node`.
///
/// A missing `status` means enabled. A missing `secure-status` follows `status`.
pub fn get_status(node: NodeRef<'_>) -> DtStatus {
    let mut status = DtStatus::empty();
    if node.property_bytes("status").is_none_or(is_okay) {
        status |= DtStatus::OK_NSEC;
    }
    let secure_ok = match node.property_bytes("secure-status") {
        Some(value) => is_okay(value),
        None => status.nonsecure_ok(),
    };
    if secure_ok {
        status |= DtStatus::OK_SEC;
    }
    status
}

/// Width of physical addresses on a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddrWidth {
    Bits32,
    Bits64,
}

impl PaddrWidth {
    #[cfg(target_pointer_width = "64")]
    pub const NATIVE: PaddrWidth = PaddrWidth::Bits64;
    #[cfg(not(target_pointer_width = "64"))]
    pub const NATIVE: PaddrWidth = PaddrWidth::Bits32;
}

/// Decode a physical address of one or two cells.
pub fn decode_paddr(cells: &[u32], width: PaddrWidth) -> Result<usize, RegError> {
    let addr = match *cells {
        [low] => low as u64,
        [high, low] => match width {
            PaddrWidth::Bits32 if high != 0 => return Err(RegError::AddressTooLarge),
            _ => (high as u64) << 32 | low as u64,
        },
        _ => return Err(RegError::InvalidAddressCells(cells.len() as u32)),
    };
    if addr == 0 {
        return Err(RegError::ZeroAddress);
    }
    usize::try_from(addr).map_err(|_| RegError::AddressTooLarge)
}

/// Decode a size of one or two cells. Sizes never exceed 32 bits.
pub fn decode_size(cells: &[u32]) -> Result<usize, RegError> {
    match *cells {
        [size] | [0, size] => Ok(size as usize),
        [_, _] => Err(RegError::SizeTooLarge),
        _ => Err(RegError::InvalidSizeCells(cells.len() as u32)),
    }
}

/// The physical register window of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegRegion {
    pub base: PhysAddr,
    pub size: usize,
}

/// The `reg` cells of a node, with the `#address-cells` of its parent already checked.
struct RegCells<'a> {
    parent: NodeRef<'a>,
    cells: Vec<u32>,
    address_cells: usize,
}

impl<'a> RegCells<'a> {
    fn of(node: NodeRef<'a>) -> Result<RegCells<'a>, RegError> {
        let parent = node.parent().ok_or(RegError::NoParent)?;
        let reg = node.get_property("reg").ok_or(RegError::NoReg)?;
        let cells = reg
            .value_as_proplist::<u32, BigEndian32>()?
            .iter()
            .map(|cell| cell.value())
            .collect();
        Ok(RegCells {
            parent,
            cells,
            address_cells: address_cells(parent)?,
        })
    }

    fn base(&self) -> Result<PhysAddr, RegError> {
        let addr = self
            .cells
            .get(..self.address_cells)
            .ok_or(RegError::Truncated)?;
        decode_paddr(addr, PaddrWidth::NATIVE).map(PhysAddr::from)
    }

    fn size(&self) -> Result<usize, RegError> {
        let start = self.address_cells;
        let end = start + size_cells(self.parent)?;
        decode_size(self.cells.get(start..end).ok_or(RegError::Truncated)?)
    }
}

fn address_cells(parent: NodeRef<'_>) -> Result<usize, RegError> {
    match parent.address_cells()? {
        n @ (1 | 2) => Ok(n as usize),
        n => Err(RegError::InvalidAddressCells(n)),
    }
}

fn size_cells(parent: NodeRef<'_>) -> Result<usize, RegError> {
    match parent.size_cells()? {
        n @ (1 | 2) => Ok(n as usize),
        n => Err(RegError::InvalidSizeCells(n)),
    }
}

/// Base address of the first register window of `node`.
pub fn reg_base_address(node: NodeRef<'_>) -> Result<PhysAddr, RegError> {
    RegCells::of(node)?.base()
}

/// Size of the first register window of `node`.
pub fn reg_size(node: NodeRef<'_>) -> Result<usize, RegError> {
    RegCells::of(node)?.size()
}

/// Base address and size of the first register window of `node`.
pub fn reg_region(node: NodeRef<'_>) -> Result<RegRegion, RegError> {
    let reg = RegCells::of(node)?;
    Ok(RegRegion {
        base: reg.base()?,
        size: reg.size()?,
    })
}

/// Map the register window of `node` and return where it landed.
///
/// The mapping is secure I/O when only the secure world may use the device and non-secure I/O
/// otherwise. A node disabled for both worlds gives [MapDevError::Disabled] and is not mapped.
///
/// # Panics
/// If the MMU is not enabled yet.
pub fn map_dev<M: IoMapper + ?Sized>(
    node: NodeRef<'_>,
    mapper: &M,
) -> Result<MappedRegion, MapDevError> {
    assert!(
        mapper.mmu_enabled(),
        "device '{}' mapped before the MMU is enabled",
        node.name()
    );

    let status = get_status(node);
    if status.is_disabled() {
        debug_ex!("\tSkipped disabled device '{}'.", node.name());
        return Err(MapDevError::Disabled);
    }

    let RegRegion { base: pa, size } = reg_region(node)?;
    let mtype = status.io_mem_type();

    mapper.add_mapping(mtype, pa, size).map_err(|err| {
        error!("Failed to map {:#x} bytes at PA {}: {}", size, pa, err);
        MapDevError::Mapping(err)
    })?;
    let va = mapper.phys_to_virt(pa, mtype).ok_or_else(|| {
        error!("Failed to get VA for PA {}", pa);
        MapDevError::NoVirtAddr { pa }
    })?;

    Ok(MappedRegion { va, size, mtype })
}
