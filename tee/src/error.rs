//! Error types of device resolution, mapping and probing.

use crate::mm::{MemAreaType, PhysAddr};
use core::fmt::Display;
use dt::PropertyError;

/// Why the register window of a node could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegError {
    /// The node is the root; cell counts come from the parent.
    NoParent,
    /// The node has no `reg` property.
    NoReg,
    /// `reg`, `#address-cells` or `#size-cells` is not a sequence of 32-bit cells.
    Property(PropertyError),
    /// The parent's `#address-cells` is not 1 or 2.
    InvalidAddressCells(u32),
    /// The parent's `#size-cells` is not 1 or 2.
    InvalidSizeCells(u32),
    /// `reg` holds fewer cells than the parent's cell counts require.
    Truncated,
    /// The address does not fit the platform's physical address width.
    AddressTooLarge,
    /// The decoded address is zero, which is reserved for "no address".
    ZeroAddress,
    /// The size does not fit in 32 bits.
    SizeTooLarge,
}

/// Errors of the mapping service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    /// A zero-sized range was requested.
    EmptyRange,
    /// The range wraps around the physical address space.
    Overflow,
    /// The range overlaps a mapping of another security class.
    ConflictMapping { existing: MemAreaType },
    /// The range partially overlaps an existing mapping of the same class.
    PartialOverlap,
    /// The I/O virtual window is exhausted.
    OutOfSpace,
}

/// Errors of [crate::dev::dt::map_dev].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDevError {
    /// The node is disabled for both security classes. Expected; nothing was mapped.
    Disabled,
    /// The register window could not be resolved.
    Reg(RegError),
    /// The mapper refused to establish the mapping.
    Mapping(MappingError),
    /// A mapping exists but the mapper has no virtual address for `pa`.
    NoVirtAddr { pa: PhysAddr },
}

/// Errors that may be returned by [crate::dev::driver::Driver::probe].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverProbeError {
    /// Mapping the register window failed, or the device is disabled.
    Map(MapDevError),
    /// Custom driver-specific information.
    Customized { info: &'static str },
}

impl From<PropertyError> for RegError {
    fn from(value: PropertyError) -> Self {
        RegError::Property(value)
    }
}

impl From<RegError> for MapDevError {
    fn from(value: RegError) -> Self {
        MapDevError::Reg(value)
    }
}

impl From<MapDevError> for DriverProbeError {
    fn from(value: MapDevError) -> Self {
        DriverProbeError::Map(value)
    }
}

impl Display for RegError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoParent => f.write_str("node has no parent"),
            Self::NoReg => f.write_str("missing 'reg' property"),
            Self::Property(err) => write!(f, "malformed property: {err}"),
            Self::InvalidAddressCells(n) => write!(f, "unsupported #address-cells {n}"),
            Self::InvalidSizeCells(n) => write!(f, "unsupported #size-cells {n}"),
            Self::Truncated => f.write_str("'reg' is shorter than its cell counts"),
            Self::AddressTooLarge => f.write_str("address exceeds the physical address width"),
            Self::ZeroAddress => f.write_str("address is zero"),
            Self::SizeTooLarge => f.write_str("size exceeds 32 bits"),
        }
    }
}

impl Display for MappingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyRange => f.write_str("empty range"),
            Self::Overflow => f.write_str("range overflows the address space"),
            Self::ConflictMapping { existing } => {
                write!(f, "range already mapped as {existing}")
            }
            Self::PartialOverlap => f.write_str("range partially overlaps an existing mapping"),
            Self::OutOfSpace => f.write_str("I/O virtual window exhausted"),
        }
    }
}

impl Display for MapDevError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disabled => f.write_str("device disabled"),
            Self::Reg(err) => write!(f, "cannot resolve address: {err}"),
            Self::Mapping(err) => write!(f, "cannot map device: {err}"),
            Self::NoVirtAddr { pa } => write!(f, "no virtual address for PA {pa}"),
        }
    }
}

impl Display for DriverProbeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Map(err) => err.fmt(f),
            Self::Customized { info } => f.write_str(info),
        }
    }
}

impl core::error::Error for RegError {}
impl core::error::Error for MappingError {}
impl core::error::Error for MapDevError {}
impl core::error::Error for DriverProbeError {}
