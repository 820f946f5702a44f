//! This module provides functionalities to resolve a flattened device tree

use bitflags::bitflags;
use core::fmt::Display;

pub mod reader;
pub mod writer;

/// Expected FDT magic number (0xd00dfeed).
pub const FDT_MAGIC: u32 = 0xd00d_feed;
/// The FDT version this crate targets.
pub const FDT_VERSION: u32 = 17;
/// The last compatible FDT version accepted by the reader.
pub const LAST_COMP_VERSION: u32 = 16;
/// Size of the header in bytes.
pub const FDT_HEADER_SIZE: usize = 40;
/// Size of one memory reservation entry (address and size, both 64-bit).
pub const RSV_ENTRY_SIZE: usize = 16;

/// Flattened Device Tree header, with fields already converted to native endianness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdtHeader {
    pub magic: u32,
    pub totalsize: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    pub boot_cpuid_phys: u32,
    pub size_dt_strings: u32,
    pub size_dt_struct: u32,
}

bitflags! {
    /// Type tags found in the FDT structure block.
    pub struct FdtNodeType : u32{
        /// Begin a node (followed by its name string)
        const FDT_BEGIN_NODE  = 0x01;
        /// End a node
        const FDT_END_NODE    = 0x02;
        /// A property entry (length, nameoff, data)
        const FDT_PROP        = 0x03;
        /// No-op padding word
        const FDT_NOP         = 0x04;
        /// End of the structure block
        const FDT_END         = 0x09;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtError {
    /// A read at `offset` would leave the blob or the block it belongs to.
    Truncated { offset: usize },
    InvalidMagic { magic: u32 },
    IncompatibleVersion { version: u32 },
    InvalidNodeType { node_type: u32, offset: usize },
    /// A node or property name is not NUL-terminated or not valid UTF-8.
    InvalidString { offset: usize },
    /// Nodes are nested deeper than [reader::FdtReader::MAX_DEPTH].
    TooDeep { offset: usize },
}

impl Display for FdtError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated { offset } => write!(f, "blob truncated at offset {offset:#x}"),
            Self::InvalidMagic { magic } => write!(f, "invalid magic {magic:#x}"),
            Self::IncompatibleVersion { version } => write!(f, "incompatible version {version}"),
            Self::InvalidNodeType { node_type, offset } => {
                write!(f, "unexpected token {node_type:#x} at offset {offset:#x}")
            }
            Self::InvalidString { offset } => write!(f, "invalid string at offset {offset:#x}"),
            Self::TooDeep { offset } => write!(f, "nodes nested too deep at offset {offset:#x}"),
        }
    }
}

impl core::error::Error for FdtError {}
