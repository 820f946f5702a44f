use crate::{
    fdt::{
        FDT_HEADER_SIZE, FDT_MAGIC, FDT_VERSION, FdtError, FdtHeader, FdtNodeType,
        LAST_COMP_VERSION, RSV_ENTRY_SIZE,
    },
    node::{DeviceTree, Node, NodeType},
    prop::Property,
};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, vec::Vec};
use core::{mem::take, ops::Range, str};
use log::warn;
use utils::{
    endian::{BigEndian32, BigEndian64, EndianData},
    num::AlignableTo,
};

/// Root-level nodes that carry information for the kernel rather than describe a device.
const DESCRIPTION_NODES: [&str; 4] = ["aliases", "chosen", "memory", "reserved-memory"];

/// Parser for a flattened device tree blob.
///
/// Every read is checked against the blob and against the block it belongs to, so a corrupted
/// or hostile blob yields an [FdtError] instead of an out-of-bounds access.
pub struct FdtReader<'a> {
    blob: &'a [u8],
    cursor: usize,
    struct_block: Range<usize>,
    strings_block: Range<usize>,
    nodes: Vec<Node>,
}

/// Basic Reader Functions
impl FdtReader<'_> {
    /// Read a 32-bit big-endian word at `offset` of the blob.
    fn word_at(&self, offset: usize) -> Result<u32, FdtError> {
        self.blob
            .get(offset..)
            .and_then(BigEndian32::from_bytes)
            .map(|w| w.value())
            .ok_or(FdtError::Truncated { offset })
    }

    /// Read a 32-bit big-endian word from the cursor without advancing it.
    fn peek_u32(&self) -> Result<u32, FdtError> {
        if self.cursor + 4 > self.struct_block.end {
            return Err(FdtError::Truncated {
                offset: self.cursor,
            });
        }
        self.word_at(self.cursor)
    }

    /// Read a 32-bit big-endian word and advance the cursor by 4 bytes.
    fn read_u32(&mut self) -> Result<u32, FdtError> {
        let res = self.peek_u32()?;
        self.cursor += 4;
        Ok(res)
    }

    /// Read `len` bytes at the cursor and advance it to the next 4-byte aligned position.
    fn readbytes_aligned(&mut self, len: usize) -> Result<&[u8], FdtError> {
        let start = self.cursor;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.struct_block.end)
            .ok_or(FdtError::Truncated { offset: start })?;
        self.cursor = end.align_up(4);
        Ok(&self.blob[start..end])
    }

    /// Advance the cursor past NOP tokens.
    fn skip(&mut self) -> Result<(), FdtError> {
        while self.peek_u32()? == FdtNodeType::FDT_NOP.bits() {
            self.cursor += 4;
        }
        Ok(())
    }

    /// Read a NUL-terminated string at the cursor and advance to the next aligned position.
    fn readstr_aligned(&mut self) -> Result<&str, FdtError> {
        let start = self.cursor;
        let bytes = self
            .blob
            .get(start..self.struct_block.end)
            .ok_or(FdtError::Truncated { offset: start })?;
        let len = bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or(FdtError::InvalidString { offset: start })?;
        self.cursor = (start + len + 1).align_up(4);
        str::from_utf8(&bytes[..len]).map_err(|_| FdtError::InvalidString { offset: start })
    }

    /// Read a tag word and verify it equals `supposed`.
    fn read_and_check(&mut self, supposed: FdtNodeType) -> Result<(), FdtError> {
        let offset = self.cursor;
        let node_type = self.read_u32()?;
        if node_type != supposed.bits() {
            return Err(FdtError::InvalidNodeType { node_type, offset });
        }
        Ok(())
    }
}

impl<'a> FdtReader<'a> {
    /// Deepest node nesting accepted by [Self::read].
    pub const MAX_DEPTH: usize = 64;

    /// Create a reader over a blob. Nothing is checked until [Self::validate] or [Self::read].
    pub fn new(blob: &'a [u8]) -> FdtReader<'a> {
        FdtReader {
            blob,
            cursor: 0,
            struct_block: 0..0,
            strings_block: 0..0,
            nodes: Vec::new(),
        }
    }

    /// Decode the header. Fields are not validated; see [Self::validate].
    pub fn get_header(&self) -> Result<FdtHeader, FdtError> {
        if self.blob.len() < FDT_HEADER_SIZE {
            return Err(FdtError::Truncated {
                offset: self.blob.len(),
            });
        }
        let field = |index: usize| self.word_at(index * 4);
        Ok(FdtHeader {
            magic: field(0)?,
            totalsize: field(1)?,
            off_dt_struct: field(2)?,
            off_dt_strings: field(3)?,
            off_mem_rsvmap: field(4)?,
            version: field(5)?,
            last_comp_version: field(6)?,
            boot_cpuid_phys: field(7)?,
            size_dt_strings: field(8)?,
            size_dt_struct: field(9)?,
        })
    }

    /// Validate the header: magic number, version range and block bounds.
    pub fn validate(&self) -> Result<FdtHeader, FdtError> {
        let header = self.get_header()?;

        // 1. Check the magic number
        if header.magic != FDT_MAGIC {
            return Err(FdtError::InvalidMagic {
                magic: header.magic,
            });
        }

        // 2. Check the fdt version. We use version 17, and the last compatible version is 16
        if header.version < LAST_COMP_VERSION || header.last_comp_version > FDT_VERSION {
            return Err(FdtError::IncompatibleVersion {
                version: header.version,
            });
        }

        // 3. Every block must lie within the blob
        let total = header.totalsize as usize;
        if total > self.blob.len() || total < FDT_HEADER_SIZE {
            return Err(FdtError::Truncated {
                offset: self.blob.len(),
            });
        }
        for (offset, size) in [
            (header.off_dt_struct, header.size_dt_struct),
            (header.off_dt_strings, header.size_dt_strings),
            (header.off_mem_rsvmap, 0),
        ] {
            let end = (offset as usize).checked_add(size as usize);
            if end.is_none_or(|end| end > total) {
                return Err(FdtError::Truncated {
                    offset: offset as usize,
                });
            }
        }
        Ok(header)
    }

    /// Look a property name up in the strings block.
    pub fn get_string(&self, offset: usize) -> Result<&'a str, FdtError> {
        let blob: &'a [u8] = self.blob;
        let start = self.strings_block.start.saturating_add(offset);
        let bytes = blob
            .get(start..self.strings_block.end)
            .ok_or(FdtError::InvalidString { offset: start })?;
        let len = bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or(FdtError::InvalidString { offset: start })?;
        str::from_utf8(&bytes[..len]).map_err(|_| FdtError::InvalidString { offset: start })
    }

    /// Read consecutive property entries following a node header.
    fn read_props(&mut self) -> Result<Vec<Property>, FdtError> {
        let mut res = Vec::<Property>::new();
        loop {
            self.skip()?;
            if self.peek_u32()? != FdtNodeType::FDT_PROP.bits() {
                break Ok(res);
            }
            self.cursor += 4;
            let len = self.read_u32()? as usize;
            let name_offset = self.read_u32()? as usize;
            let name = self.get_string(name_offset)?;
            let data = Box::from(self.readbytes_aligned(len)?);
            res.push(Property {
                name: Box::from(name),
                data,
            });
        }
    }

    /// Parse a node and, recursively, its children. Returns the index of the node.
    fn read_node(&mut self, parent_id: Option<usize>, depth: usize) -> Result<usize, FdtError> {
        self.skip()?;
        if depth > Self::MAX_DEPTH {
            return Err(FdtError::TooDeep {
                offset: self.cursor,
            });
        }
        self.read_and_check(FdtNodeType::FDT_BEGIN_NODE)?;
        let full_name: Box<str> = Box::from(self.readstr_aligned()?);
        let (node_name, unit_addr) = full_name.split_once('@').unwrap_or((full_name.as_ref(), ""));
        let (node_name, unit_addr) = (Box::from(node_name), Box::from(unit_addr));
        let props = self.read_props()?;

        let id = self.nodes.len();
        self.nodes.push(Node {
            node_id: id,
            parent_id,
            full_name,
            node_name,
            unit_addr,
            children: Vec::new(),
            props,
            node_type: NodeType::Device,
        });

        loop {
            self.skip()?;
            let offset = self.cursor;
            let node_type = self.peek_u32()?;
            if node_type == FdtNodeType::FDT_BEGIN_NODE.bits() {
                let child = self.read_node(Some(id), depth + 1)?;
                self.nodes[id].children.push(child);
            } else if node_type == FdtNodeType::FDT_END_NODE.bits() {
                self.cursor += 4;
                break;
            } else {
                return Err(FdtError::InvalidNodeType { node_type, offset });
            }
        }
        Ok(id)
    }

    /// Read the memory reservation block up to its `(0, 0)` terminator.
    fn get_mem_rsv_map(&self, header: &FdtHeader) -> Result<Vec<Range<u64>>, FdtError> {
        let total = header.totalsize as usize;
        let mut offset = header.off_mem_rsvmap as usize;
        let mut res = Vec::new();
        loop {
            let entry = self
                .blob
                .get(offset..total)
                .filter(|entry| entry.len() >= RSV_ENTRY_SIZE)
                .ok_or(FdtError::Truncated { offset })?;
            let addr = BigEndian64::from_bytes(entry).map_or(0, |x| x.value());
            let size = BigEndian64::from_bytes(&entry[8..]).map_or(0, |x| x.value());
            if addr == 0 && size == 0 {
                break Ok(res);
            }
            res.push(addr..addr.saturating_add(size));
            offset += RSV_ENTRY_SIZE;
        }
    }

    fn collect_phandles(&self) -> BTreeMap<u32, usize> {
        let mut res = BTreeMap::new();
        for node in &self.nodes {
            let prop = node
                .props
                .iter()
                .find(|p| p.name.as_ref() == "phandle" || p.name.as_ref() == "linux,phandle");
            if let Some(phandle) = prop.and_then(|p| p.value_as_u32().ok()) {
                if res.insert(phandle, node.node_id).is_some() {
                    warn!("Duplicated phandle {:#x} in device tree.", phandle);
                }
            }
        }
        res
    }

    fn read_internal(&mut self) -> Result<DeviceTree, FdtError> {
        let header = self.validate()?;
        let struct_start = header.off_dt_struct as usize;
        let strings_start = header.off_dt_strings as usize;
        self.struct_block = struct_start..struct_start + header.size_dt_struct as usize;
        self.strings_block = strings_start..strings_start + header.size_dt_strings as usize;
        self.cursor = self.struct_block.start;

        let root_id = self.read_node(None, 0)?;
        self.skip()?;
        self.read_and_check(FdtNodeType::FDT_END)?;

        for child in self.nodes[root_id].children.clone() {
            if DESCRIPTION_NODES.contains(&self.nodes[child].node_name.as_ref()) {
                self.nodes[child].node_type = NodeType::Description;
            }
        }

        Ok(DeviceTree {
            root_id,
            mem_rsv_map: self.get_mem_rsv_map(&header)?,
            phandle_map: self.collect_phandles(),
            boot_cpuid_phys: header.boot_cpuid_phys,
            container: take(&mut self.nodes),
        })
    }

    /// Parse the entire blob into a [DeviceTree].
    ///
    /// All strings and byte-array data are **copied**, so the blob can be released afterwards.
    pub fn read(&mut self) -> Result<DeviceTree, FdtError> {
        match self.read_internal() {
            Ok(res) => Ok(res),
            Err(err) => {
                self.cursor = 0;
                self.nodes.clear();
                Err(err)
            }
        }
    }
}
