use crate::fdt::{
    FDT_HEADER_SIZE, FDT_MAGIC, FDT_VERSION, FdtNodeType, LAST_COMP_VERSION, RSV_ENTRY_SIZE,
};
use alloc::{collections::btree_map::BTreeMap, string::String, vec::Vec};
use utils::num::AlignableTo;

/// Builds a flattened device tree blob.
///
/// Nodes are emitted in call order: open a node with [FdtWriter::begin_node], add its properties,
/// then its children, and close it with [FdtWriter::end_node]. The root node has an empty name.
///
/// Unbalanced `begin_node`/`end_node` calls are a caller bug and make [FdtWriter::finish] panic.
#[derive(Debug, Default)]
pub struct FdtWriter {
    structure: Vec<u8>,
    strings: Vec<u8>,
    string_offsets: BTreeMap<String, u32>,
    mem_rsv_map: Vec<(u64, u64)>,
    depth: usize,
}

impl FdtWriter {
    pub fn new() -> FdtWriter {
        FdtWriter::default()
    }

    pub fn add_reservation(&mut self, addr: u64, size: u64) {
        self.mem_rsv_map.push((addr, size));
    }

    fn push_u32(&mut self, value: u32) {
        self.structure.extend_from_slice(&value.to_be_bytes());
    }

    fn pad(&mut self) {
        let len = self.structure.len().align_up(4);
        self.structure.resize(len, 0);
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        if let Some(offset) = self.string_offsets.get(name) {
            return *offset;
        }
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.string_offsets.insert(String::from(name), offset);
        offset
    }

    pub fn begin_node(&mut self, name: &str) {
        self.push_u32(FdtNodeType::FDT_BEGIN_NODE.bits());
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self.depth += 1;
    }

    pub fn end_node(&mut self) {
        assert!(self.depth > 0, "end_node without matching begin_node");
        self.push_u32(FdtNodeType::FDT_END_NODE.bits());
        self.depth -= 1;
    }

    /// Add a property with a raw value.
    pub fn property(&mut self, name: &str, value: &[u8]) {
        let name_offset = self.string_offset(name);
        self.push_u32(FdtNodeType::FDT_PROP.bits());
        self.push_u32(value.len() as u32);
        self.push_u32(name_offset);
        self.structure.extend_from_slice(value);
        self.pad();
    }

    pub fn property_empty(&mut self, name: &str) {
        self.property(name, &[]);
    }

    pub fn property_u32(&mut self, name: &str, value: u32) {
        self.property(name, &value.to_be_bytes());
    }

    pub fn property_cells(&mut self, name: &str, cells: &[u32]) {
        let value: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.property(name, &value);
    }

    /// Add a NUL-terminated string property.
    pub fn property_str(&mut self, name: &str, value: &str) {
        self.property_strlist(name, &[value]);
    }

    pub fn property_strlist(&mut self, name: &str, values: &[&str]) {
        let mut value = Vec::new();
        for s in values {
            value.extend_from_slice(s.as_bytes());
            value.push(0);
        }
        self.property(name, &value);
    }

    /// Assemble the blob: header, memory reservation block, structure block, strings block.
    pub fn finish(mut self) -> Vec<u8> {
        assert_eq!(self.depth, 0, "unterminated node in device tree");
        self.push_u32(FdtNodeType::FDT_END.bits());

        let off_mem_rsvmap = FDT_HEADER_SIZE;
        let off_dt_struct = off_mem_rsvmap + (self.mem_rsv_map.len() + 1) * RSV_ENTRY_SIZE;
        let off_dt_strings = off_dt_struct + self.structure.len();
        let totalsize = off_dt_strings + self.strings.len();

        let header = [
            FDT_MAGIC,
            totalsize as u32,
            off_dt_struct as u32,
            off_dt_strings as u32,
            off_mem_rsvmap as u32,
            FDT_VERSION,
            LAST_COMP_VERSION,
            0, // boot_cpuid_phys
            self.strings.len() as u32,
            self.structure.len() as u32,
        ];

        let mut blob = Vec::with_capacity(totalsize);
        for field in header {
            blob.extend_from_slice(&field.to_be_bytes());
        }
        for (addr, size) in self.mem_rsv_map.iter().chain([(0, 0)].iter()) {
            blob.extend_from_slice(&addr.to_be_bytes());
            blob.extend_from_slice(&size.to_be_bytes());
        }
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }
}
