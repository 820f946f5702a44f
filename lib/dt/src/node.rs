use crate::prop::{Property, PropertyError};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, string::String, vec::Vec};
use core::{fmt::Debug, ops::Range};

/// `#address-cells` assumed when a node does not carry the property.
pub const DEFAULT_ADDRESS_CELLS: u32 = 2;
/// `#size-cells` assumed when a node does not carry the property.
pub const DEFAULT_SIZE_CELLS: u32 = 1;

/// A parsed device tree. Nodes are stored in pre-order, so the root is always node 0.
pub struct DeviceTree {
    pub root_id: usize,
    pub container: Vec<Node>,
    pub mem_rsv_map: Vec<Range<u64>>,
    pub phandle_map: BTreeMap<u32, usize>,
    pub boot_cpuid_phys: u32,
}

pub struct Node {
    pub node_id: usize,
    pub parent_id: Option<usize>,
    pub full_name: Box<str>,
    pub node_name: Box<str>,
    pub unit_addr: Box<str>,
    pub children: Vec<usize>,
    pub props: Vec<Property>,
    pub node_type: NodeType,
}

/// Whether a node describes a device or only carries information for the kernel
/// (`/chosen`, `/aliases`, `/memory`, `/reserved-memory`).
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NodeType {
    Device,
    Description,
}

/// Handle to a node of a [DeviceTree].
///
/// The handle is a borrow of the tree plus an index; it is cheap to copy and cannot outlive the
/// tree it was taken from.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a DeviceTree,
    id: usize,
}

impl DeviceTree {
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: self.root_id,
        }
    }

    fn node(&self, id: usize) -> Option<NodeRef<'_>> {
        (id < self.container.len()).then_some(NodeRef { tree: self, id })
    }

    /// Iterate over every node in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.container.len()).map(move |id| NodeRef { tree: self, id })
    }

    /// Look a node up by its absolute path, e.g. `/soc/serial@10000000`.
    pub fn get_node(&self, path: impl AsRef<str>) -> Option<NodeRef<'_>> {
        let mut node = self.root();
        for section in path.as_ref().split('/') {
            if section.trim().is_empty() {
                continue;
            }
            node = node
                .children()
                .find(|child| child.name() == section)?;
        }
        Some(node)
    }

    pub fn find_by_phandle(&self, phandle: u32) -> Option<NodeRef<'_>> {
        self.node(*self.phandle_map.get(&phandle)?)
    }

    /// Find all nodes compatible with `compat`, in pre-order.
    pub fn find_compatible<'a>(&'a self, compat: &'a str) -> impl Iterator<Item = NodeRef<'a>> {
        self.nodes().filter(move |node| node.is_compatible(compat))
    }
}

impl<'a> NodeRef<'a> {
    fn inner(&self) -> &'a Node {
        &self.tree.container[self.id]
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn tree(&self) -> &'a DeviceTree {
        self.tree
    }

    /// Node name including the unit address.
    pub fn name(&self) -> &'a str {
        &self.inner().full_name
    }

    /// Node name without the unit address.
    pub fn node_name(&self) -> &'a str {
        &self.inner().node_name
    }

    pub fn unit_addr(&self) -> &'a str {
        &self.inner().unit_addr
    }

    pub fn node_type(&self) -> NodeType {
        self.inner().node_type
    }

    pub fn is_root(&self) -> bool {
        self.inner().parent_id.is_none()
    }

    pub fn path(&self) -> String {
        match self.parent() {
            None => String::from("/"),
            Some(parent) if parent.is_root() => String::from("/") + self.name(),
            Some(parent) => parent.path() + "/" + self.name(),
        }
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.inner().parent_id.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> {
        let tree = self.tree;
        self.inner()
            .children
            .iter()
            .map(move |id| NodeRef { tree, id: *id })
    }

    pub fn get_property(&self, name: impl AsRef<str>) -> Option<&'a Property> {
        let name = name.as_ref();
        self.inner()
            .props
            .iter()
            .find(|prop| prop.name.as_ref() == name)
    }

    /// Raw bytes of a property, with its exact stored length.
    pub fn property_bytes(&self, name: impl AsRef<str>) -> Option<&'a [u8]> {
        self.get_property(name).map(|prop| prop.data.as_ref())
    }

    pub fn has_property(&self, name: impl AsRef<str>) -> bool {
        self.get_property(name).is_some()
    }

    /// Whether one entry of the `compatible` list equals `compat` byte for byte.
    ///
    /// Entries are compared as raw bytes, so a malformed entry does not hide the others.
    pub fn is_compatible(&self, compat: &str) -> bool {
        self.property_bytes("compatible").is_some_and(|list| {
            list.strip_suffix(b"\0")
                .unwrap_or(list)
                .split(|b| *b == 0)
                .any(|entry| entry == compat.as_bytes())
        })
    }

    /// `#address-cells` of this node, i.e. the address width used by its children.
    pub fn address_cells(&self) -> Result<u32, PropertyError> {
        self.cells_or("#address-cells", DEFAULT_ADDRESS_CELLS)
    }

    /// `#size-cells` of this node, i.e. the size width used by its children.
    pub fn size_cells(&self) -> Result<u32, PropertyError> {
        self.cells_or("#size-cells", DEFAULT_SIZE_CELLS)
    }

    fn cells_or(&self, name: &str, default: u32) -> Result<u32, PropertyError> {
        match self.get_property(name) {
            Some(prop) if prop.len() != 4 => Err(PropertyError::InvalidPropFormat),
            Some(prop) => prop.value_as_u32(),
            None => Ok(default),
        }
    }
}

impl Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("NodeRef({})", self.path()))
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

#[cfg(test)]
mod tests {
    use crate::fdt::{reader::FdtReader, writer::FdtWriter};

    fn sample() -> alloc::vec::Vec<u8> {
        let mut w = FdtWriter::new();
        w.begin_node("");
        w.property_u32("#address-cells", 1);
        w.property_u32("#size-cells", 1);
        w.begin_node("chosen");
        w.property_str("bootargs", "console=ttyS0");
        w.end_node();
        w.begin_node("soc");
        w.property_u32("#address-cells", 2);
        w.begin_node("serial@10000000");
        w.property_strlist("compatible", &["vendor,uart-v2", "ns16550a"]);
        w.property_u32("phandle", 7);
        w.end_node();
        w.end_node();
        w.end_node();
        w.finish()
    }

    #[test]
    fn lookup_by_path_and_phandle() {
        let blob = sample();
        let tree = FdtReader::new(&blob).read().unwrap();
        let serial = tree.get_node("/soc/serial@10000000").unwrap();
        assert_eq!(serial.node_name(), "serial");
        assert_eq!(serial.unit_addr(), "10000000");
        assert_eq!(serial.path(), "/soc/serial@10000000");
        assert_eq!(tree.find_by_phandle(7), Some(serial));
        assert!(tree.get_node("/soc/serial").is_none());
        assert_eq!(tree.root().path(), "/");
    }

    #[test]
    fn compatible_requires_an_exact_entry() {
        let blob = sample();
        let tree = FdtReader::new(&blob).read().unwrap();
        let serial = tree.get_node("/soc/serial@10000000").unwrap();
        assert!(serial.is_compatible("ns16550a"));
        assert!(serial.is_compatible("vendor,uart-v2"));
        assert!(!serial.is_compatible("ns16550"));
        assert!(!tree.root().is_compatible("ns16550a"));
        assert_eq!(tree.find_compatible("ns16550a").count(), 1);
    }

    #[test]
    fn compatible_ignores_malformed_entries() {
        let mut w = FdtWriter::new();
        w.begin_node("");
        w.begin_node("uart@1000");
        w.property("compatible", b"vendor,uart\0vendor,\xffuart\0");
        w.end_node();
        w.end_node();
        let blob = w.finish();
        let tree = FdtReader::new(&blob).read().unwrap();
        let uart = tree.get_node("/uart@1000").unwrap();
        assert!(uart.is_compatible("vendor,uart"));
        assert!(!uart.is_compatible("vendor,"));
        assert!(!uart.is_compatible(""));
    }

    #[test]
    fn cell_counts_fall_back_to_defaults() {
        let blob = sample();
        let tree = FdtReader::new(&blob).read().unwrap();
        let soc = tree.get_node("/soc").unwrap();
        assert_eq!(soc.address_cells(), Ok(2));
        assert_eq!(soc.size_cells(), Ok(super::DEFAULT_SIZE_CELLS));
        assert_eq!(tree.root().address_cells(), Ok(1));
        let serial = tree.get_node("/soc/serial@10000000").unwrap();
        assert_eq!(serial.address_cells(), Ok(super::DEFAULT_ADDRESS_CELLS));
    }

    #[test]
    fn description_nodes_are_marked() {
        let blob = sample();
        let tree = FdtReader::new(&blob).read().unwrap();
        assert_eq!(
            tree.get_node("/chosen").unwrap().node_type(),
            super::NodeType::Description
        );
        assert_eq!(
            tree.get_node("/soc").unwrap().node_type(),
            super::NodeType::Device
        );
    }
}
