//! Walk a device tree and probe every device node that has a driver.
use crate::{
    debug_ex,
    dev::{
        driver::{DriverRegistry, registry},
        dt::get_status,
    },
    error::{DriverProbeError, MapDevError},
    mm::IoMapper,
    panic_init,
};
use dt::{DeviceTree, NodeRef, NodeType};
use log::{info, warn};

/// Outcome counters of a probe walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSummary {
    /// Devices bound to a driver.
    pub probed: usize,
    /// Devices with a driver but disabled for both worlds.
    pub disabled: usize,
    /// Devices whose driver failed to probe.
    pub failed: usize,
    /// Devices claiming a `compatible` string no driver handles.
    pub unmatched: usize,
}

/// Probe every device node of `tree`, depth first, with the drivers of `registry`.
///
/// Description nodes (`/chosen`, `/memory`, ...) and their subtrees are skipped. A failing
/// probe is logged and counted; the walk goes on with the next node.
pub fn probe_devices(
    tree: &DeviceTree,
    registry: &DriverRegistry,
    mapper: &dyn IoMapper,
) -> ProbeSummary {
    debug_ex!("Probing devices...");
    let mut summary = ProbeSummary::default();
    for child in tree.root().children() {
        probe_node(child, registry, mapper, &mut summary);
    }
    info!(
        "Probed {} devices ({} disabled, {} failed, {} without driver).",
        summary.probed, summary.disabled, summary.failed, summary.unmatched
    );
    summary
}

/// [probe_devices] with the registry installed by [crate::dev::driver::init].
pub fn probe_all(tree: &DeviceTree, mapper: &dyn IoMapper) -> ProbeSummary {
    let Some(registry) = registry() else {
        panic_init!("Devices probed before the driver registry is installed.");
    };
    probe_devices(tree, registry, mapper)
}

fn probe_node(
    node: NodeRef<'_>,
    registry: &DriverRegistry,
    mapper: &dyn IoMapper,
    summary: &mut ProbeSummary,
) {
    if node.node_type() == NodeType::Description {
        debug_ex!("\tSkipped Description Node {}.", node.path());
        return;
    }
    match registry.find_compatible(node) {
        None if node.has_property("compatible") => summary.unmatched += 1,
        None => {}
        Some(_) if get_status(node).is_disabled() => {
            debug_ex!("\tSkipped disabled device {}.", node.path());
            summary.disabled += 1;
        }
        Some(driver) => match driver.probe(node, mapper) {
            Ok(()) => {
                debug_ex!("\tProbed {} with driver '{}'.", node.path(), driver.get_name());
                summary.probed += 1;
            }
            Err(DriverProbeError::Map(MapDevError::Disabled)) => summary.disabled += 1,
            Err(err) => {
                warn!(
                    "Driver '{}' failed to probe {}: {}",
                    driver.get_name(),
                    node.path(),
                    err
                );
                summary.failed += 1;
            }
        },
    }
    for child in node.children() {
        probe_node(child, registry, mapper, summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dev::driver::Driver, mm::io::IoMapTable};
    use alloc::vec;
    use dt::fdt::{reader::FdtReader, writer::FdtWriter};

    #[derive(Debug)]
    struct MmioDriver;

    impl Driver for MmioDriver {
        fn get_name(&self) -> &'static str {
            "mmio"
        }

        fn get_comp_strs(&self) -> &'static [&'static str] {
            &["vendor,mmio"]
        }
    }

    static MMIO: MmioDriver = MmioDriver;

    fn mmio_node(w: &mut FdtWriter, name: &str, reg: &[u32], status: Option<&str>) {
        w.begin_node(name);
        w.property_str("compatible", "vendor,mmio");
        w.property_cells("reg", reg);
        if let Some(status) = status {
            w.property_str("status", status);
        }
        w.end_node();
    }

    fn tree() -> DeviceTree {
        let mut w = FdtWriter::new();
        w.begin_node("");
        w.property_u32("#address-cells", 1);
        w.property_u32("#size-cells", 1);
        w.begin_node("chosen");
        w.property_str("compatible", "vendor,mmio");
        w.end_node();
        w.begin_node("soc");
        w.property_strlist("compatible", &["simple-bus"]);
        w.property_u32("#address-cells", 1);
        w.property_u32("#size-cells", 1);
        mmio_node(&mut w, "dev@10000000", &[0x1000_0000, 0x100], None);
        mmio_node(&mut w, "dev@10001000", &[0x1000_1000, 0x100], Some("disabled"));
        mmio_node(&mut w, "dev@0", &[0, 0x100], Some("okay"));
        w.end_node();
        w.end_node();
        FdtReader::new(&w.finish()).read().unwrap()
    }

    // The registry is process-wide, so both phases of `probe_all` live in one test.
    #[test]
    fn probe_all_needs_the_installed_registry() {
        let tree = tree();
        let table = IoMapTable::new(0x4000_0000, 0x10_0000, 0x1000);
        table.enable();

        let early = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            probe_all(&tree, &table)
        }));
        assert!(early.is_err());
        assert!(table.is_empty());

        crate::dev::driver::init(vec![&MMIO as &dyn Driver]);
        let summary = probe_all(&tree, &table);
        assert_eq!(summary.probed, 1);
        assert_eq!(summary.disabled, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn walk_counts_every_outcome() {
        let tree = tree();
        let registry = DriverRegistry::new(vec![&MMIO as &dyn Driver]);
        let table = IoMapTable::new(0x4000_0000, 0x10_0000, 0x1000);
        table.enable();

        let summary = probe_devices(&tree, &registry, &table);
        assert_eq!(
            summary,
            ProbeSummary {
                probed: 1,
                disabled: 1,
                failed: 1,
                unmatched: 1,
            }
        );
        assert_eq!(table.len(), 1);
    }
}
