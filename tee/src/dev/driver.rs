//! Driver registry and compatibility matching.
//!
//! Responsibilities:
//! - Provide the [Driver] trait for device drivers compiled into the kernel.
//! - Hold the ordered list of drivers in [DRIVER_REG], installed once at boot by [init] and
//!   read-only afterwards, so lookups need no locking.
//! - Match a device node against the registry with [find_driver].
//!
//! Ordering notes:
//! - Registration order is the tie-break: when several drivers claim a node, the driver
//!   registered first wins, whichever of its compatible strings matched.
use crate::{debug_ex, dev::dt::map_dev, error::DriverProbeError, mm::IoMapper, panic_init};
use alloc::vec::Vec;
use core::fmt::Debug;
use dt::NodeRef;
use spin::Once;

/// Trait implemented by drivers.
///
/// - Identify compatible strings via [Driver::get_comp_strs]; the registry matches them
///   against the `compatible` list of device nodes.
/// - Implement [Driver::probe] to bind to a node. The default maps the node's register window
///   with [map_dev] and nothing else.
/// - [Driver::on_registered] runs once, when the registry is installed.
pub trait Driver: Sync + Debug {
    fn get_name(&self) -> &'static str;
    fn get_comp_strs(&self) -> &'static [&'static str];
    fn probe(&self, node: NodeRef<'_>, mapper: &dyn IoMapper) -> Result<(), DriverProbeError> {
        map_dev(node, mapper)?;
        Ok(())
    }
    fn on_registered(&self) {}
}

/// An ordered, immutable list of drivers.
pub struct DriverRegistry {
    drivers: Vec<&'static dyn Driver>,
}

impl DriverRegistry {
    pub fn new(drivers: Vec<&'static dyn Driver>) -> DriverRegistry {
        DriverRegistry { drivers }
    }

    /// Drivers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static dyn Driver> {
        self.drivers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// First driver, in registration order, with a compatible string the node claims.
    pub fn find_compatible(&self, node: NodeRef<'_>) -> Option<&'static dyn Driver> {
        self.iter().find(|driver| {
            driver
                .get_comp_strs()
                .iter()
                .any(|comp| node.is_compatible(comp))
        })
    }
}

impl Debug for DriverRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.drivers.iter().map(|driver| driver.get_name()))
            .finish()
    }
}

/// The drivers compiled into the kernel.
static DRIVER_REG: Once<DriverRegistry> = Once::new();

/// Install the driver registry. Must be called exactly once, before probing.
pub fn init(drivers: Vec<&'static dyn Driver>) {
    debug_ex!("Registering drivers...");
    let mut installed = false;
    DRIVER_REG.call_once(|| {
        installed = true;
        for driver in &drivers {
            debug_ex!("\tRegistered driver '{}'.", driver.get_name());
            driver.on_registered();
        }
        DriverRegistry::new(drivers)
    });
    if !installed {
        panic_init!("Driver registry initialized twice.");
    }
    debug_ex!("Drivers registered.");
}

/// The installed registry, if [init] has run.
pub fn registry() -> Option<&'static DriverRegistry> {
    DRIVER_REG.get()
}

/// Find the driver for `node` in the installed registry.
///
/// [None] means no driver handles the node, or the registry is not installed yet.
pub fn find_driver(node: NodeRef<'_>) -> Option<&'static dyn Driver> {
    registry()?.find_compatible(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use dt::{fdt::reader::FdtReader, fdt::writer::FdtWriter};

    #[derive(Debug)]
    struct NamedDriver {
        name: &'static str,
        comps: &'static [&'static str],
    }

    impl Driver for NamedDriver {
        fn get_name(&self) -> &'static str {
            self.name
        }

        fn get_comp_strs(&self) -> &'static [&'static str] {
            self.comps
        }
    }

    static GENERIC_UART: NamedDriver = NamedDriver {
        name: "generic uart",
        comps: &["ns16550a"],
    };
    static VENDOR_UART: NamedDriver = NamedDriver {
        name: "vendor uart",
        comps: &["vendor,uart-v2", "ns16550a"],
    };
    static GPIO: NamedDriver = NamedDriver {
        name: "gpio",
        comps: &["vendor,gpio"],
    };

    fn blob() -> Vec<u8> {
        let mut w = FdtWriter::new();
        w.begin_node("");
        w.begin_node("serial@1000");
        w.property_strlist("compatible", &["vendor,uart-v2", "ns16550a"]);
        w.end_node();
        w.begin_node("timer@2000");
        w.property_str("compatible", "vendor,timer");
        w.end_node();
        w.end_node();
        w.finish()
    }

    #[test]
    fn first_registered_driver_wins() {
        let tree = FdtReader::new(&blob()).read().unwrap();
        let serial = tree.get_node("/serial@1000").unwrap();

        let registry = DriverRegistry::new(vec![&GPIO as &dyn Driver, &GENERIC_UART, &VENDOR_UART]);
        let driver = registry.find_compatible(serial).unwrap();
        assert_eq!(driver.get_name(), "generic uart");

        let registry = DriverRegistry::new(vec![&VENDOR_UART as &dyn Driver, &GENERIC_UART]);
        let driver = registry.find_compatible(serial).unwrap();
        assert_eq!(driver.get_name(), "vendor uart");
    }

    #[test]
    fn unmatched_node_has_no_driver() {
        let tree = FdtReader::new(&blob()).read().unwrap();
        let registry = DriverRegistry::new(vec![&GENERIC_UART as &dyn Driver, &GPIO]);
        assert!(registry.find_compatible(tree.get_node("/timer@2000").unwrap()).is_none());
        assert!(registry.find_compatible(tree.root()).is_none());
        assert!(DriverRegistry::new(Vec::new()).find_compatible(tree.root()).is_none());
    }

    #[test]
    fn registry_keeps_order() {
        let registry = DriverRegistry::new(vec![&VENDOR_UART as &dyn Driver, &GPIO]);
        let names: Vec<_> = registry.iter().map(|d| d.get_name()).collect();
        assert_eq!(names, ["vendor uart", "gpio"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(alloc::format!("{:?}", registry), r#"["vendor uart", "gpio"]"#);
    }
}
