use dt::{fdt::reader::FdtReader, fdt::writer::FdtWriter};
use std::panic;
use tee::dev::driver::{Driver, find_driver, init, registry};

#[derive(Debug)]
struct PlDriver {
    name: &'static str,
    comps: &'static [&'static str],
}

impl Driver for PlDriver {
    fn get_name(&self) -> &'static str {
        self.name
    }

    fn get_comp_strs(&self) -> &'static [&'static str] {
        self.comps
    }
}

static PL011: PlDriver = PlDriver {
    name: "PL011 UART",
    comps: &["arm,pl011"],
};
static PL011_SBSA: PlDriver = PlDriver {
    name: "SBSA UART",
    comps: &["arm,sbsa-uart", "arm,pl011"],
};
static PL061: PlDriver = PlDriver {
    name: "PL061 GPIO",
    comps: &["arm,pl061"],
};

// The registry is process-wide, so everything touching it lives in one test.
#[test]
fn installed_registry_matches_in_order() {
    let mut w = FdtWriter::new();
    w.begin_node("");
    w.begin_node("uart@9000000");
    w.property_strlist("compatible", &["arm,pl011", "arm,primecell"]);
    w.end_node();
    w.begin_node("uart@9040000");
    w.property_strlist("compatible", &["arm,sbsa-uart"]);
    w.end_node();
    w.begin_node("rtc@9010000");
    w.property_strlist("compatible", &["arm,pl031", "arm,primecell"]);
    w.end_node();
    w.end_node();
    let tree = FdtReader::new(&w.finish()).read().unwrap();

    init(vec![&PL061 as &dyn Driver, &PL011, &PL011_SBSA]);
    assert_eq!(registry().map(|r| r.len()), Some(3));

    let name = |path: &str| find_driver(tree.get_node(path).unwrap()).map(|d| d.get_name());
    assert_eq!(name("/uart@9000000"), Some("PL011 UART"));
    assert_eq!(name("/uart@9040000"), Some("SBSA UART"));
    assert_eq!(name("/rtc@9010000"), None);

    assert!(panic::catch_unwind(|| init(Vec::new())).is_err());
    assert_eq!(registry().map(|r| r.len()), Some(3));
}
