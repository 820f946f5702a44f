use dt::{fdt::reader::FdtReader, fdt::writer::FdtWriter};
use log::LevelFilter;
use std::sync::Mutex;
use tee::{
    console::{self, Console},
    dev::dt::map_dev,
    error::{MapDevError, MappingError},
    kserial_println, logging,
    mm::io::IoMapTable,
};

struct Capture(Mutex<String>);

impl Console for Capture {
    fn put_str(&self, s: &str) {
        self.0.lock().unwrap().push_str(s);
    }
}

static CAPTURE: Capture = Capture(Mutex::new(String::new()));

// The console and the logger are process-wide, so everything lives in one test.
#[test]
fn mapping_failures_are_logged_with_the_address() {
    console::init(&CAPTURE);
    logging::init(LevelFilter::Debug);

    kserial_println!("boot {}", 1);
    assert!(CAPTURE.0.lock().unwrap().contains("boot 1\n"));

    let mut w = FdtWriter::new();
    w.begin_node("");
    w.property_u32("#address-cells", 1);
    w.property_u32("#size-cells", 1);
    w.begin_node("uart@9000000");
    w.property_cells("reg", &[0x900_0000, 0x2000]);
    w.end_node();
    w.end_node();
    let tree = FdtReader::new(&w.finish()).read().unwrap();

    let table = IoMapTable::new(0x4000_0000, 0x1000, 0x1000);
    table.enable();
    let node = tree.get_node("/uart@9000000").unwrap();
    assert_eq!(
        map_dev(node, &table),
        Err(MapDevError::Mapping(MappingError::OutOfSpace))
    );

    let output = CAPTURE.0.lock().unwrap().clone();
    assert!(output.contains("[ERROR] Failed to map 0x2000 bytes at PA 0x9000000"));
}
