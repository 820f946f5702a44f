include!(concat!(env!("OUT_DIR"), "/build_flags.rs"));

pub const PAGE_SIZE: usize = 1 << PAGE_WIDTH;
