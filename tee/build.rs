use serde::Deserialize;
use std::{collections::HashMap, env, fs, path::PathBuf};

#[derive(Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct PlatformFlags {
    io_va_base: String,
    io_va_size: String,
    page_width: String,
}

fn parse_num(num_str: &str) -> Result<u64, std::num::ParseIntError> {
    let clean = num_str.trim().replace("_", "");
    match clean.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => clean.parse(),
    }
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap();
    let flags_str =
        fs::read_to_string(PathBuf::from(manifest_dir).join("platform.json")).unwrap();
    let flagmap: HashMap<String, PlatformFlags> = serde_json::from_str(&flags_str).unwrap();
    let flags = flagmap
        .get(target_arch.as_str())
        .or_else(|| flagmap.get("default"))
        .unwrap_or_else(|| panic!("No platform flags for architecture '{target_arch}'."));
    make_flags(flags);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=platform.json");
}

fn make_flags(flags: &PlatformFlags) {
    let mut s = String::new();
    for (key, value) in [
        ("IO_VA_BASE", &flags.io_va_base),
        ("IO_VA_SIZE", &flags.io_va_size),
        ("PAGE_WIDTH", &flags.page_width),
    ] {
        let value = parse_num(value).unwrap_or_else(|err| panic!("Invalid {key}: {err}"));
        s += format!("pub const {key}: usize = {value:#x};\n").as_str();
    }
    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(PathBuf::from(out_dir).join("build_flags.rs"), s).unwrap();
}
