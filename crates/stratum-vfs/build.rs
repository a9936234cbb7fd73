//! Stages the optional embedded archive.
//!
//! When `STRATUM_EMBED_ARCHIVE` names a file, its bytes are baked into the
//! library and picked up by `embedded::embedded_region()`. Otherwise an empty
//! region is staged and the bootstrap stays inactive.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=STRATUM_EMBED_ARCHIVE");

    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        println!("cargo:warning=OUT_DIR not set; embedded archive disabled");
        return;
    };
    let staged = out_dir.join("embedded_archive.bin");

    let data = match env::var_os("STRATUM_EMBED_ARCHIVE").map(PathBuf::from) {
        Some(source) => {
            println!("cargo:rerun-if-changed={}", source.display());
            fs::read(&source).unwrap_or_else(|e| {
                println!(
                    "cargo:warning=cannot read embedded archive {}: {e}",
                    source.display()
                );
                Vec::new()
            })
        }
        None => Vec::new(),
    };

    if let Err(e) = fs::write(&staged, data) {
        println!("cargo:warning=cannot stage embedded archive: {e}");
    }
}
