//! Build script for the sample crate.
//!
//! Compiles the interfaces under `proto/` with rxdr-codegen into
//! `OUT_DIR`, where `src/lib.rs` includes them.

use std::path::Path;

use rxdr_codegen::{compile_files, GenOptions};

fn generate(manifest_dir: &Path, out_dir: &Path, proto: &str, out: &str, opts: &GenOptions) {
    let proto_path = manifest_dir.join("proto").join(proto);
    let code = match compile_files(&[&proto_path], opts) {
        Ok(code) => code,
        Err(e) => panic!("failed to compile {}:\n{}", proto_path.display(), e),
    };
    let dest = out_dir.join(out);
    std::fs::write(&dest, code).expect("failed to write generated code");

    println!("cargo:rerun-if-changed=proto/{}", proto);
}

fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let (out_dir, manifest_dir) = (Path::new(&out_dir), Path::new(&manifest_dir));

    generate(
        manifest_dir,
        out_dir,
        "sample.x",
        "sample.rs",
        &GenOptions::new().with_enum_comments(true),
    );

    // Caller-supplied imports instead of the prelude, inside `pub mod lax`.
    generate(
        manifest_dir,
        out_dir,
        "lax.x",
        "lax.rs",
        &GenOptions::new()
            .with_package("lax")
            .with_boilerplate(false)
            .with_import("use rxdr::prelude::*;")
            .with_lax_discriminants(true),
    );

    println!("cargo:rerun-if-changed=build.rs");
}
