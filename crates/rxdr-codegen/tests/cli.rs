use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rxdr-cli-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn rxdr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rxdr"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_compile_to_stdout() {
    let dir = scratch("stdout");
    let input = dir.join("point.x");
    fs::write(&input, "struct Point { int x; int y; };\n").unwrap();

    let out = rxdr(&[input.to_str().unwrap()]);
    assert!(out.status.success());
    let code = String::from_utf8(out.stdout).unwrap();
    assert!(code.starts_with("// Code generated by rxdr-codegen from point.x. DO NOT EDIT."));
    assert!(code.contains("pub struct Point {"));
    assert!(code.contains("pub use rxdr::prelude::*;"));
}

#[test]
fn test_compile_to_file_with_options() {
    let dir = scratch("file");
    let input = dir.join("kinds.x");
    let output = dir.join("kinds.rs");
    fs::write(&input, "enum Kind {\n    ONE = 1, // the first\n    TWO = 2\n};\n").unwrap();

    let out = rxdr(&[
        "-o",
        output.to_str().unwrap(),
        "-p",
        "wire",
        "-b",
        "-i",
        "rxdr::prelude::*",
        "-e",
        input.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("kinds.rs"));

    let code = fs::read_to_string(&output).unwrap();
    assert!(code.contains("pub mod wire {"));
    assert!(code.contains("use rxdr::prelude::*;"));
    assert!(!code.contains("pub use rxdr::prelude::*;"));
    assert!(code.contains("(1, \"the first\")"));
}

#[test]
fn test_parse_errors_exit_one() {
    let dir = scratch("errors");
    let input = dir.join("bad.x");
    fs::write(&input, "struct S {\n    int;\n};\n").unwrap();

    let out = rxdr(&[input.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("bad.x:2: "), "stderr: {}", stderr);
}

#[test]
fn test_emit_errors_exit_one() {
    let dir = scratch("emit");
    let input = dir.join("missing.x");
    fs::write(&input, "struct S { Missing m; };\n").unwrap();

    let out = rxdr(&[input.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unresolved type Missing"));
}

#[test]
fn test_argument_errors_exit_two() {
    assert_eq!(rxdr(&[]).status.code(), Some(2));
    assert_eq!(rxdr(&["--bogus", "a.x"]).status.code(), Some(2));
}
