//! Compiler from XDR interface files (RFC 4506 `.x`) to Rust.
//!
//! Input files are lexed (keeping comments), parsed into one shared
//! [`SymbolTable`], and emitted as Rust types plus the visitor glue the
//! `rxdr` runtime marshals through. Intended for `build.rs`:
//!
//! ```ignore
//! let code = rxdr_codegen::compile_files(&["proto/types.x"], &GenOptions::new())?;
//! std::fs::write(out_dir.join("types.rs"), code)?;
//! ```

pub mod ast;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod options;
pub mod parser;

use std::path::Path;

pub use ast::SymbolTable;
pub use error::{CodegenError, Diagnostic, Result};
pub use generator::generate;
pub use options::GenOptions;

fn checked(table: SymbolTable) -> Result<SymbolTable> {
    if table.failed() {
        return Err(CodegenError::Parse(table.diagnostics().to_vec()));
    }
    Ok(table)
}

/// Parse one source held in memory. `file` only names it in diagnostics.
pub fn parse_str(file: &str, src: &str) -> Result<SymbolTable> {
    let mut table = SymbolTable::new();
    parser::parse_source(&mut table, file, src);
    checked(table)
}

/// Parse one `.x` file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<SymbolTable> {
    parse_files(&[path])
}

/// Parse several files into one symbol table; later files may refer to
/// names of earlier ones. All files are read and parsed before failing,
/// so every diagnostic is reported at once.
pub fn parse_files<P: AsRef<Path>>(paths: &[P]) -> Result<SymbolTable> {
    let mut table = SymbolTable::new();
    for path in paths {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| CodegenError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parser::parse_source(&mut table, &path.display().to_string(), &src);
    }
    checked(table)
}

/// Parse and generate in one step.
pub fn compile_files<P: AsRef<Path>>(paths: &[P], opts: &GenOptions) -> Result<String> {
    generate(&parse_files(paths)?, opts)
}

pub fn compile_str(file: &str, src: &str, opts: &GenOptions) -> Result<String> {
    generate(&parse_str(file, src)?, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_str() {
        let out = compile_str("t.x", "const N = 2;\ntypedef int Pair[N];", &GenOptions::new())
            .unwrap();
        assert!(out.contains("pub type Pair = XdrArray<i32, 2>;"));
    }

    #[test]
    fn test_parse_errors_are_collected() {
        let err = parse_str("bad.x", "struct A { int; };\nconst = 1;").unwrap_err();
        let CodegenError::Parse(diagnostics) = &err else {
            panic!("expected a parse error, got {:?}", err);
        };
        assert_eq!(diagnostics.len(), 2);
        assert!(err.to_string().starts_with("bad.x:1: "));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_file("/nonexistent/missing.x").unwrap_err();
        assert!(matches!(err, CodegenError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/missing.x"));
    }
}
