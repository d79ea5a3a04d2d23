use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use rxdr_codegen::{compile_files, CodegenError, GenOptions};

#[derive(Parser)]
#[command(name = "rxdr")]
#[command(about = "Compile XDR interface files (.x) to Rust", long_about = None)]
struct Cli {
    /// Output `.rs` file (if omitted, prints to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Module to wrap the output in (`main` emits at the top level)
    #[arg(short, long, default_value = "main")]
    package: String,

    /// `use` item to put at the top of the output; may be repeated
    #[arg(short, long = "import")]
    import: Vec<String>,

    /// Do not emit the `rxdr::prelude` re-export
    #[arg(short = 'b', long)]
    no_boilerplate: bool,

    /// Emit `XDR_COMMENTS` tables for enums
    #[arg(short, long)]
    enum_comments: bool,

    /// Accept union cases labelled with tags of another enum type
    #[arg(long)]
    lax_discriminants: bool,

    /// Input `.x` files, parsed in order into one symbol table
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Cli {
    fn options(&self) -> GenOptions {
        let mut opts = GenOptions::new()
            .with_package(self.package.as_str())
            .with_boilerplate(!self.no_boilerplate)
            .with_enum_comments(self.enum_comments)
            .with_lax_discriminants(self.lax_discriminants);
        for import in &self.import {
            opts = opts.with_import(import.as_str());
        }
        opts
    }
}

/// Write through a temporary file next to `path` so readers never see a
/// half-written output.
fn write_atomic(path: &Path, code: &str) -> Result<(), CodegenError> {
    let write_err = |source| CodegenError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Err(source) = fs::write(&tmp, code).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), CodegenError> {
    let code = compile_files(&cli.files, &cli.options())?;
    match &cli.output {
        Some(path) => {
            write_atomic(path, &code)?;
            eprintln!(
                "rxdr: wrote {} ({} bytes) from {} file(s)",
                path.display(),
                code.len(),
                cli.files.len()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(code.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|source| CodegenError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CodegenError::Parse(diagnostics)) => {
            for diagnostic in &diagnostics {
                eprintln!("{}", diagnostic);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("rxdr: {}", e);
            ExitCode::FAILURE
        }
    }
}
