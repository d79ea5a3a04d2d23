//! Settings of one generator run.

/// What to emit around the generated types. Built with the
/// `with`-style methods below; the defaults match the `rxdr` binary
/// without flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenOptions {
    /// Module to wrap the output in. `None` or `"main"` emits at the
    /// top level of the including file.
    pub package: Option<String>,
    /// `use` items copied to the top of the output. A bare path `a::b`
    /// becomes `use a::b;`.
    pub imports: Vec<String>,
    /// Emit `pub use rxdr::prelude::*;` before the types.
    pub boilerplate: bool,
    /// Emit `XDR_COMMENTS` tables for enums.
    pub enum_comments: bool,
    /// Accept union case labels that are tags of a different enum than
    /// the discriminant, comparing them by value.
    pub lax_discriminants: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GenOptions {
    pub fn new() -> Self {
        Self {
            package: None,
            imports: Vec::new(),
            boilerplate: true,
            enum_comments: false,
            lax_discriminants: false,
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    pub fn with_boilerplate(mut self, on: bool) -> Self {
        self.boilerplate = on;
        self
    }

    pub fn with_enum_comments(mut self, on: bool) -> Self {
        self.enum_comments = on;
        self
    }

    pub fn with_lax_discriminants(mut self, on: bool) -> Self {
        self.lax_discriminants = on;
        self
    }

    /// The module the output is wrapped in, if any.
    pub fn module(&self) -> Option<&str> {
        self.package
            .as_deref()
            .filter(|p| !p.is_empty() && *p != "main")
    }
}
