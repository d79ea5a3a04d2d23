//! Symbol table of a parsed XDR compilation unit.

use std::collections::HashMap;

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};

use crate::error::Diagnostic;

/// A name as written in the IDL (`xid`) and as emitted in Rust (`hostid`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub xid: String,
    pub hostid: String,
}

impl Ident {
    /// Name of a type: `foo_bar` becomes `FooBar`.
    pub fn ty(xid: impl Into<String>) -> Self {
        let xid = xid.into();
        let hostid = to_rust_type_name(&xid);
        Self { xid, hostid }
    }

    /// Name of a constant or enum tag: `maxSigners` becomes `MAX_SIGNERS`.
    pub fn constant(xid: impl Into<String>) -> Self {
        let xid = xid.into();
        let hostid = xid.to_shouty_snake_case();
        Self { xid, hostid }
    }

    /// Name of a struct or union field: `maxMem` becomes `max_mem`.
    pub fn field(xid: impl Into<String>) -> Self {
        let xid = xid.into();
        let hostid = to_rust_field_name(&xid);
        Self { xid, hostid }
    }
}

/// Convert an XDR type name to a Rust type name.
pub fn to_rust_type_name(name: &str) -> String {
    let converted = name.to_upper_camel_case();

    // Avoid collision with Rust standard types
    match converted.as_str() {
        "String" | "Vec" | "Option" | "Box" | "Result" | "Default" | "Self" | "Some" | "None"
        | "Ok" | "Err" => {
            format!("Idl{}", converted)
        }
        _ => converted,
    }
}

/// Convert an XDR field name to a Rust field name.
pub fn to_rust_field_name(name: &str) -> String {
    let name = name.to_snake_case();

    match name.as_str() {
        // Cannot be raw identifiers.
        "self" | "super" | "crate" | "_" => format!("{}_", name),
        "type" | "match" | "ref" | "mod" | "fn" | "struct" | "enum" | "trait" | "impl" | "use"
        | "pub" | "in" | "where" | "async" | "await" | "dyn" | "loop" | "move" | "return"
        | "static" | "const" | "unsafe" | "extern" | "let" | "mut" | "if" | "else" | "for"
        | "while" | "break" | "continue" | "as" | "box" | "priv" | "abstract" | "final"
        | "override" | "virtual" | "yield" | "become" | "macro" | "typeof" | "try" | "union"
        | "true" | "false" | "gen" => format!("r#{}", name),
        _ => name,
    }
}

/// A constant expression: an integer literal or a symbolic name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `literal` keeps the spelling, so `0` and `0x0` stay distinguishable.
    Int { value: i64, literal: String },
    Ident(String),
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Int {
            value,
            literal: value.to_string(),
        }
    }

    /// True for the literal `0` and for `FALSE`.
    pub fn is_literal_zero(&self) -> bool {
        match self {
            Value::Int { literal, .. } => literal == "0",
            Value::Ident(name) => name == "FALSE",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int { literal, .. } => f.write_str(literal),
            Value::Ident(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Int,
    UnsignedInt,
    Hyper,
    UnsignedHyper,
    Float,
    Double,
    Quadruple,
    Bool,
    Opaque,
    String,
    /// Reference to a declared (or imported) type by its IDL name.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    Scalar,
    /// `T *name`
    Optional,
    /// `T name[N]`
    Array(Value),
    /// `T name<N>`; `None` is unbounded.
    Vector(Option<Value>),
}

/// A field, typedef or discriminant declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub ident: Ident,
    pub ty: TypeSpec,
    pub qual: Qualifier,
    pub comment: Option<String>,
    pub line_comment: Option<String>,
    pub line: usize,
}

impl Decl {
    /// Documentation: the block comment, else the trailing line comment.
    pub fn doc(&self) -> Option<&str> {
        self.comment.as_deref().or(self.line_comment.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumTag {
    pub ident: Ident,
    pub value: Value,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub tags: Vec<EnumTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub fields: Vec<Decl>,
}

/// One `case ...: decl;` group. `decl` is `None` for `void`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionArm {
    pub cases: Vec<Value>,
    pub is_default: bool,
    pub decl: Option<Decl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDef {
    pub discriminant: Decl,
    pub arms: Vec<UnionArm>,
}

impl UnionDef {
    pub fn has_default(&self) -> bool {
        self.arms.iter().any(|a| a.is_default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    pub ident: Ident,
    pub number: Value,
    /// `None` for `void`.
    pub result: Option<TypeSpec>,
    pub args: Vec<TypeSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDef {
    pub ident: Ident,
    pub number: Value,
    pub procedures: Vec<Procedure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDef {
    pub number: Value,
    pub versions: Vec<VersionDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefKind {
    Const(Value),
    Typedef(Decl),
    Enum(EnumDef),
    Struct(StructDef),
    Union(UnionDef),
    Program(ProgramDef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub ident: Ident,
    pub kind: DefKind,
    pub comment: Option<String>,
    pub file: String,
    pub line: usize,
}

impl Definition {
    pub fn is_type(&self) -> bool {
        !matches!(self.kind, DefKind::Const(_) | DefKind::Program(_))
    }
}

/// Every definition of a compilation unit, in source order, plus the
/// diagnostics collected while building it.
#[derive(Debug, Default)]
pub struct SymbolTable {
    definitions: Vec<Definition>,
    index: HashMap<String, usize>,
    /// Enum tag name to (definition index, tag index).
    tags: HashMap<String, (usize, usize)>,
    files: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    failed: bool,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Sticky: set by the first error and never cleared.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub(crate) fn add_file(&mut self, file: &str) {
        self.files.push(file.to_string());
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.failed = true;
        self.diagnostics.push(diagnostic);
    }

    /// Report `name` if it is already defined, as a type, constant or tag.
    pub fn check_dup(&mut self, name: &str, file: &str, line: usize) -> bool {
        let taken = self.index.contains_key(name) || self.tags.contains_key(name);
        if taken {
            self.report(Diagnostic::new(
                file,
                line,
                format!("duplicate definition of {}", name),
            ));
        }
        taken
    }

    /// Add a definition, registering its enum tags. Duplicates are
    /// reported and dropped.
    pub fn insert(&mut self, def: Definition) {
        if self.check_dup(&def.ident.xid, &def.file, def.line) {
            return;
        }
        let at = self.definitions.len();
        if let DefKind::Enum(e) = &def.kind {
            for (i, tag) in e.tags.iter().enumerate() {
                if !self.check_dup(&tag.ident.xid, &def.file, def.line) {
                    self.tags.insert(tag.ident.xid.clone(), (at, i));
                }
            }
        }
        self.index.insert(def.ident.xid.clone(), at);
        self.definitions.push(def);
    }

    pub fn get(&self, xid: &str) -> Option<&Definition> {
        self.index.get(xid).map(|&i| &self.definitions[i])
    }

    /// The enum definition declaring tag `xid`, and the tag.
    pub fn tag(&self, xid: &str) -> Option<(&Definition, &EnumTag)> {
        let &(def, tag) = self.tags.get(xid)?;
        let definition = &self.definitions[def];
        match &definition.kind {
            DefKind::Enum(e) => Some((definition, &e.tags[tag])),
            _ => None,
        }
    }

    /// Numeric value of a constant expression.
    pub fn resolve(&self, value: &Value) -> Option<i64> {
        self.resolve_depth(value, 0)
    }

    fn resolve_depth(&self, value: &Value, depth: usize) -> Option<i64> {
        if depth > 64 {
            return None;
        }
        match value {
            Value::Int { value, .. } => Some(*value),
            Value::Ident(name) if name == "TRUE" => Some(1),
            Value::Ident(name) if name == "FALSE" => Some(0),
            Value::Ident(name) => {
                if let Some((_, tag)) = self.tag(name) {
                    return self.resolve_depth(&tag.value, depth + 1);
                }
                match &self.get(name)?.kind {
                    DefKind::Const(v) => self.resolve_depth(v, depth + 1),
                    _ => None,
                }
            }
        }
    }

    /// Follow scalar typedefs (`typedef Foo Bar;`) to the definition
    /// they finally name, or the builtin they alias.
    pub fn resolve_type<'a>(&'a self, ty: &'a TypeSpec) -> Result<&'a TypeSpec, String> {
        let mut ty = ty;
        for _ in 0..64 {
            let TypeSpec::Named(name) = ty else {
                return Ok(ty);
            };
            let def = self
                .get(name)
                .ok_or_else(|| format!("unresolved type {}", name))?;
            match &def.kind {
                DefKind::Typedef(decl) if decl.qual == Qualifier::Scalar => ty = &decl.ty,
                _ => return Ok(ty),
            }
        }
        Err("typedef cycle".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, kind: DefKind) -> Definition {
        Definition {
            ident: Ident::ty(name),
            kind,
            comment: None,
            file: "t.x".into(),
            line: 1,
        }
    }

    #[test]
    fn test_host_names() {
        assert_eq!(Ident::ty("foo_bar").hostid, "FooBar");
        assert_eq!(Ident::ty("XdrAnon_Foo_ext").hostid, "XdrAnonFooExt");
        assert_eq!(Ident::ty("string").hostid, "IdlString");
        assert_eq!(Ident::field("maxMem").hostid, "max_mem");
        assert_eq!(Ident::field("type").hostid, "r#type");
        assert_eq!(Ident::field("self").hostid, "self_");
        assert_eq!(Ident::constant("maxSigners").hostid, "MAX_SIGNERS");
    }

    #[test]
    fn test_resolve_through_constants_and_tags() {
        let mut table = SymbolTable::new();
        table.insert(def("A", DefKind::Const(Value::int(4))));
        table.insert(def("B", DefKind::Const(Value::Ident("A".into()))));
        table.insert(def(
            "E",
            DefKind::Enum(EnumDef {
                tags: vec![EnumTag {
                    ident: Ident::constant("RED"),
                    value: Value::Ident("B".into()),
                    comment: None,
                }],
            }),
        ));
        assert_eq!(table.resolve(&Value::Ident("B".into())), Some(4));
        assert_eq!(table.resolve(&Value::Ident("RED".into())), Some(4));
        assert_eq!(table.resolve(&Value::Ident("TRUE".into())), Some(1));
        assert_eq!(table.resolve(&Value::Ident("nope".into())), None);
        assert!(!table.failed());
    }

    #[test]
    fn test_duplicates_are_sticky_failures() {
        let mut table = SymbolTable::new();
        table.insert(def("A", DefKind::Const(Value::int(1))));
        table.insert(def("A", DefKind::Const(Value::int(2))));
        assert!(table.failed());
        assert_eq!(table.definitions().len(), 1);
        assert_eq!(
            table.diagnostics()[0].to_string(),
            "t.x:1: duplicate definition of A"
        );
    }

    #[test]
    fn test_literal_zero() {
        assert!(Value::int(0).is_literal_zero());
        assert!(!Value::Int { value: 0, literal: "0x0".into() }.is_literal_zero());
        assert!(Value::Ident("FALSE".into()).is_literal_zero());
    }
}
