//! Rust code generator from the XDR symbol table.
//!
//! Output is collected in two buffers: the data shapes in source order,
//! and the helpers (visitor glue, enum tables, union accessors and the
//! memoized `XdrPtr*` / `XdrVec*` aliases). Helpers may be created while
//! a later declaration is emitted, so they go after all declarations.

mod enums;
mod unions;

use std::collections::HashSet;
use std::path::Path;

use heck::ToSnakeCase;
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use crate::ast::*;
use crate::error::{CodegenError, Result};
use crate::lexer::comment_lines;
use crate::options::GenOptions;

/// Generate Rust code for every definition in `table`.
pub fn generate(table: &SymbolTable, opts: &GenOptions) -> Result<String> {
    if table.failed() {
        return Err(CodegenError::Parse(table.diagnostics().to_vec()));
    }

    let mut emitter = Emitter::new(table, opts);
    for def in table.definitions() {
        emitter.definition(def)?;
    }
    let tokens = emitter.finish()?;

    let file = syn::parse2(tokens)?;
    let sources: Vec<String> = table
        .files()
        .iter()
        .map(|f| {
            Path::new(f)
                .file_name()
                .map_or_else(|| f.clone(), |n| n.to_string_lossy().into_owned())
        })
        .collect();
    let mut out = format!(
        "// Code generated by rxdr-codegen from {}. DO NOT EDIT.\n\n",
        sources.join(", ")
    );
    out.push_str(&prettyplease::unparse(&file));
    Ok(out)
}

fn emit_err(message: impl Into<String>) -> CodegenError {
    CodegenError::Emit(message.into())
}

fn ident(name: &str) -> proc_macro2::Ident {
    format_ident!("{}", name)
}

/// Name of the free marshaling function of a type.
fn xdr_fn(hostid: &str) -> proc_macro2::Ident {
    format_ident!("xdr_{}", hostid.to_snake_case())
}

/// A signed literal; the sign is a separate token.
fn int_lit(v: i64) -> TokenStream {
    let lit = Literal::u64_unsuffixed(v.unsigned_abs());
    if v < 0 {
        quote!(-#lit)
    } else {
        quote!(#lit)
    }
}

/// `#[doc]` attributes from a raw comment.
fn doc_attrs(comment: Option<&str>) -> TokenStream {
    let lines = comment.map(comment_lines).unwrap_or_default();
    let lines = lines.iter().map(|l| format!(" {}", l));
    quote! { #(#[doc = #lines])* }
}

struct Emitter<'a> {
    table: &'a SymbolTable,
    opts: &'a GenOptions,
    decls: TokenStream,
    helpers: TokenStream,
    /// Helper aliases already written.
    helper_names: HashSet<String>,
    /// Host names of every declared type.
    type_names: HashSet<String>,
}

impl<'a> Emitter<'a> {
    fn new(table: &'a SymbolTable, opts: &'a GenOptions) -> Self {
        let type_names = table
            .definitions()
            .iter()
            .filter(|d| d.is_type())
            .map(|d| d.ident.hostid.clone())
            .collect();
        Self {
            table,
            opts,
            decls: TokenStream::new(),
            helpers: TokenStream::new(),
            helper_names: HashSet::new(),
            type_names,
        }
    }

    fn definition(&mut self, def: &Definition) -> Result<()> {
        match &def.kind {
            DefKind::Const(value) => self.constant(def, value),
            DefKind::Typedef(decl) => self.typedef(def, decl),
            DefKind::Enum(e) => self.enumeration(def, e),
            DefKind::Struct(s) => self.structure(def, s),
            DefKind::Union(u) => self.union(def, u),
            DefKind::Program(_) => Ok(()),
        }
    }

    fn finish(self) -> Result<TokenStream> {
        let mut imports = TokenStream::new();
        for import in &self.opts.imports {
            let text = import.trim();
            let text = if text.starts_with("use ") || text.starts_with("pub use ") {
                text.to_string()
            } else {
                format!("use {};", text.trim_end_matches(';'))
            };
            let tokens: TokenStream = text
                .parse()
                .map_err(|_| CodegenError::Import(import.clone()))?;
            syn::parse2::<syn::ItemUse>(tokens.clone())
                .map_err(|_| CodegenError::Import(import.clone()))?;
            imports.extend(tokens);
        }

        let prelude = if self.opts.boilerplate {
            quote! {
                #[allow(unused_imports)]
                pub use rxdr::prelude::*;
            }
        } else {
            TokenStream::new()
        };

        let decls = self.decls;
        let helpers = self.helpers;
        let body = quote! {
            #imports
            #prelude
            #decls
            #helpers
        };
        match self.opts.module() {
            Some(module) => {
                let module: syn::Ident = syn::parse_str(module)
                    .map_err(|_| emit_err(format!("invalid package name {:?}", module)))?;
                Ok(quote! { pub mod #module { #body } })
            }
            None => Ok(body),
        }
    }

    fn resolve(&self, value: &Value) -> Result<i64> {
        self.table
            .resolve(value)
            .ok_or_else(|| emit_err(format!("cannot resolve constant {}", value)))
    }

    fn bound(&self, value: &Value) -> Result<u32> {
        let n = self.resolve(value)?;
        u32::try_from(n).map_err(|_| emit_err(format!("invalid bound {} = {}", value, n)))
    }

    /// The definition a type name refers to; `None` for a type supplied
    /// by the imports.
    fn lookup(&self, name: &str) -> Result<Option<&'a Definition>> {
        match self.table.get(name) {
            Some(def) if def.is_type() => Ok(Some(def)),
            Some(_) => Err(emit_err(format!("{} is not a type", name))),
            None if !self.opts.imports.is_empty() => Ok(None),
            None => Err(emit_err(format!("unresolved type {}", name))),
        }
    }

    fn host_name(&self, name: &str) -> Result<String> {
        Ok(match self.lookup(name)? {
            Some(def) => def.ident.hostid.clone(),
            None => Ident::ty(name).hostid,
        })
    }

    fn base_type(&self, ty: &TypeSpec) -> Result<TokenStream> {
        Ok(match ty {
            TypeSpec::Int => quote!(i32),
            TypeSpec::UnsignedInt => quote!(u32),
            TypeSpec::Hyper => quote!(i64),
            TypeSpec::UnsignedHyper => quote!(u64),
            TypeSpec::Float => quote!(f32),
            TypeSpec::Double => quote!(f64),
            TypeSpec::Quadruple => quote!(Quadruple),
            TypeSpec::Bool => quote!(bool),
            TypeSpec::Opaque | TypeSpec::String => {
                return Err(emit_err("opaque and string need a length"))
            }
            TypeSpec::Named(name) => {
                let host = ident(&self.host_name(name)?);
                quote!(#host)
            }
        })
    }

    /// Part of a helper alias name standing for the element type.
    fn fragment(&self, ty: &TypeSpec) -> Result<String> {
        Ok(match ty {
            TypeSpec::Int => "Int".to_string(),
            TypeSpec::UnsignedInt => "Uint".to_string(),
            TypeSpec::Hyper => "Hyper".to_string(),
            TypeSpec::UnsignedHyper => "Uhyper".to_string(),
            TypeSpec::Float => "Float".to_string(),
            TypeSpec::Double => "Double".to_string(),
            TypeSpec::Quadruple => "Quadruple".to_string(),
            TypeSpec::Bool => "Bool".to_string(),
            TypeSpec::Opaque | TypeSpec::String => {
                return Err(emit_err("opaque and string need a length"))
            }
            TypeSpec::Named(name) => self.host_name(name)?,
        })
    }

    /// Name `target` as `name` in the helpers buffer, once.
    fn helper(&mut self, name: String, target: TokenStream) -> Result<TokenStream> {
        if self.type_names.contains(&name) {
            return Err(emit_err(format!(
                "helper type {} collides with a declared type",
                name
            )));
        }
        let id = ident(&name);
        if self.helper_names.insert(name) {
            self.helpers.extend(quote! { pub type #id = #target; });
        }
        Ok(quote!(#id))
    }

    /// Rust type of a declaration, creating helper aliases as needed.
    fn decl_type(&mut self, decl: &Decl) -> Result<TokenStream> {
        Ok(match (&decl.ty, &decl.qual) {
            (TypeSpec::Opaque, Qualifier::Array(n)) => {
                let n = Literal::usize_unsuffixed(self.bound(n)? as usize);
                quote!(FixedOpaque<#n>)
            }
            (TypeSpec::Opaque, Qualifier::Vector(None)) => quote!(XdrOpaque),
            (TypeSpec::Opaque, Qualifier::Vector(Some(b))) => {
                let b = Literal::u32_unsuffixed(self.bound(b)?);
                quote!(XdrOpaque<#b>)
            }
            (TypeSpec::String, Qualifier::Vector(None)) => quote!(XdrString),
            (TypeSpec::String, Qualifier::Vector(Some(b))) => {
                let b = Literal::u32_unsuffixed(self.bound(b)?);
                quote!(XdrString<#b>)
            }
            (ty, Qualifier::Scalar) => self.base_type(ty)?,
            (ty, Qualifier::Optional) => {
                let inner = self.base_type(ty)?;
                let name = format!("XdrPtr{}", self.fragment(ty)?);
                self.helper(name, quote!(Option<Box<#inner>>))?
            }
            (ty, Qualifier::Array(n)) => {
                let inner = self.base_type(ty)?;
                let n = Literal::usize_unsuffixed(self.bound(n)? as usize);
                quote!(XdrArray<#inner, #n>)
            }
            (ty, Qualifier::Vector(bound)) => {
                let inner = self.base_type(ty)?;
                let fragment = self.fragment(ty)?;
                match bound {
                    Some(b) => {
                        let n = self.bound(b)?;
                        let lit = Literal::u32_unsuffixed(n);
                        self.helper(
                            format!("XdrVec{}{}", n, fragment),
                            quote!(XdrVec<#inner, #lit>),
                        )?
                    }
                    None => self.helper(format!("XdrVec{}", fragment), quote!(XdrVec<#inner>))?,
                }
            }
        })
    }

    /// Statement marshaling `place` (an expression of type `&mut T`)
    /// under the field name bound to `n`.
    ///
    /// Only scalar fields of a named type go through its `xdr_<type>`
    /// function. Elements of vectors, arrays and optionals marshal through
    /// the element's `XdrType`, so an element whose type is a scalar typedef
    /// reports the underlying builtin and skips the typedef's override.
    fn marshal_call(&self, decl: &Decl, place: TokenStream) -> Result<TokenStream> {
        if let (TypeSpec::Named(name), Qualifier::Scalar) = (&decl.ty, &decl.qual) {
            if let Some(def) = self.lookup(name)? {
                let f = xdr_fn(&def.ident.hostid);
                return Ok(quote! { #f(v, &n, #place)?; });
            }
        }
        Ok(quote! { XdrType::xdr_marshal_value(#place, v, &n)?; })
    }

    /// The free `xdr_<type>` function: the override hook, then `body`.
    fn marshal_fn(&mut self, def: &Definition, body: TokenStream) {
        let name = ident(&def.ident.hostid);
        let f = xdr_fn(&def.ident.hostid);
        let xid = &def.ident.xid;
        self.helpers.extend(quote! {
            pub fn #f(v: &mut dyn XdrVisitor, name: &str, value: &mut #name) -> XdrResult<()> {
                if let Some(result) = v.marshal_override(name, #xid, value) {
                    return result;
                }
                #body
            }
        });
    }

    fn constant(&mut self, def: &Definition, value: &Value) -> Result<()> {
        let name = ident(&def.ident.hostid);
        let value = int_lit(self.resolve(value)?);
        let doc = doc_attrs(def.comment.as_deref());
        self.decls.extend(quote! {
            #doc
            pub const #name: i64 = #value;
        });
        Ok(())
    }

    fn typedef(&mut self, def: &Definition, decl: &Decl) -> Result<()> {
        let name = ident(&def.ident.hostid);
        let xid = &def.ident.xid;
        let doc = doc_attrs(def.comment.as_deref());
        let target = self.decl_type(decl)?;
        self.decls.extend(quote! {
            #doc
            pub type #name = #target;
        });

        let body = if decl.qual == Qualifier::Scalar {
            let named = match &decl.ty {
                TypeSpec::Named(n) => self.lookup(n)?,
                _ => None,
            };
            let builtin = match named {
                Some(_) => self.table.resolve_type(&decl.ty).map_err(emit_err)?,
                None => &decl.ty,
            };
            match (builtin, named) {
                (
                    TypeSpec::Int | TypeSpec::UnsignedInt | TypeSpec::Float | TypeSpec::Bool,
                    _,
                ) => quote! {
                    v.marshal(name, XdrValue::Num32(&mut XdrNamed::new(#xid, value)))
                },
                (TypeSpec::Hyper | TypeSpec::UnsignedHyper | TypeSpec::Double, _) => quote! {
                    v.marshal(name, XdrValue::Num64(&mut XdrNamed::new(#xid, value)))
                },
                (_, Some(target)) => {
                    let f = xdr_fn(&target.ident.hostid);
                    quote! { #f(v, name, value) }
                }
                (_, None) => quote! { XdrType::xdr_marshal_value(value, v, name) },
            }
        } else {
            quote! { XdrType::xdr_marshal_value(value, v, name) }
        };
        self.marshal_fn(def, body);
        Ok(())
    }

    fn structure(&mut self, def: &Definition, s: &StructDef) -> Result<()> {
        let name = ident(&def.ident.hostid);
        let xid = &def.ident.xid;
        let f = xdr_fn(&def.ident.hostid);
        let doc = doc_attrs(def.comment.as_deref());

        let mut hosts = HashSet::new();
        let mut fields = Vec::new();
        let mut marshals = Vec::new();
        let mut inits = Vec::new();
        for decl in &s.fields {
            if !hosts.insert(decl.ident.hostid.as_str()) {
                return Err(emit_err(format!(
                    "struct {}: two fields are named {}",
                    xid, decl.ident.hostid
                )));
            }
            let field = ident(&decl.ident.hostid);
            let ty = self.decl_type(decl)?;
            let field_doc = doc_attrs(decl.doc());
            fields.push(quote! { #field_doc pub #field: #ty });
            let field_xid = &decl.ident.xid;
            let call = self.marshal_call(decl, quote!(&mut self.#field))?;
            marshals.push(quote! {
                let n = field_name(v, name, #field_xid);
                #call
            });
            inits.push(quote! { XdrType::xdr_initialize(&mut self.#field); });
        }
        if marshals.is_empty() {
            marshals.push(quote! { let _ = (v, name); });
        }

        self.decls.extend(quote! {
            #doc
            #[derive(Debug, Clone, PartialEq, Default)]
            pub struct #name {
                #(#fields,)*
            }
        });
        self.helpers.extend(quote! {
            impl XdrAggregate for #name {
                fn xdr_marshal(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
                    #(#marshals)*
                    Ok(())
                }
                fn xdr_type_name(&self) -> &'static str {
                    #xid
                }
            }

            impl XdrType for #name {
                fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
                    #f(v, name, self)
                }
                fn xdr_initialize(&mut self) {
                    #(#inits)*
                }
            }
        });
        self.marshal_fn(def, quote! { v.marshal(name, XdrValue::Aggregate(value)) });
        Ok(())
    }
}
