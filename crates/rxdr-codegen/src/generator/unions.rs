use std::collections::HashSet;

use heck::ToUpperCamelCase;
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use super::{doc_attrs, emit_err, ident, int_lit, Emitter};
use crate::ast::{DefKind, Definition, EnumDef, Qualifier, TypeSpec, UnionDef, Value};
use crate::error::Result;

/// What a union switches on, after following typedefs.
enum Discriminant<'a> {
    Int,
    Unsigned,
    Bool,
    Enum(&'a Definition, &'a EnumDef),
}

impl Discriminant<'_> {
    fn zero(&self) -> TokenStream {
        match self {
            Discriminant::Int | Discriminant::Unsigned => quote!(0),
            Discriminant::Bool => quote!(false),
            Discriminant::Enum(def, _) => {
                let host = ident(&def.ident.hostid);
                quote!(#host(0))
            }
        }
    }
}

/// Method name without a raw-identifier prefix, for building other names.
fn bare(hostid: &str) -> &str {
    hostid.trim_start_matches("r#")
}

impl<'a> Emitter<'a> {
    fn discriminant(&self, union: &str, u: &UnionDef) -> Result<Discriminant<'a>> {
        let disc = &u.discriminant;
        let invalid = || {
            emit_err(format!(
                "union {}: discriminant {} must be int, unsigned int, bool or an enum",
                union, disc.ident.xid
            ))
        };
        if disc.qual != Qualifier::Scalar {
            return Err(invalid());
        }
        let ty = match &disc.ty {
            TypeSpec::Named(name) => {
                if self.lookup(name)?.is_none() {
                    return Err(invalid());
                }
                self.table.resolve_type(&disc.ty).map_err(emit_err)?
            }
            ty => ty,
        };
        match ty {
            TypeSpec::Int => Ok(Discriminant::Int),
            TypeSpec::UnsignedInt => Ok(Discriminant::Unsigned),
            TypeSpec::Bool => Ok(Discriminant::Bool),
            TypeSpec::Named(name) => {
                let def = self.table.get(name).ok_or_else(invalid)?;
                match &def.kind {
                    DefKind::Enum(e) => Ok(Discriminant::Enum(def, e)),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }

    /// Numeric value and Rust pattern of one case label.
    fn case_label(
        &self,
        union: &str,
        disc: &Discriminant<'_>,
        value: &Value,
    ) -> Result<(i64, TokenStream)> {
        let n = self.resolve(value)?;
        let out_of_range = || emit_err(format!("union {}: case {} is out of range", union, value));
        match disc {
            Discriminant::Bool => match n {
                0 => Ok((0, quote!(false))),
                1 => Ok((1, quote!(true))),
                _ => Err(out_of_range()),
            },
            Discriminant::Int => {
                i32::try_from(n).map_err(|_| out_of_range())?;
                Ok((n, int_lit(n)))
            }
            Discriminant::Unsigned => {
                u32::try_from(n).map_err(|_| out_of_range())?;
                Ok((n, int_lit(n)))
            }
            Discriminant::Enum(def, _) => {
                let host = ident(&def.ident.hostid);
                if let Value::Ident(name) = value {
                    if let Some((owner, tag)) = self.table.tag(name) {
                        if owner.ident.xid == def.ident.xid {
                            let tag = ident(&tag.ident.hostid);
                            return Ok((n, quote!(#host::#tag)));
                        }
                        if !self.opts.lax_discriminants {
                            return Err(emit_err(format!(
                                "union {}: case {} is a tag of {}, not of {}",
                                union, name, owner.ident.xid, def.ident.xid
                            )));
                        }
                    }
                }
                let lit = int_lit(i64::from(i32::try_from(n).map_err(|_| out_of_range())?));
                Ok((n, quote!(#host(#lit))))
            }
        }
    }

    /// A union is a struct holding the discriminant and an arm enum whose
    /// variant always agrees with it.
    pub(super) fn union(&mut self, def: &Definition, u: &UnionDef) -> Result<()> {
        let xid = &def.ident.xid;
        let name = ident(&def.ident.hostid);
        let arm_name = {
            let plain = format!("{}Arm", def.ident.hostid);
            if self.type_names.contains(&plain) {
                format!("{}XdrArm", def.ident.hostid)
            } else {
                plain
            }
        };
        let arm_enum = ident(&arm_name);
        let doc = doc_attrs(def.comment.as_deref());

        let disc = self.discriminant(xid, u)?;
        let disc_decl = &u.discriminant;
        let disc_xid = &disc_decl.ident.xid;
        let disc_getter = ident(&disc_decl.ident.hostid);
        let disc_doc = doc_attrs(disc_decl.doc());
        let setter = format_ident!("set_{}", bare(&disc_decl.ident.hostid));
        let tag_ty = self.decl_type(disc_decl)?;
        let tag_call = self.marshal_call(disc_decl, quote!(&mut tag))?;

        let mut methods: HashSet<String> = ["new", "xdr_arm_index", "xdr_fresh_arm"]
            .into_iter()
            .map(String::from)
            .collect();
        methods.insert(bare(&disc_decl.ident.hostid).to_string());
        methods.insert(setter.to_string());
        let mut variants_seen = HashSet::from(["Void".to_string()]);

        let mut seen_values = HashSet::new();
        let mut accepts_zero = false;
        let mut sentinel: Option<TokenStream> = None;
        let mut default_index: Option<usize> = None;
        let mut arm_count = 0usize;

        let mut index_arms = Vec::new();
        let mut variants = Vec::new();
        let mut fresh_arms = Vec::new();
        let mut variant_indexes = Vec::new();
        let mut accessors = Vec::new();
        let mut body_arms = Vec::new();
        let mut body_names = Vec::new();
        let mut marshal_arms = Vec::new();
        let mut init_arms = Vec::new();

        for arm in &u.arms {
            let index = match arm.decl {
                Some(_) => {
                    arm_count += 1;
                    arm_count
                }
                None => 0,
            };
            let index_lit = Literal::usize_unsuffixed(index);

            let mut patterns = Vec::new();
            for case in &arm.cases {
                let (n, pattern) = self.case_label(xid, &disc, case)?;
                if !seen_values.insert(n) {
                    return Err(emit_err(format!(
                        "union {}: duplicate case {}",
                        xid, case
                    )));
                }
                if n == 0 {
                    accepts_zero = true;
                } else if sentinel.is_none() {
                    sentinel = Some(pattern.clone());
                }
                patterns.push(pattern);
            }
            if !patterns.is_empty() {
                index_arms.push(quote! { #(#patterns)|* => Some(#index_lit), });
            }
            if arm.is_default {
                default_index = Some(index);
                accepts_zero = true;
            }

            let Some(decl) = &arm.decl else {
                continue;
            };
            let arm_xid = &decl.ident.xid;
            let variant_name = arm_xid.to_upper_camel_case();
            if !variants_seen.insert(variant_name.clone()) {
                return Err(emit_err(format!(
                    "union {}: arm {} clashes with another arm",
                    xid, arm_xid
                )));
            }
            let base = bare(&decl.ident.hostid);
            for method in [base.to_string(), format!("{}_mut", base), format!("must_{}", base)] {
                if !methods.insert(method.clone()) {
                    return Err(emit_err(format!(
                        "union {}: accessor {} of arm {} is already taken",
                        xid, method, arm_xid
                    )));
                }
            }

            let variant = ident(&variant_name);
            let ty = self.decl_type(decl)?;
            variants.push(quote! { #variant(#ty) });
            fresh_arms.push(quote! {
                Some(#index_lit) => #arm_enum::#variant({
                    let mut body: #ty = Default::default();
                    XdrType::xdr_initialize(&mut body);
                    body
                }),
            });
            variant_indexes.push(quote! { #arm_enum::#variant(_) => #index_lit, });

            let getter = ident(&decl.ident.hostid);
            let getter_mut = format_ident!("{}_mut", base);
            let must = format_ident!("must_{}", base);
            let arm_doc = doc_attrs(decl.doc());
            let panic_message = format!("{}.{} is not the active arm", xid, arm_xid);
            accessors.push(quote! {
                #arm_doc
                pub fn #getter(&self) -> Option<&#ty> {
                    match &self.arm {
                        #arm_enum::#variant(body) => Some(body),
                        _ => None,
                    }
                }

                pub fn #getter_mut(&mut self) -> Option<&mut #ty> {
                    match &mut self.arm {
                        #arm_enum::#variant(body) => Some(body),
                        _ => None,
                    }
                }

                /// Panics unless the discriminant selects this arm.
                pub fn #must(&mut self) -> &mut #ty {
                    match &mut self.arm {
                        #arm_enum::#variant(body) => body,
                        _ => panic!(#panic_message),
                    }
                }
            });

            body_arms.push(quote! { #arm_enum::#variant(body) => Some(body as &mut dyn XdrType), });
            body_names.push(quote! { #arm_enum::#variant(_) => #arm_xid, });
            let call = self.marshal_call(decl, quote!(body))?;
            marshal_arms.push(quote! {
                #arm_enum::#variant(body) => {
                    let n = field_name(v, name, #arm_xid);
                    #call
                }
            });
            init_arms.push(quote! { #arm_enum::#variant(body) => XdrType::xdr_initialize(body), });
        }

        let fallback = match default_index {
            Some(index) => {
                let index = Literal::usize_unsuffixed(index);
                quote!(Some(#index))
            }
            None => quote!(None),
        };

        let zero = disc.zero();
        let zero_ok = accepts_zero
            && match &disc {
                Discriminant::Enum(_, e) => e
                    .tags
                    .iter()
                    .any(|t| self.table.resolve(&t.value) == Some(0)),
                _ => true,
            };
        let sentinel = match sentinel {
            Some(pattern) => pattern,
            None => match &disc {
                Discriminant::Enum(enum_def, e) => e
                    .tags
                    .iter()
                    .find(|t| self.table.resolve(&t.value).is_some_and(|v| v != 0))
                    .map(|t| {
                        let host = ident(&enum_def.ident.hostid);
                        let tag = ident(&t.ident.hostid);
                        quote!(#host::#tag)
                    })
                    .unwrap_or_else(|| zero.clone()),
                _ => zero.clone(),
            },
        };
        let (initial, reset) = if zero_ok {
            (zero.clone(), quote!())
        } else {
            (
                sentinel.clone(),
                quote! {
                    if self.tag == #zero {
                        self.#setter(#sentinel);
                    }
                },
            )
        };
        let f = super::xdr_fn(&def.ident.hostid);

        self.decls.extend(quote! {
            #doc
            #[derive(Debug, Clone, PartialEq)]
            pub struct #name {
                tag: #tag_ty,
                arm: #arm_enum,
            }
        });
        self.helpers.extend(quote! {
            #[derive(Debug, Clone, PartialEq)]
            enum #arm_enum {
                Void,
                #(#variants,)*
            }

            impl #arm_enum {
                fn xdr_index(&self) -> usize {
                    match self {
                        #(#variant_indexes)*
                        _ => 0,
                    }
                }
            }

            impl #name {
                pub fn new(tag: #tag_ty) -> Self {
                    Self {
                        tag,
                        arm: Self::xdr_fresh_arm(tag),
                    }
                }

                #disc_doc
                pub fn #disc_getter(&self) -> #tag_ty {
                    self.tag
                }

                /// Set the discriminant. Selecting a different arm replaces
                /// the body with a fresh one.
                pub fn #setter(&mut self, tag: #tag_ty) {
                    let index = Self::xdr_arm_index(tag).unwrap_or(0);
                    self.tag = tag;
                    if index != self.arm.xdr_index() {
                        self.arm = Self::xdr_fresh_arm(tag);
                    }
                }

                #(#accessors)*

                #[allow(unreachable_patterns)]
                fn xdr_arm_index(tag: #tag_ty) -> Option<usize> {
                    match tag {
                        #(#index_arms)*
                        _ => #fallback,
                    }
                }

                fn xdr_fresh_arm(tag: #tag_ty) -> #arm_enum {
                    match Self::xdr_arm_index(tag) {
                        #(#fresh_arms)*
                        _ => #arm_enum::Void,
                    }
                }
            }

            impl Default for #name {
                fn default() -> Self {
                    Self::new(#initial)
                }
            }

            impl XdrUnion for #name {
                fn xdr_union_tag(&self) -> u32 {
                    XdrNum32::get_u32(&self.tag)
                }
                fn xdr_union_tag_name(&self) -> &'static str {
                    #disc_xid
                }
                fn xdr_union_body(&mut self) -> Option<&mut dyn XdrType> {
                    match &mut self.arm {
                        #(#body_arms)*
                        _ => None,
                    }
                }
                fn xdr_union_body_name(&self) -> &'static str {
                    match &self.arm {
                        #(#body_names)*
                        _ => "",
                    }
                }
                fn xdr_valid(&self) -> bool {
                    Self::xdr_arm_index(self.tag).is_some()
                }
            }

            impl XdrAggregate for #name {
                fn xdr_marshal(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
                    let mut tag = self.tag;
                    let n = field_name(v, name, #disc_xid);
                    #tag_call
                    if tag != self.tag {
                        self.#setter(tag);
                    }
                    if !XdrUnion::xdr_valid(self) {
                        return Err(XdrError::InvalidUnion {
                            type_name: #xid,
                            tag: self.tag.to_string(),
                        });
                    }
                    match &mut self.arm {
                        #(#marshal_arms)*
                        _ => {}
                    }
                    Ok(())
                }
                fn xdr_type_name(&self) -> &'static str {
                    #xid
                }
                fn as_union(&mut self) -> Option<&mut dyn XdrUnion> {
                    Some(self)
                }
            }

            impl XdrType for #name {
                fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
                    #f(v, name, self)
                }
                fn xdr_initialize(&mut self) {
                    #reset
                    match &mut self.arm {
                        #(#init_arms)*
                        _ => {}
                    }
                }
            }
        });
        self.marshal_fn(def, quote! { v.marshal(name, XdrValue::Aggregate(value)) });
        Ok(())
    }
}
