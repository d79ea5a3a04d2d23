use std::collections::HashSet;

use quote::quote;

use super::{doc_attrs, emit_err, ident, int_lit, xdr_fn, Emitter};
use crate::ast::{Definition, EnumDef};
use crate::error::Result;
use crate::lexer::comment_lines;

impl Emitter<'_> {
    /// An enum is a `Copy` newtype over `i32` with one associated constant
    /// per tag, so values without a tag survive a round trip.
    pub(super) fn enumeration(&mut self, def: &Definition, e: &EnumDef) -> Result<()> {
        let name = ident(&def.ident.hostid);
        let xid = &def.ident.xid;
        let doc = doc_attrs(def.comment.as_deref());

        let mut hosts = HashSet::new();
        let mut values = Vec::new();
        let mut consts = Vec::new();
        let mut names = Vec::new();
        let mut comments = Vec::new();
        for tag in &e.tags {
            let resolved = self.resolve(&tag.value)?;
            let value = i32::try_from(resolved).map_err(|_| {
                emit_err(format!("{}: {} = {} does not fit an int", xid, tag.ident.xid, resolved))
            })?;
            if !hosts.insert(tag.ident.hostid.as_str()) {
                return Err(emit_err(format!(
                    "{}: two tags are named {}",
                    xid, tag.ident.hostid
                )));
            }
            let constant = ident(&tag.ident.hostid);
            let lit = int_lit(i64::from(value));
            let tag_doc = doc_attrs(tag.comment.as_deref());
            consts.push(quote! {
                #tag_doc
                pub const #constant: #name = #name(#lit);
            });
            let tag_xid = &tag.ident.xid;
            names.push(quote! { (#lit, #tag_xid) });
            if let Some(comment) = &tag.comment {
                let text = comment_lines(comment).join("\n");
                comments.push(quote! { (#lit, #text) });
            }
            values.push(value);
        }

        let has_zero = values.contains(&0);
        let default = int_lit(i64::from(if has_zero {
            0
        } else {
            values.first().copied().unwrap_or(0)
        }));

        let (comments_const, comments_fn) = if self.opts.enum_comments {
            (
                quote! {
                    pub const XDR_COMMENTS: &'static [(i32, &'static str)] = &[#(#comments),*];
                },
                quote! {
                    fn xdr_enum_comments(&self) -> &'static [(i32, &'static str)] {
                        Self::XDR_COMMENTS
                    }
                },
            )
        } else {
            (quote!(), quote!())
        };
        let initialize = if has_zero {
            quote!()
        } else {
            quote! {
                fn xdr_initialize(&mut self) {
                    if self.0 == 0 {
                        *self = Self::default();
                    }
                }
            }
        };
        let f = xdr_fn(&def.ident.hostid);

        self.decls.extend(quote! {
            #doc
            #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct #name(pub i32);
        });
        self.helpers.extend(quote! {
            impl #name {
                #(#consts)*
                pub const XDR_NAMES: &'static [(i32, &'static str)] = &[#(#names),*];
                #comments_const
            }

            impl Default for #name {
                fn default() -> Self {
                    #name(#default)
                }
            }

            impl ::std::fmt::Debug for #name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.write_str(&XdrEnum::xdr_enum_string(self))
                }
            }

            impl ::std::fmt::Display for #name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.write_str(&XdrEnum::xdr_enum_string(self))
                }
            }

            impl ::std::str::FromStr for #name {
                type Err = XdrError;
                fn from_str(s: &str) -> ::std::result::Result<Self, XdrError> {
                    let mut value = #name(0);
                    XdrEnum::xdr_enum_scan(&mut value, s)?;
                    Ok(value)
                }
            }

            impl XdrNum32 for #name {
                fn get_u32(&self) -> u32 {
                    self.0 as u32
                }
                fn set_u32(&mut self, v: u32) -> XdrResult<()> {
                    self.0 = v as i32;
                    Ok(())
                }
                fn num_kind(&self) -> NumKind {
                    NumKind::Signed
                }
                fn xdr_type_name(&self) -> &'static str {
                    #xid
                }
            }

            impl XdrEnum for #name {
                fn xdr_enum_names(&self) -> &'static [(i32, &'static str)] {
                    Self::XDR_NAMES
                }
                #comments_fn
            }

            impl XdrType for #name {
                fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
                    #f(v, name, self)
                }
                #initialize
            }
        });
        self.marshal_fn(def, quote! { v.marshal(name, XdrValue::Enum(value)) });
        Ok(())
    }
}
