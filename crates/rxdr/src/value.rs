//! The visitor protocol.
//!
//! Generated code never contains per-format logic. Every emitted type
//! knows how to hand each of its fields, in wire order, to an
//! [`XdrVisitor`], wrapped in an [`XdrValue`] that says what *shape* the
//! field has. A back-end (binary, txrep, JSON, hashing, ...) is therefore
//! just one `match` over the shapes below.
//!
//! The same walk is used for reading and writing. Encoding visitors only
//! call the getters of a handle; decoding visitors call the setters and
//! overwrite the tree they were given.

use std::any::Any;
use std::fmt;

use crate::error::{XdrError, XdrResult};

/// Bound of a variable-length construct declared without one (`<>`).
pub const XDR_UNBOUNDED: u32 = u32::MAX;

/// How text back-ends should interpret the bits of a numeric handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumKind {
    Signed,
    Unsigned,
    Bool,
    Float,
}

/// Handle onto a value that travels as one 32-bit XDR word.
pub trait XdrNum32 {
    fn get_u32(&self) -> u32;
    fn set_u32(&mut self, v: u32) -> XdrResult<()>;
    fn num_kind(&self) -> NumKind;
    fn xdr_type_name(&self) -> &'static str;
}

/// Handle onto a value that travels as one 64-bit XDR word.
pub trait XdrNum64 {
    fn get_u64(&self) -> u64;
    fn set_u64(&mut self, v: u64) -> XdrResult<()>;
    fn num_kind(&self) -> NumKind;
    fn xdr_type_name(&self) -> &'static str;
}

/// Handle onto an enum. Enums travel as signed 32-bit words; the name
/// table lets text back-ends render and scan tag names.
pub trait XdrEnum: XdrNum32 {
    /// Every tag as `(value, name)`, in declaration order.
    fn xdr_enum_names(&self) -> &'static [(i32, &'static str)];

    /// Tag comments as `(value, comment)`; empty unless the generator was
    /// asked for them.
    fn xdr_enum_comments(&self) -> &'static [(i32, &'static str)] {
        &[]
    }

    fn xdr_enum_value(&self) -> i32 {
        self.get_u32() as i32
    }

    fn xdr_enum_name(&self) -> Option<&'static str> {
        let value = self.xdr_enum_value();
        self.xdr_enum_names()
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, name)| *name)
    }

    /// True iff the current value is one of the declared tags.
    fn xdr_enum_valid(&self) -> bool {
        self.xdr_enum_name().is_some()
    }

    /// The tag name, or `Type#value` for a value with no name.
    fn xdr_enum_string(&self) -> String {
        match self.xdr_enum_name() {
            Some(name) => name.to_string(),
            None => format!("{}#{}", self.xdr_type_name(), self.xdr_enum_value()),
        }
    }

    /// Inverse of [`xdr_enum_string`](XdrEnum::xdr_enum_string). Also accepts
    /// `#value` and a bare decimal value.
    fn xdr_enum_scan(&mut self, text: &str) -> XdrResult<()> {
        let text = text.trim();
        if let Some(&(value, _)) = self.xdr_enum_names().iter().find(|(_, n)| *n == text) {
            return self.set_u32(value as u32);
        }
        let digits = match text.rsplit_once('#') {
            Some((prefix, digits)) if prefix.is_empty() || prefix == self.xdr_type_name() => {
                digits
            }
            Some(_) => "",
            None => text,
        };
        let value: i32 = digits.parse().map_err(|_| XdrError::Parse {
            type_name: self.xdr_type_name(),
            text: text.to_string(),
        })?;
        self.set_u32(value as u32)
    }
}

/// Handle onto variable-length opaque data (`opaque<N>`).
pub trait XdrVarBytes {
    fn get_bytes(&self) -> &[u8];
    fn set_bytes(&mut self, bytes: Vec<u8>) -> XdrResult<()>;
    fn xdr_bound(&self) -> u32;
    fn xdr_type_name(&self) -> &'static str;
}

/// Handle onto a bounded string (`string<N>`).
pub trait XdrStr {
    fn get_string(&self) -> &str;
    fn set_string(&mut self, s: String) -> XdrResult<()>;
    fn xdr_bound(&self) -> u32;
    fn xdr_type_name(&self) -> &'static str;
}

/// Handle onto an optional (`T *`).
pub trait XdrOptional {
    fn get_present(&self) -> bool;
    /// Making an absent value present installs a default element.
    fn set_present(&mut self, present: bool);
    /// Marshal the element; a no-op when absent.
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()>;
    fn xdr_type_name(&self) -> &'static str;
}

/// Handle onto a bounded vector (`T<N>`) or, when
/// [`xdr_fixed_len`](XdrVector::xdr_fixed_len) is set, a fixed array (`T[N]`).
pub trait XdrVector {
    fn get_vec_len(&self) -> u32;
    /// Resize to `n` elements; fails when `n` violates the bound.
    fn set_vec_len(&mut self, n: u32) -> XdrResult<()>;
    fn xdr_bound(&self) -> u32;
    fn xdr_fixed_len(&self) -> Option<u32> {
        None
    }
    /// Marshal the first `n` elements as `name[i]`.
    fn xdr_marshal_n(&mut self, v: &mut dyn XdrVisitor, name: &str, n: u32) -> XdrResult<()>;
    fn xdr_type_name(&self) -> &'static str;
}

/// A struct or union: something that walks its own fields.
pub trait XdrAggregate {
    fn xdr_marshal(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()>;
    fn xdr_type_name(&self) -> &'static str;
    fn as_union(&mut self) -> Option<&mut dyn XdrUnion> {
        None
    }
}

/// Reflection over a discriminated union.
pub trait XdrUnion: XdrAggregate {
    fn xdr_union_tag(&self) -> u32;
    /// IDL name of the discriminant field.
    fn xdr_union_tag_name(&self) -> &'static str;
    /// The active arm, or `None` for a `void` arm.
    fn xdr_union_body(&mut self) -> Option<&mut dyn XdrType>;
    /// IDL name of the active arm's field, empty for `void`.
    fn xdr_union_body_name(&self) -> &'static str;
    /// True iff the discriminant matches a case or the union has `default`.
    fn xdr_valid(&self) -> bool;
}

/// The closed set of shapes a visitor is asked to marshal.
pub enum XdrValue<'a> {
    Num32(&'a mut dyn XdrNum32),
    Num64(&'a mut dyn XdrNum64),
    Enum(&'a mut dyn XdrEnum),
    /// Fixed-length opaque data, marshaled in place without a length.
    FixedBytes(&'a mut [u8]),
    VarBytes(&'a mut dyn XdrVarBytes),
    String(&'a mut dyn XdrStr),
    Optional(&'a mut dyn XdrOptional),
    Vector(&'a mut dyn XdrVector),
    Aggregate(&'a mut dyn XdrAggregate),
}

impl XdrValue<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            XdrValue::Num32(n) => n.xdr_type_name(),
            XdrValue::Num64(n) => n.xdr_type_name(),
            XdrValue::Enum(e) => e.xdr_type_name(),
            XdrValue::FixedBytes(_) => "opaque[]",
            XdrValue::VarBytes(b) => b.xdr_type_name(),
            XdrValue::String(s) => s.xdr_type_name(),
            XdrValue::Optional(o) => o.xdr_type_name(),
            XdrValue::Vector(v) => v.xdr_type_name(),
            XdrValue::Aggregate(a) => a.xdr_type_name(),
        }
    }
}

impl fmt::Debug for XdrValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XdrValue({})", self.type_name())
    }
}

/// A marshaling back-end.
///
/// A visitor instance serves exactly one walk and is not shared between
/// threads while walking.
pub trait XdrVisitor {
    /// Compose a field name. Back-ends that do not care about names
    /// return an empty string without formatting anything.
    fn sprintf(&self, args: fmt::Arguments<'_>) -> String;

    /// Marshal one value, dispatching on its shape.
    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()>;

    /// Per-type override hook. Every generated `xdr_<type>` function asks
    /// this first; returning `Some` takes over marshaling of that value.
    fn marshal_override(
        &mut self,
        _name: &str,
        _type_name: &'static str,
        _value: &mut dyn Any,
    ) -> Option<XdrResult<()>> {
        None
    }
}

/// Implemented by every type that can be walked by a visitor.
pub trait XdrType: Any {
    /// Hand `self` to the visitor under `name`.
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()>;

    /// Replace zero values that are not valid members (enums without a
    /// zero tag, unions whose zero discriminant selects no arm) with the
    /// canonical sentinel, recursively.
    fn xdr_initialize(&mut self) {}
}

/// Name of field `field` inside the aggregate called `prefix`.
pub fn field_name(v: &dyn XdrVisitor, prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        v.sprintf(format_args!("{}", field))
    } else {
        v.sprintf(format_args!("{}.{}", prefix, field))
    }
}

/// Name of element `i` of the vector called `prefix`.
pub fn index_name(v: &dyn XdrVisitor, prefix: &str, i: u32) -> String {
    v.sprintf(format_args!("{}[{}]", prefix, i))
}

/// A scalar handle that reports a typedef's name instead of the
/// underlying builtin, so back-ends can recognise e.g. `TimePoint`.
pub struct XdrNamed<'a, T: ?Sized> {
    type_name: &'static str,
    inner: &'a mut T,
}

impl<'a, T: ?Sized> XdrNamed<'a, T> {
    pub fn new(type_name: &'static str, inner: &'a mut T) -> Self {
        Self { type_name, inner }
    }
}

impl<T: XdrNum32 + ?Sized> XdrNum32 for XdrNamed<'_, T> {
    fn get_u32(&self) -> u32 {
        self.inner.get_u32()
    }
    fn set_u32(&mut self, v: u32) -> XdrResult<()> {
        self.inner.set_u32(v)
    }
    fn num_kind(&self) -> NumKind {
        self.inner.num_kind()
    }
    fn xdr_type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<T: XdrNum64 + ?Sized> XdrNum64 for XdrNamed<'_, T> {
    fn get_u64(&self) -> u64 {
        self.inner.get_u64()
    }
    fn set_u64(&mut self, v: u64) -> XdrResult<()> {
        self.inner.set_u64(v)
    }
    fn num_kind(&self) -> NumKind {
        self.inner.num_kind()
    }
    fn xdr_type_name(&self) -> &'static str {
        self.type_name
    }
}
