//! Builtin XDR scalars mapped onto Rust primitives.
//!
//! | XDR              | Rust         |
//! |------------------|--------------|
//! | `int`            | `i32`        |
//! | `unsigned int`   | `u32`        |
//! | `bool`           | `bool`       |
//! | `float`          | `f32`        |
//! | `hyper`          | `i64`        |
//! | `unsigned hyper` | `u64`        |
//! | `double`         | `f64`        |
//! | `quadruple`      | [`Quadruple`]|

use crate::error::{XdrError, XdrResult};
use crate::value::{NumKind, XdrNum32, XdrNum64, XdrType, XdrValue, XdrVisitor};

macro_rules! impl_num {
    ($ty:ty, $trait:ident, $get:ident, $set:ident, $word:ty, $kind:expr, $name:expr) => {
        impl $trait for $ty {
            fn $get(&self) -> $word {
                *self as $word
            }
            fn $set(&mut self, v: $word) -> XdrResult<()> {
                *self = v as $ty;
                Ok(())
            }
            fn num_kind(&self) -> NumKind {
                $kind
            }
            fn xdr_type_name(&self) -> &'static str {
                $name
            }
        }
    };
}

impl_num!(i32, XdrNum32, get_u32, set_u32, u32, NumKind::Signed, "int");
impl_num!(u32, XdrNum32, get_u32, set_u32, u32, NumKind::Unsigned, "unsigned int");
impl_num!(i64, XdrNum64, get_u64, set_u64, u64, NumKind::Signed, "hyper");
impl_num!(u64, XdrNum64, get_u64, set_u64, u64, NumKind::Unsigned, "unsigned hyper");

impl XdrNum32 for bool {
    fn get_u32(&self) -> u32 {
        u32::from(*self)
    }
    fn set_u32(&mut self, v: u32) -> XdrResult<()> {
        *self = match v {
            0 => false,
            1 => true,
            _ => return Err(XdrError::InvalidBool(v)),
        };
        Ok(())
    }
    fn num_kind(&self) -> NumKind {
        NumKind::Bool
    }
    fn xdr_type_name(&self) -> &'static str {
        "bool"
    }
}

impl XdrNum32 for f32 {
    fn get_u32(&self) -> u32 {
        self.to_bits()
    }
    fn set_u32(&mut self, v: u32) -> XdrResult<()> {
        *self = f32::from_bits(v);
        Ok(())
    }
    fn num_kind(&self) -> NumKind {
        NumKind::Float
    }
    fn xdr_type_name(&self) -> &'static str {
        "float"
    }
}

impl XdrNum64 for f64 {
    fn get_u64(&self) -> u64 {
        self.to_bits()
    }
    fn set_u64(&mut self, v: u64) -> XdrResult<()> {
        *self = f64::from_bits(v);
        Ok(())
    }
    fn num_kind(&self) -> NumKind {
        NumKind::Float
    }
    fn xdr_type_name(&self) -> &'static str {
        "double"
    }
}

macro_rules! impl_scalar_type {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl XdrType for $ty {
                fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
                    v.marshal(name, XdrValue::$variant(self))
                }
            }
        )*
    };
}

impl_scalar_type!(Num32: i32, u32, bool, f32);
impl_scalar_type!(Num64: i64, u64, f64);

/// IEEE quadruple-precision float, kept as its 16 raw big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Quadruple(pub [u8; 16]);

impl XdrType for Quadruple {
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        v.marshal(name, XdrValue::FixedBytes(&mut self.0))
    }
}
