//! Run-time support for types generated by `rxdr-codegen` from XDR
//! (RFC 4506) interface definitions.
//!
//! Generated types implement [`XdrType`] and describe themselves to an
//! [`XdrVisitor`] field by field. This crate provides the visitors:
//!
//! * [`XdrOut`] / [`XdrIn`]: the binary wire format,
//! * [`TxrepOut`] / [`from_txrep`]: the human-editable `path: value` text,
//! * [`JsonOut`] / [`JsonIn`]: JSON, also usable through serde via [`Json`],
//! * [`xdr_sha256`]: hashing of the binary encoding,
//! * [`xdr_extract`] / [`xdr_walk`]: access to single fields by path.

mod de;
mod error;
mod extract;
mod json;
pub mod opaque;
mod scalar;
mod ser;
mod sha256;
pub mod strkey;
pub mod txrep;
mod value;
mod vec;

pub use de::XdrIn;
pub use error::{XdrError, XdrResult};
pub use extract::{xdr_extract, xdr_walk};
pub use json::{from_json, from_json_value, to_json, to_json_value, Json, JsonIn, JsonOut};
pub use opaque::{FixedOpaque, XdrOpaque, XdrString};
pub use scalar::Quadruple;
pub use ser::XdrOut;
pub use sha256::xdr_sha256;
pub use txrep::{from_txrep, to_txrep, TxrepError, TxrepHelp, TxrepOut};
pub use value::{
    field_name, index_name, NumKind, XdrAggregate, XdrEnum, XdrNamed, XdrNum32, XdrNum64,
    XdrOptional, XdrStr, XdrType, XdrUnion, XdrValue, XdrVarBytes, XdrVector, XdrVisitor,
    XDR_UNBOUNDED,
};
pub use vec::{XdrArray, XdrVec};

/// Everything generated code refers to.
pub mod prelude {
    pub use crate::{
        field_name, index_name, FixedOpaque, NumKind, Quadruple, XdrAggregate, XdrArray, XdrEnum,
        XdrError, XdrNamed, XdrNum32, XdrNum64, XdrOpaque, XdrOptional, XdrResult, XdrStr,
        XdrString, XdrType, XdrUnion, XdrValue, XdrVarBytes, XdrVec, XdrVector, XdrVisitor,
        XDR_UNBOUNDED,
    };
}

/// Serialize a value to XDR bytes.
pub fn to_bytes<T: XdrType + ?Sized>(value: &mut T) -> XdrResult<Vec<u8>> {
    let mut out = XdrOut::new(Vec::new());
    value.xdr_marshal_value(&mut out, "")?;
    Ok(out.into_inner())
}

/// Deserialize a value from XDR bytes. The whole input must be consumed.
pub fn from_bytes<T: XdrType + Default>(bytes: &[u8]) -> XdrResult<T> {
    let mut value = T::default();
    let mut input = XdrIn::new(bytes);
    value.xdr_marshal_value(&mut input, "")?;
    match input.remaining() {
        0 => Ok(value),
        n => Err(XdrError::TrailingData(n)),
    }
}
