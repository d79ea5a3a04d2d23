//! Opaque data and strings.
//!
//! XDR fixed-length opaque data has no length prefix, just the raw bytes
//! padded to 4-byte alignment. Variable-length opaque data and strings
//! carry a length word and a maximum size declared in the IDL, which is
//! kept here as a const generic.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{XdrError, XdrResult};
use crate::value::{XdrStr, XdrType, XdrValue, XdrVarBytes, XdrVisitor, XDR_UNBOUNDED};

/// `opaque name[N]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedOpaque<const N: usize>(pub [u8; N]);

impl<const N: usize> FixedOpaque<N> {
    /// Create a new FixedOpaque from a byte array.
    pub fn new(data: [u8; N]) -> Self {
        Self(data)
    }

    /// Get the inner byte array.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Lowercase hex, no separators.
    pub fn to_hex(&self) -> String {
        hex_string(&self.0)
    }
}

impl<const N: usize> Default for FixedOpaque<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> fmt::Display for FixedOpaque<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl<const N: usize> From<[u8; N]> for FixedOpaque<N> {
    fn from(data: [u8; N]) -> Self {
        Self(data)
    }
}

impl<const N: usize> Deref for FixedOpaque<N> {
    type Target = [u8; N];
    fn deref(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> DerefMut for FixedOpaque<N> {
    fn deref_mut(&mut self) -> &mut [u8; N] {
        &mut self.0
    }
}

impl<const N: usize> XdrType for FixedOpaque<N> {
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        v.marshal(name, XdrValue::FixedBytes(&mut self.0))
    }
}

/// `opaque name<N>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct XdrOpaque<const N: u32 = { XDR_UNBOUNDED }>(pub Vec<u8>);

impl<const N: u32> XdrOpaque<N> {
    pub const BOUND: u32 = N;

    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl<const N: u32> Deref for XdrOpaque<N> {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl<const N: u32> DerefMut for XdrOpaque<N> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl<const N: u32> From<Vec<u8>> for XdrOpaque<N> {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl<const N: u32> From<&[u8]> for XdrOpaque<N> {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

impl<const N: u32> XdrVarBytes for XdrOpaque<N> {
    fn get_bytes(&self) -> &[u8] {
        &self.0
    }
    fn set_bytes(&mut self, bytes: Vec<u8>) -> XdrResult<()> {
        check_bound("opaque<>", bytes.len(), N)?;
        self.0 = bytes;
        Ok(())
    }
    fn xdr_bound(&self) -> u32 {
        N
    }
    fn xdr_type_name(&self) -> &'static str {
        "opaque<>"
    }
}

impl<const N: u32> XdrType for XdrOpaque<N> {
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        v.marshal(name, XdrValue::VarBytes(self))
    }
}

/// `string name<N>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct XdrString<const N: u32 = { XDR_UNBOUNDED }>(pub String);

impl<const N: u32> XdrString<N> {
    pub const BOUND: u32 = N;

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<const N: u32> Deref for XdrString<N> {
    type Target = String;
    fn deref(&self) -> &String {
        &self.0
    }
}

impl<const N: u32> DerefMut for XdrString<N> {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.0
    }
}

impl<const N: u32> From<String> for XdrString<N> {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<const N: u32> From<&str> for XdrString<N> {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<const N: u32> fmt::Display for XdrString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: u32> XdrStr for XdrString<N> {
    fn get_string(&self) -> &str {
        &self.0
    }
    fn set_string(&mut self, s: String) -> XdrResult<()> {
        check_bound("string<>", s.len(), N)?;
        self.0 = s;
        Ok(())
    }
    fn xdr_bound(&self) -> u32 {
        N
    }
    fn xdr_type_name(&self) -> &'static str {
        "string<>"
    }
}

impl<const N: u32> XdrType for XdrString<N> {
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        v.marshal(name, XdrValue::String(self))
    }
}

pub(crate) fn check_bound(type_name: &'static str, len: usize, bound: u32) -> XdrResult<()> {
    if len as u64 > u64::from(bound) {
        return Err(XdrError::LengthExceedsBound {
            type_name,
            len: len as u64,
            bound,
        });
    }
    Ok(())
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    use fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

pub(crate) fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
