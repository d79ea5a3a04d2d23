//! XDR binary decoder.

use std::fmt;

use bytes::Buf;

use crate::error::{XdrError, XdrResult};
use crate::value::{XdrValue, XdrVisitor};

/// Visitor reading RFC 4506 bytes into the value it walks.
///
/// Every length is checked against its bound before the body is read, and
/// against the remaining input before anything is allocated.
pub struct XdrIn<'de> {
    input: &'de [u8],
}

impl<'de> XdrIn<'de> {
    pub fn new(input: &'de [u8]) -> Self {
        Self { input }
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> usize {
        self.input.remaining()
    }

    fn need(&self, n: usize) -> XdrResult<()> {
        if self.input.remaining() < n {
            return Err(XdrError::Eof);
        }
        Ok(())
    }

    fn read_u32(&mut self) -> XdrResult<u32> {
        self.need(4)?;
        Ok(self.input.get_u32())
    }

    fn read_u64(&mut self) -> XdrResult<u64> {
        self.need(8)?;
        Ok(self.input.get_u64())
    }

    /// Fill `buf`, then consume padding, which must be zero.
    fn read_padded_into(&mut self, buf: &mut [u8]) -> XdrResult<()> {
        let padding = (4 - (buf.len() % 4)) % 4;
        self.need(buf.len() + padding)?;
        self.input.copy_to_slice(buf);
        if self.input[..padding].iter().any(|b| *b != 0) {
            return Err(XdrError::BadPadding(buf.len()));
        }
        self.input.advance(padding);
        Ok(())
    }

    /// Read a length word and check it against `bound`.
    fn read_length(&mut self, type_name: &'static str, bound: u32) -> XdrResult<usize> {
        let len = self.read_u32()?;
        if len > bound {
            return Err(XdrError::LengthExceedsBound {
                type_name,
                len: u64::from(len),
                bound,
            });
        }
        let len = len as usize;
        self.need(len)?;
        Ok(len)
    }
}

impl XdrVisitor for XdrIn<'_> {
    fn sprintf(&self, _args: fmt::Arguments<'_>) -> String {
        String::new()
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        match value {
            XdrValue::Num32(n) => {
                let v = self.read_u32()?;
                n.set_u32(v)
            }
            XdrValue::Num64(n) => {
                let v = self.read_u64()?;
                n.set_u64(v)
            }
            XdrValue::Enum(e) => {
                let v = self.read_u32()?;
                e.set_u32(v)?;
                if !e.xdr_enum_valid() {
                    return Err(XdrError::InvalidEnum {
                        type_name: e.xdr_type_name(),
                        value: v as i32,
                    });
                }
                Ok(())
            }
            XdrValue::FixedBytes(bytes) => self.read_padded_into(bytes),
            XdrValue::VarBytes(b) => {
                let len = self.read_length(b.xdr_type_name(), b.xdr_bound())?;
                let mut buf = vec![0u8; len];
                self.read_padded_into(&mut buf)?;
                b.set_bytes(buf)
            }
            XdrValue::String(s) => {
                let len = self.read_length(s.xdr_type_name(), s.xdr_bound())?;
                let mut buf = vec![0u8; len];
                self.read_padded_into(&mut buf)?;
                let text = String::from_utf8(buf).map_err(|_| XdrError::InvalidUtf8)?;
                s.set_string(text)
            }
            XdrValue::Optional(o) => {
                match self.read_u32()? {
                    0 => o.set_present(false),
                    1 => o.set_present(true),
                    flag => return Err(XdrError::InvalidOptionFlag(flag)),
                }
                o.xdr_marshal_value(self, name)
            }
            XdrValue::Vector(vec) => {
                let n = match vec.xdr_fixed_len() {
                    Some(n) => n,
                    None => {
                        let n = self.read_u32()?;
                        if n > vec.xdr_bound() {
                            return Err(XdrError::LengthExceedsBound {
                                type_name: vec.xdr_type_name(),
                                len: u64::from(n),
                                bound: vec.xdr_bound(),
                            });
                        }
                        // Every element takes at least one word.
                        if n as usize > self.remaining() / 4 {
                            return Err(XdrError::Eof);
                        }
                        n
                    }
                };
                vec.set_vec_len(n)?;
                vec.xdr_marshal_n(self, name, n)
            }
            XdrValue::Aggregate(a) => a.xdr_marshal(self, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, FixedOpaque, XdrOpaque, XdrString, XdrVec};

    #[test]
    fn test_integers() {
        assert_eq!(from_bytes::<i32>(&[0, 0, 0, 42]).unwrap(), 42);
        assert_eq!(from_bytes::<i32>(&[0xff, 0xff, 0xff, 0xfe]).unwrap(), -2);
        assert_eq!(from_bytes::<u64>(&[0, 0, 0, 1, 0, 0, 0, 0]).unwrap(), 1 << 32);
        assert!(matches!(from_bytes::<bool>(&[0, 0, 0, 2]), Err(XdrError::InvalidBool(2))));
        assert!(matches!(from_bytes::<i32>(&[0, 0, 1]), Err(XdrError::Eof)));
    }

    #[test]
    fn test_string() {
        let s: XdrString<8> =
            from_bytes(&[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0, 0, 0]).unwrap();
        assert_eq!(s.as_str(), "hello");

        let too_long = from_bytes::<XdrString<4>>(&[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0, 0, 0]);
        assert!(matches!(too_long, Err(XdrError::LengthExceedsBound { len: 5, .. })));

        let bad = from_bytes::<XdrString<4>>(&[0, 0, 0, 2, 0xff, 0xfe, 0, 0]);
        assert!(matches!(bad, Err(XdrError::InvalidUtf8)));
    }

    #[test]
    fn test_nonzero_padding_rejected() {
        assert_eq!(from_bytes::<FixedOpaque<3>>(&[1, 2, 3, 0]).unwrap().0, [1, 2, 3]);
        assert!(matches!(
            from_bytes::<FixedOpaque<3>>(&[1, 2, 3, 1]),
            Err(XdrError::BadPadding(3))
        ));
        assert!(matches!(
            from_bytes::<XdrOpaque>(&[0, 0, 0, 1, 7, 0, 9, 0]),
            Err(XdrError::BadPadding(1))
        ));
    }

    #[test]
    fn test_optional_flag() {
        assert_eq!(from_bytes::<Option<Box<i32>>>(&[0, 0, 0, 0]).unwrap(), None);
        assert_eq!(
            from_bytes::<Option<Box<i32>>>(&[0, 0, 0, 1, 0, 0, 0, 3]).unwrap(),
            Some(Box::new(3))
        );
        assert!(matches!(
            from_bytes::<Option<Box<i32>>>(&[0, 0, 0, 2, 0, 0, 0, 3]),
            Err(XdrError::InvalidOptionFlag(2))
        ));
    }

    #[test]
    fn test_huge_vector_length_fails_fast() {
        let r = from_bytes::<XdrVec<i32>>(&[0x7f, 0xff, 0xff, 0xff]);
        assert!(matches!(r, Err(XdrError::Eof)));
        let r = from_bytes::<XdrVec<i32, 2>>(&[0, 0, 0, 3, 0, 0, 0, 0]);
        assert!(matches!(r, Err(XdrError::LengthExceedsBound { len: 3, bound: 2, .. })));
    }

    #[test]
    fn test_trailing_data() {
        assert!(matches!(
            from_bytes::<i32>(&[0, 0, 0, 1, 0]),
            Err(XdrError::TrailingData(1))
        ));
    }
}
