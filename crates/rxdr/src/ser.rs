//! XDR binary encoder.

use std::fmt;
use std::io::Write;

use crate::error::{XdrError, XdrResult};
use crate::value::{XdrValue, XdrVisitor};

/// Visitor writing RFC 4506 bytes to any [`Write`] sink.
///
/// `Vec<u8>` collects the encoding; a hasher that implements `Write`
/// digests it without buffering.
pub struct XdrOut<W> {
    output: W,
}

impl<W: Write> XdrOut<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    /// Get the sink back.
    pub fn into_inner(self) -> W {
        self.output
    }

    fn write_u32(&mut self, v: u32) -> XdrResult<()> {
        self.output.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, v: u64) -> XdrResult<()> {
        self.output.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    /// Write bytes followed by zero padding up to 4-byte alignment.
    fn write_padded(&mut self, bytes: &[u8]) -> XdrResult<()> {
        self.output.write_all(bytes)?;
        let padding = (4 - (bytes.len() % 4)) % 4;
        self.output.write_all(&[0u8; 3][..padding])?;
        Ok(())
    }

    fn write_length(&mut self, type_name: &'static str, len: usize, bound: u32) -> XdrResult<()> {
        match u32::try_from(len) {
            Ok(n) if n <= bound => self.write_u32(n),
            _ => Err(XdrError::LengthExceedsBound {
                type_name,
                len: len as u64,
                bound,
            }),
        }
    }
}

impl<W: Write> XdrVisitor for XdrOut<W> {
    fn sprintf(&self, _args: fmt::Arguments<'_>) -> String {
        String::new()
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        match value {
            XdrValue::Num32(n) => self.write_u32(n.get_u32()),
            XdrValue::Num64(n) => self.write_u64(n.get_u64()),
            XdrValue::Enum(e) => {
                if !e.xdr_enum_valid() {
                    return Err(XdrError::InvalidEnum {
                        type_name: e.xdr_type_name(),
                        value: e.xdr_enum_value(),
                    });
                }
                self.write_u32(e.get_u32())
            }
            XdrValue::FixedBytes(bytes) => self.write_padded(bytes),
            XdrValue::VarBytes(b) => {
                self.write_length(b.xdr_type_name(), b.get_bytes().len(), b.xdr_bound())?;
                self.write_padded(b.get_bytes())
            }
            XdrValue::String(s) => {
                self.write_length(s.xdr_type_name(), s.get_string().len(), s.xdr_bound())?;
                self.write_padded(s.get_string().as_bytes())
            }
            XdrValue::Optional(o) => {
                let present = o.get_present();
                self.write_u32(u32::from(present))?;
                o.xdr_marshal_value(self, name)
            }
            XdrValue::Vector(vec) => {
                let n = vec.get_vec_len();
                if vec.xdr_fixed_len().is_none() {
                    self.write_length(vec.xdr_type_name(), n as usize, vec.xdr_bound())?;
                }
                vec.xdr_marshal_n(self, name, n)
            }
            XdrValue::Aggregate(a) => a.xdr_marshal(self, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_bytes, FixedOpaque, XdrOpaque, XdrString, XdrVec};

    #[test]
    fn test_integers() {
        assert_eq!(to_bytes(&mut 42i32).unwrap(), vec![0, 0, 0, 42]);
        assert_eq!(to_bytes(&mut -1i32).unwrap(), vec![0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            to_bytes(&mut 1u64).unwrap(),
            vec![0, 0, 0, 0, 0, 0, 0, 1]
        );
        assert_eq!(to_bytes(&mut true).unwrap(), vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_string_padding() {
        let mut s = XdrString::<16>::from("hello");
        assert_eq!(
            to_bytes(&mut s).unwrap(),
            vec![0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0, 0, 0]
        );
    }

    #[test]
    fn test_opaque() {
        let mut fixed = FixedOpaque::new([1, 2, 3]);
        assert_eq!(to_bytes(&mut fixed).unwrap(), vec![1, 2, 3, 0]);

        let mut var = XdrOpaque::<8>::from(vec![9u8; 4]);
        assert_eq!(to_bytes(&mut var).unwrap(), vec![0, 0, 0, 4, 9, 9, 9, 9]);
    }

    #[test]
    fn test_optional() {
        let mut absent: Option<Box<i32>> = None;
        assert_eq!(to_bytes(&mut absent).unwrap(), vec![0, 0, 0, 0]);
        let mut present = Some(Box::new(7i32));
        assert_eq!(to_bytes(&mut present).unwrap(), vec![0, 0, 0, 1, 0, 0, 0, 7]);
    }

    #[test]
    fn test_vector_bound_violation() {
        let mut v = XdrVec::<i32, 3>::from(vec![1, 2, 3, 4]);
        assert!(matches!(
            to_bytes(&mut v),
            Err(XdrError::LengthExceedsBound { len: 4, bound: 3, .. })
        ));
        v.pop();
        assert_eq!(
            to_bytes(&mut v).unwrap(),
            vec![0, 0, 0, 3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]
        );
    }
}
