use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Bound;

use super::scanner::TxrepField;
use super::{child, unquote, TxrepLineError};
use crate::error::{XdrError, XdrResult};
use crate::opaque::parse_hex;
use crate::value::{NumKind, XdrNum32, XdrNum64, XdrValue, XdrVisitor};

/// Visitor populating a value from scanned txrep fields.
///
/// Bad values are recorded against their line and the walk continues, so
/// one pass reports every problem in the input.
pub(crate) struct TxrepIn {
    fields: BTreeMap<String, TxrepField>,
    used: HashSet<String>,
    errors: Vec<TxrepLineError>,
    last_line: usize,
}

fn first_token(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

fn parse_num32(n: &mut dyn XdrNum32, token: &str) -> XdrResult<()> {
    let bits = match n.num_kind() {
        NumKind::Signed => token.parse::<i32>().map(|v| v as u32).ok(),
        NumKind::Unsigned => token.parse::<u32>().ok(),
        NumKind::Bool => token.parse::<bool>().map(u32::from).ok(),
        NumKind::Float => token.parse::<f32>().map(f32::to_bits).ok(),
    };
    match bits {
        Some(bits) => n.set_u32(bits),
        None => Err(XdrError::Parse {
            type_name: n.xdr_type_name(),
            text: token.to_string(),
        }),
    }
}

fn parse_num64(n: &mut dyn XdrNum64, token: &str) -> XdrResult<()> {
    let bits = match n.num_kind() {
        NumKind::Signed => token.parse::<i64>().map(|v| v as u64).ok(),
        NumKind::Unsigned | NumKind::Bool => token.parse::<u64>().ok(),
        NumKind::Float => token.parse::<f64>().map(f64::to_bits).ok(),
    };
    match bits {
        Some(bits) => n.set_u64(bits),
        None => Err(XdrError::Parse {
            type_name: n.xdr_type_name(),
            text: token.to_string(),
        }),
    }
}

impl TxrepIn {
    pub(crate) fn new(fields: BTreeMap<String, TxrepField>) -> Self {
        Self {
            fields,
            used: HashSet::new(),
            errors: Vec::new(),
            last_line: 0,
        }
    }

    /// Consume `key`, returning the line and text of its value.
    fn take(&mut self, key: &str) -> Option<(usize, String)> {
        let field = self.fields.get(key)?;
        self.used.insert(key.to_string());
        self.last_line = field.value_line;
        Some((field.value_line, field.value.clone()))
    }

    /// True if any key lies below `path`.
    fn has_children(&self, path: &str) -> bool {
        if path.is_empty() {
            return !self.fields.is_empty();
        }
        self.fields
            .range::<str, _>((Bound::Included(path), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(path))
            .any(|(k, _)| matches!(k.as_bytes().get(path.len()), None | Some(b'.' | b'[')))
    }

    fn error(&mut self, line: usize, message: impl fmt::Display) {
        self.errors.push(TxrepLineError {
            line,
            message: message.to_string(),
        });
    }

    /// Record an error that escaped the walk.
    pub(crate) fn fail(&mut self, e: XdrError) {
        self.error(self.last_line, e);
    }

    /// Report unconsumed keys and return every error, sorted by line.
    pub(crate) fn finish(mut self) -> Vec<TxrepLineError> {
        let unused: Vec<(usize, String)> = self
            .fields
            .iter()
            .filter(|(k, _)| !self.used.contains(*k))
            .map(|(k, f)| (f.key_line, k.clone()))
            .collect();
        for (line, key) in unused {
            self.error(line, format!("invalid key {}", key));
        }
        self.errors.sort_by_key(|e| e.line);
        self.errors
    }

    fn scalar(&mut self, name: &str, value: XdrValue<'_>) {
        let Some((line, text)) = self.take(name) else {
            return;
        };
        let token = first_token(&text);
        let result = match value {
            XdrValue::Num32(n) => parse_num32(n, token),
            XdrValue::Num64(n) => parse_num64(n, token),
            XdrValue::Enum(e) => e.xdr_enum_scan(token),
            XdrValue::FixedBytes(b) => match parse_hex(token) {
                Some(bytes) if bytes.len() == b.len() => {
                    b.copy_from_slice(&bytes);
                    Ok(())
                }
                _ => Err(XdrError::msg(format!(
                    "expected {} bytes of hex, found {:?}",
                    b.len(),
                    token
                ))),
            },
            XdrValue::VarBytes(b) => {
                let bytes = if token == "0" {
                    Some(Vec::new())
                } else {
                    parse_hex(token)
                };
                match bytes {
                    Some(bytes) => b.set_bytes(bytes),
                    None => Err(XdrError::msg(format!("invalid hex {:?}", token))),
                }
            }
            XdrValue::String(s) => match unquote(&text) {
                Some(unquoted) => s.set_string(unquoted),
                None => Err(XdrError::msg(format!("expected quoted string, found {}", text))),
            },
            XdrValue::Optional(_) | XdrValue::Vector(_) | XdrValue::Aggregate(_) => Ok(()),
        };
        if let Err(e) = result {
            self.error(line, e);
        }
    }

    fn vector_len(&mut self, name: &str, bound: u32) -> Option<u32> {
        let Some((line, text)) = self.take(&child(name, "len")) else {
            return Some(0);
        };
        match first_token(&text).parse::<u32>() {
            Ok(n) if n <= bound => Some(n),
            Ok(n) => {
                self.error(line, format!("length {} exceeds bound {}", n, bound));
                None
            }
            Err(_) => {
                self.error(line, format!("invalid length {:?}", first_token(&text)));
                None
            }
        }
    }
}

impl XdrVisitor for TxrepIn {
    fn sprintf(&self, args: fmt::Arguments<'_>) -> String {
        fmt::format(args)
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        match value {
            XdrValue::Optional(o) => {
                let present = match self.take(&child(name, "_present")) {
                    Some((line, text)) => match first_token(&text).parse::<bool>() {
                        Ok(present) => present,
                        Err(_) => {
                            self.error(line, format!("invalid _present value {:?}", text));
                            false
                        }
                    },
                    None => self.has_children(name),
                };
                o.set_present(present);
                o.xdr_marshal_value(self, name)
            }
            XdrValue::Vector(vec) => {
                let n = match vec.xdr_fixed_len() {
                    Some(n) => n,
                    None => match self.vector_len(name, vec.xdr_bound()) {
                        Some(n) => n,
                        None => return Ok(()),
                    },
                };
                if let Err(e) = vec.set_vec_len(n) {
                    self.fail(e);
                    return Ok(());
                }
                vec.xdr_marshal_n(self, name, n)
            }
            XdrValue::Aggregate(a) => {
                if let Err(e) = a.xdr_marshal(self, name) {
                    self.fail(e);
                }
                Ok(())
            }
            leaf => {
                self.scalar(name, leaf);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txrep::scanner::scan;
    use crate::{XdrOpaque, XdrString, XdrVec};

    fn reader(text: &str) -> TxrepIn {
        TxrepIn::new(scan(text).unwrap().fields)
    }

    #[test]
    fn test_scalars_ignore_comments() {
        let mut r = reader("a: 25000000 (2.5e7)\nb: true\nc: \"x y\" trailing\nd: 0 bytes\n");
        let mut a: i64 = 0;
        let mut b = false;
        let mut c = XdrString::<8>::default();
        let mut d = XdrOpaque::<8>::from(vec![1]);
        r.marshal("a", XdrValue::Num64(&mut a)).unwrap();
        r.marshal("b", XdrValue::Num32(&mut b)).unwrap();
        r.marshal("c", XdrValue::String(&mut c)).unwrap();
        r.marshal("d", XdrValue::VarBytes(&mut d)).unwrap();
        assert!(r.finish().is_empty());
        assert_eq!((a, b, c.as_str(), d.len()), (25_000_000, true, "x y", 0));
    }

    #[test]
    fn test_optional_presence_from_children() {
        let mut r = reader("p.x: 1\n");
        let mut p: Option<Box<XdrVec<i32>>> = None;
        let mut q: Option<Box<i32>> = Some(Box::new(1));
        r.marshal("p.x", XdrValue::Optional(&mut q)).unwrap();
        assert_eq!(q.as_deref(), Some(&1));
        r.marshal("q", XdrValue::Optional(&mut p)).unwrap();
        assert!(p.is_none());
        assert!(r.has_children("p"));
        assert!(!r.has_children("p.x.y"));
    }

    #[test]
    fn test_errors_accumulate() {
        let mut r = reader("v.len: 9\nn: abc\nextra: 1\n");
        let mut v = XdrVec::<i32, 3>::default();
        let mut n: u32 = 0;
        r.marshal("v", XdrValue::Vector(&mut v)).unwrap();
        r.marshal("n", XdrValue::Num32(&mut n)).unwrap();
        let errors = r.finish();
        let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(errors[0].message.contains("exceeds bound"));
        assert!(errors[2].message.contains("invalid key extra"));
    }
}
