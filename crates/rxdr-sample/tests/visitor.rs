mod common;

use std::any::Any;
use std::fmt;

use rxdr::{to_bytes, XdrOut, XdrResult, XdrValue, XdrVisitor};
use rxdr_sample::*;

use common::envelope;

/// Takes over every `Hash` and counts what reaches the generic path.
#[derive(Default)]
struct HashCollector {
    hashes: Vec<(String, u8)>,
    fixed_bytes: usize,
    leaves: usize,
}

impl XdrVisitor for HashCollector {
    fn sprintf(&self, args: fmt::Arguments<'_>) -> String {
        fmt::format(args)
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        match value {
            XdrValue::Optional(o) => o.xdr_marshal_value(self, name),
            XdrValue::Vector(v) => {
                let n = v.get_vec_len();
                v.xdr_marshal_n(self, name, n)
            }
            XdrValue::Aggregate(a) => a.xdr_marshal(self, name),
            XdrValue::FixedBytes(_) => {
                self.fixed_bytes += 1;
                Ok(())
            }
            _ => {
                self.leaves += 1;
                Ok(())
            }
        }
    }

    fn marshal_override(
        &mut self,
        name: &str,
        type_name: &'static str,
        value: &mut dyn Any,
    ) -> Option<XdrResult<()>> {
        if type_name != "Hash" {
            return None;
        }
        let hash = value.downcast_mut::<Hash>()?;
        self.hashes.push((name.to_string(), hash.0[0]));
        Some(Ok(()))
    }
}

#[test]
fn test_override_takes_over_a_type() {
    let mut collector = HashCollector::default();
    envelope().xdr_marshal_value(&mut collector, "").unwrap();
    assert_eq!(
        collector.hashes,
        [("tx.source".to_string(), 1), ("signatures[0].key".to_string(), 2)]
    );
    // Overridden values never reach `marshal`.
    assert_eq!(collector.fixed_bytes, 0);
    assert_eq!(collector.leaves, 8);
}

/// Binary encoder that writes every `Hash` as a single zero word.
struct ShortHashes(XdrOut<Vec<u8>>);

impl XdrVisitor for ShortHashes {
    fn sprintf(&self, _args: fmt::Arguments<'_>) -> String {
        String::new()
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        match value {
            XdrValue::Optional(o) => {
                let mut flag = u32::from(o.get_present());
                self.0.marshal(name, XdrValue::Num32(&mut flag))?;
                o.xdr_marshal_value(self, name)
            }
            XdrValue::Vector(v) => {
                let n = v.get_vec_len();
                if v.xdr_fixed_len().is_none() {
                    let mut len = n;
                    self.0.marshal(name, XdrValue::Num32(&mut len))?;
                }
                v.xdr_marshal_n(self, name, n)
            }
            XdrValue::Aggregate(a) => a.xdr_marshal(self, name),
            leaf => self.0.marshal(name, leaf),
        }
    }

    fn marshal_override(
        &mut self,
        name: &str,
        type_name: &'static str,
        _value: &mut dyn Any,
    ) -> Option<XdrResult<()>> {
        (type_name == "Hash").then(|| self.0.marshal(name, XdrValue::Num32(&mut 0u32)))
    }
}

#[test]
fn test_override_changes_the_encoding() {
    let mut env = envelope();
    let full = to_bytes(&mut env).unwrap();
    let mut short = ShortHashes(XdrOut::new(Vec::new()));
    env.xdr_marshal_value(&mut short, "").unwrap();
    let short = short.0.into_inner();
    // Two hashes of 32 bytes each shrink to one word.
    assert_eq!(full.len() - short.len(), 2 * (32 - 4));
}
