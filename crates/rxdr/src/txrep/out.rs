use std::fmt::{self, Write};

use chrono::{Local, TimeZone};

use super::{child, quote, scaled_e7, TxrepHelp, DEFAULT_TIME_TYPES};
use crate::error::{XdrError, XdrResult};
use crate::opaque::hex_string;
use crate::value::{NumKind, XdrNum32, XdrNum64, XdrValue, XdrVisitor};

/// Visitor rendering txrep lines into a string.
pub struct TxrepOut<'h> {
    out: String,
    help: Option<&'h TxrepHelp>,
    time_types: Vec<String>,
    scaled: bool,
}

impl Default for TxrepOut<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> TxrepOut<'h> {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            help: None,
            time_types: DEFAULT_TIME_TYPES.iter().map(|s| s.to_string()).collect(),
            scaled: true,
        }
    }

    /// List the alternatives of enum fields whose path is in `help`.
    pub fn with_help(mut self, help: &'h TxrepHelp) -> Self {
        self.help = Some(help);
        self
    }

    /// Replace the typedef names whose values are seconds since the epoch.
    pub fn with_time_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_types = names.into_iter().map(Into::into).collect();
        self
    }

    /// Toggle the `(1.5e7)` comment after signed 64-bit values.
    pub fn with_scaled_comments(mut self, on: bool) -> Self {
        self.scaled = on;
        self
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn line(&mut self, path: &str, value: impl fmt::Display) {
        let _ = writeln!(self.out, "{}: {}", path, value);
    }

    fn wants_help(&self, path: &str) -> bool {
        self.help.is_some_and(|h| h.contains(path))
    }
}

fn render_num32(n: &dyn XdrNum32) -> String {
    let bits = n.get_u32();
    match n.num_kind() {
        NumKind::Signed => (bits as i32).to_string(),
        NumKind::Unsigned => bits.to_string(),
        NumKind::Bool => (bits != 0).to_string(),
        NumKind::Float => f32::from_bits(bits).to_string(),
    }
}

fn render_num64(n: &dyn XdrNum64, time_types: &[String], scaled: bool) -> String {
    let bits = n.get_u64();
    if time_types.iter().any(|t| t == n.xdr_type_name()) {
        let date = i64::try_from(bits)
            .ok()
            .and_then(|secs| Local.timestamp_opt(secs, 0).single());
        return match date {
            Some(date) => format!("{} ({})", bits, date.to_rfc3339()),
            None => bits.to_string(),
        };
    }
    match n.num_kind() {
        NumKind::Signed if scaled => format!("{} ({})", bits as i64, scaled_e7(bits as i64)),
        NumKind::Signed => (bits as i64).to_string(),
        NumKind::Float => f64::from_bits(bits).to_string(),
        NumKind::Unsigned | NumKind::Bool => bits.to_string(),
    }
}

/// Value text of a leaf, or `None` for containers.
pub(crate) fn render_leaf(
    value: &XdrValue<'_>,
    time_types: &[String],
    scaled: bool,
) -> Option<String> {
    let text = match value {
        XdrValue::Num32(n) => render_num32(&**n),
        XdrValue::Num64(n) => render_num64(&**n, time_types, scaled),
        XdrValue::Enum(e) => e.xdr_enum_string(),
        XdrValue::FixedBytes(b) => hex_string(b),
        XdrValue::VarBytes(b) if b.get_bytes().is_empty() => "0 bytes".to_string(),
        XdrValue::VarBytes(b) => hex_string(b.get_bytes()),
        XdrValue::String(s) => quote(s.get_string()),
        XdrValue::Optional(_) | XdrValue::Vector(_) | XdrValue::Aggregate(_) => return None,
    };
    Some(text)
}

impl XdrVisitor for TxrepOut<'_> {
    fn sprintf(&self, args: fmt::Arguments<'_>) -> String {
        fmt::format(args)
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        match value {
            XdrValue::Enum(e) if self.wants_help(name) => {
                let names: Vec<&str> = e.xdr_enum_names().iter().map(|(_, n)| *n).collect();
                let text = format!("{} ({})", e.xdr_enum_string(), names.join(", "));
                self.line(name, text);
                Ok(())
            }
            XdrValue::Optional(o) => {
                let present = o.get_present();
                self.line(&child(name, "_present"), present);
                o.xdr_marshal_value(self, name)
            }
            XdrValue::Vector(vec) => {
                let n = vec.get_vec_len();
                if vec.xdr_fixed_len().is_none() {
                    if n > vec.xdr_bound() {
                        return Err(XdrError::LengthExceedsBound {
                            type_name: vec.xdr_type_name(),
                            len: u64::from(n),
                            bound: vec.xdr_bound(),
                        });
                    }
                    self.line(&child(name, "len"), n);
                }
                vec.xdr_marshal_n(self, name, n)
            }
            XdrValue::Aggregate(a) => a.xdr_marshal(self, name),
            leaf => {
                if let Some(text) = render_leaf(&leaf, &self.time_types, self.scaled) {
                    self.line(name, text);
                }
                Ok(())
            }
        }
    }
}
