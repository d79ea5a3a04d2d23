//! Txrep: a line-oriented `path: value` text form of any XDR value.
//!
//! ```text
//! tx.sourceAccount: GBXS...
//! tx.fee: 100
//! tx.memo.type: MEMO_TEXT (MEMO_NONE, MEMO_TEXT, MEMO_ID, MEMO_HASH)
//! tx.memo.text: "hello"
//! tx.operations.len: 1
//! tx.operations[0].body.amount: 10000000 (1e7)
//! ```
//!
//! Paths are the IDL field names joined with `.`, vector elements are
//! `[i]`, a vector's length is `.len` and an optional's presence is
//! `._present`. Anything in parentheses after a value is a comment for
//! humans and is ignored when reading. A value ending in `?` asks the
//! renderer to list the alternatives for that field the next time the
//! value is printed.

mod out;
mod parse;
mod scanner;

use std::collections::BTreeSet;
use std::fmt;

use crate::error::XdrResult;
use crate::value::XdrType;

pub use out::TxrepOut;

pub(crate) use out::render_leaf;

/// Default typedef names rendered with a calendar-date comment.
pub const DEFAULT_TIME_TYPES: &[&str] = &["TimePoint"];

/// The set of paths whose values were marked with `?`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxrepHelp(BTreeSet<String>);

impl TxrepHelp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>) {
        self.0.insert(path.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// One problem found while reading txrep, tied to a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxrepLineError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for TxrepLineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Every problem found while reading txrep, sorted by line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_errors(.errors))]
pub struct TxrepError {
    pub errors: Vec<TxrepLineError>,
}

fn render_errors(errors: &[TxrepLineError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render `value` as txrep, listing alternatives for the paths in `help`.
pub fn to_txrep<T: XdrType + ?Sized>(value: &mut T, help: &TxrepHelp) -> XdrResult<String> {
    let mut out = TxrepOut::new().with_help(help);
    value.xdr_marshal_value(&mut out, "")?;
    Ok(out.into_string())
}

/// Parse txrep into a fresh value.
///
/// Keys missing from the input leave the corresponding field at its
/// initialized zero value. Keys that name no field are errors.
pub fn from_txrep<T: XdrType + Default>(input: &str) -> Result<(T, TxrepHelp), TxrepError> {
    let mut value = T::default();
    let help = read(&mut value, input)?;
    Ok((value, help))
}

/// Like [`from_txrep`] but populates an existing value. The input is read
/// into a copy, so `value` is only replaced when there are no errors.
pub fn from_txrep_into<T: XdrType + Clone>(
    value: &mut T,
    input: &str,
) -> Result<TxrepHelp, TxrepError> {
    let mut copy = value.clone();
    let help = read(&mut copy, input)?;
    *value = copy;
    Ok(help)
}

fn read<T: XdrType + ?Sized>(value: &mut T, input: &str) -> Result<TxrepHelp, TxrepError> {
    let scanned = scanner::scan(input).map_err(|errors| TxrepError { errors })?;
    value.xdr_initialize();
    let mut reader = parse::TxrepIn::new(scanned.fields);
    if let Err(e) = value.xdr_marshal_value(&mut reader, "") {
        reader.fail(e);
    }
    let errors = reader.finish();
    if errors.is_empty() {
        Ok(scanned.help)
    } else {
        Err(TxrepError { errors })
    }
}

/// `path.suffix`, or just `suffix` at the root.
pub(crate) fn child(path: &str, suffix: &str) -> String {
    if path.is_empty() {
        suffix.to_string()
    } else {
        format!("{}.{}", path, suffix)
    }
}

/// Fixed-point rendering with seven implied decimals, the unit used for
/// amounts: `15000000` is `1.5e7`.
pub(crate) fn scaled_e7(v: i64) -> String {
    const UNIT: i128 = 10_000_000;
    let v = i128::from(v);
    let int = v / UNIT;
    let frac = (v % UNIT).abs();
    let sign = if v < 0 && int == 0 { "-" } else { "" };
    if frac == 0 {
        format!("{}{}e7", sign, int)
    } else {
        let digits = format!("{:07}", frac);
        format!("{}{}.{}e7", sign, int, digits.trim_end_matches('0'))
    }
}

/// Double-quote `s`, escaping quotes, backslashes and control characters.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Inverse of [`quote`]. Text after the closing quote is ignored. A
/// backslash before a line break keeps the line break.
pub fn unquote(text: &str) -> Option<String> {
    let mut chars = text.strip_prefix('"')?.chars();
    let mut out = String::new();
    loop {
        match chars.next()? {
            '"' => return Some(out),
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '0' => out.push('\0'),
                'x' => {
                    let hex: String = chars.by_ref().take(2).collect();
                    let b = u8::from_str_radix(&hex, 16).ok().filter(u8::is_ascii)?;
                    out.push(char::from(b));
                }
                'u' => {
                    let rest = chars.as_str().strip_prefix('{')?;
                    let end = rest.find('}')?;
                    let c = u32::from_str_radix(&rest[..end], 16)
                        .ok()
                        .and_then(char::from_u32)?;
                    out.push(c);
                    chars = rest[end + 1..].chars();
                }
                c => out.push(c),
            },
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_e7() {
        assert_eq!(scaled_e7(10_000_000), "1e7");
        assert_eq!(scaled_e7(15_000_000), "1.5e7");
        assert_eq!(scaled_e7(1), "0.0000001e7");
        assert_eq!(scaled_e7(-5), "-0.0000005e7");
        assert_eq!(scaled_e7(-25_000_000), "-2.5e7");
        assert_eq!(scaled_e7(0), "0e7");
        assert_eq!(scaled_e7(i64::MIN), "-922337203685.4775808e7");
    }

    #[test]
    fn test_quote_unquote() {
        let s = "say \"hi\"\\\n\tbye\u{1}";
        let q = quote(s);
        assert_eq!(q, "\"say \\\"hi\\\"\\\\\\n\\tbye\\u{1}\"");
        assert_eq!(unquote(&q).as_deref(), Some(s));
        assert_eq!(unquote("\"a\\x41\" (comment)").as_deref(), Some("aA"));
        assert_eq!(unquote("\"line\\\nnext\"").as_deref(), Some("line\nnext"));
        assert_eq!(unquote("\"open"), None);
        assert_eq!(unquote("bare"), None);
    }

    #[test]
    fn test_error_display() {
        let err = TxrepError {
            errors: vec![
                TxrepLineError { line: 2, message: "invalid key x".into() },
                TxrepLineError { line: 5, message: "bad".into() },
            ],
        };
        assert_eq!(err.to_string(), "line 2: invalid key x\nline 5: bad");
    }
}
