//! Types generated at build time from `proto/sample.x` and `proto/lax.x`.
//!
//! The generated code carries no format logic of its own; every value is
//! encoded through the `rxdr` back-ends:
//!
//! ```
//! use rxdr_sample::{Memo, MemoType, Transaction};
//!
//! let mut tx = Transaction::default();
//! tx.fee = 100;
//! tx.memo.set_type(MemoType::MEMO_TEXT);
//! *tx.memo.must_text() = "hello".into();
//!
//! let bytes = rxdr::to_bytes(&mut tx).unwrap();
//! let back: Transaction = rxdr::from_bytes(&bytes).unwrap();
//! assert_eq!(back, tx);
//! assert_eq!(back.memo.text().map(|t| t.as_str()), Some("hello"));
//! # let _ = Memo::default();
//! ```

/// Generated types and constants from `proto/sample.x`.
#[allow(dead_code)]
#[allow(clippy::all)]
pub mod generated {
    include!(concat!(env!("OUT_DIR"), "/sample.rs"));
}

pub use generated::*;

// Defines `pub mod lax`.
include!(concat!(env!("OUT_DIR"), "/lax.rs"));

/// Render any generated value as pretty-printed JSON.
pub fn to_pretty_json<T: rxdr::XdrType>(value: &mut T) -> rxdr::XdrResult<String> {
    let json = rxdr::to_json_value(value)?;
    serde_json::to_string_pretty(&json).map_err(rxdr::XdrError::msg)
}
