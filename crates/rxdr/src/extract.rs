//! Field-level access by txrep path.

use std::fmt;

use crate::error::XdrResult;
use crate::txrep::{render_leaf, DEFAULT_TIME_TYPES};
use crate::value::{XdrType, XdrValue, XdrVisitor};

/// Visitor calling a closure on every leaf, with its full path.
struct Walker<F> {
    f: F,
}

impl<F> XdrVisitor for Walker<F>
where
    F: FnMut(&str, XdrValue<'_>) -> XdrResult<()>,
{
    fn sprintf(&self, args: fmt::Arguments<'_>) -> String {
        fmt::format(args)
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        match value {
            XdrValue::Optional(o) => o.xdr_marshal_value(self, name),
            XdrValue::Vector(vec) => {
                let n = vec.get_vec_len();
                vec.xdr_marshal_n(self, name, n)
            }
            XdrValue::Aggregate(a) => a.xdr_marshal(self, name),
            leaf => (self.f)(name, leaf),
        }
    }
}

/// Call `f` with the path and handle of every leaf of `value`, in wire
/// order. Handles are writable, so `f` may also modify fields.
pub fn xdr_walk<T, F>(value: &mut T, f: F) -> XdrResult<()>
where
    T: XdrType + ?Sized,
    F: FnMut(&str, XdrValue<'_>) -> XdrResult<()>,
{
    let mut walker = Walker { f };
    value.xdr_marshal_value(&mut walker, "")
}

/// Render the leaf at `path` the way txrep shows it, if there is one.
///
/// ```
/// let mut v = rxdr::XdrVec::<i32, 4>::from(vec![3, 4]);
/// assert_eq!(rxdr::xdr_extract(&mut v, "[1]").as_deref(), Some("4"));
/// assert_eq!(rxdr::xdr_extract(&mut v, "[2]"), None);
/// ```
pub fn xdr_extract<T: XdrType + ?Sized>(value: &mut T, path: &str) -> Option<String> {
    let time_types: Vec<String> = DEFAULT_TIME_TYPES.iter().map(|s| s.to_string()).collect();
    let mut found = None;
    xdr_walk(value, |name, leaf| {
        if found.is_none() && name == path {
            found = render_leaf(&leaf, &time_types, true);
        }
        Ok(())
    })
    .ok()?;
    found
}
