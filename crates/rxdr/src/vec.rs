//! Vectors, fixed arrays and optionals.

use std::ops::{Deref, DerefMut};

use crate::error::{XdrError, XdrResult};
use crate::opaque::check_bound;
use crate::value::{
    index_name, XdrOptional, XdrType, XdrValue, XdrVector, XdrVisitor, XDR_UNBOUNDED,
};

/// `T name<N>`: a `Vec<T>` that remembers its IDL bound.
///
/// The bound is enforced when the value is marshaled, not on every push.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XdrVec<T, const N: u32 = { XDR_UNBOUNDED }>(pub Vec<T>);

impl<T, const N: u32> XdrVec<T, N> {
    pub const BOUND: u32 = N;

    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T, const N: u32> Default for XdrVec<T, N> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T, const N: u32> Deref for XdrVec<T, N> {
    type Target = Vec<T>;
    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T, const N: u32> DerefMut for XdrVec<T, N> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T, const N: u32> From<Vec<T>> for XdrVec<T, N> {
    fn from(v: Vec<T>) -> Self {
        Self(v)
    }
}

impl<T, const N: u32> FromIterator<T> for XdrVec<T, N> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: XdrType + Default, const N: u32> XdrVector for XdrVec<T, N> {
    fn get_vec_len(&self) -> u32 {
        u32::try_from(self.0.len()).unwrap_or(u32::MAX)
    }
    fn set_vec_len(&mut self, n: u32) -> XdrResult<()> {
        check_bound("vector", n as usize, N)?;
        self.0.resize_with(n as usize, T::default);
        Ok(())
    }
    fn xdr_bound(&self) -> u32 {
        N
    }
    fn xdr_marshal_n(&mut self, v: &mut dyn XdrVisitor, name: &str, n: u32) -> XdrResult<()> {
        marshal_elements(&mut self.0, v, name, n)
    }
    fn xdr_type_name(&self) -> &'static str {
        "vector"
    }
}

impl<T: XdrType + Default, const N: u32> XdrType for XdrVec<T, N> {
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        v.marshal(name, XdrValue::Vector(self))
    }
    fn xdr_initialize(&mut self) {
        self.0.iter_mut().for_each(XdrType::xdr_initialize);
    }
}

/// `T name[N]`: exactly `N` elements, no length on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XdrArray<T, const N: usize>(Vec<T>);

impl<T, const N: usize> XdrArray<T, N> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T: Default, const N: usize> Default for XdrArray<T, N> {
    fn default() -> Self {
        Self((0..N).map(|_| T::default()).collect())
    }
}

impl<T, const N: usize> From<[T; N]> for XdrArray<T, N> {
    fn from(items: [T; N]) -> Self {
        Self(items.into())
    }
}

impl<T, const N: usize> TryFrom<Vec<T>> for XdrArray<T, N> {
    type Error = XdrError;
    fn try_from(items: Vec<T>) -> XdrResult<Self> {
        if items.len() != N {
            return Err(XdrError::WrongLength {
                type_name: "array",
                len: items.len(),
                expected: N,
            });
        }
        Ok(Self(items))
    }
}

impl<T, const N: usize> Deref for XdrArray<T, N> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T, const N: usize> DerefMut for XdrArray<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.0
    }
}

impl<T: XdrType + Default, const N: usize> XdrVector for XdrArray<T, N> {
    fn get_vec_len(&self) -> u32 {
        N as u32
    }
    fn set_vec_len(&mut self, n: u32) -> XdrResult<()> {
        if n as usize != N {
            return Err(XdrError::WrongLength {
                type_name: "array",
                len: n as usize,
                expected: N,
            });
        }
        self.0.resize_with(N, T::default);
        Ok(())
    }
    fn xdr_bound(&self) -> u32 {
        N as u32
    }
    fn xdr_fixed_len(&self) -> Option<u32> {
        Some(N as u32)
    }
    fn xdr_marshal_n(&mut self, v: &mut dyn XdrVisitor, name: &str, n: u32) -> XdrResult<()> {
        marshal_elements(&mut self.0, v, name, n)
    }
    fn xdr_type_name(&self) -> &'static str {
        "array"
    }
}

impl<T: XdrType + Default, const N: usize> XdrType for XdrArray<T, N> {
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        v.marshal(name, XdrValue::Vector(self))
    }
    fn xdr_initialize(&mut self) {
        self.0.iter_mut().for_each(XdrType::xdr_initialize);
    }
}

fn marshal_elements<T: XdrType>(
    items: &mut [T],
    v: &mut dyn XdrVisitor,
    name: &str,
    n: u32,
) -> XdrResult<()> {
    if n as usize > items.len() {
        return Err(XdrError::WrongLength {
            type_name: "vector",
            len: items.len(),
            expected: n as usize,
        });
    }
    for (i, item) in items.iter_mut().take(n as usize).enumerate() {
        let element = index_name(v, name, i as u32);
        item.xdr_marshal_value(v, &element)?;
    }
    Ok(())
}

impl<T: XdrType + Default> XdrOptional for Option<Box<T>> {
    fn get_present(&self) -> bool {
        self.is_some()
    }
    fn set_present(&mut self, present: bool) {
        match (present, self.is_some()) {
            (true, false) => {
                let mut element = Box::<T>::default();
                element.xdr_initialize();
                *self = Some(element);
            }
            (false, true) => *self = None,
            _ => {}
        }
    }
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        match self {
            Some(element) => XdrType::xdr_marshal_value(element.as_mut(), v, name),
            None => Ok(()),
        }
    }
    fn xdr_type_name(&self) -> &'static str {
        "optional"
    }
}

impl<T: XdrType + Default> XdrType for Option<Box<T>> {
    fn xdr_marshal_value(&mut self, v: &mut dyn XdrVisitor, name: &str) -> XdrResult<()> {
        v.marshal(name, XdrValue::Optional(self))
    }
    fn xdr_initialize(&mut self) {
        if let Some(element) = self {
            element.xdr_initialize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_len_respects_bound() {
        let mut v = XdrVec::<i32, 3>::default();
        v.set_vec_len(3).unwrap();
        assert_eq!(*v, vec![0, 0, 0]);
        assert!(matches!(
            v.set_vec_len(4),
            Err(XdrError::LengthExceedsBound { len: 4, bound: 3, .. })
        ));
        v.set_vec_len(1).unwrap();
        assert_eq!(v.get_vec_len(), 1);
    }

    #[test]
    fn test_array_is_fixed() {
        let mut a = XdrArray::<u32, 2>::default();
        assert_eq!(a.len(), 2);
        assert_eq!(a.xdr_fixed_len(), Some(2));
        assert!(a.set_vec_len(3).is_err());
        assert!(XdrArray::<u32, 2>::try_from(vec![1]).is_err());
        a[1] = 9;
        assert_eq!(a.into_inner(), vec![0, 9]);
    }

    #[test]
    fn test_optional_presence() {
        let mut o: Option<Box<i32>> = None;
        o.set_present(true);
        assert_eq!(o.as_deref(), Some(&0));
        **o.as_mut().unwrap() = 5;
        o.set_present(true);
        assert_eq!(o.as_deref(), Some(&5));
        o.set_present(false);
        assert!(o.is_none());
    }
}
