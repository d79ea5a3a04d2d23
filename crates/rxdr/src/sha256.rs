//! SHA-256 over the XDR encoding of a value.

use sha2::{Digest, Sha256};

use crate::error::XdrResult;
use crate::ser::XdrOut;
use crate::value::XdrType;

/// Hash the binary encoding of `value` without materialising it.
pub fn xdr_sha256<T: XdrType + ?Sized>(value: &mut T) -> XdrResult<[u8; 32]> {
    let mut out = XdrOut::new(Sha256::new());
    value.xdr_marshal_value(&mut out, "")?;
    Ok(out.into_inner().finalize().into())
}
