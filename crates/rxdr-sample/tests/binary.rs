mod common;

use rxdr::{from_bytes, to_bytes, xdr_sha256};
use rxdr_sample::*;
use sha2::{Digest, Sha256};

use common::{account, envelope, hash};

#[test]
fn test_account_round_trip() {
    let mut account = account();
    let bytes = to_bytes(&mut account).unwrap();
    let mut back: Account = from_bytes(&bytes).unwrap();
    assert_eq!(back, account);
    assert_eq!(to_bytes(&mut back).unwrap(), bytes);
}

#[test]
fn test_envelope_round_trip() {
    let mut env = envelope();
    let bytes = to_bytes(&mut env).unwrap();
    let back: TransactionEnvelope = from_bytes(&bytes).unwrap();
    assert_eq!(back, env);
    assert_eq!(back.tx.memo.r#type(), MemoType::MEMO_TEXT);
    assert_eq!(back.tx.memo.text().map(|t| t.as_str()), Some("hello"));
    assert!(back.tx.memo.xdr_valid());
    let chain = back.tx.chain.as_ref().unwrap();
    assert_eq!(chain.next.as_ref().map(|n| n.value), Some(2));
}

#[test]
fn test_default_round_trip() {
    let mut account = Account::default();
    let back: Account = from_bytes(&to_bytes(&mut account).unwrap()).unwrap();
    assert_eq!(back, account);
}

#[test]
fn test_optional_wire_form() {
    let mut absent: XdrPtrInt = None;
    assert_eq!(to_bytes(&mut absent).unwrap(), [0, 0, 0, 0]);
    let mut present: XdrPtrInt = Some(Box::new(42));
    assert_eq!(
        to_bytes(&mut present).unwrap(),
        [0, 0, 0, 1, 0, 0, 0, 0x2a]
    );

    let mut node = Node {
        value: 5,
        next: None,
    };
    assert_eq!(to_bytes(&mut node).unwrap(), [0, 0, 0, 5, 0, 0, 0, 0]);
    assert!(matches!(
        from_bytes::<Node>(&[0, 0, 0, 5, 0, 0, 0, 2]),
        Err(XdrError::InvalidOptionFlag(2))
    ));
}

#[test]
fn test_vector_bound() {
    let mut account = Account::default();
    assert!(matches!(
        account.v.set_vec_len(4),
        Err(XdrError::LengthExceedsBound { len: 4, bound: 3, .. })
    ));

    account.v = vec![1, 2, 3, 4].into();
    assert!(matches!(
        to_bytes(&mut account),
        Err(XdrError::LengthExceedsBound { len: 4, bound: 3, .. })
    ));

    // The length word alone is enough to reject the input.
    assert!(matches!(
        from_bytes::<XdrVec3Int>(&[0, 0, 0, 4]),
        Err(XdrError::LengthExceedsBound { len: 4, bound: 3, .. })
    ));
}

#[test]
fn test_string_bound() {
    let mut account = Account::default();
    account.name = "a name longer than sixteen".into();
    assert!(matches!(
        to_bytes(&mut account),
        Err(XdrError::LengthExceedsBound { bound: 16, .. })
    ));
    assert!(matches!(
        from_bytes::<Name>(&[0, 0, 0, 17]),
        Err(XdrError::LengthExceedsBound { len: 17, bound: 16, .. })
    ));
}

#[test]
fn test_nonzero_padding_is_rejected() {
    let mut account = account();
    let mut bytes = to_bytes(&mut account).unwrap();
    let at = bytes
        .windows(4)
        .position(|w| w == [1, 2, 3, 0])
        .unwrap();
    bytes[at + 3] = 1;
    assert!(matches!(
        from_bytes::<Account>(&bytes),
        Err(XdrError::BadPadding(3))
    ));
}

#[test]
fn test_union_with_default() {
    let mut u = U::new(E::A);
    *u.must_x() = 7;
    let bytes = to_bytes(&mut u).unwrap();
    assert_eq!(bytes, [0, 0, 0, 1, 0, 0, 0, 7]);
    let back: U = from_bytes(&bytes).unwrap();
    assert_eq!(back.e(), E::A);
    assert_eq!(back.x(), Some(&7));

    let mut u = U::new(E::B);
    assert_eq!(u.x(), None);
    let bytes = to_bytes(&mut u).unwrap();
    assert_eq!(bytes, [0, 0, 0, 2]);
    let back: U = from_bytes(&bytes).unwrap();
    assert_eq!(back.e(), E::B);
    assert_eq!(back.x(), None);
    assert!(back.xdr_valid());
}

#[test]
fn test_unknown_enum_values_are_rejected() {
    assert!(matches!(
        from_bytes::<U>(&[0, 0, 0, 7]),
        Err(XdrError::InvalidEnum { type_name: "E", value: 7 })
    ));
    let mut u = U::new(E(7));
    assert!(matches!(
        to_bytes(&mut u),
        Err(XdrError::InvalidEnum { value: 7, .. })
    ));
}

#[test]
fn test_int_discriminant() {
    let mut r = IdlResult::new(-2);
    *r.must_message() = "failed".into();
    let bytes = to_bytes(&mut r).unwrap();
    let back: IdlResult = from_bytes(&bytes).unwrap();
    assert_eq!(back.code(), -2);
    assert_eq!(back.message().map(|m| m.as_str()), Some("failed"));

    match from_bytes::<IdlResult>(&[0, 0, 0, 3]) {
        Err(XdrError::InvalidUnion { type_name, tag }) => {
            assert_eq!(type_name, "Result");
            assert_eq!(tag, "3");
        }
        other => panic!("expected an invalid union, got {:?}", other),
    }
    let mut invalid = IdlResult::new(3);
    assert!(!invalid.xdr_valid());
    assert!(matches!(
        to_bytes(&mut invalid),
        Err(XdrError::InvalidUnion { .. })
    ));
}

#[test]
fn test_trailing_data() {
    assert!(matches!(
        from_bytes::<Signer>(&[0u8; 40]),
        Err(XdrError::TrailingData(4))
    ));
    assert!(matches!(from_bytes::<Signer>(&[0u8; 35]), Err(XdrError::Eof)));
}

#[test]
fn test_sha256_of_wire_form() {
    let mut env = envelope();
    let digest = xdr_sha256(&mut env).unwrap();
    let expected: [u8; 32] = Sha256::digest(to_bytes(&mut env).unwrap()).into();
    assert_eq!(digest, expected);
    assert_eq!(xdr_sha256(&mut envelope()).unwrap(), digest);

    env.tx.source = hash(3);
    assert_ne!(xdr_sha256(&mut env).unwrap(), digest);
}
