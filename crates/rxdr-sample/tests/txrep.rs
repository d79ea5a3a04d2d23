mod common;

use rxdr::txrep::{from_txrep_into, TxrepOut};
use rxdr::{from_txrep, to_txrep, xdr_extract, xdr_walk, TxrepHelp};
use rxdr_sample::*;

use common::{account, envelope};

#[test]
fn test_envelope_lines() {
    let text = to_txrep(&mut envelope(), &TxrepHelp::new()).unwrap();
    for line in [
        "tx.fee: 100\n",
        "tx.seqNum: 15000000 (1.5e7)\n",
        "tx.memo.type: MEMO_TEXT\n",
        "tx.memo.text: \"hello\"\n",
        "tx.chain._present: true\n",
        "tx.chain.value: 1\n",
        "tx.chain.next._present: true\n",
        "tx.chain.next.next._present: false\n",
        "signatures.len: 1\n",
        "signatures[0].weight: 10\n",
    ] {
        assert!(text.contains(line), "missing {:?} in\n{}", line, text);
    }
    assert!(text.contains("tx.validUntil: 0 ("));
}

#[test]
fn test_round_trips() {
    let mut env = envelope();
    let text = to_txrep(&mut env, &TxrepHelp::new()).unwrap();
    let (back, help) = from_txrep::<TransactionEnvelope>(&text).unwrap();
    assert_eq!(back, env);
    assert!(help.is_empty());

    let mut account = account();
    let text = to_txrep(&mut account, &TxrepHelp::new()).unwrap();
    assert!(text.contains("fixed[1]: 5\n"));
    assert!(!text.contains("fixed.len"));
    assert!(text.contains("ext.enabled: true\n"));
    assert!(text.contains("ext.flags: 9\n"));
    assert!(text.contains("range.lo: -1\n"));
    let (back, _) = from_txrep::<Account>(&text).unwrap();
    assert_eq!(back, account);
}

#[test]
fn test_help_lists_alternatives() {
    let text = to_txrep(&mut envelope(), &TxrepHelp::new()).unwrap();
    let edited = text.replace("tx.memo.type: MEMO_TEXT\n", "tx.memo.type: MEMO_TEXT?\n");
    let (mut back, help) = from_txrep::<TransactionEnvelope>(&edited).unwrap();
    assert!(help.contains("tx.memo.type"));
    assert_eq!(back.tx.memo.r#type(), MemoType::MEMO_TEXT);

    let text = to_txrep(&mut back, &help).unwrap();
    assert!(text.contains(
        "tx.memo.type: MEMO_TEXT (MEMO_NONE, MEMO_TEXT, MEMO_ID, MEMO_HASH, MEMO_RETURN)\n"
    ));
}

#[test]
fn test_missing_keys_keep_initialized_values() {
    let (u, _) = from_txrep::<U>("").unwrap();
    assert_eq!(u.e(), E::A);
    assert_eq!(u.x(), Some(&0));

    let (env, _) = from_txrep::<TransactionEnvelope>("tx.fee: 7\ntx.memo.type: MEMO_ID\n").unwrap();
    assert_eq!(env.tx.fee, 7);
    assert_eq!(env.tx.memo.id(), Some(&0));
    assert!(env.tx.chain.is_none());

    // Children promote an optional to present.
    let (env, _) = from_txrep::<TransactionEnvelope>("tx.chain.value: 3\n").unwrap();
    assert_eq!(env.tx.chain.map(|n| n.value), Some(3));
}

#[test]
fn test_errors_carry_lines() {
    let input = "tx.fee: lots\ntx.memo.type: MEMO_TEXT\ntx.bogus: 1\nsignatures.len: 21\n";
    let err = from_txrep::<TransactionEnvelope>(input).unwrap_err();
    let lines: Vec<usize> = err.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, [1, 3, 4]);
    assert!(err.errors[1].message.contains("invalid key tx.bogus"));
    assert!(err.errors[2].message.contains("exceeds bound 20"));
    assert!(err.to_string().starts_with("line 1: "));
}

#[test]
fn test_invalid_union_tag_is_reported() {
    let err = from_txrep::<IdlResult>("code: 5\n").unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].line, 1);
    assert!(err.errors[0].message.contains("invalid union discriminant 5"));
}

#[test]
fn test_read_into_existing_value() {
    let mut account = account();
    from_txrep_into(&mut account, "balance: 5\n").unwrap();
    assert_eq!(account.balance, 5);
    assert_eq!(account.name.as_str(), "alice");
}

#[test]
fn test_failed_read_leaves_value_untouched() {
    let mut account = account();
    let err = from_txrep_into(&mut account, "balance: 5\nbogus: 1\n").unwrap_err();
    assert_eq!(err.errors[0].line, 2);
    assert_eq!(account.balance, 25_000_000);
    assert_eq!(account, common::account());
}

#[test]
fn test_untagged_enum_round_trips() {
    let mut u = U::new(E(7));
    let text = to_txrep(&mut u, &TxrepHelp::new()).unwrap();
    assert_eq!(text, "e: E#7\n");
    let (back, _) = from_txrep::<U>(&text).unwrap();
    assert_eq!(back, u);
    assert_eq!(back.x(), None);
}

#[test]
fn test_scaled_comments_can_be_disabled() {
    let mut out = TxrepOut::new().with_scaled_comments(false);
    envelope().xdr_marshal_value(&mut out, "").unwrap();
    assert!(out.into_string().contains("tx.seqNum: 15000000\n"));
}

#[test]
fn test_enum_scan_and_names() {
    assert_eq!("B".parse::<E>().unwrap(), E::B);
    assert_eq!("E#7".parse::<E>().unwrap(), E(7));
    assert_eq!(E(7).to_string(), "E#7");
    assert_eq!(format!("{:?}", E::C), "C");
    assert!("D".parse::<E>().is_err());

    for &(value, name) in E::XDR_NAMES {
        let scanned: E = name.parse().unwrap();
        assert_eq!(scanned.0, value);
        assert_eq!(E::XDR_NAMES.iter().filter(|(v, _)| *v == value).count(), 1);
    }
    assert_eq!(
        E::XDR_COMMENTS,
        &[(1, "first letter"), (2, "second letter")]
    );
    assert_eq!(E::default(), E::A);
    assert_eq!(MemoType::default(), MemoType::MEMO_NONE);
}

#[test]
fn test_extract_and_walk() {
    let mut env = envelope();
    assert_eq!(xdr_extract(&mut env, "tx.fee").as_deref(), Some("100"));
    assert_eq!(xdr_extract(&mut env, "tx.memo.type").as_deref(), Some("MEMO_TEXT"));
    assert_eq!(xdr_extract(&mut env, "signatures[0].weight").as_deref(), Some("10"));
    assert_eq!(xdr_extract(&mut env, "tx.nothing"), None);

    let mut paths = Vec::new();
    xdr_walk(&mut env, |path, _| {
        paths.push(path.to_string());
        Ok(())
    })
    .unwrap();
    assert_eq!(paths.first().map(String::as_str), Some("tx.source"));
    assert!(paths.contains(&"tx.chain.next.value".to_string()));
    assert_eq!(paths.last().map(String::as_str), Some("signatures[0].weight"));
}
