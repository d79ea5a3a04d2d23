#![allow(dead_code)]

use rxdr_sample::*;

pub fn hash(byte: u8) -> Hash {
    FixedOpaque::new([byte; 32])
}

/// An account with every field away from its zero value.
pub fn account() -> Account {
    let mut account = Account::default();
    account.name = "alice".into();
    account.balance = 25_000_000;
    account.created = 1_700_000_000;
    account.maybe = Some(Box::new(42));
    account.v = vec![1, 2, 3].into();
    account.signers = vec![Signer {
        key: hash(7),
        weight: 1,
    }]
    .into();
    account.fixed = [4, 5].into();
    account.triple = [7, 8, 9].into();
    account.active = true;
    account.ratio = 0.5;
    account.score = -2.25;
    account.blob = vec![0xde, 0xad, 0xbe].into();
    account.h = FixedOpaque::new([1, 2, 3]);
    account.ext.set_enabled(true);
    *account.ext.must_flags() = 9;
    account.range = XdrAnonAccountRange { lo: -1, hi: 1 };
    account
}

pub fn envelope() -> TransactionEnvelope {
    let mut env = TransactionEnvelope::default();
    env.tx.source = hash(1);
    env.tx.fee = 100;
    env.tx.seq_num = 15_000_000;
    env.tx.memo.set_type(MemoType::MEMO_TEXT);
    *env.tx.memo.must_text() = "hello".into();
    env.tx.chain = Some(Box::new(Node {
        value: 1,
        next: Some(Box::new(Node {
            value: 2,
            next: None,
        })),
    }));
    env.signatures = vec![Signer {
        key: hash(2),
        weight: 10,
    }]
    .into();
    env
}
