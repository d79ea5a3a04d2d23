//! Stellar "strkey" text encoding of keys: a version byte, the payload
//! and a CRC16-XModem checksum, all in RFC 4648 base32.

use thiserror::Error;

/// What a strkey encodes; the first character of the text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrKeyVersion {
    /// `G...`: ed25519 public key.
    AccountId,
    /// `M...`: muxed account (key followed by a 64-bit id).
    MuxedAccount,
    /// `P...`: signed payload.
    SignedPayload,
    /// `S...`: ed25519 seed.
    Seed,
    /// `T...`: pre-authorized transaction hash.
    PreAuthTx,
    /// `X...`: hash of a signing preimage.
    HashX,
}

impl StrKeyVersion {
    /// The version byte: a base32 digit shifted into the top five bits.
    pub fn byte(self) -> u8 {
        match self {
            StrKeyVersion::AccountId => 6 << 3,
            StrKeyVersion::MuxedAccount => 12 << 3,
            StrKeyVersion::SignedPayload => 15 << 3,
            StrKeyVersion::Seed => 18 << 3,
            StrKeyVersion::PreAuthTx => 19 << 3,
            StrKeyVersion::HashX => 23 << 3,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        [
            StrKeyVersion::AccountId,
            StrKeyVersion::MuxedAccount,
            StrKeyVersion::SignedPayload,
            StrKeyVersion::Seed,
            StrKeyVersion::PreAuthTx,
            StrKeyVersion::HashX,
        ]
        .into_iter()
        .find(|v| v.byte() == b)
    }

    fn payload_len_ok(self, len: usize) -> bool {
        match self {
            StrKeyVersion::MuxedAccount => len == 40,
            // 32-byte key, 4-byte length, 4 to 64 bytes of payload.
            StrKeyVersion::SignedPayload => (40..=100).contains(&len) && len % 4 == 0,
            _ => len == 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrKeyError {
    #[error("invalid base32 character {0:?}")]
    InvalidCharacter(char),
    #[error("strkey too short")]
    TooShort,
    #[error("unknown strkey version byte {0:#04x}")]
    UnknownVersion(u8),
    #[error("invalid payload length {0}")]
    InvalidLength(usize),
    #[error("checksum mismatch")]
    BadChecksum,
}

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// CRC16-XModem (polynomial 0x1021, initial value 0).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &b in data {
        crc ^= u16::from(b) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &b in data {
        buffer = (buffer << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 31) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 31) as usize] as char);
    }
    out
}

fn base32_decode(text: &str) -> Result<Vec<u8>, StrKeyError> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for c in text.chars() {
        let digit = ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(StrKeyError::InvalidCharacter(c))?;
        buffer = (buffer << 5) | digit as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }
    Ok(out)
}

/// Encode `payload` under `version`.
pub fn encode(version: StrKeyVersion, payload: &[u8]) -> String {
    let mut raw = Vec::with_capacity(payload.len() + 3);
    raw.push(version.byte());
    raw.extend_from_slice(payload);
    let crc = crc16(&raw);
    raw.extend_from_slice(&crc.to_le_bytes());
    base32_encode(&raw)
}

/// Decode a strkey, checking its version byte, length and checksum.
pub fn decode(text: &str) -> Result<(StrKeyVersion, Vec<u8>), StrKeyError> {
    let mut raw = base32_decode(text)?;
    if raw.len() < 3 {
        return Err(StrKeyError::TooShort);
    }
    let version = StrKeyVersion::from_byte(raw[0]).ok_or(StrKeyError::UnknownVersion(raw[0]))?;
    let trailer = raw.split_off(raw.len() - 2);
    let payload_len = raw.len() - 1;
    if !version.payload_len_ok(payload_len) {
        return Err(StrKeyError::InvalidLength(payload_len));
    }
    if crc16(&raw).to_le_bytes() != trailer[..] {
        return Err(StrKeyError::BadChecksum);
    }
    // The text must be the canonical encoding of the bytes it decodes to.
    if base32_encode(&[&raw[..], &trailer[..]].concat()) != text {
        return Err(StrKeyError::BadChecksum);
    }
    raw.remove(0);
    Ok((version, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_xmodem() {
        assert_eq!(crc16(b"123456789"), 0x31c3);
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn test_account_id_of_zero_key() {
        let text = encode(StrKeyVersion::AccountId, &[0u8; 32]);
        assert_eq!(text, "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF");
        assert_eq!(decode(&text).unwrap(), (StrKeyVersion::AccountId, vec![0u8; 32]));
    }

    #[test]
    fn test_rejects_corruption() {
        let text = encode(StrKeyVersion::Seed, &[7u8; 32]);
        assert!(text.starts_with('S'));
        let mut corrupted = text.clone().into_bytes();
        corrupted[10] = if corrupted[10] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert_eq!(decode(&corrupted), Err(StrKeyError::BadChecksum));
        assert_eq!(decode("G1"), Err(StrKeyError::InvalidCharacter('1')));
        assert_eq!(
            decode(&encode(StrKeyVersion::AccountId, &[0u8; 31])),
            Err(StrKeyError::InvalidLength(31))
        );
    }

    #[test]
    fn test_muxed_length() {
        let text = encode(StrKeyVersion::MuxedAccount, &[1u8; 40]);
        assert!(text.starts_with('M'));
        assert_eq!(decode(&text).unwrap().1.len(), 40);
    }
}
