//! NIP-19: bech32-encoded entities.
//!
//! Implements the bech32 checksum scheme (BIP-173) and the three
//! fixed-length Nostr profiles built on it:
//! - `npub` — 32-byte x-only public key
//! - `nsec` — 32-byte secret key
//! - `note` — 32-byte event id
//!
//! Byte payloads cross this boundary as lowercase hex strings, matching
//! how they appear everywhere else in the protocol.

use thiserror::Error;

/// Errors that can occur during bech32 encoding or decoding.
///
/// Each malformed-input condition gets its own variant so callers (and
/// tests) can tell them apart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Bech32Error {
    #[error("invalid character {0:?} in bech32 string")]
    InvalidCharacter(char),

    #[error("mixed-case bech32 string")]
    MixedCase,

    #[error("missing or misplaced bech32 separator")]
    InvalidSeparator,

    #[error("bech32 checksum mismatch")]
    ChecksumMismatch,

    #[error("non-zero padding in bech32 data")]
    InvalidPadding,

    #[error("invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidPayloadLength { expected: usize, actual: usize },

    #[error("wrong prefix: expected {expected:?}, got {actual:?}")]
    WrongPrefix { expected: String, actual: String },

    #[error("invalid hex input: {0}")]
    InvalidHex(String),
}

/// The bech32 data alphabet. Index = 5-bit value.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const GENERATOR: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

fn charset_rev(c: u8) -> Option<u8> {
    CHARSET.iter().position(|&x| x == c).map(|i| i as u8)
}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for &v in values {
        let b = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(v);
        for (i, g) in GENERATOR.iter().enumerate() {
            if (b >> i) & 1 == 1 {
                chk ^= g;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let bytes = hrp.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 2 + 1);
    out.extend(bytes.iter().map(|b| b >> 5));
    out.push(0);
    out.extend(bytes.iter().map(|b| b & 31));
    out
}

fn create_checksum(hrp: &str, data: &[u8]) -> [u8; 6] {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0; 6]);
    let pm = polymod(&values) ^ 1;
    let mut checksum = [0u8; 6];
    for (i, c) in checksum.iter_mut().enumerate() {
        *c = ((pm >> (5 * (5 - i))) & 31) as u8;
    }
    checksum
}

fn verify_checksum(hrp: &str, data: &[u8]) -> bool {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    polymod(&values) == 1
}

/// Regroup bits MSB-first, e.g. 8-bit bytes into 5-bit symbols and back.
///
/// With `pad`, leftover bits are zero-padded into a final group. Without
/// it, leftover bits must be zero padding of fewer than `from` bits, or
/// the input is rejected.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, Bech32Error> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        if u32::from(value) >> from != 0 {
            return Err(Bech32Error::InvalidPadding);
        }
        acc = (acc << from) | u32::from(value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & maxv) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & maxv) != 0 {
        return Err(Bech32Error::InvalidPadding);
    }
    Ok(out)
}

/// Encode a raw byte payload under the given human-readable prefix.
pub fn encode(hrp: &str, payload: &[u8]) -> String {
    // 8-to-5 with padding cannot fail
    let data = convert_bits(payload, 8, 5, true).expect("8-bit input");
    let checksum = create_checksum(hrp, &data);
    let mut out = String::with_capacity(hrp.len() + 1 + data.len() + 6);
    out.push_str(hrp);
    out.push('1');
    for d in data.iter().chain(checksum.iter()) {
        out.push(CHARSET[*d as usize] as char);
    }
    out
}

/// Decode a bech32 string into its prefix and raw byte payload.
///
/// Rejects characters outside printable ASCII 33..=126, mixed case,
/// missing separators, unknown data characters, checksum failures, and
/// non-zero leftover padding bits.
pub fn decode(s: &str) -> Result<(String, Vec<u8>), Bech32Error> {
    for c in s.chars() {
        if !(33..=126).contains(&(c as u32)) {
            return Err(Bech32Error::InvalidCharacter(c));
        }
    }
    let lower = s.to_lowercase();
    let upper = s.to_uppercase();
    if s != lower && s != upper {
        return Err(Bech32Error::MixedCase);
    }
    let s = lower;

    let pos = s.rfind('1').ok_or(Bech32Error::InvalidSeparator)?;
    // Prefix must be non-empty and at least 6 checksum symbols must follow.
    if pos < 1 || pos + 7 > s.len() {
        return Err(Bech32Error::InvalidSeparator);
    }
    let (hrp, rest) = (&s[..pos], &s[pos + 1..]);

    let mut data = Vec::with_capacity(rest.len());
    for c in rest.chars() {
        let v = charset_rev(c as u8).ok_or(Bech32Error::InvalidCharacter(c))?;
        data.push(v);
    }
    if !verify_checksum(hrp, &data) {
        return Err(Bech32Error::ChecksumMismatch);
    }
    let payload = convert_bits(&data[..data.len() - 6], 5, 8, false)?;
    Ok((hrp.to_string(), payload))
}

fn encode_fixed32(hrp: &str, payload_hex: &str) -> Result<String, Bech32Error> {
    let bytes =
        hex::decode(payload_hex).map_err(|e| Bech32Error::InvalidHex(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(Bech32Error::InvalidPayloadLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    Ok(encode(hrp, &bytes))
}

fn decode_fixed32(expected_hrp: &str, s: &str) -> Result<String, Bech32Error> {
    let (hrp, payload) = decode(s)?;
    if hrp != expected_hrp {
        return Err(Bech32Error::WrongPrefix {
            expected: expected_hrp.to_string(),
            actual: hrp,
        });
    }
    if payload.len() != 32 {
        return Err(Bech32Error::InvalidPayloadLength {
            expected: 32,
            actual: payload.len(),
        });
    }
    Ok(hex::encode(payload))
}

/// Encode a 32-byte public key (hex) as an `npub1...` string.
pub fn encode_npub(pubkey_hex: &str) -> Result<String, Bech32Error> {
    encode_fixed32("npub", pubkey_hex)
}

/// Encode a 32-byte secret key (hex) as an `nsec1...` string.
pub fn encode_nsec(seckey_hex: &str) -> Result<String, Bech32Error> {
    encode_fixed32("nsec", seckey_hex)
}

/// Encode a 32-byte event id (hex) as a `note1...` string.
pub fn encode_note(event_id_hex: &str) -> Result<String, Bech32Error> {
    encode_fixed32("note", event_id_hex)
}

/// Decode an `npub1...` string to a 64-char hex public key.
pub fn decode_npub(npub: &str) -> Result<String, Bech32Error> {
    decode_fixed32("npub", npub)
}

/// Decode an `nsec1...` string to a 64-char hex secret key.
pub fn decode_nsec(nsec: &str) -> Result<String, Bech32Error> {
    decode_fixed32("nsec", nsec)
}

/// Decode a `note1...` string to a 64-char hex event id.
pub fn decode_note(note: &str) -> Result<String, Bech32Error> {
    decode_fixed32("note", note)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vectors from the NIP-19 specification.
    const PUBKEY_HEX: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
    const NPUB: &str = "npub180cvv07tjdrrgpa0j7j7tmnyl2yr6yr7l8j4s3evf6u64th6gkwsyjh6w6";
    const SECKEY_HEX: &str = "67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa";
    const NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";

    #[test]
    fn test_encode_npub_vector() {
        assert_eq!(encode_npub(PUBKEY_HEX).unwrap(), NPUB);
    }

    #[test]
    fn test_decode_npub_vector() {
        assert_eq!(decode_npub(NPUB).unwrap(), PUBKEY_HEX);
    }

    #[test]
    fn test_nsec_vector_roundtrip() {
        assert_eq!(decode_nsec(NSEC).unwrap(), SECKEY_HEX);
        assert_eq!(encode_nsec(SECKEY_HEX).unwrap(), NSEC);
    }

    #[test]
    fn test_note_roundtrip() {
        let id = "f35432c139f4cb3577ab52497cb047b25333f82d286457bbf0f34962f24d9990";
        let note = encode_note(id).unwrap();
        assert!(note.starts_with("note1"));
        assert_eq!(decode_note(&note).unwrap(), id);
    }

    #[test]
    fn test_roundtrip_all_profiles() {
        let payload: Vec<u8> = (0u8..32).collect();
        for hrp in ["npub", "nsec", "note"] {
            let encoded = encode(hrp, &payload);
            let (decoded_hrp, decoded) = decode(&encoded).unwrap();
            assert_eq!(decoded_hrp, hrp);
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn test_uppercase_accepted() {
        assert_eq!(decode_npub(&NPUB.to_uppercase()).unwrap(), PUBKEY_HEX);
    }

    #[test]
    fn test_mixed_case_rejected() {
        let mut mixed = NPUB.to_string();
        mixed.replace_range(0..1, "N");
        assert_eq!(decode(&mixed), Err(Bech32Error::MixedCase));
    }

    #[test]
    fn test_invalid_character_rejected() {
        // 'b' and 'i' are not in the bech32 charset
        let bad = format!("npub1{}", "b".repeat(58));
        assert!(matches!(
            decode(&bad),
            Err(Bech32Error::InvalidCharacter('b'))
        ));
        // Characters outside printable ASCII 33..=126
        assert!(matches!(
            decode("npub1 qqqqqq"),
            Err(Bech32Error::InvalidCharacter(' '))
        ));
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let mut corrupted = NPUB.to_string();
        // Flip the final checksum symbol to a different charset character.
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == 'q' { 'p' } else { 'q' });
        assert_eq!(decode(&corrupted), Err(Bech32Error::ChecksumMismatch));
    }

    #[test]
    fn test_missing_separator_rejected() {
        assert_eq!(decode("qqqqqq"), Err(Bech32Error::InvalidSeparator));
        // Separator present but fewer than 6 symbols after it.
        assert_eq!(decode("npub1qqq"), Err(Bech32Error::InvalidSeparator));
        // Empty prefix.
        assert_eq!(decode("1qqqqqq"), Err(Bech32Error::InvalidSeparator));
    }

    #[test]
    fn test_wrong_payload_length_rejected() {
        let short = encode("npub", &[0u8; 20]);
        assert_eq!(
            decode_npub(&short),
            Err(Bech32Error::InvalidPayloadLength {
                expected: 32,
                actual: 20
            })
        );
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let err = decode_npub(NSEC).unwrap_err();
        assert_eq!(
            err,
            Bech32Error::WrongPrefix {
                expected: "npub".to_string(),
                actual: "nsec".to_string(),
            }
        );
    }

    #[test]
    fn test_encode_rejects_bad_hex() {
        assert!(matches!(
            encode_npub("zz"),
            Err(Bech32Error::InvalidHex(_))
        ));
        assert_eq!(
            encode_npub("00"),
            Err(Bech32Error::InvalidPayloadLength {
                expected: 32,
                actual: 1
            })
        );
    }
}
