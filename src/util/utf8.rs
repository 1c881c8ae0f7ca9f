// Copyright (c) 2019 Parity Technologies (UK) Ltd.
// Copyright (c) 2016 twist developers
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Incremental UTF-8 validation, per [RFC 3629].
//!
//! [`validate_prefix`] never looks past the first broken or truncated
//! code point: on success it reports a valid-byte count, on a
//! truncated trailing sequence it reports how many more bytes are
//! needed to decide, and on an invalid sequence it reports how many
//! leading bytes were valid before the break. The RX frame codec uses
//! the `Incomplete` case to carry a split code point across a buffer
//! refill or a fragment boundary.
//!
//! [RFC 3629]: https://tools.ietf.org/html/rfc3629

/// Outcome of validating a byte slice as a (possibly truncated) prefix
/// of a UTF-8 string.
#[derive(Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The entire slice is valid UTF-8.
    Valid,
    /// `buf[..valid_prefix]` is valid UTF-8; the remaining bytes are the
    /// start of a multi-byte sequence that is not yet complete and need
    /// `need` more bytes before it can be judged.
    Incomplete {
        /// Length of the valid prefix before the truncated sequence.
        valid_prefix: usize,
        /// Additional bytes required to decide the trailing sequence.
        need: usize
    },
    /// `buf[..valid_prefix]` is valid UTF-8; the byte at `valid_prefix`
    /// starts a sequence that can never be valid.
    Invalid {
        /// Length of the valid prefix before the invalid byte.
        valid_prefix: usize
    }
}

enum CharResult {
    Complete(usize),
    Incomplete(usize),
    Invalid
}

/// Validate `buf` as a prefix of a UTF-8 byte stream.
pub fn validate_prefix(buf: &[u8]) -> Outcome {
    let mut i = 0;
    while i < buf.len() {
        match decode_one(&buf[i..]) {
            CharResult::Complete(n) => i += n,
            CharResult::Incomplete(need) => return Outcome::Incomplete { valid_prefix: i, need },
            CharResult::Invalid => return Outcome::Invalid { valid_prefix: i }
        }
    }
    Outcome::Valid
}

/// Convenience check used where a caller only cares whether the whole
/// slice is valid and complete (e.g. validating an outgoing TEXT
/// payload, which has no further fragment to complete a truncated
/// trailing sequence).
pub fn is_valid(buf: &[u8]) -> bool {
    matches!(validate_prefix(buf), Outcome::Valid)
}

fn decode_one(b: &[u8]) -> CharResult {
    match b[0] {
        0x00..=0x7F => CharResult::Complete(1),
        0xC2..=0xDF => check_tail(b, 2, &[(0x80, 0xBF)]),
        0xE0 => check_tail(b, 3, &[(0xA0, 0xBF), (0x80, 0xBF)]),
        0xE1..=0xEC => check_tail(b, 3, &[(0x80, 0xBF), (0x80, 0xBF)]),
        0xED => check_tail(b, 3, &[(0x80, 0x9F), (0x80, 0xBF)]),
        0xEE..=0xEF => check_tail(b, 3, &[(0x80, 0xBF), (0x80, 0xBF)]),
        0xF0 => check_tail(b, 4, &[(0x90, 0xBF), (0x80, 0xBF), (0x80, 0xBF)]),
        0xF1..=0xF3 => check_tail(b, 4, &[(0x80, 0xBF), (0x80, 0xBF), (0x80, 0xBF)]),
        0xF4 => check_tail(b, 4, &[(0x80, 0x8F), (0x80, 0xBF), (0x80, 0xBF)]),
        _ => CharResult::Invalid
    }
}

/// Check the continuation bytes following a lead byte against their
/// required ranges. `total_len` is the full sequence length (including
/// the lead byte already consumed by the caller).
fn check_tail(b: &[u8], total_len: usize, ranges: &[(u8, u8)]) -> CharResult {
    for (idx, &(lo, hi)) in ranges.iter().enumerate() {
        let pos = idx + 1;
        if pos >= b.len() {
            return CharResult::Incomplete(total_len - pos);
        }
        if !(lo..=hi).contains(&b[pos]) {
            return CharResult::Invalid;
        }
    }
    CharResult::Complete(total_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest and largest one-byte sequence.
    const V1: &[u8] = &[0x00];
    const V1_MAX: &[u8] = &[0x7F];

    // Smallest and largest two-byte sequence.
    const V2_MIN: &[u8] = &[0xC2, 0x80];
    const V2_MAX: &[u8] = &[0xDF, 0xBF];

    // Three-byte sequences, one per lead-byte sub-range.
    const V3_E0: &[u8] = &[0xE0, 0xA0, 0x80];
    const V3_E1: &[u8] = &[0xE1, 0x80, 0x80];
    const V3_ED: &[u8] = &[0xED, 0x9F, 0xBF];
    const V3_EF: &[u8] = &[0xEF, 0xBF, 0xBF];

    // Four-byte sequences, one per lead-byte sub-range.
    const V4_F0: &[u8] = &[0xF0, 0x90, 0x80, 0x80];
    const V4_F1: &[u8] = &[0xF1, 0x80, 0x80, 0x80];
    const V4_F4: &[u8] = &[0xF4, 0x8F, 0xBF, 0xBF];

    // Overlong encodings: technically-decodable but forbidden.
    const O2_OVERLONG: &[u8] = &[0xC0, 0xAF];
    const O3_OVERLONG: &[u8] = &[0xE0, 0x80, 0x80];
    const O4_OVERLONG: &[u8] = &[0xF0, 0x80, 0x80, 0x80];

    // Surrogate half, encoded as if it were a bare code point: forbidden.
    const SURROGATE: &[u8] = &[0xED, 0xA0, 0x80];

    // Past U+10FFFF: forbidden.
    const TOO_LARGE: &[u8] = &[0xF4, 0x90, 0x80, 0x80];

    #[test]
    fn one_byte_sequences_are_valid() {
        assert_eq!(validate_prefix(V1), Outcome::Valid);
        assert_eq!(validate_prefix(V1_MAX), Outcome::Valid);
    }

    #[test]
    fn two_byte_sequences_are_valid() {
        assert_eq!(validate_prefix(V2_MIN), Outcome::Valid);
        assert_eq!(validate_prefix(V2_MAX), Outcome::Valid);
    }

    #[test]
    fn three_byte_sequences_are_valid() {
        for seq in [V3_E0, V3_E1, V3_ED, V3_EF] {
            assert_eq!(validate_prefix(seq), Outcome::Valid);
        }
    }

    #[test]
    fn four_byte_sequences_are_valid() {
        for seq in [V4_F0, V4_F1, V4_F4] {
            assert_eq!(validate_prefix(seq), Outcome::Valid);
        }
    }

    #[test]
    fn overlong_encodings_are_invalid() {
        for seq in [O2_OVERLONG, O3_OVERLONG, O4_OVERLONG] {
            assert_eq!(validate_prefix(seq), Outcome::Invalid { valid_prefix: 0 });
        }
    }

    #[test]
    fn surrogate_half_is_invalid() {
        assert_eq!(validate_prefix(SURROGATE), Outcome::Invalid { valid_prefix: 0 });
    }

    #[test]
    fn past_max_code_point_is_invalid() {
        assert_eq!(validate_prefix(TOO_LARGE), Outcome::Invalid { valid_prefix: 0 });
    }

    #[test]
    fn truncated_sequence_reports_bytes_needed() {
        // "Hello" (5 valid bytes) followed by a truncated 3-byte sequence's lead byte.
        let mut buf = b"Hello".to_vec();
        buf.push(0xE0);
        assert_eq!(validate_prefix(&buf), Outcome::Incomplete { valid_prefix: 5, need: 2 });
        buf.push(0xA0);
        assert_eq!(validate_prefix(&buf), Outcome::Incomplete { valid_prefix: 5, need: 1 });
    }

    #[test]
    fn invalid_tail_byte_is_rejected_at_its_position() {
        // 0xC0 0xAF is a forbidden overlong two-byte sequence.
        let buf = b"ab\xC0\xAFcd".to_vec();
        assert_eq!(validate_prefix(&buf), Outcome::Invalid { valid_prefix: 2 });
    }

    #[test]
    fn lone_continuation_byte_is_invalid() {
        assert_eq!(validate_prefix(&[0x80]), Outcome::Invalid { valid_prefix: 0 });
    }

    #[test]
    fn empty_input_is_valid() {
        assert_eq!(validate_prefix(&[]), Outcome::Valid);
    }

    #[quickcheck_macros::quickcheck]
    fn agrees_with_std_on_arbitrary_bytes(bytes: Vec<u8>) -> bool {
        matches!(
            (validate_prefix(&bytes), std::str::from_utf8(&bytes)),
            (Outcome::Valid, Ok(_)) | (Outcome::Invalid { .. } | Outcome::Incomplete { .. }, Err(_))
        )
    }

    #[quickcheck_macros::quickcheck]
    fn valid_prefix_is_always_sound_utf8(bytes: Vec<u8>) -> bool {
        let prefix_len = match validate_prefix(&bytes) {
            Outcome::Valid => bytes.len(),
            Outcome::Incomplete { valid_prefix, .. } | Outcome::Invalid { valid_prefix } => valid_prefix
        };
        std::str::from_utf8(&bytes[..prefix_len]).is_ok()
    }
}
