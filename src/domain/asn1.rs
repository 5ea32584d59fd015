//! Minimal DER tag-length-value reading and writing.
//!
//! Only definite-length, single-byte-tag encodings are handled, which covers
//! every structure exchanged with RFC3161 timestamp authorities.

use crate::domain::constants::ASN1_INTEGER_TAG;

/// One decoded TLV element.
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
    /// Tag, length and value bytes together.
    pub raw: &'a [u8],
}

/// Read one TLV from the front of `input`, returning it and the remaining bytes.
pub fn read_tlv(input: &[u8]) -> Result<(Tlv<'_>, &[u8]), String> {
    if input.len() < 2 {
        return Err(format!("truncated DER element ({} bytes)", input.len()));
    }
    let tag = input[0];
    let first = input[1];
    let (len, header) = if first < 0x80 {
        (first as usize, 2)
    } else {
        let count = (first & 0x7f) as usize;
        if count == 0 {
            return Err("indefinite length is not DER".to_string());
        }
        if count > 4 {
            return Err(format!("length of {count} bytes is too large"));
        }
        if input.len() < 2 + count {
            return Err("truncated DER length".to_string());
        }
        let len = input[2..2 + count]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, 2 + count)
    };
    let end = header
        .checked_add(len)
        .ok_or_else(|| "DER length overflow".to_string())?;
    if input.len() < end {
        return Err(format!(
            "DER element declares {len} bytes but only {} remain",
            input.len() - header
        ));
    }
    Ok((
        Tlv {
            tag,
            value: &input[header..end],
            raw: &input[..end],
        },
        &input[end..],
    ))
}

/// Read one TLV and require its tag.
pub fn expect_tlv<'a>(input: &'a [u8], tag: u8, what: &str) -> Result<(Tlv<'a>, &'a [u8]), String> {
    let (tlv, rest) = read_tlv(input).map_err(|e| format!("{what}: {e}"))?;
    if tlv.tag != tag {
        return Err(format!(
            "{what}: expected tag 0x{tag:02x}, found 0x{:02x}",
            tlv.tag
        ));
    }
    Ok((tlv, rest))
}

pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes: Vec<u8> = len
        .to_be_bytes()
        .iter()
        .copied()
        .skip_while(|b| *b == 0)
        .collect();
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(0x80 | bytes.len() as u8);
    out.extend_from_slice(&bytes);
    out
}

pub fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    out.extend_from_slice(&encode_length(content.len()));
    out.extend_from_slice(content);
    out
}

/// INTEGER holding a non-negative big-endian magnitude.
pub fn encode_unsigned_integer(magnitude: &[u8]) -> Vec<u8> {
    let trimmed: Vec<u8> = magnitude.iter().copied().skip_while(|b| *b == 0).collect();
    let mut content = Vec::with_capacity(trimmed.len() + 1);
    if trimmed.is_empty() || trimmed[0] & 0x80 != 0 {
        content.push(0x00);
    }
    content.extend_from_slice(&trimmed);
    encode_tlv(ASN1_INTEGER_TAG, &content)
}

/// Value of a small non-negative INTEGER content.
pub fn read_small_unsigned(value: &[u8]) -> Option<u64> {
    if value.is_empty() || value.len() > 8 || value[0] & 0x80 != 0 {
        return None;
    }
    Some(value.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_form_lengths() {
        assert_eq!(encode_length(0x7f), vec![0x7f]);
        assert_eq!(encode_length(0x80), vec![0x81, 0x80]);
        assert_eq!(encode_length(0x1234), vec![0x82, 0x12, 0x34]);

        let content = vec![0xabu8; 300];
        let encoded = encode_tlv(0x04, &content);
        let (tlv, rest) = read_tlv(&encoded).unwrap();
        assert_eq!(tlv.tag, 0x04);
        assert_eq!(tlv.value.len(), 300);
        assert!(rest.is_empty());
    }

    #[test]
    fn rejects_truncated_and_indefinite() {
        assert!(read_tlv(&[0x30]).is_err());
        assert!(read_tlv(&[0x30, 0x05, 0x01]).is_err());
        assert!(read_tlv(&[0x30, 0x80, 0x00, 0x00]).is_err());
    }

    #[test]
    fn unsigned_integers_stay_positive() {
        assert_eq!(encode_unsigned_integer(&[0x80]), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encode_unsigned_integer(&[0x00, 0x01]), vec![0x02, 0x01, 0x01]);
        assert_eq!(encode_unsigned_integer(&[]), vec![0x02, 0x01, 0x00]);
        assert_eq!(read_small_unsigned(&[0x01, 0x00]), Some(256));
        assert_eq!(read_small_unsigned(&[0xff]), None);
    }

    #[test]
    fn expect_tlv_checks_tag() {
        let encoded = encode_tlv(0x31, &[]);
        assert!(expect_tlv(&encoded, 0x30, "seq").is_err());
        assert!(expect_tlv(&encoded, 0x31, "set").is_ok());
    }
}
