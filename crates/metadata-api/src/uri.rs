//! Request path decoding.
//!
//! Paths are decoded once before routing. Escapes for the URI reserved
//! characters (`; / ? : @ & = + $ , #`) are left encoded, so `%2F` inside a
//! segment never becomes a separator. Every other escape is decoded as
//! UTF-8; a malformed escape or an invalid byte sequence is an error.

use crate::ApiError;

const RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decode a request path.
pub fn decode_uri(path: &str) -> Result<String, ApiError> {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            let run_end = bytes[i..]
                .iter()
                .position(|b| *b == b'%')
                .map_or(bytes.len(), |p| i + p);
            out.push_str(&path[i..run_end]);
            i = run_end;
            continue;
        }

        let lead = escape_at(path, i)?;
        if lead < 0x80 {
            if RESERVED.contains(&lead) {
                out.push_str(&path[i..i + 3]);
            } else {
                out.push(char::from(lead));
            }
            i += 3;
            continue;
        }

        let width = utf8_width(lead).ok_or_else(|| malformed(path, "invalid UTF-8 lead byte"))?;
        let mut seq = Vec::with_capacity(width);
        seq.push(lead);
        for k in 1..width {
            let at = i + 3 * k;
            if bytes.get(at) != Some(&b'%') {
                return Err(malformed(path, "truncated UTF-8 sequence"));
            }
            seq.push(escape_at(path, at)?);
        }
        let decoded =
            std::str::from_utf8(&seq).map_err(|_| malformed(path, "invalid UTF-8 sequence"))?;
        out.push_str(decoded);
        i += 3 * width;
    }

    Ok(out)
}

/// Decode the `%XX` escape starting at `at`.
fn escape_at(path: &str, at: usize) -> Result<u8, ApiError> {
    let hex = path
        .get(at + 1..at + 3)
        .ok_or_else(|| malformed(path, "truncated escape"))?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed(path, "invalid escape"));
    }
    u8::from_str_radix(hex, 16).map_err(|_| malformed(path, "invalid escape"))
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn malformed(path: &str, reason: &str) -> ApiError {
    ApiError::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_unchanged() {
        assert_eq!(decode_uri("/packages/jquery").unwrap(), "/packages/jquery");
    }

    #[test]
    fn test_decodes_unreserved_and_utf8() {
        assert_eq!(decode_uri("/packages/a%20b").unwrap(), "/packages/a b");
        assert_eq!(decode_uri("/packages/%C3%A9t%C3%A9").unwrap(), "/packages/été");
        assert_eq!(decode_uri("/packages/%F0%9F%98%80").unwrap(), "/packages/😀");
        assert_eq!(decode_uri("/%70ackages").unwrap(), "/packages");
    }

    #[test]
    fn test_reserved_escapes_kept() {
        assert_eq!(decode_uri("/packages/a%2Fb").unwrap(), "/packages/a%2Fb");
        assert_eq!(decode_uri("/packages/a%2fb").unwrap(), "/packages/a%2fb");
        assert_eq!(decode_uri("/x%23y%3Fz").unwrap(), "/x%23y%3Fz");
    }

    #[test]
    fn test_truncated_escape_rejected() {
        assert!(matches!(
            decode_uri("/packages/%"),
            Err(ApiError::MalformedPath { .. })
        ));
        assert!(decode_uri("/packages/%4").is_err());
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(decode_uri("/packages/%zz").is_err());
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        // Lone continuation byte.
        assert!(decode_uri("/packages/%80").is_err());
        // Lead byte without continuation.
        assert!(decode_uri("/packages/%C3").is_err());
        assert!(decode_uri("/packages/%C3x").is_err());
        // Overlong encoding.
        assert!(decode_uri("/packages/%C0%AF").is_err());
        // Encoded surrogate.
        assert!(decode_uri("/packages/%ED%A0%80").is_err());
    }
}
