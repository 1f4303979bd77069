//! Input decoding helpers.

use std::borrow::Cow;

/// How far into a page to look for a `<meta charset>` declaration.
const CHARSET_SNIFF_LIMIT: usize = 1024;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (a BOM is honoured by encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<meta charset>`)
/// 3. Falls back to Windows-1252 (the web's default legacy encoding)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Find a `charset=` declaration near the start of an HTML page.
///
/// Covers both `<meta charset="x">` and the `http-equiv` content form.
pub fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(CHARSET_SNIFF_LIMIT)];
    let needle = b"charset=";
    let pos = head
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))?;

    let rest = &head[pos + needle.len()..];
    let rest = rest
        .strip_prefix(b"\"")
        .or_else(|| rest.strip_prefix(b"'"))
        .unwrap_or(rest);
    let label: String = rest
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
        .map(|&b| b as char)
        .collect();

    (!label.is_empty()).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_borrows() {
        let text = decode_text("héllo".as_bytes(), None);
        assert!(matches!(text, Cow::Borrowed("héllo")));
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        // 0xE9 is 'é' in Windows-1252 and invalid as a lone UTF-8 byte.
        assert_eq!(decode_text(b"caf\xe9", None), "café");
    }

    #[test]
    fn test_decode_uses_hint() {
        // 0xC1 is Cyrillic 'а' in KOI8-R.
        assert_eq!(decode_text(b"\xc1", Some("koi8-r")), "\u{430}");
    }

    #[test]
    fn test_sniff_meta_charset() {
        assert_eq!(
            sniff_meta_charset(br#"<head><meta charset="iso-8859-1"></head>"#).as_deref(),
            Some("iso-8859-1")
        );
        assert_eq!(
            sniff_meta_charset(
                br#"<meta http-equiv="Content-Type" content="text/html; CHARSET=koi8-r">"#
            )
            .as_deref(),
            Some("koi8-r")
        );
        assert_eq!(sniff_meta_charset(b"<p>no declaration</p>"), None);
    }
}
