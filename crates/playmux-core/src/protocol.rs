//! URI protocol extraction.

/// Returns true when `uri` starts with a well-formed scheme followed by `:`.
///
/// A scheme is an ASCII letter followed by letters, digits, `+`, `-` or `.`.
pub fn uri_is_valid(uri: &str) -> bool {
    scheme_len(uri).is_some()
}

/// Lower-cased protocol token of `uri`, or `None` when the URI is malformed.
pub fn uri_protocol(uri: &str) -> Option<String> {
    scheme_len(uri).map(|len| uri[..len].to_ascii_lowercase())
}

fn scheme_len(uri: &str) -> Option<usize> {
    let bytes = uri.as_bytes();
    if !bytes.first()?.is_ascii_alphabetic() {
        return None;
    }
    for (idx, byte) in bytes.iter().enumerate().skip(1) {
        match byte {
            b':' => return Some(idx),
            b if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.') => {}
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_lowercase_protocol() {
        assert_eq!(uri_protocol("HTTP://x/a.mp4").as_deref(), Some("http"));
        assert_eq!(uri_protocol("dvb://1.2").as_deref(), Some("dvb"));
        assert_eq!(uri_protocol("svn+ssh:host").as_deref(), Some("svn+ssh"));
    }

    #[test]
    fn rejects_malformed_uris() {
        assert!(!uri_is_valid(""));
        assert!(!uri_is_valid("/tmp/a.mp3"));
        assert!(!uri_is_valid("1http://x"));
        assert!(!uri_is_valid("http"));
        assert!(!uri_is_valid("ht tp://x"));
        assert_eq!(uri_protocol(":foo"), None);
    }
}
