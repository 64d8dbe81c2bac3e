pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// `::` introduces a Postgres cast, never a named placeholder.
pub(super) fn is_cast(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b':') && bytes.get(idx + 1) == Some(&b':')
}

pub(super) fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Returns the tag between `$...$` and the index of the closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        if !is_name_byte(bytes[idx]) {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        // `$1` is a numbered parameter, not a quote tag
        if tag.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((tag, idx))
    } else {
        None
    }
}

pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len() && &bytes[idx + 1..end] == tag.as_bytes() && bytes[end] == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_quote_tags() {
        assert_eq!(
            try_start_dollar_quote(b"$fn$ body $fn$", 0),
            Some(("fn".to_string(), 3))
        );
        assert_eq!(try_start_dollar_quote(b"$$", 0), Some((String::new(), 1)));
        assert_eq!(try_start_dollar_quote(b"$1$", 0), None);
        assert_eq!(try_start_dollar_quote(b"$a b$", 0), None);
        assert!(matches_tag(b"x $fn$", 2, "fn"));
        assert!(!matches_tag(b"x $fx$", 2, "fn"));
    }

    #[test]
    fn cast_detection() {
        assert!(is_cast(b"a::int", 1));
        assert!(!is_cast(b"a :b", 2));
    }
}
