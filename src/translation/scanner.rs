use super::parsers::is_name_byte;

#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    Bracketed,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// End index (exclusive) of the `[A-Za-z0-9_]+` run starting at `start`.
pub(super) fn scan_name(bytes: &[u8], start: usize) -> Option<usize> {
    let mut idx = start;
    while idx < bytes.len() && is_name_byte(bytes[idx]) {
        idx += 1;
    }
    if idx == start { None } else { Some(idx) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_stop_at_punctuation() {
        assert_eq!(scan_name(b":user_id)", 1), Some(8));
        assert_eq!(scan_name(b": x", 1), None);
        assert_eq!(scan_name(b":a1", 1), Some(3));
    }
}
