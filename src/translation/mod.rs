use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::types::Backend;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_cast, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};
use scanner::{State, scan_name};

/// Which placeholder token a statement binds through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`, numbered by order of appearance.
    Positional,
    /// `:name`, where the name matches `[A-Za-z0-9_]+`.
    Named,
}

/// How a quote character can appear inside a quoted literal without closing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeStyle {
    /// SQL-standard doubling: `'it''s'`.
    #[default]
    Doubled,
    /// Backslash escapes any following character: `'it\'s'`.
    Backslash,
    /// Both forms are accepted (MySQL default mode).
    DoubledOrBackslash,
}

impl EscapeStyle {
    fn allows_doubled(self) -> bool {
        matches!(self, EscapeStyle::Doubled | EscapeStyle::DoubledOrBackslash)
    }

    fn allows_backslash(self) -> bool {
        matches!(self, EscapeStyle::Backslash | EscapeStyle::DoubledOrBackslash)
    }
}

/// Literal rules the scanner honours for one backend dialect.
///
/// Fields missing from a serialized form take their [`Default`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteralSyntax {
    pub escape: EscapeStyle,
    /// Recognise Postgres `$tag$ ... $tag$` bodies as literals.
    pub dollar_quotes: bool,
    /// `/* /* */ */` nests, as in standard SQL. MySQL and SQLite close at the first `*/`.
    pub nested_comments: bool,
    /// `` `name` `` is a quoted identifier (MySQL, SQLite).
    pub backticks: bool,
    /// `[name]` is a quoted identifier (SQL Server, Sybase, SQLite).
    pub brackets: bool,
}

impl Default for LiteralSyntax {
    fn default() -> Self {
        Self {
            escape: EscapeStyle::Doubled,
            dollar_quotes: false,
            nested_comments: true,
            backticks: false,
            brackets: false,
        }
    }
}

impl LiteralSyntax {
    #[must_use]
    pub fn for_backend(backend: Backend) -> Self {
        let standard = Self::default();
        match backend {
            Backend::Mysql => Self {
                escape: EscapeStyle::DoubledOrBackslash,
                nested_comments: false,
                backticks: true,
                ..standard
            },
            Backend::Postgres => Self {
                dollar_quotes: true,
                ..standard
            },
            Backend::Sqlite => Self {
                nested_comments: false,
                backticks: true,
                brackets: true,
                ..standard
            },
            Backend::Mssql | Backend::Sybase => Self {
                brackets: true,
                ..standard
            },
            _ => standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind<'a> {
    /// 0-based order of the `?` within the statement.
    Positional(usize),
    /// Name without the leading colon.
    Named(&'a str),
}

/// One unquoted placeholder found in a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole token, including the `:` of named placeholders.
    pub span: Range<usize>,
    pub kind: PlaceholderKind<'a>,
}

/// Locate every placeholder of `style` that sits outside literals and comments.
///
/// Quoted strings, quoted identifiers, `--` and `/* */` comments, and (when
/// enabled) dollar-quoted bodies are skipped with a small state machine;
/// escape handling inside literals follows `syntax.escape`.
/// ```rust
/// use portable_sql::translation::{LiteralSyntax, PlaceholderStyle, scan_placeholders};
///
/// let found = scan_placeholders(
///     "SELECT ':foo' AS lit WHERE x = :foo",
///     PlaceholderStyle::Named,
///     LiteralSyntax::default(),
/// );
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].span, 31..35);
/// ```
#[must_use]
pub fn scan_placeholders(
    sql: &str,
    style: PlaceholderStyle,
    syntax: LiteralSyntax,
) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut state = State::Normal;
    let mut positional = 0;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' if syntax.backticks => state = State::Backticked,
                b'[' if syntax.brackets => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' if syntax.dollar_quotes => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b'?' if style == PlaceholderStyle::Positional => {
                    found.push(Placeholder {
                        span: idx..idx + 1,
                        kind: PlaceholderKind::Positional(positional),
                    });
                    positional += 1;
                }
                b':' if style == PlaceholderStyle::Named => {
                    if is_cast(bytes, idx) {
                        idx += 1;
                    } else if let Some(end) = scan_name(bytes, idx + 1) {
                        found.push(Placeholder {
                            span: idx..end,
                            kind: PlaceholderKind::Named(&sql[idx + 1..end]),
                        });
                        idx = end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if matches!(state, State::SingleQuoted) {
                    b'\''
                } else {
                    b'"'
                };
                if b == b'\\' && syntax.escape.allows_backslash() {
                    idx += 1;
                } else if b == quote {
                    if syntax.escape.allows_doubled() && bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked | State::Bracketed => {
                let close = if matches!(state, State::Backticked) {
                    b'`'
                } else {
                    b']'
                };
                if b == close {
                    if bytes.get(idx + 1) == Some(&close) {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if syntax.nested_comments && is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let tag_len = tag.len();
                    state = State::Normal;
                    idx += tag_len + 1;
                }
            }
        }

        idx += 1;
    }

    found
}

/// Byte offsets of each unquoted `?`, in order.
#[must_use]
pub fn positional_placeholder_positions(sql: &str, syntax: LiteralSyntax) -> Vec<usize> {
    scan_placeholders(sql, PlaceholderStyle::Positional, syntax)
        .into_iter()
        .map(|p| p.span.start)
        .collect()
}

/// Byte offsets and names of each unquoted `:name`, in order.
#[must_use]
pub fn named_placeholder_positions(sql: &str, syntax: LiteralSyntax) -> Vec<(usize, &str)> {
    scan_placeholders(sql, PlaceholderStyle::Named, syntax)
        .into_iter()
        .filter_map(|p| match p.kind {
            PlaceholderKind::Named(name) => Some((p.span.start, name)),
            PlaceholderKind::Positional(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STD: LiteralSyntax = LiteralSyntax {
        escape: EscapeStyle::Doubled,
        dollar_quotes: false,
        nested_comments: true,
        backticks: false,
        brackets: false,
    };

    #[test]
    fn finds_positional_in_order() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = ?";
        assert_eq!(positional_placeholder_positions(sql, STD), vec![26, 36]);
        let found = scan_placeholders(sql, PlaceholderStyle::Positional, STD);
        assert_eq!(found[1].kind, PlaceholderKind::Positional(1));
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "SELECT '?', \"?\" -- ?\n/* ? /* ? */ ? */ FROM t WHERE a = ?";
        assert_eq!(
            positional_placeholder_positions(sql, STD),
            vec![sql.len() - 1]
        );
    }

    #[test]
    fn named_placeholders_repeat_and_ignore_literals() {
        let sql = "SELECT ':foo' AS lit WHERE x = :foo OR y = :foo AND z = :bar_1";
        let names: Vec<&str> = named_placeholder_positions(sql, STD)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["foo", "foo", "bar_1"]);
    }

    #[test]
    fn postgres_casts_are_not_placeholders() {
        let sql = "SELECT :val::int, x::text FROM t";
        let found = named_placeholder_positions(sql, STD);
        assert_eq!(found, vec![(7, "val")]);
    }

    #[test]
    fn doubled_quotes_keep_literal_open() {
        let sql = "SELECT 'it''s ?' WHERE a = ?";
        assert_eq!(positional_placeholder_positions(sql, STD), vec![27]);
    }

    #[test]
    fn backslash_escape_depends_on_dialect() {
        let sql = r"SELECT 'a\' ?' WHERE b = ?";
        let mysql = LiteralSyntax::for_backend(Backend::Mysql);
        assert_eq!(positional_placeholder_positions(sql, mysql), vec![25]);

        // With SQL-standard escaping the backslash is ordinary text, so the
        // literal closes early and the first `?` is live.
        assert_eq!(positional_placeholder_positions(sql, STD), vec![12]);
    }

    #[test]
    fn dollar_quoted_bodies_are_skipped_for_postgres() {
        let sql = "SELECT $fn$ :inner $fn$, :outer";
        let pg = LiteralSyntax::for_backend(Backend::Postgres);
        let names: Vec<&str> = named_placeholder_positions(sql, pg)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["outer"]);
    }

    #[test]
    fn unterminated_literal_hides_the_rest() {
        let sql = "SELECT 'open ? WHERE a = ?";
        assert!(positional_placeholder_positions(sql, STD).is_empty());
    }

    #[test]
    fn mysql_comments_close_at_first_terminator() {
        let sql = "SELECT 1 /* a /* b */ WHERE x = ?";
        let mysql = LiteralSyntax::for_backend(Backend::Mysql);
        assert_eq!(positional_placeholder_positions(sql, mysql), vec![sql.len() - 1]);
        assert!(positional_placeholder_positions(sql, STD).is_empty());
    }

    #[test]
    fn backtick_identifiers_are_skipped_for_mysql() {
        let sql = "SELECT `odd?col`, `a``:b` FROM t WHERE x = :x";
        let mysql = LiteralSyntax::for_backend(Backend::Mysql);
        assert_eq!(
            positional_placeholder_positions(sql, mysql),
            Vec::<usize>::new()
        );
        let names: Vec<&str> = named_placeholder_positions(sql, mysql)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["x"]);
        assert_eq!(positional_placeholder_positions(sql, STD), vec![11]);
    }

    #[test]
    fn bracket_identifiers_are_skipped_for_sql_server() {
        let sql = "SELECT [what?], [a]]?] FROM t WHERE x = ?";
        let mssql = LiteralSyntax::for_backend(Backend::Mssql);
        assert_eq!(positional_placeholder_positions(sql, mssql), vec![sql.len() - 1]);
        assert_eq!(positional_placeholder_positions(sql, STD).len(), 3);
    }

    #[test]
    fn missing_syntax_fields_take_defaults() {
        let syntax: LiteralSyntax = serde_json::from_str(r#"{"backticks": true}"#).unwrap();
        assert!(syntax.backticks);
        assert!(syntax.nested_comments);
        assert_eq!(syntax.escape, EscapeStyle::Doubled);
    }
}
