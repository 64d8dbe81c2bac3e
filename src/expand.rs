//! Rewrites a statement into the flat positional form drivers consume.
//!
//! Array-typed bindings are spread into one `?` per element (or the literal
//! `NULL` when empty) and named placeholders are resolved to positions.

use crate::error::PortableSqlError;
use crate::query::{Params, ParamTypes, Query, check_styles};
use crate::translation::{LiteralSyntax, PlaceholderKind, PlaceholderStyle, scan_placeholders};
use crate::types::{ParamType, ParamValue};

/// Statement ready for the driver: `?` placeholders only, params and types aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    pub sql: String,
    pub params: Vec<ParamValue>,
    pub types: Vec<ParamType>,
}

/// Expand with SQL-standard literal escaping.
///
/// # Errors
/// See [`expand_with_syntax`].
pub fn expand(
    sql: &str,
    params: &Params,
    types: &ParamTypes,
) -> Result<ExpandedQuery, PortableSqlError> {
    expand_with_syntax(sql, params, types, LiteralSyntax::default())
}

/// Expand a [`Query`] using the literal rules of its target dialect.
///
/// # Errors
/// See [`expand_with_syntax`].
pub fn expand_query(query: &Query, syntax: LiteralSyntax) -> Result<ExpandedQuery, PortableSqlError> {
    expand_with_syntax(&query.sql, &query.params, &query.types, syntax)
}

/// Validate every placeholder has a value and spread array bindings.
///
/// ```rust
/// use portable_sql::prelude::*;
///
/// let out = expand(
///     "SELECT * FROM t WHERE x IN (?)",
///     &Params::Positional(vec![ParamValue::Array(vec![
///         ParamValue::Int(1),
///         ParamValue::Int(2),
///         ParamValue::Int(3),
///     ])]),
///     &ParamTypes::positional([ParamType::IntegerArray]),
/// )?;
/// assert_eq!(out.sql, "SELECT * FROM t WHERE x IN (?, ?, ?)");
/// assert_eq!(out.types, vec![ParamType::Integer; 3]);
/// # Ok::<(), PortableSqlError>(())
/// ```
///
/// # Errors
/// Returns `MissingPositionalParameter` / `MissingNamedParameter` when a
/// placeholder has no bound value, and `MixedParameterStyles` when params
/// and types disagree on style.
pub fn expand_with_syntax(
    sql: &str,
    params: &Params,
    types: &ParamTypes,
    syntax: LiteralSyntax,
) -> Result<ExpandedQuery, PortableSqlError> {
    check_styles(params, types)?;

    let style = if params.is_named() {
        PlaceholderStyle::Named
    } else {
        PlaceholderStyle::Positional
    };
    let placeholders = scan_placeholders(sql, style, syntax);

    let mut out_sql = String::with_capacity(sql.len());
    let mut out_params = Vec::with_capacity(placeholders.len());
    let mut out_types = Vec::with_capacity(placeholders.len());
    let mut cursor = 0;

    for placeholder in &placeholders {
        let (value, declared) = match placeholder.kind {
            PlaceholderKind::Positional(index) => (
                params
                    .positional(index)
                    .ok_or(PortableSqlError::MissingPositionalParameter(index))?,
                types.positional_type(index),
            ),
            PlaceholderKind::Named(name) => (
                params
                    .get_named(name)
                    .ok_or_else(|| PortableSqlError::MissingNamedParameter(name.to_string()))?,
                types.named_type(name),
            ),
        };

        out_sql.push_str(&sql[cursor..placeholder.span.start]);
        cursor = placeholder.span.end;

        match array_binding(value, declared) {
            Some((items, _)) if items.is_empty() => out_sql.push_str("NULL"),
            Some((items, element_type)) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out_sql.push_str(", ");
                    }
                    out_sql.push('?');
                    out_params.push(item.clone());
                    out_types.push(element_type);
                }
            }
            None => {
                out_sql.push('?');
                out_params.push(value.clone());
                out_types.push(declared.unwrap_or(ParamType::String));
            }
        }
    }
    out_sql.push_str(&sql[cursor..]);

    if out_params.len() != placeholders.len() {
        tracing::trace!(
            placeholders = placeholders.len(),
            bindings = out_params.len(),
            "expanded array parameters"
        );
    }

    Ok(ExpandedQuery {
        sql: out_sql,
        params: out_params,
        types: out_types,
    })
}

/// Elements and element type when `value` must be spread, `None` for scalars.
///
/// An array-typed scalar is bound as a one-element list. A `ParamValue::Array`
/// always spreads: elements take the declared scalar type when one is given,
/// otherwise the default string type. Array values never reach the driver.
fn array_binding(
    value: &ParamValue,
    declared: Option<ParamType>,
) -> Option<(&[ParamValue], ParamType)> {
    match (declared.and_then(ParamType::element_type), value) {
        (Some(element_type), ParamValue::Array(items)) => Some((items.as_slice(), element_type)),
        (Some(element_type), scalar) => Some((std::slice::from_ref(scalar), element_type)),
        (None, ParamValue::Array(items)) => {
            Some((items.as_slice(), declared.unwrap_or(ParamType::String)))
        }
        (None, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> ParamValue {
        ParamValue::Array(values.iter().copied().map(ParamValue::Int).collect())
    }

    #[test]
    fn scalars_pass_through_unchanged() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = ?";
        let params = Params::Positional(vec![ParamValue::Int(1), ParamValue::Text("x".into())]);
        let types = ParamTypes::positional([ParamType::Integer]);
        let out = expand(sql, &params, &types).unwrap();
        assert_eq!(out.sql, sql);
        assert_eq!(out.params, vec![ParamValue::Int(1), ParamValue::Text("x".into())]);
        assert_eq!(out.types, vec![ParamType::Integer, ParamType::String]);
    }

    #[test]
    fn positional_array_spreads_in_place() {
        let out = expand(
            "SELECT * FROM t WHERE a = ? AND x IN (?) AND b = ?",
            &Params::Positional(vec![
                ParamValue::Text("a".into()),
                ints(&[1, 2, 3]),
                ParamValue::Bool(true),
            ]),
            &ParamTypes::Positional(vec![
                Some(ParamType::String),
                Some(ParamType::IntegerArray),
                Some(ParamType::Boolean),
            ]),
        )
        .unwrap();
        assert_eq!(out.sql, "SELECT * FROM t WHERE a = ? AND x IN (?, ?, ?) AND b = ?");
        assert_eq!(
            out.params,
            vec![
                ParamValue::Text("a".into()),
                ParamValue::Int(1),
                ParamValue::Int(2),
                ParamValue::Int(3),
                ParamValue::Bool(true),
            ]
        );
        assert_eq!(
            out.types,
            vec![
                ParamType::String,
                ParamType::Integer,
                ParamType::Integer,
                ParamType::Integer,
                ParamType::Boolean,
            ]
        );
    }

    #[test]
    fn array_value_with_scalar_tag_spreads_as_that_type() {
        let out = expand(
            "SELECT * FROM t WHERE x IN (?)",
            &Params::Positional(vec![ints(&[1, 2])]),
            &ParamTypes::positional([ParamType::Integer]),
        )
        .unwrap();
        assert_eq!(out.sql, "SELECT * FROM t WHERE x IN (?, ?)");
        assert_eq!(out.params, vec![ParamValue::Int(1), ParamValue::Int(2)]);
        assert_eq!(out.types, vec![ParamType::Integer, ParamType::Integer]);
        assert!(!out.params.iter().any(|p| matches!(p, ParamValue::Array(_))));
    }

    #[test]
    fn empty_array_collapses_to_null() {
        let out = expand(
            "SELECT * FROM t WHERE x IN (?)",
            &Params::Positional(vec![ParamValue::Array(vec![])]),
            &ParamTypes::positional([ParamType::IntegerArray]),
        )
        .unwrap();
        assert_eq!(out.sql, "SELECT * FROM t WHERE x IN (NULL)");
        assert!(out.params.is_empty());
        assert!(out.types.is_empty());
    }

    #[test]
    fn named_query_resolves_to_positional() {
        let out = expand(
            "SELECT * FROM t WHERE id IN (:ids) AND name = :name AND id <> :first",
            &Params::named([
                ("name", ParamValue::Text("bob".into())),
                ("ids", ParamValue::Array(vec![
                    ParamValue::Text("a".into()),
                    ParamValue::Text("b".into()),
                ])),
                ("first", ParamValue::Int(9)),
            ]),
            &ParamTypes::named([("ids", ParamType::AsciiStringArray)]),
        )
        .unwrap();
        assert_eq!(
            out.sql,
            "SELECT * FROM t WHERE id IN (?, ?) AND name = ? AND id <> ?"
        );
        assert_eq!(
            out.params,
            vec![
                ParamValue::Text("a".into()),
                ParamValue::Text("b".into()),
                ParamValue::Text("bob".into()),
                ParamValue::Int(9),
            ]
        );
        assert_eq!(
            out.types,
            vec![
                ParamType::AsciiString,
                ParamType::AsciiString,
                ParamType::String,
                ParamType::String,
            ]
        );
    }

    #[test]
    fn repeated_named_array_expands_at_each_site() {
        let out = expand(
            "SELECT * FROM a WHERE x IN (:ids) UNION SELECT * FROM b WHERE y IN (:ids)",
            &Params::named([("ids", ints(&[4, 5]))]),
            &ParamTypes::named([("ids", ParamType::IntegerArray)]),
        )
        .unwrap();
        assert_eq!(
            out.sql,
            "SELECT * FROM a WHERE x IN (?, ?) UNION SELECT * FROM b WHERE y IN (?, ?)"
        );
        assert_eq!(out.params.len(), 4);
        assert_eq!(out.params[2], ParamValue::Int(4));
    }

    #[test]
    fn quoted_named_marker_is_left_alone() {
        let out = expand(
            "SELECT ':foo' AS lit WHERE x = :foo",
            &Params::named([("foo", ints(&[1, 2]))]),
            &ParamTypes::named([("foo", ParamType::IntegerArray)]),
        )
        .unwrap();
        assert_eq!(out.sql, "SELECT ':foo' AS lit WHERE x = ?, ?");
        assert_eq!(out.params, vec![ParamValue::Int(1), ParamValue::Int(2)]);
    }

    #[test]
    fn missing_named_parameter_is_reported() {
        let err = expand(
            "SELECT * FROM t WHERE a = :foo AND b = :bar",
            &Params::named([("foo", ParamValue::Int(1))]),
            &ParamTypes::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PortableSqlError::MissingNamedParameter(ref n) if n == "bar"));
    }

    #[test]
    fn missing_positional_parameter_is_reported() {
        let err = expand(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            &Params::Positional(vec![ParamValue::Int(1)]),
            &ParamTypes::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PortableSqlError::MissingPositionalParameter(1)));
    }

    #[test]
    fn empty_named_array_collapses_every_occurrence() {
        let out = expand(
            "DELETE FROM t WHERE a IN (:ids) OR b IN (:ids) OR c = :c",
            &Params::named([
                ("ids", ParamValue::Array(vec![])),
                ("c", ParamValue::Null),
            ]),
            &ParamTypes::named([("ids", ParamType::StringArray), ("c", ParamType::Null)]),
        )
        .unwrap();
        assert_eq!(out.sql, "DELETE FROM t WHERE a IN (NULL) OR b IN (NULL) OR c = ?");
        assert_eq!(out.params, vec![ParamValue::Null]);
        assert_eq!(out.types, vec![ParamType::Null]);
    }

    #[test]
    fn untyped_array_value_is_spread_as_strings() {
        let out = expand(
            "SELECT * FROM t WHERE x IN (?)",
            &Params::Positional(vec![ints(&[7, 8])]),
            &ParamTypes::default(),
        )
        .unwrap();
        assert_eq!(out.sql, "SELECT * FROM t WHERE x IN (?, ?)");
        assert_eq!(out.types, vec![ParamType::String, ParamType::String]);
    }

    #[test]
    fn array_type_on_scalar_binds_one_element() {
        let out = expand(
            "SELECT * FROM t WHERE x IN (?)",
            &Params::Positional(vec![ParamValue::Int(3)]),
            &ParamTypes::positional([ParamType::IntegerArray]),
        )
        .unwrap();
        assert_eq!(out.sql, "SELECT * FROM t WHERE x IN (?)");
        assert_eq!(out.types, vec![ParamType::Integer]);
    }
}
