use serde::Serialize;

use crate::error::PortableSqlError;
use crate::types::{ParamType, ParamValue};

/// Bound values for one statement, either all positional or all named.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Params {
    /// Values for `?` placeholders, in order of appearance.
    Positional(Vec<ParamValue>),
    /// Values for `:name` placeholders, keyed by name without the colon.
    Named(Vec<(String, ParamValue)>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

impl Params {
    /// Build a named collection; a leading `:` on a key is ignored.
    pub fn named<K: Into<String>>(pairs: impl IntoIterator<Item = (K, ParamValue)>) -> Self {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (strip_colon(k.into()), v))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Params::Positional(values) => values.len(),
            Params::Named(pairs) => pairs.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        matches!(self, Params::Named(_))
    }

    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&ParamValue> {
        match self {
            Params::Positional(values) => values.get(index),
            Params::Named(_) => None,
        }
    }

    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&ParamValue> {
        match self {
            Params::Named(pairs) => pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            Params::Positional(_) => None,
        }
    }
}

impl From<Vec<ParamValue>> for Params {
    fn from(values: Vec<ParamValue>) -> Self {
        Params::Positional(values)
    }
}

/// Type annotations aligned with [`Params`]. Missing entries mean "untyped".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParamTypes {
    Positional(Vec<Option<ParamType>>),
    Named(Vec<(String, ParamType)>),
}

impl Default for ParamTypes {
    fn default() -> Self {
        ParamTypes::Positional(Vec::new())
    }
}

impl ParamTypes {
    /// Positional annotations where every listed parameter is typed.
    pub fn positional(types: impl IntoIterator<Item = ParamType>) -> Self {
        ParamTypes::Positional(types.into_iter().map(Some).collect())
    }

    pub fn named<K: Into<String>>(pairs: impl IntoIterator<Item = (K, ParamType)>) -> Self {
        ParamTypes::Named(
            pairs
                .into_iter()
                .map(|(k, t)| (strip_colon(k.into()), t))
                .collect(),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            ParamTypes::Positional(types) => types.is_empty(),
            ParamTypes::Named(pairs) => pairs.is_empty(),
        }
    }

    #[must_use]
    pub fn positional_type(&self, index: usize) -> Option<ParamType> {
        match self {
            ParamTypes::Positional(types) => types.get(index).copied().flatten(),
            ParamTypes::Named(_) => None,
        }
    }

    #[must_use]
    pub fn named_type(&self, name: &str) -> Option<ParamType> {
        match self {
            ParamTypes::Named(pairs) => pairs.iter().find(|(k, _)| k == name).map(|(_, t)| *t),
            ParamTypes::Positional(_) => None,
        }
    }

    /// Whether any annotation is one of the array variants.
    #[must_use]
    pub fn has_array(&self) -> bool {
        match self {
            ParamTypes::Positional(types) => types.iter().flatten().any(|t| t.is_array()),
            ParamTypes::Named(pairs) => pairs.iter().any(|(_, t)| t.is_array()),
        }
    }
}

/// A SQL string together with its bound values and type annotations.
///
/// ```rust
/// use portable_sql::prelude::*;
///
/// let query = Query::new(
///     "SELECT * FROM users WHERE id IN (:ids)",
///     Params::named([("ids", ParamValue::Array(vec![ParamValue::Int(1)]))]),
/// )
/// .with_types(ParamTypes::named([("ids", ParamType::IntegerArray)]));
/// # let _ = query;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Params,
    pub types: ParamTypes,
}

impl Query {
    pub fn new(sql: impl Into<String>, params: impl Into<Params>) -> Self {
        Self {
            sql: sql.into(),
            params: params.into(),
            types: ParamTypes::default(),
        }
    }

    /// Create a query with no parameters
    pub fn without_params(sql: impl Into<String>) -> Self {
        Self::new(sql, Params::default())
    }

    #[must_use]
    pub fn with_types(mut self, types: ParamTypes) -> Self {
        self.types = types;
        self
    }

    /// Reject params and types that use different placeholder styles.
    ///
    /// # Errors
    /// Returns `PortableSqlError::MixedParameterStyles` when one side is named
    /// and the other positional (an empty type list matches either).
    pub fn check_styles(&self) -> Result<(), PortableSqlError> {
        check_styles(&self.params, &self.types)
    }
}

pub(crate) fn check_styles(params: &Params, types: &ParamTypes) -> Result<(), PortableSqlError> {
    let types_named = matches!(types, ParamTypes::Named(_));
    if types.is_empty() || params.is_empty() || params.is_named() == types_named {
        return Ok(());
    }
    Err(PortableSqlError::MixedParameterStyles(
        "params and types must both be positional or both be named".into(),
    ))
}

fn strip_colon(key: String) -> String {
    match key.strip_prefix(':') {
        Some(stripped) => stripped.to_string(),
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_drop_leading_colon() {
        let params = Params::named([(":id", ParamValue::Int(7))]);
        assert_eq!(params.get_named("id"), Some(&ParamValue::Int(7)));
        let types = ParamTypes::named([(":id", ParamType::Integer)]);
        assert_eq!(types.named_type("id"), Some(ParamType::Integer));
    }

    #[test]
    fn mixed_styles_are_rejected() {
        let query = Query::new("SELECT ?", vec![ParamValue::Int(1)])
            .with_types(ParamTypes::named([("a", ParamType::Integer)]));
        assert!(matches!(
            query.check_styles(),
            Err(PortableSqlError::MixedParameterStyles(_))
        ));

        let untyped = Query::new("SELECT :a", Params::named([("a", ParamValue::Int(1))]));
        assert!(untyped.check_styles().is_ok());
    }

    #[test]
    fn positional_types_may_have_gaps() {
        let types = ParamTypes::Positional(vec![None, Some(ParamType::IntegerArray)]);
        assert_eq!(types.positional_type(0), None);
        assert_eq!(types.positional_type(1), Some(ParamType::IntegerArray));
        assert_eq!(types.positional_type(5), None);
        assert!(types.has_array());
    }
}
