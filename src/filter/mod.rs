//! Filter compiler: the OR text grammar and structured filter descriptors.

mod compile;
mod grammar;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use compile::{convert_literal, FilterCompiler};
pub use grammar::{split_or_segments, text_filter, text_filter_expr, TextMatch};

use crate::error::{CompileError, Result};

/// Comparison applied by a [`FilterDescriptor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilterOperator {
    /// Unset; the descriptor is not applied.
    #[default]
    None,
    /// `property == value`
    Equal,
    /// `property != value`
    NotEqual,
    /// `property < value`
    LessThan,
    /// `property <= value`
    LessThanOrEqual,
    /// `property > value`
    GreaterThan,
    /// `property >= value`
    GreaterThanOrEqual,
    /// Prefix match, on the textual form for non-text properties.
    StartsWith,
    /// Substring match, on the textual form for non-text properties.
    Contains,
    /// Membership in a separator-delimited value list.
    In,
    /// Null, or empty text.
    IsEmpty,
    /// Negation of [`FilterOperator::IsEmpty`].
    IsNotEmpty,
}

impl FilterOperator {
    /// Every operator, `None` first.
    pub const ALL: [FilterOperator; 12] = [
        FilterOperator::None,
        FilterOperator::Equal,
        FilterOperator::NotEqual,
        FilterOperator::LessThan,
        FilterOperator::LessThanOrEqual,
        FilterOperator::GreaterThan,
        FilterOperator::GreaterThanOrEqual,
        FilterOperator::StartsWith,
        FilterOperator::Contains,
        FilterOperator::In,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
    ];

    /// Canonical operator name.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::None => "None",
            FilterOperator::Equal => "Equal",
            FilterOperator::NotEqual => "NotEqual",
            FilterOperator::LessThan => "LessThan",
            FilterOperator::LessThanOrEqual => "LessThanOrEqual",
            FilterOperator::GreaterThan => "GreaterThan",
            FilterOperator::GreaterThanOrEqual => "GreaterThanOrEqual",
            FilterOperator::StartsWith => "StartsWith",
            FilterOperator::Contains => "Contains",
            FilterOperator::In => "In",
            FilterOperator::IsEmpty => "IsEmpty",
            FilterOperator::IsNotEmpty => "IsNotEmpty",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = CompileError;

    /// Parses an operator name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self> {
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CompileError::UnsupportedOperator {
                operator: s.to_owned(),
            })
    }
}

impl TryFrom<String> for FilterOperator {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_owned()
    }
}

/// One structured filter: `property <operator> value`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// Dotted property path.
    pub property: String,
    /// Comparison to apply.
    #[serde(default)]
    pub operator: FilterOperator,
    /// Raw value, converted to the property's type at compile time.
    #[serde(default)]
    pub value: Option<String>,
}

impl FilterDescriptor {
    /// Creates a descriptor.
    pub fn new(property: impl Into<String>, operator: FilterOperator, value: Option<&str>) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.map(str::to_owned),
        }
    }

    /// Parses a JSON array of descriptors.
    ///
    /// Unknown operator names surface as
    /// [`CompileError::UnsupportedOperator`] rather than a JSON error.
    pub fn list_from_json(text: &str) -> Result<Vec<Self>> {
        let raw: Vec<RawDescriptor> = serde_json::from_str(text)
            .map_err(|err| CompileError::Document(format!("filter list: {err}")))?;
        raw.into_iter()
            .map(|raw| {
                let operator = match raw.operator {
                    Some(name) => name.parse()?,
                    None => FilterOperator::None,
                };
                Ok(Self {
                    property: raw.property,
                    operator,
                    value: raw.value,
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    property: String,
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    value: Option<String>,
}
