//! Structured filter descriptors to predicate expressions.

use tracing::{debug, trace};

use super::{text_filter_expr, FilterDescriptor, FilterOperator};
use crate::convert::{parse_enum, parse_text};
use crate::error::{CompileError, Result};
use crate::expr::{BinaryOp, Expr, Lambda, Method, Param};
use crate::options::CompilerOptions;
use crate::path;
use crate::schema::{Schema, TypeRef};
use crate::value::Value;

/// Constant for `raw` converted to `ty`. Nullable targets get the underlying
/// constant wrapped in a conversion; an absent value is a null constant.
pub fn convert_literal(raw: Option<&str>, ty: &TypeRef, schema: &Schema) -> Result<Expr> {
    let value = match raw {
        Some(raw) => parse_text(raw, ty, schema)?,
        None => Value::Null,
    };
    if ty.is_nullable() {
        Expr::convert(Expr::literal(value, ty.underlying().clone())?, ty.clone())
    } else {
        Expr::literal(value, ty.clone())
    }
}

/// Compiles filter descriptors against one schema.
pub struct FilterCompiler<'a> {
    schema: &'a Schema,
    root_name: String,
    in_separator: String,
}

impl<'a> FilterCompiler<'a> {
    /// Compiler with default options.
    pub fn new(schema: &'a Schema) -> Self {
        let defaults = CompilerOptions::default().filter;
        Self {
            schema,
            root_name: defaults.root_parameter,
            in_separator: defaults.in_separator,
        }
    }

    /// Applies `[filter]` options.
    pub fn with_options(mut self, options: &CompilerOptions) -> Self {
        self.root_name = options.filter.root_parameter.clone();
        self.in_separator = options.filter.in_separator.clone();
        self
    }

    /// AND-combines every applied descriptor into one predicate; descriptors
    /// whose operator is [`FilterOperator::None`] are skipped.
    pub fn compile(&self, root_type: &TypeRef, filters: &[FilterDescriptor]) -> Result<Lambda> {
        let root = Param::new(self.root_name.clone(), root_type.clone());
        let mut predicates = Vec::with_capacity(filters.len());
        for filter in filters {
            if filter.operator == FilterOperator::None {
                trace!(property = %filter.property, "filter.skip");
                continue;
            }
            predicates.push(self.build_predicate(filter, &root)?);
        }
        let body = Expr::fold(BinaryOp::AndAlso, predicates)?.unwrap_or_else(Expr::always_true);
        let lambda = Lambda::new(root, body);
        debug!(filters = filters.len(), expr = %lambda, "filter.compile");
        Ok(lambda)
    }

    /// Text-grammar predicate on `property`, over a fresh root parameter.
    pub fn text_filter(&self, root_type: &TypeRef, property: &str, text: &str) -> Result<Lambda> {
        let root = Param::new(self.root_name.clone(), root_type.clone());
        let body = text_filter_expr(self.schema, &root, property, text)?;
        Ok(Lambda::new(root, body))
    }

    /// Boolean expression for one descriptor, read off `root`.
    pub fn build_predicate(&self, filter: &FilterDescriptor, root: &Param) -> Result<Expr> {
        let prop = path::resolve(self.schema, &Expr::param(root), &filter.property)?;
        let prop_ty = prop.ty();
        let raw = filter.value.as_deref();
        let cmp = |op: BinaryOp, prop: Expr| -> Result<Expr> {
            Expr::binary(op, prop, convert_literal(raw, &prop_ty, self.schema)?)
        };
        match filter.operator {
            FilterOperator::None => Err(CompileError::UnsupportedOperator {
                operator: filter.operator.to_string(),
            }),
            FilterOperator::In => self.membership(prop, raw),
            FilterOperator::Equal => cmp(BinaryOp::Equal, prop),
            FilterOperator::NotEqual => cmp(BinaryOp::NotEqual, prop),
            FilterOperator::LessThan => cmp(BinaryOp::LessThan, prop),
            FilterOperator::LessThanOrEqual => cmp(BinaryOp::LessThanOrEqual, prop),
            FilterOperator::GreaterThan => cmp(BinaryOp::GreaterThan, prop),
            FilterOperator::GreaterThanOrEqual => cmp(BinaryOp::GreaterThanOrEqual, prop),
            FilterOperator::StartsWith => self.text_match(Method::StartsWith, prop, raw),
            FilterOperator::Contains => self.text_match(Method::Contains, prop, raw),
            FilterOperator::IsEmpty => self.is_empty(prop, raw),
            FilterOperator::IsNotEmpty => Expr::not(self.is_empty(prop, raw)?),
        }
    }

    fn text_match(&self, method: Method, prop: Expr, raw: Option<&str>) -> Result<Expr> {
        let ty = prop.ty();
        let constant = convert_literal(raw, &ty, self.schema)?;
        if ty.is_text() {
            return Expr::call(method, prop, vec![constant]);
        }
        if raw.is_none() {
            return Err(CompileError::conversion(
                "null",
                &ty,
                "a missing value has no textual form",
            ));
        }
        let prop_text = Expr::call(Method::ToText, prop, Vec::new())?;
        let constant_text = Expr::call(Method::ToText, constant, Vec::new())?;
        Expr::call(method, prop_text, vec![constant_text])
    }

    fn is_empty(&self, prop: Expr, raw: Option<&str>) -> Result<Expr> {
        let ty = prop.ty();
        if ty.is_text() {
            let is_null = Expr::equal(prop.clone(), Expr::null(ty.clone()))?;
            let is_blank = Expr::equal(prop, Expr::literal("", ty)?)?;
            return Expr::binary(BinaryOp::OrElse, is_null, is_blank);
        }
        Expr::equal(prop, convert_literal(raw, &ty, self.schema)?)
    }

    fn membership(&self, prop: Expr, raw: Option<&str>) -> Result<Expr> {
        let ty = prop.ty();
        let raw = raw.ok_or_else(|| {
            CompileError::conversion("null", &ty, "In requires a value list")
        })?;
        let tokens = raw.split(self.in_separator.as_str());
        match ty.underlying() {
            TypeRef::Uuid => {
                let mut matches = Vec::new();
                for token in tokens {
                    let id = Expr::literal(parse_text(token, &TypeRef::Uuid, self.schema)?, TypeRef::Uuid)?;
                    matches.push(Expr::equal(id, prop.clone())?);
                }
                Ok(Expr::fold(BinaryOp::OrElse, matches)?
                    .unwrap_or_else(|| Expr::Literal {
                        value: Value::Bool(false),
                        ty: TypeRef::Bool,
                    }))
            }
            TypeRef::Enum(name) => {
                let values = tokens
                    .map(|token| parse_enum(token, name, self.schema).map(Value::Enum))
                    .collect::<Result<Vec<_>>>()?;
                let list = Expr::literal(Value::List(values), TypeRef::list(TypeRef::Enum(name.clone())))?;
                Expr::call(Method::ListContains, list, vec![prop])
            }
            _ => {
                let values = tokens.map(Value::from).collect();
                let list = Expr::literal(Value::List(values), TypeRef::list(TypeRef::String))?;
                let needle = if ty.is_text() {
                    prop
                } else {
                    Expr::call(Method::ToText, prop, Vec::new())?
                };
                Expr::call(Method::ListContains, list, vec![needle])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumType, RecordType};
    use crate::value::{EnumValue, Record};
    use uuid::Uuid;

    fn schema() -> Schema {
        Schema::new()
            .with_record(
                RecordType::new("Person")
                    .field("Id", TypeRef::Uuid)
                    .field("Name", TypeRef::String)
                    .field("Age", TypeRef::Int)
                    .field("Score", TypeRef::Int.nullable())
                    .field("Nick", TypeRef::String.nullable())
                    .field("Mood", TypeRef::Enum("Mood".into())),
            )
            .with_enum(
                EnumType::new("Mood")
                    .constant("Calm", 1)
                    .constant("Grumpy", 2)
                    .constant("Sleepy", 3)
                    .constant("Hungry", 4),
            )
    }

    fn person() -> TypeRef {
        TypeRef::Record("Person".into())
    }

    fn mood(ordinal: i64) -> Value {
        Value::Enum(EnumValue {
            ordinal,
            name: None,
        })
    }

    fn predicate(schema: &Schema, op: FilterOperator, property: &str, value: Option<&str>) -> Result<Lambda> {
        FilterCompiler::new(schema).compile(&person(), &[FilterDescriptor::new(property, op, value)])
    }

    #[test]
    fn greater_than_converts_value() {
        let schema = schema();
        let lambda = predicate(&schema, FilterOperator::GreaterThan, "Age", Some("18")).unwrap();
        assert_eq!(lambda.to_string(), "x => (x.Age > 18)");
        assert!(lambda.test(&Value::Record(Record::new().with("Age", 21i64))).unwrap());
        assert!(!lambda.test(&Value::Record(Record::new().with("Age", 10i64))).unwrap());
    }

    #[test]
    fn nullable_targets_wrap_constant() {
        let schema = schema();
        let lambda = predicate(&schema, FilterOperator::Equal, "Score", Some("7")).unwrap();
        assert_eq!(lambda.to_string(), "x => (x.Score == (int?)7)");
    }

    #[test]
    fn empty_value_on_nullable_text_matches_empty_text() {
        let schema = schema();
        let lambda = predicate(&schema, FilterOperator::Equal, "Nick", Some("")).unwrap();
        assert_eq!(lambda.to_string(), r#"x => (x.Nick == (string?)"")"#);
        assert!(lambda.test(&Value::Record(Record::new().with("Nick", ""))).unwrap());
        assert!(!lambda.test(&Value::Record(Record::new().with("Nick", Value::Null))).unwrap());

        let prefix = predicate(&schema, FilterOperator::StartsWith, "Nick", Some("")).unwrap();
        assert!(prefix.test(&Value::Record(Record::new().with("Nick", "Bo"))).unwrap());
    }

    #[test]
    fn bad_literal_is_conversion_error() {
        let schema = schema();
        let err = predicate(&schema, FilterOperator::Equal, "Age", Some("old")).unwrap_err();
        assert_eq!(err.code(), "ValueConversion");
    }

    #[test]
    fn in_on_enum_matches_ordinals_and_names() {
        let schema = schema();
        let lambda = predicate(&schema, FilterOperator::In, "Mood", Some("1, 2,3")).unwrap();
        for ordinal in 1..=3 {
            let row = Value::Record(Record::new().with("Mood", mood(ordinal)));
            assert!(lambda.test(&row).unwrap(), "ordinal {ordinal}");
        }
        assert!(!lambda.test(&Value::Record(Record::new().with("Mood", mood(4)))).unwrap());

        let named = predicate(&schema, FilterOperator::In, "Mood", Some("Hungry")).unwrap();
        assert!(named.test(&Value::Record(Record::new().with("Mood", mood(4)))).unwrap());
        assert!(predicate(&schema, FilterOperator::In, "Mood", Some("Angry")).is_err());
    }

    #[test]
    fn in_on_uuid_or_equals_each_token() {
        let schema = schema();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lambda = predicate(&schema, FilterOperator::In, "Id", Some(format!("{a}, {b}").as_str())).unwrap();
        assert!(lambda.test(&Value::Record(Record::new().with("Id", b))).unwrap());
        assert!(!lambda.test(&Value::Record(Record::new().with("Id", Uuid::new_v4()))).unwrap());
        assert!(predicate(&schema, FilterOperator::In, "Id", Some("nope")).is_err());
    }

    #[test]
    fn in_on_other_types_compares_raw_text_tokens() {
        let schema = schema();
        let lambda = predicate(&schema, FilterOperator::In, "Age", Some("18,21")).unwrap();
        assert!(lambda.test(&Value::Record(Record::new().with("Age", 21i64))).unwrap());
        let spaced = predicate(&schema, FilterOperator::In, "Name", Some("Ann, Bob")).unwrap();
        assert!(spaced.test(&Value::Record(Record::new().with("Name", "Ann"))).unwrap());
        assert!(!spaced.test(&Value::Record(Record::new().with("Name", "Bob"))).unwrap());
    }

    #[test]
    fn in_respects_configured_separator() {
        let schema = schema();
        let options = CompilerOptions::from_toml_str("[filter]\nin_separator = \";\"").unwrap();
        let lambda = FilterCompiler::new(&schema)
            .with_options(&options)
            .compile(
                &person(),
                &[FilterDescriptor::new("Name", FilterOperator::In, Some("Ann;Bob"))],
            )
            .unwrap();
        assert!(lambda.test(&Value::Record(Record::new().with("Name", "Bob"))).unwrap());
    }

    #[test]
    fn text_filter_uses_configured_root_name() {
        let schema = schema();
        let options = CompilerOptions::from_toml_str("[filter]\nroot_parameter = \"row\"").unwrap();
        let configured = FilterCompiler::new(&schema)
            .with_options(&options)
            .text_filter(&person(), "Name", "Ann")
            .unwrap();
        assert_eq!(configured.to_string(), r#"row => row.Name.equals("Ann")"#);

        let default = crate::filter::text_filter(&schema, &person(), "Name", "Ann").unwrap();
        assert_eq!(default.to_string(), r#"x => x.Name.equals("Ann")"#);
    }

    #[test]
    fn starts_with_on_numbers_uses_text_form() {
        let schema = schema();
        let lambda = predicate(&schema, FilterOperator::StartsWith, "Age", Some("4")).unwrap();
        assert_eq!(lambda.to_string(), "x => x.Age.to_text().starts_with(4.to_text())");
        assert!(lambda.test(&Value::Record(Record::new().with("Age", 42i64))).unwrap());
        assert!(!lambda.test(&Value::Record(Record::new().with("Age", 24i64))).unwrap());
        let err = predicate(&schema, FilterOperator::Contains, "Age", None).unwrap_err();
        assert_eq!(err.code(), "ValueConversion");
    }

    #[test]
    fn is_empty_on_text_accepts_null_and_blank() {
        let schema = schema();
        let empty = predicate(&schema, FilterOperator::IsEmpty, "Name", None).unwrap();
        assert!(empty.test(&Value::Record(Record::new().with("Name", Value::Null))).unwrap());
        assert!(empty.test(&Value::Record(Record::new().with("Name", ""))).unwrap());
        assert!(!empty.test(&Value::Record(Record::new().with("Name", "Ann"))).unwrap());

        let not_empty = predicate(&schema, FilterOperator::IsNotEmpty, "Name", None).unwrap();
        assert!(not_empty.test(&Value::Record(Record::new().with("Name", "Ann"))).unwrap());
    }

    #[test]
    fn is_empty_on_nullable_compares_with_null() {
        let schema = schema();
        let empty = predicate(&schema, FilterOperator::IsEmpty, "Score", None).unwrap();
        assert_eq!(empty.to_string(), "x => (x.Score == (int?)null)");
        assert!(empty.test(&Value::Record(Record::new().with("Score", Value::Null))).unwrap());
        assert!(!empty.test(&Value::Record(Record::new().with("Score", 3i64))).unwrap());
    }

    #[test]
    fn none_operator_is_skipped_by_compile_but_rejected_alone() {
        let schema = schema();
        let lambda = FilterCompiler::new(&schema)
            .compile(
                &person(),
                &[
                    FilterDescriptor::new("Name", FilterOperator::None, None),
                    FilterDescriptor::new("Age", FilterOperator::LessThan, Some("30")),
                ],
            )
            .unwrap();
        assert_eq!(lambda.to_string(), "x => (x.Age < 30)");

        let root = Param::new("x", person());
        let err = FilterCompiler::new(&schema)
            .build_predicate(&FilterDescriptor::new("Name", FilterOperator::None, None), &root)
            .unwrap_err();
        assert_eq!(err.code(), "UnsupportedOperator");
    }

    #[test]
    fn descriptors_are_and_combined() {
        let schema = schema();
        let lambda = FilterCompiler::new(&schema)
            .compile(
                &person(),
                &[
                    FilterDescriptor::new("Age", FilterOperator::GreaterThanOrEqual, Some("18")),
                    FilterDescriptor::new("Name", FilterOperator::StartsWith, Some("A")),
                ],
            )
            .unwrap();
        let row = |name: &str, age: i64| Value::Record(Record::new().with("Name", name).with("Age", age));
        assert!(lambda.test(&row("Ann", 30)).unwrap());
        assert!(!lambda.test(&row("Ann", 12)).unwrap());
        assert!(!lambda.test(&row("Bob", 30)).unwrap());
    }

    #[test]
    fn unknown_property_is_path_error() {
        let schema = schema();
        let err = predicate(&schema, FilterOperator::Equal, "Height", Some("1")).unwrap_err();
        assert_eq!(err.code(), "PathResolution");
    }
}
