//! Canonical string conversion for each scalar type.
//!
//! Mirrors what a type's own string converter accepts: surrounding whitespace
//! is ignored for non-text types, booleans are case-insensitive, enums accept
//! either a declared constant name or an integer ordinal, and an empty string
//! converts to null for nullable non-text targets.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;

use crate::error::{CompileError, Result};
use crate::schema::{Schema, TypeRef};
use crate::value::{EnumValue, Value};

/// Converts `raw` into a value of type `ty`.
pub fn parse_text(raw: &str, ty: &TypeRef, schema: &Schema) -> Result<Value> {
    let trimmed = raw.trim();
    match ty {
        TypeRef::Nullable(inner) => {
            if raw.is_empty() && !inner.is_text() {
                Ok(Value::Null)
            } else {
                parse_text(raw, inner, schema)
            }
        }
        TypeRef::String => Ok(Value::String(raw.to_owned())),
        TypeRef::Bool => {
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(CompileError::conversion(raw, ty, "expected 'true' or 'false'"))
            }
        }
        TypeRef::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|err| CompileError::conversion(raw, ty, err)),
        TypeRef::Float => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|err| CompileError::conversion(raw, ty, err)),
        TypeRef::Uuid => Uuid::parse_str(trimmed)
            .map(Value::Uuid)
            .map_err(|err| CompileError::conversion(raw, ty, err)),
        TypeRef::Date => parse_date(trimmed)
            .map(Value::Date)
            .ok_or_else(|| CompileError::conversion(raw, ty, "expected YYYY-MM-DD")),
        TypeRef::DateTime => parse_datetime(trimmed).map(Value::DateTime).ok_or_else(|| {
            CompileError::conversion(raw, ty, "expected RFC 3339 or YYYY-MM-DD[ HH:MM:SS]")
        }),
        TypeRef::Enum(name) => parse_enum(raw, name, schema).map(Value::Enum),
        TypeRef::Record(_) | TypeRef::Shape(_) | TypeRef::List(_) => Err(
            CompileError::conversion(raw, ty, "type has no textual conversion"),
        ),
    }
}

/// Parses an enum constant from either its ordinal or its declared name.
pub fn parse_enum(raw: &str, enum_name: &str, schema: &Schema) -> Result<EnumValue> {
    let def = schema.enumeration(enum_name)?;
    let token = raw.trim();
    if let Ok(ordinal) = token.parse::<i64>() {
        return Ok(EnumValue {
            ordinal,
            name: def.name_of(ordinal).map(str::to_owned),
        });
    }
    def.ordinal_of(token)
        .map(|ordinal| EnumValue {
            ordinal,
            name: Some(token.to_owned()),
        })
        .ok_or_else(|| {
            CompileError::conversion(raw, enum_name, format!("no constant named '{token}'"))
        })
}

fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text, format_description!("[year]-[month]-[day]")).ok()
}

fn parse_datetime(text: &str) -> Option<PrimitiveDateTime> {
    if let Ok(with_offset) = OffsetDateTime::parse(text, &Rfc3339) {
        let utc = with_offset.to_offset(UtcOffset::UTC);
        return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    PrimitiveDateTime::parse(
        text,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            text,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
    })
    .ok()
    .or_else(|| parse_date(text).map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT)))
}
