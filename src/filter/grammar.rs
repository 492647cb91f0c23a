//! Text filter grammar.
//!
//! Outside double quotes whitespace is dropped and the letters `or` (any
//! case) separate segments. Quotes toggle a literal span and are not copied.
//! A `%` at either end of a segment selects the match kind.

use tracing::debug;

use crate::error::Result;
use super::FilterCompiler;
use crate::expr::{BinaryOp, Expr, Lambda, Method, Param};
use crate::path;
use crate::schema::{Schema, TypeRef};

/// Splits `text` into OR-separated segments.
///
/// Separators are consumed, so `a or or b` yields an empty middle segment;
/// only a trailing empty segment is dropped.
pub fn split_or_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if !quoted && c.is_whitespace() {
            continue;
        }
        if c == '"' {
            quoted = !quoted;
            continue;
        }
        if !quoted && matches!(c, 'o' | 'O') && matches!(chars.peek(), Some('r' | 'R')) {
            chars.next();
            segments.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Match requested by one segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextMatch {
    /// `%abc%`
    Contains(String),
    /// `abc%`
    StartsWith(String),
    /// `%abc`
    EndsWith(String),
    /// `abc`
    Exact(String),
}

impl TextMatch {
    /// Classifies a segment by its wildcards.
    pub fn classify(segment: &str) -> Self {
        match (segment.strip_prefix('%'), segment.strip_suffix('%')) {
            (Some(rest), Some(_)) => {
                TextMatch::Contains(rest.strip_suffix('%').unwrap_or(rest).to_owned())
            }
            (Some(rest), None) => TextMatch::EndsWith(rest.to_owned()),
            (None, Some(rest)) => TextMatch::StartsWith(rest.to_owned()),
            (None, None) => TextMatch::Exact(segment.to_owned()),
        }
    }

    /// String method implementing the match.
    pub fn method(&self) -> Method {
        match self {
            TextMatch::Contains(_) => Method::Contains,
            TextMatch::StartsWith(_) => Method::StartsWith,
            TextMatch::EndsWith(_) => Method::EndsWith,
            TextMatch::Exact(_) => Method::TextEquals,
        }
    }

    /// Text with wildcards removed.
    pub fn needle(&self) -> &str {
        match self {
            TextMatch::Contains(s)
            | TextMatch::StartsWith(s)
            | TextMatch::EndsWith(s)
            | TextMatch::Exact(s) => s,
        }
    }
}

/// Predicate over `root` matching `property` against any segment of `text`.
/// Empty input yields `true`.
pub fn text_filter_expr(schema: &Schema, root: &Param, property: &str, text: &str) -> Result<Expr> {
    let segments = split_or_segments(text);
    debug!(property, segments = ?segments, "filter.segments");
    if segments.is_empty() {
        return Ok(Expr::always_true());
    }
    let prop = path::resolve(schema, &Expr::param(root), property)?;
    let mut matches = Vec::with_capacity(segments.len());
    for segment in &segments {
        let kind = TextMatch::classify(segment);
        let needle = Expr::literal(kind.needle(), TypeRef::String)?;
        matches.push(Expr::call(kind.method(), prop.clone(), vec![needle])?);
    }
    Ok(Expr::fold(BinaryOp::OrElse, matches)?.unwrap_or_else(Expr::always_true))
}

/// [`text_filter_expr`] over a fresh root parameter typed `root_type`.
///
/// Uses default [`CompilerOptions`](crate::CompilerOptions); configure a
/// [`FilterCompiler`] to rename the root parameter.
pub fn text_filter(schema: &Schema, root_type: &TypeRef, property: &str, text: &str) -> Result<Lambda> {
    FilterCompiler::new(schema).text_filter(root_type, property, text)
}
