//! Dotted field-path resolution.

use tracing::trace;

use crate::error::{CompileError, Result};
use crate::expr::Expr;
use crate::schema::Schema;

/// Resolves `path` (e.g. `IdCard.FirstName`) against `root`, folding each
/// segment into a nested field read.
///
/// Fails with [`CompileError::PathResolution`] when a segment is empty, is
/// not declared on the current record type, or is applied to a type that has
/// no fields.
pub fn resolve(schema: &Schema, root: &Expr, path: &str) -> Result<Expr> {
    let mut current = root.clone();
    for segment in path.split('.') {
        let ty = current.ty();
        if segment.is_empty() {
            return Err(CompileError::path(path, segment, &ty));
        }
        let record_name = ty
            .record_name()
            .ok_or_else(|| CompileError::path(path, segment, &ty))?;
        let record = schema.record(record_name)?;
        let def = record
            .get(segment)
            .ok_or_else(|| CompileError::path(path, segment, &ty))?;
        current = Expr::field(current, def);
    }
    trace!(path, ty = %current.ty(), "path.resolve");
    Ok(current)
}
