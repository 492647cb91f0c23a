//! Lazy in-memory query over root entities.
//!
//! Stands in for an external query engine: stages are recorded when
//! `filter`/`select` are called and only evaluated when rows are pulled.

use std::fmt;

use crate::error::Result;
use crate::expr::Lambda;
use crate::projection::Projection;
use crate::value::Value;

#[derive(Clone, Debug)]
enum Stage {
    Filter(Lambda),
    Select(Lambda),
}

/// Composable query over a fixed row set.
#[derive(Clone, Debug, Default)]
pub struct MemoryQuery {
    rows: Vec<Value>,
    stages: Vec<Stage>,
}

impl MemoryQuery {
    /// Query over `rows` with no stages.
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            stages: Vec::new(),
        }
    }

    /// Keeps rows for which `predicate` holds.
    pub fn filter(mut self, predicate: Lambda) -> Self {
        self.stages.push(Stage::Filter(predicate));
        self
    }

    /// Maps each row through `transform`.
    pub fn select(mut self, transform: Lambda) -> Self {
        self.stages.push(Stage::Select(transform));
        self
    }

    /// Maps each row through a compiled projection.
    pub fn project(self, projection: &Projection) -> Self {
        self.select(projection.lambda().clone())
    }

    /// Pulls rows one at a time; each stage runs only for rows that reach it.
    pub fn iter(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        self.rows
            .iter()
            .filter_map(move |row| self.run(row.clone()).transpose())
    }

    /// Evaluates the whole query.
    pub fn to_vec(&self) -> Result<Vec<Value>> {
        self.iter().collect()
    }

    fn run(&self, mut row: Value) -> Result<Option<Value>> {
        for stage in &self.stages {
            match stage {
                Stage::Filter(predicate) => {
                    if !predicate.test(&row)? {
                        return Ok(None);
                    }
                }
                Stage::Select(transform) => row = transform.invoke(&row)?,
            }
        }
        Ok(Some(row))
    }
}

impl fmt::Display for MemoryQuery {
    /// Renders the stage pipeline, one stage per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows({})", self.rows.len())?;
        for stage in &self.stages {
            match stage {
                Stage::Filter(lambda) => write!(f, "\n  .filter({lambda})")?,
                Stage::Select(lambda) => write!(f, "\n  .select({lambda})")?,
            }
        }
        Ok(())
    }
}
