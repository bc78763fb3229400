//! Container for the named tables of one BQL query.

use crate::error::{BbgError, Result};
use crate::frame::table_to_frame;
use crate::models::SITable;
use polars::prelude::*;
use std::ops::Index;
use tracing::debug;

/// Ordered collection of named DataFrames returned by a BQL query
#[derive(Debug, Clone, Default)]
pub struct BqlResult {
    names: Vec<String>,
    frames: Vec<DataFrame>,
}

impl BqlResult {
    pub fn new(entries: Vec<(String, DataFrame)>) -> Self {
        let (names, frames) = entries.into_iter().unzip();
        Self { names, frames }
    }

    /// Materialize every intermediate table, keeping table order
    pub fn from_tables(tables: &[SITable]) -> Result<Self> {
        let entries = tables
            .iter()
            .map(|table| Ok((table.name.clone(), table_to_frame(table)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(entries))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn frames(&self) -> &[DataFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DataFrame> {
        self.frames.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&DataFrame> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|index| self.frames.get(index))
    }

    /// Iterate over (name, frame) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataFrame)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.frames.iter())
    }

    /// Full outer join of every frame on the columns they all share.
    ///
    /// Frames are joined left to right and key columns are coalesced, so the
    /// result holds the union of key values with nulls where a frame had no
    /// row. Duplicate keys expand to every pairing. A single frame is
    /// returned as is.
    pub fn combine(&self) -> Result<DataFrame> {
        let Some((first, rest)) = self.frames.split_first() else {
            return Err(BbgError::NothingToCombine);
        };

        let keys: Vec<String> = first
            .get_column_names()
            .into_iter()
            .filter(|name| {
                rest.iter()
                    .all(|frame| frame.get_column_index(name.as_str()).is_some())
            })
            .map(|name| name.to_string())
            .collect();
        if keys.is_empty() {
            return Err(BbgError::NoCommonColumns);
        }

        debug!(
            "Combining {} frames on columns {:?}",
            self.frames.len(),
            keys
        );

        let on: Vec<Expr> = keys.iter().map(|key| col(key.as_str())).collect();
        let mut combined = first.clone();
        for frame in rest {
            combined = combined
                .lazy()
                .join(
                    frame.clone().lazy(),
                    on.clone(),
                    on.clone(),
                    JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
                )
                .collect()?;
        }
        Ok(combined)
    }
}

impl Index<usize> for BqlResult {
    type Output = DataFrame;

    fn index(&self, index: usize) -> &Self::Output {
        &self.frames[index]
    }
}

impl<'a> IntoIterator for &'a BqlResult {
    type Item = &'a DataFrame;
    type IntoIter = std::slice::Iter<'a, DataFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
