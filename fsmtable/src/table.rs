//! Tables of parsed records.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::template::{CompiledTemplate, ValueOptions};

/// A single table cell: a scalar capture or an ordered list of captures.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Scalar value (empty string when nothing was captured).
    Text(String),
    /// Values declared with the `List` option.
    List(Vec<String>),
}

impl Cell {
    /// An empty scalar cell.
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }

    /// Check if the cell holds no data.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Text(s) => s.is_empty(),
            Cell::List(items) => items.is_empty(),
        }
    }

    /// Scalar contents, if this is a scalar cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::List(_) => None,
        }
    }

    /// List contents, if this is a list cell.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Cell::Text(_) => None,
            Cell::List(items) => Some(items),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<Vec<String>> for Cell {
    fn from(items: Vec<String>) -> Self {
        Cell::List(items)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

/// A table column: its name and the options of the value that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Options of the originating value.
    pub options: ValueOptions,
}

impl Column {
    /// Create a new column.
    pub fn new(name: impl Into<String>, options: ValueOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Check if the column is part of the row identity.
    pub fn is_key(&self) -> bool {
        self.options.contains(ValueOptions::KEY)
    }

    /// Check if the column is hidden from non-verbose projections.
    pub fn is_verbose(&self) -> bool {
        self.options.contains(ValueOptions::VERBOSE)
    }
}

/// Ordered records sharing one column list.
///
/// Every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create an empty table with one column per template value.
    pub fn for_template(template: &CompiledTemplate) -> Self {
        Self::new(
            template
                .values()
                .iter()
                .map(|v| Column::new(v.name.clone(), v.options))
                .collect(),
        )
    }

    /// Append a row.
    ///
    /// # Panics
    ///
    /// Panics if the row width does not match the column count.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width must match the column count"
        );
        self.rows.push(row);
    }

    /// Columns, in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names, in order.
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Rows, in order.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Cell>] {
        &mut self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get a cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[col]).collect())
    }

    /// Names of the key columns.
    pub fn keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_key())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Return a view with `Verbose` columns removed unless `verbose` is set.
    ///
    /// Row order and the order of the remaining columns are preserved.
    pub fn project(&self, verbose: bool) -> Table {
        if verbose {
            return self.clone();
        }

        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_verbose())
            .map(|(i, _)| i)
            .collect();

        Table {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Insert a column at `index`, filling every row with `value`.
    pub fn insert_column(&mut self, index: usize, column: Column, value: Cell) {
        self.columns.insert(index, column);
        for row in &mut self.rows {
            row.insert(index, value.clone());
        }
    }

    /// Extend rows with the columns of `other` that this table lacks.
    ///
    /// Rows are joined on `keys`: each row takes the new columns from the
    /// first row of `other` whose key cells are equal. With no keys, rows are
    /// joined by position. Rows without a partner keep empty cells.
    pub fn extend(&mut self, other: &Table, keys: &[&str]) -> Result<(), TableError> {
        let key_cols = keys
            .iter()
            .map(|k| {
                let mine = self
                    .column_index(k)
                    .ok_or_else(|| TableError::UnknownKey(k.to_string()))?;
                let theirs = other
                    .column_index(k)
                    .ok_or_else(|| TableError::UnknownKey(k.to_string()))?;
                Ok((mine, theirs))
            })
            .collect::<Result<Vec<_>, TableError>>()?;

        let added: Vec<usize> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.column_index(&c.name).is_none())
            .map(|(i, _)| i)
            .collect();
        if added.is_empty() {
            return Ok(());
        }

        for &i in &added {
            self.columns.push(other.columns[i].clone());
        }

        for (pos, row) in self.rows.iter_mut().enumerate() {
            let partner = if key_cols.is_empty() {
                other.rows.get(pos)
            } else {
                other
                    .rows
                    .iter()
                    .find(|theirs| key_cols.iter().all(|&(m, t)| row[m] == theirs[t]))
            };
            for &i in &added {
                row.push(partner.map(|p| p[i].clone()).unwrap_or_default());
            }
        }

        Ok(())
    }

    /// Stable sort of rows by their key cells, in column order.
    pub fn sort_by_keys(&mut self) {
        let key_cols: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_key())
            .map(|(i, _)| i)
            .collect();
        if key_cols.is_empty() {
            return;
        }
        self.rows.sort_by(|a, b| {
            key_cols
                .iter()
                .map(|&i| a[i].cmp(&b[i]))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Rows as ordered `column -> cell` maps.
    pub fn records(&self) -> Vec<IndexMap<String, Cell>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.name.clone())
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Render as compact JSON: the header array, then one array per row.
    pub fn dump(&self) -> serde_json::Result<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(serde_json::to_string(&self.header())?);
        for row in &self.rows {
            lines.push(serde_json::to_string(row)?);
        }
        Ok(lines.join("\n"))
    }
}

impl fmt::Display for Table {
    /// Comma separated text: header line, then one line per row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header().join(", "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            writeln!(f, "{}", cells.join(", "))?;
        }
        Ok(())
    }
}
