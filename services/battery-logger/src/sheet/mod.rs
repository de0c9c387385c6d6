//! Spreadsheet-like storage the logger writes into.
//!
//! Addressing follows the hosted spreadsheet convention: rows and columns are
//! 1-indexed and row 1 is the header once anything has been written.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StoreError;

pub mod csv_store;
pub mod memory;

pub use self::csv_store::CsvWorkbook;
pub use self::memory::MemoryWorkbook;

pub type Row = Vec<Cell>;

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Time(DateTime<Utc>),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Whole numbers are kept as integers so counters stay integral.
    pub fn number(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Cell::Int(value as i64)
        } else {
            Cell::Float(value)
        }
    }

    /// Reads a cell back from its text form. A typed reading is kept only when
    /// it prints back to exactly `raw`, so `parse(raw).to_string() == raw`
    /// always holds and text such as `007` or `1.50` stays text.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Empty;
        }
        let typed = if let Ok(n) = raw.parse::<i64>() {
            Some(Cell::Int(n))
        } else if raw.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b'-') {
            raw.parse::<f64>().ok().map(Cell::Float)
        } else {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| Cell::Time(t.with_timezone(&Utc)))
        };
        match typed {
            Some(cell) if cell.to_string() == raw => cell,
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Cell::Int(n) => *n,
            Cell::Float(f) => *f as i64,
            Cell::Text(s) => s.trim().parse().unwrap_or(0),
            Cell::Empty | Cell::Time(_) => 0,
        }
    }

    /// Exact, case-sensitive comparison against an identifier, made on the
    /// cell's text form.
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            Cell::Text(s) => s == key,
            other => other.to_string() == key,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// One sheet inside a workbook. Each call is applied on its own; callers that
/// read and then write get no atomicity across calls.
#[async_trait]
pub trait Sheet: Send + Sync {
    /// Number of the last row holding data, 0 when the sheet is empty.
    async fn last_row(&self) -> Result<usize, StoreError>;

    /// Every row, header included.
    async fn values(&self) -> Result<Vec<Row>, StoreError>;

    async fn append_row(&self, row: Row) -> Result<(), StoreError>;

    async fn set_cell(&self, row: usize, column: usize, value: Cell) -> Result<(), StoreError>;

    /// Removes `count` rows starting at `start`.
    async fn delete_rows(&self, start: usize, count: usize) -> Result<(), StoreError>;
}

/// A collection of named sheets. Handles are opened per request.
#[async_trait]
pub trait Workbook: Send + Sync {
    async fn sheet(&self, name: &str) -> Result<Option<Box<dyn Sheet>>, StoreError>;
}

pub(crate) fn set_in(
    rows: &mut [Row],
    row: usize,
    column: usize,
    value: Cell,
) -> Result<(), StoreError> {
    if row == 0 || column == 0 || row > rows.len() {
        return Err(StoreError::CellOutOfRange { row, column });
    }
    let target = &mut rows[row - 1];
    if target.len() < column {
        target.resize(column, Cell::Empty);
    }
    target[column - 1] = value;
    Ok(())
}

pub(crate) fn delete_in(rows: &mut Vec<Row>, start: usize, count: usize) -> Result<(), StoreError> {
    if count == 0 {
        return Ok(());
    }
    let end = start.saturating_add(count - 1);
    if start == 0 || end > rows.len() {
        return Err(StoreError::RowOutOfRange { row: end });
    }
    rows.drain(start - 1..end);
    Ok(())
}
