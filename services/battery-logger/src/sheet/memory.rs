use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Cell, Row, Sheet, Workbook, delete_in, set_in};
use crate::error::StoreError;

type Sheets = Arc<RwLock<HashMap<String, Vec<Row>>>>;

/// Workbook kept in process memory. Clones share the same sheets.
#[derive(Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Sheets,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty sheet; an existing sheet with that name is left alone.
    pub async fn add_sheet(&self, name: &str) {
        self.sheets
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    /// Snapshot of a sheet's rows.
    pub async fn rows(&self, name: &str) -> Option<Vec<Row>> {
        self.sheets.read().await.get(name).cloned()
    }
}

#[async_trait]
impl Workbook for MemoryWorkbook {
    async fn sheet(&self, name: &str) -> Result<Option<Box<dyn Sheet>>, StoreError> {
        if !self.sheets.read().await.contains_key(name) {
            return Ok(None);
        }
        Ok(Some(Box::new(MemorySheet {
            sheets: self.sheets.clone(),
            name: name.to_string(),
        })))
    }
}

struct MemorySheet {
    sheets: Sheets,
    name: String,
}

impl MemorySheet {
    fn missing(&self) -> StoreError {
        StoreError::SheetNotFound(self.name.clone())
    }
}

#[async_trait]
impl Sheet for MemorySheet {
    async fn last_row(&self) -> Result<usize, StoreError> {
        let sheets = self.sheets.read().await;
        let rows = sheets.get(&self.name).ok_or_else(|| self.missing())?;
        Ok(rows.len())
    }

    async fn values(&self) -> Result<Vec<Row>, StoreError> {
        let sheets = self.sheets.read().await;
        sheets.get(&self.name).cloned().ok_or_else(|| self.missing())
    }

    async fn append_row(&self, row: Row) -> Result<(), StoreError> {
        let mut sheets = self.sheets.write().await;
        let rows = sheets.get_mut(&self.name).ok_or_else(|| self.missing())?;
        rows.push(row);
        Ok(())
    }

    async fn set_cell(&self, row: usize, column: usize, value: Cell) -> Result<(), StoreError> {
        let mut sheets = self.sheets.write().await;
        let rows = sheets.get_mut(&self.name).ok_or_else(|| self.missing())?;
        set_in(rows, row, column, value)
    }

    async fn delete_rows(&self, start: usize, count: usize) -> Result<(), StoreError> {
        let mut sheets = self.sheets.write().await;
        let rows = sheets.get_mut(&self.name).ok_or_else(|| self.missing())?;
        delete_in(rows, start, count)
    }
}
