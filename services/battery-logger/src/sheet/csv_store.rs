use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use tokio::{fs, sync::Mutex};

use super::{Cell, Row, Sheet, Workbook, delete_in, set_in};
use crate::error::StoreError;

/// Workbook stored as a directory holding one `<sheet>.csv` per sheet.
///
/// Every call loads the whole file and rewrites it; the shared lock only
/// covers one call at a time.
#[derive(Clone)]
pub struct CsvWorkbook {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CsvWorkbook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        ensure_safe_sheet_name(name)?;
        Ok(self.dir.join(format!("{name}.csv")))
    }

    /// Creates the sheet file (and data directory) when missing.
    pub async fn ensure_sheet(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        let _guard = self.lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        if !fs::try_exists(&path).await? {
            fs::write(&path, b"").await?;
            tracing::info!(path = %path.display(), "created empty sheet");
        }
        Ok(())
    }
}

fn ensure_safe_sheet_name(name: &str) -> Result<(), StoreError> {
    let path = Path::new(name);
    let single = matches!(
        path.components().collect::<Vec<_>>().as_slice(),
        [Component::Normal(_)]
    );
    if name.trim().is_empty() || !single {
        return Err(StoreError::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl Workbook for CsvWorkbook {
    async fn sheet(&self, name: &str) -> Result<Option<Box<dyn Sheet>>, StoreError> {
        let path = self.path_for(name)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(Box::new(CsvSheet {
            name: name.to_string(),
            path,
            lock: self.lock.clone(),
        })))
    }
}

struct CsvSheet {
    name: String,
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CsvSheet {
    async fn load(&self) -> Result<Vec<Row>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SheetNotFound(self.name.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(Cell::parse).collect());
        }
        Ok(rows)
    }

    async fn store(&self, rows: &[Row]) -> Result<(), StoreError> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
        for row in rows {
            writer.write_record(row.iter().map(|c| c.to_string()))?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        let tmp = self.path.with_extension("csv.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn modify<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<Row>) -> Result<(), StoreError> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut rows = self.load().await?;
        change(&mut rows)?;
        self.store(&rows).await
    }
}

#[async_trait]
impl Sheet for CsvSheet {
    async fn last_row(&self) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len())
    }

    async fn values(&self) -> Result<Vec<Row>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn append_row(&self, row: Row) -> Result<(), StoreError> {
        self.modify(move |rows| {
            rows.push(row);
            Ok(())
        })
        .await
    }

    async fn set_cell(&self, row: usize, column: usize, value: Cell) -> Result<(), StoreError> {
        self.modify(move |rows| set_in(rows, row, column, value)).await
    }

    async fn delete_rows(&self, start: usize, count: usize) -> Result<(), StoreError> {
        self.modify(move |rows| delete_in(rows, start, count)).await
    }
}
