use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::record::{Layout, Record};
use crate::sheet::Sheet;
use crate::types::{Action, BatterySummary, Health};

/// Writes `record` into `sheet`, overwriting the first data row whose key
/// column equals the record key, or appending a new row.
///
/// The header is written first when the sheet is empty. The scan and the
/// following write are separate store calls.
pub async fn upsert(
    sheet: &dyn Sheet,
    layout: &Layout,
    record: &Record,
    now: DateTime<Utc>,
) -> Result<Action, StoreError> {
    if sheet.last_row().await? == 0 {
        sheet.append_row(layout.header_row()).await?;
    }

    let rows = sheet.values().await?;
    let key_index = layout.key_column - 1;
    let existing = rows
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| row.get(key_index).is_some_and(|c| c.matches_key(&record.key)))
        .map(|(i, _)| i + 1);

    let row = layout.row(record, now);
    match existing {
        Some(row_number) => {
            for (i, cell) in row.into_iter().enumerate() {
                let column = i + 1;
                if column == layout.key_column {
                    continue;
                }
                sheet.set_cell(row_number, column, cell).await?;
            }
            Ok(Action::Updated)
        }
        None => {
            sheet.append_row(row).await?;
            Ok(Action::Created)
        }
    }
}

/// Deletes every row below the header. Returns how many were removed.
pub async fn clear(sheet: &dyn Sheet) -> Result<usize, StoreError> {
    let last = sheet.last_row().await?;
    if last <= 1 {
        return Ok(0);
    }
    sheet.delete_rows(2, last - 1).await?;
    Ok(last - 1)
}

pub async fn summarize(sheet: &dyn Sheet, layout: &Layout) -> Result<Vec<BatterySummary>, StoreError> {
    let rows = sheet.values().await?;
    Ok(rows
        .iter()
        .skip(1)
        .map(|row| {
            let cell = |column: usize| row.get(column - 1).map(|c| c.to_string()).unwrap_or_default();
            let usage_count = row
                .get(layout.usage_column - 1)
                .map(|c| c.as_i64())
                .unwrap_or(0);
            BatterySummary {
                id: cell(layout.key_column),
                usage_count,
                health: Health::from_usage(usage_count),
                last_updated: cell(layout.timestamp_column),
            }
        })
        .collect())
}
