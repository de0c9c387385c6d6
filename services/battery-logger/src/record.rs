//! Mapping between device payloads and sheet rows.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::sheet::{Cell, Row};
use crate::types::{TagReport, UsageReport};

/// Column layout of a sheet. Columns are 1-indexed.
#[derive(Debug)]
pub struct Layout {
    pub header: &'static [&'static str],
    pub key_column: usize,
    pub timestamp_column: usize,
    pub usage_column: usize,
}

const USAGE_LAYOUT: Layout = Layout {
    header: &[
        "Timestamp",
        "Battery UUID",
        "Battery Usage",
        "Battery Usage Count",
        "Total Time Used",
        "Total Percentage Used",
    ],
    key_column: 2,
    timestamp_column: 1,
    usage_column: 4,
};

const TAG_LAYOUT: Layout = Layout {
    header: &[
        "Battery Name",
        "NFC UID",
        "Usage Count",
        "Total Time (s)",
        "Total Time",
        "Last Updated",
    ],
    key_column: 1,
    timestamp_column: 6,
    usage_column: 3,
};

impl Layout {
    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn header_row(&self) -> Row {
        self.header.iter().map(|h| Cell::text(*h)).collect()
    }

    /// Full row for `record`, with `now` in the timestamp column.
    pub fn row(&self, record: &Record, now: DateTime<Utc>) -> Row {
        let mut values = record.values.iter();
        (1..=self.width())
            .map(|column| {
                if column == self.key_column {
                    Cell::text(record.key.as_str())
                } else if column == self.timestamp_column {
                    Cell::Time(now)
                } else {
                    values.next().cloned().unwrap_or(Cell::Empty)
                }
            })
            .collect()
    }
}

/// Which device firmware the service is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Keyed by `battery_uuid`.
    Usage,
    /// Keyed by the battery `name` read from its NFC tag.
    Tag,
}

impl Variant {
    pub fn layout(self) -> &'static Layout {
        match self {
            Variant::Usage => &USAGE_LAYOUT,
            Variant::Tag => &TAG_LAYOUT,
        }
    }

    pub fn parse_record(self, body: &[u8]) -> Result<Record, serde_json::Error> {
        Ok(match self {
            Variant::Usage => serde_json::from_slice::<UsageReport>(body)?.into(),
            Variant::Tag => serde_json::from_slice::<TagReport>(body)?.into(),
        })
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usage" | "uuid" => Ok(Variant::Usage),
            "tag" | "nfc" => Ok(Variant::Tag),
            other => Err(format!("unknown variant '{other}' (expected usage or tag)")),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Usage => "usage",
            Variant::Tag => "tag",
        })
    }
}

/// A keyed record; `values` holds the payload cells in column order, without
/// the key and timestamp columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub values: Vec<Cell>,
}

fn loose_cell(value: Option<Value>, default: Cell) -> Cell {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::String(s)) => Cell::Text(s),
        Some(Value::Number(n)) => n.as_f64().map(Cell::number).unwrap_or(default),
        Some(other) => Cell::Text(other.to_string()),
    }
}

fn text_or_empty(value: Option<Value>) -> Cell {
    loose_cell(value, Cell::text(""))
}

fn number_or_zero(value: Option<Value>) -> Cell {
    loose_cell(value, Cell::Int(0))
}

impl From<UsageReport> for Record {
    fn from(r: UsageReport) -> Self {
        Record {
            key: r.battery_uuid,
            values: vec![
                text_or_empty(r.battery_usage),
                number_or_zero(r.battery_usage_count),
                number_or_zero(r.total_time_used),
                number_or_zero(r.total_percentage_used),
            ],
        }
    }
}

impl From<TagReport> for Record {
    fn from(r: TagReport) -> Self {
        Record {
            key: r.name,
            values: vec![
                text_or_empty(r.uid),
                number_or_zero(r.usage_count),
                number_or_zero(r.total_time),
                text_or_empty(r.total_time_formatted),
            ],
        }
    }
}
