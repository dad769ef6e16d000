use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cycles::serial_to_datetime;
use crate::error::SheetError;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.to_rfc3339(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) if s.is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => match serial_to_datetime(dt.as_f64()) {
                Some(instant) => Cell::DateTime(instant),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet { rows }
    }

    pub fn header(&self) -> Option<&[Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx, row.as_slice()))
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

pub trait SheetReader {
    fn read(&self, bytes: &[u8]) -> Result<Sheet, SheetError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxReader;

impl SheetReader for XlsxReader {
    fn read(&self, bytes: &[u8]) -> Result<Sheet, SheetError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(SheetError::NoWorksheet)??;
        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        debug!("xlsx: read {} rows", rows.len());
        Ok(Sheet::new(rows))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReader;

/// Cells that are not valid UTF-8 come from Latin-1/Windows-1252 exports and are decoded
/// byte for byte.
fn decode_csv_field(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => raw.iter().map(|&b| char::from(b)).collect(),
    }
}

impl SheetReader for CsvReader {
    fn read(&self, bytes: &[u8]) -> Result<Sheet, SheetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            let row = record
                .iter()
                .map(|raw| {
                    let value = decode_csv_field(raw);
                    let value = value.trim_start_matches('\u{feff}');
                    if value.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(value.to_string())
                    }
                })
                .collect();
            rows.push(row);
        }
        debug!("csv: read {} rows", rows.len());
        Ok(Sheet::new(rows))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Csv,
}

impl SheetFormat {
    pub fn sniff(bytes: &[u8]) -> SheetFormat {
        if bytes.starts_with(b"PK\x03\x04") {
            SheetFormat::Xlsx
        } else {
            SheetFormat::Csv
        }
    }

    pub fn reader(self) -> Box<dyn SheetReader + Send + Sync> {
        match self {
            SheetFormat::Xlsx => Box::new(XlsxReader),
            SheetFormat::Csv => Box::new(CsvReader),
        }
    }
}

pub fn read_sheet(bytes: &[u8]) -> Result<Sheet, SheetError> {
    let format = SheetFormat::sniff(bytes);
    debug!("read_sheet: {} bytes as {:?}", bytes.len(), format);
    format.reader().read(bytes)
}
