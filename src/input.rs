//! Input loading for delimited text files and spreadsheet workbooks.
//!
//! Every input source is reduced to a [`RawTable`]: a list of normalized
//! column names (trimmed, lower-cased) plus one [`RawRow`] of [`Scalar`]
//! cells per data row. It provides:
//!
//! - **Format detection**: workbook extensions (`.xlsx`, `.xlsm`, `.xlsb`,
//!   `.xls`, `.ods`) route through `calamine`; everything else is read as
//!   delimited text with the `csv` crate.
//! - **Delimiter resolution**: extension-based auto-detection (`.tsv` → tab,
//!   anything else → comma) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.

use std::{
    fmt,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::error::InputError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Workbook,
}

#[derive(Debug, Clone)]
pub struct InputOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub sheet: Option<String>,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            sheet: None,
        }
    }
}

/// A single cell value as read from the source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Scalar {
    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Empty => true,
            Scalar::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Scalar::Empty => String::new(),
            Scalar::Text(s) => s.clone(),
            Scalar::Number(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Scalar::Date(d) => d.format("%Y-%m-%d").to_string(),
            Scalar::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    cells: Vec<Scalar>,
}

impl RawRow {
    pub fn new(cells: Vec<Scalar>) -> Self {
        Self { cells }
    }

    /// Cell at `index`; short rows read as empty.
    pub fn get(&self, index: usize) -> &Scalar {
        const EMPTY: &Scalar = &Scalar::Empty;
        self.cells.get(index).unwrap_or(EMPTY)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Scalar::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Builds a table from raw header names, normalizing them the same way
    /// file-backed tables are.
    pub fn new<S: AsRef<str>>(headers: &[S], rows: Vec<RawRow>) -> Self {
        Self {
            columns: headers
                .iter()
                .map(|h| normalize_header(h.as_ref()))
                .collect(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn detect_format(path: &Path) -> InputFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext)
            if WORKBOOK_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate)) =>
        {
            InputFormat::Workbook
        }
        _ => InputFormat::Delimited,
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, InputError> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes()).ok_or_else(|| InputError::UnknownEncoding {
            label: value.to_string(),
        })
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn load_table(path: &Path, options: &InputOptions) -> Result<RawTable, InputError> {
    let format = detect_format(path);
    debug!("Reading {path:?} as {format:?}");
    match format {
        InputFormat::Delimited => {
            let delimiter = resolve_input_delimiter(path, options.delimiter);
            let file = File::open(path).map_err(|source| InputError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            read_delimited(BufReader::new(file), path, delimiter, options.encoding)
        }
        InputFormat::Workbook => read_workbook(path, options.sheet.as_deref()),
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

/// Reads delimited text into a table. `path` is only used for error reporting.
pub fn read_delimited<R: Read>(
    reader: R,
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawTable, InputError> {
    let mut reader = open_csv_reader(reader, delimiter);
    let header_record = reader
        .byte_headers()
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            row: 1,
            source,
        })?
        .clone();
    let headers = decode_record(&header_record, path, encoding)?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(InputError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            row: row_idx + 2,
            source,
        })?;
        let decoded = decode_record(&record, path, encoding)?;
        let cells = decoded
            .into_iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Scalar::Empty
                } else {
                    Scalar::Text(field)
                }
            })
            .collect();
        let row = RawRow::new(cells);
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(RawTable::new(&headers, rows))
}

pub fn decode_bytes(
    bytes: &[u8],
    path: &Path,
    encoding: &'static Encoding,
) -> Result<String, InputError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(InputError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        })
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    path: &Path,
    encoding: &'static Encoding,
) -> Result<Vec<String>, InputError> {
    record
        .iter()
        .map(|field| decode_bytes(field, path, encoding))
        .collect()
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<RawTable, InputError> {
    let workbook_error = |source| InputError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let names = workbook.sheet_names();
    let range = match sheet {
        Some(name) => {
            if !names.iter().any(|candidate| candidate == name) {
                return Err(InputError::MissingSheet {
                    path: path.to_path_buf(),
                    sheet: name.to_string(),
                    available: names,
                });
            }
            workbook.worksheet_range(name).map_err(workbook_error)?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| InputError::EmptyWorkbook {
                path: path.to_path_buf(),
            })?
            .map_err(workbook_error)?,
    };

    let mut rows_iter = range.rows();
    let headers = rows_iter
        .next()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>())
        .ok_or_else(|| InputError::MissingHeader {
            path: path.to_path_buf(),
        })?;

    let rows = rows_iter
        .map(|row| RawRow::new(row.iter().map(scalar_from_cell).collect()))
        .filter(|row| !row.is_empty())
        .collect::<Vec<_>>();
    debug!(
        "Workbook {path:?}: {} column(s), {} data row(s)",
        headers.len(),
        rows.len()
    );
    Ok(RawTable::new(&headers, rows))
}

fn scalar_from_cell(cell: &Data) -> Scalar {
    match cell {
        Data::Empty => Scalar::Empty,
        Data::Int(i) => Scalar::Number(*i as f64),
        Data::Float(f) => Scalar::Number(*f),
        Data::String(s) if s.trim().is_empty() => Scalar::Empty,
        Data::String(s) => Scalar::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(parsed) if parsed.time() == NaiveTime::MIN => Scalar::Date(parsed.date()),
            Some(parsed) => Scalar::DateTime(parsed),
            None => Scalar::Number(dt.as_f64()),
        },
        Data::DateTimeIso(text) => scalar_from_iso(text),
        other => Scalar::Text(other.to_string()),
    }
}

// OpenDocument stores dates as ISO text.
fn scalar_from_iso(text: &str) -> Scalar {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Scalar::Date(date);
    }
    match text.parse::<NaiveDateTime>() {
        Ok(datetime) => Scalar::DateTime(datetime),
        Err(_) => Scalar::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detect_format_routes_workbooks_by_extension() {
        assert_eq!(
            detect_format(Path::new("sales.XLSX")),
            InputFormat::Workbook
        );
        assert_eq!(detect_format(Path::new("sales.ods")), InputFormat::Workbook);
        assert_eq!(
            detect_format(Path::new("sales.csv")),
            InputFormat::Delimited
        );
        assert_eq!(detect_format(Path::new("sales")), InputFormat::Delimited);
    }

    #[test]
    fn resolve_input_delimiter_prefers_override_then_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }

    #[test]
    fn read_delimited_normalizes_headers_and_blank_fields() {
        let data = " Date ,PRODUCT,Quantity\n2025-01-05,Camiseta,\n";
        let table =
            read_delimited(data.as_bytes(), &PathBuf::from("inline.csv"), b',', UTF_8).unwrap();
        assert_eq!(table.columns, vec!["date", "product", "quantity"]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0].get(0), &Scalar::Text("2025-01-05".into()));
        assert_eq!(table.rows[0].get(2), &Scalar::Empty);
        assert_eq!(table.rows[0].get(9), &Scalar::Empty);
    }

    #[test]
    fn read_delimited_decodes_legacy_encodings() {
        let encoding = resolve_encoding(Some("windows-1252")).unwrap();
        let bytes = b"data;produto;valor\n05/01/2025;Bon\xe9;39,90\n";
        let table =
            read_delimited(&bytes[..], &PathBuf::from("legacy.csv"), b';', encoding).unwrap();
        assert_eq!(table.rows[0].get(1), &Scalar::Text("Boné".into()));
    }

    #[test]
    fn resolve_encoding_rejects_unknown_labels() {
        assert!(matches!(
            resolve_encoding(Some("klingon")),
            Err(InputError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn scalar_display_drops_integral_fraction() {
        assert_eq!(Scalar::Number(3.0).as_display(), "3");
        assert_eq!(Scalar::Number(49.9).as_display(), "49.9");
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(Scalar::Date(date).as_display(), "2025-01-05");
    }

    #[test]
    fn iso_workbook_cells_become_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(
            scalar_from_cell(&Data::DateTimeIso("2025-01-05".into())),
            Scalar::Date(date)
        );
        assert_eq!(
            scalar_from_cell(&Data::DateTimeIso("2025-01-05T08:30:00".into())),
            Scalar::DateTime(date.and_hms_opt(8, 30, 0).unwrap())
        );
        assert_eq!(
            scalar_from_cell(&Data::DateTimeIso("P1D".into())),
            Scalar::Text("P1D".into())
        );
    }
}
