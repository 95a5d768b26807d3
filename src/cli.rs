use std::path::PathBuf;

use clap::Parser;

use crate::{
    chart::DEFAULT_TOP_N,
    compose::{DEFAULT_TABLE_ROWS, DEFAULT_TITLE, ReportMetadata},
    error::InputError,
    input::{self, InputOptions},
    report::ReportOptions,
};

#[derive(Debug, Parser)]
#[command(
    name = "sales-report",
    author,
    version,
    about = "Turn a spreadsheet of sales transactions into a PDF report",
    long_about = None
)]
pub struct Cli {
    /// Input spreadsheet (.csv, .tsv, .xlsx, .xlsm, .xlsb, .xls or .ods)
    pub input: PathBuf,
    /// Destination PDF file (overwritten if it exists)
    pub output: PathBuf,
    /// Report title
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,
    /// Report subtitle (defaults to "Fonte: <input>")
    #[arg(long)]
    pub subtitle: Option<String>,
    /// Number of bars in the top products chart
    #[arg(long = "top", default_value_t = DEFAULT_TOP_N)]
    pub top: usize,
    /// Number of rows in the product table
    #[arg(long = "table-rows", default_value_t = DEFAULT_TABLE_ROWS)]
    pub table_rows: usize,
    /// Workbook sheet to read (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl Cli {
    pub fn report_options(&self) -> Result<ReportOptions, InputError> {
        let encoding = input::resolve_encoding(self.input_encoding.as_deref())?;
        let subtitle = self
            .subtitle
            .clone()
            .unwrap_or_else(|| format!("Fonte: {}", self.input.display()));
        Ok(ReportOptions {
            input: self.input.clone(),
            output: self.output.clone(),
            metadata: ReportMetadata::new(self.title.clone(), subtitle),
            top_n: self.top,
            table_rows: self.table_rows,
            input_options: InputOptions {
                delimiter: self.delimiter,
                encoding,
                sheet: self.sheet.clone(),
            },
        })
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("|"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn defaults_fill_report_options() {
        let cli = Cli::try_parse_from(["sales-report", "vendas.csv", "out.pdf"]).unwrap();
        let options = cli.report_options().unwrap();
        assert_eq!(options.metadata.title, "Relatório de Vendas");
        assert_eq!(options.metadata.subtitle, "Fonte: vendas.csv");
        assert_eq!(options.top_n, 10);
        assert_eq!(options.table_rows, 20);
        assert_eq!(options.input_options.encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn options_override_defaults() {
        let cli = Cli::try_parse_from([
            "sales-report",
            "vendas.xlsx",
            "out.pdf",
            "--title",
            "Vendas Q1",
            "--subtitle",
            "Loja Centro",
            "--top",
            "5",
            "--sheet",
            "Janeiro",
            "--input-encoding",
            "windows-1252",
        ])
        .unwrap();
        let options = cli.report_options().unwrap();
        assert_eq!(options.metadata, ReportMetadata::new("Vendas Q1", "Loja Centro"));
        assert_eq!(options.top_n, 5);
        assert_eq!(options.input_options.sheet.as_deref(), Some("Janeiro"));
        assert_eq!(options.input_options.encoding, encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let cli = Cli::try_parse_from([
            "sales-report",
            "vendas.csv",
            "out.pdf",
            "--input-encoding",
            "klingon",
        ])
        .unwrap();
        assert!(matches!(
            cli.report_options(),
            Err(InputError::UnknownEncoding { .. })
        ));
    }
}
