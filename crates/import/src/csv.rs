use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tally_core::{Money, Transaction, TxKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid amount '{value}' on line {line}")]
    InvalidAmount { line: u64, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvColumnMapping {
    pub date_column: usize,
    pub description_column: usize,
    pub amount_column: usize,
    pub kind_column: Option<usize>,
}

const DATE_HEADERS: &[&str] = &["date", "transaction date", "posted date", "posting date"];
const DESCRIPTION_HEADERS: &[&str] = &["description", "payee", "name", "memo", "details"];
const AMOUNT_HEADERS: &[&str] = &["amount", "value"];
const KIND_HEADERS: &[&str] = &["type", "kind", "direction"];

impl CsvColumnMapping {
    /// Locates columns by (case-insensitive) header name.
    pub fn from_headers(headers: &csv::StringRecord) -> Result<Self, ImportError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };
        Ok(Self {
            date_column: find(DATE_HEADERS).ok_or_else(|| ImportError::MissingColumn("date".into()))?,
            description_column: find(DESCRIPTION_HEADERS)
                .ok_or_else(|| ImportError::MissingColumn("description".into()))?,
            amount_column: find(AMOUNT_HEADERS)
                .ok_or_else(|| ImportError::MissingColumn("amount".into()))?,
            kind_column: find(KIND_HEADERS),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvImportProfile {
    /// Explicit column positions; `None` means detect from the header row.
    pub mapping: Option<CsvColumnMapping>,
    pub has_header: bool,
    pub delimiter: u8,
    /// Tried before the built-in statement formats.
    pub date_format: Option<String>,
    /// Year for statements that print dates as `MM/DD`.
    pub default_year: Option<i32>,
}

impl Default for CsvImportProfile {
    fn default() -> Self {
        Self {
            mapping: None,
            has_header: true,
            delimiter: b',',
            date_format: None,
            default_year: None,
        }
    }
}

const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const YEAR_LAST_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%d/%m/%Y", "%d-%m-%Y"];
const TWO_DIGIT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y", "%d/%m/%y", "%d-%m-%y"];

/// Parses the date layouts seen on bank statements. Returns `None` rather
/// than an error so the row can still be categorized and reported as undated.
pub fn parse_statement_date(
    s: &str,
    preferred_format: Option<&str>,
    default_year: Option<i32>,
) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(date) = preferred_format.and_then(|fmt| NaiveDate::parse_from_str(s, fmt).ok()) {
        return Some(date);
    }

    let parts: Vec<&str> = s.split(['/', '-']).collect();
    match parts.as_slice() {
        [month, day] => {
            let year = default_year?;
            NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
        }
        [first, _, last] => {
            let formats = if first.len() == 4 {
                YEAR_FIRST_FORMATS
            } else if last.len() == 2 {
                TWO_DIGIT_YEAR_FORMATS
            } else {
                YEAR_LAST_FORMATS
            };
            formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        }
        _ => None,
    }
}

pub fn import_csv<R: Read>(data: R, profile: &CsvImportProfile) -> Result<Vec<Transaction>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(profile.has_header)
        .delimiter(profile.delimiter)
        .flexible(true)
        .from_reader(data);

    let mapping = match &profile.mapping {
        Some(mapping) => mapping.clone(),
        None => CsvColumnMapping::from_headers(reader.headers()?)?,
    };

    let mut transactions = Vec::new();
    let mut undated = 0usize;

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());

        let raw_date = record.get(mapping.date_column).unwrap_or_default();
        let date = parse_statement_date(raw_date, profile.date_format.as_deref(), profile.default_year);
        if date.is_none() {
            undated += 1;
            tracing::warn!(line, raw_date, "Unparseable transaction date");
        }

        let description = record
            .get(mapping.description_column)
            .unwrap_or_default()
            .trim()
            .to_string();

        let raw_amount = record.get(mapping.amount_column).unwrap_or_default();
        let amount = Money::parse(raw_amount).map_err(|_| ImportError::InvalidAmount {
            line,
            value: raw_amount.to_string(),
        })?;

        let kind = mapping
            .kind_column
            .and_then(|col| record.get(col))
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| match s.parse::<TxKind>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    tracing::warn!(line, "{e}");
                    None
                }
            });

        transactions.push(Transaction {
            date,
            description,
            amount,
            kind,
        });
    }

    tracing::info!(rows = transactions.len(), undated, "Imported CSV transactions");
    Ok(transactions)
}
