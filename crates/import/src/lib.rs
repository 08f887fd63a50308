pub mod csv;
pub mod export;

pub use csv::{import_csv, parse_statement_date, CsvColumnMapping, CsvImportProfile, ImportError};
pub use export::write_categorized;
