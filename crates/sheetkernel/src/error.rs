//! Facade-level failures — these are not spreadsheet values. `ExcelError`/
//! `ExcelErrorKind` stay inside the evaluator as values (cell results can be
//! `#REF!` without any `Result::Err` involved); a `WorkbookError` is for
//! operations on the facade itself that have no cell to report through,
//! e.g. renaming a sheet that doesn't exist.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkbookError {
    #[error("unknown sheet {0:?}")]
    UnknownSheet(String),
    #[error("sheet {0:?} already exists")]
    DuplicateSheet(String),
    #[error("unknown table {0:?}")]
    UnknownTable(String),
    #[error("table {0:?} already exists")]
    DuplicateTable(String),
    #[error("invalid formula: {0}")]
    InvalidFormula(String),
}
