//! In-process spreadsheet-formula workbook: a mutable cell store wired to
//! the `sheetkernel-eval` evaluation kernel, exposing load/mutate/read
//! operations and change events over it.

pub mod config;
pub mod error;
pub mod events;
pub mod store;
pub mod workbook;

pub use config::WorkbookConfig;
pub use error::WorkbookError;
pub use events::{CellAddress, CellChange, SheetEvent};
pub use store::WorkbookHandle;
pub use workbook::{CellValue, Workbook, serialize_literal};

pub use sheetkernel_common::{ExcelError, ExcelErrorKind, LiteralValue, RangeEnd};
pub use sheetkernel_eval::TableDef;
