//! Collaborator interfaces the evaluator consumes but does not own: raw cell
//! storage, named-expression resolution, and table definitions (spec §1
//! "Out of scope (collaborators only)"). The evaluator only ever reads
//! through these traits; nothing here is mutated by the evaluator itself.

use sheetkernel_common::RangeEnd;
use sheetkernel_common::value::LiteralValue;

use crate::key::{NameScope, WorkbookId};

/// What a single cell currently holds, before formula parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Formula source *without* the leading `=`.
    Formula(String),
}

impl CellContent {
    /// Convert a non-formula cell directly to a `LiteralValue` (spec §4.F.3
    /// "Cell... If not a formula string, convert scalar to CellValue").
    pub fn to_literal(&self) -> LiteralValue {
        match self {
            CellContent::Empty => LiteralValue::Empty,
            CellContent::Number(n) => LiteralValue::Number(*n),
            CellContent::Text(s) => LiteralValue::Text(s.clone()),
            CellContent::Boolean(b) => LiteralValue::Boolean(*b),
            CellContent::Formula(_) => LiteralValue::Empty,
        }
    }
}

/// A table definition (spec §3 "Table definition").
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: String,
    pub sheet: u32,
    pub start_col: u32,
    pub start_row: u32,
    /// Ordered column-name -> 0-based column offset from `start_col`.
    pub headers: Vec<(String, u32)>,
    pub end_row: RangeEnd,
}

impl TableDef {
    pub fn column_offset(&self, name: &str) -> Option<u32> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, off)| *off)
    }

    pub fn width(&self) -> u32 {
        self.headers.len() as u32
    }

    /// The table's header row, i.e. `start_row`.
    pub fn header_row(&self) -> u32 {
        self.start_row
    }

    pub fn first_data_row(&self) -> u32 {
        self.start_row + 1
    }
}

/// Raw cell storage and sheet metadata, consumed read-only by the evaluator.
pub trait CellStore {
    fn get_cell(&self, workbook: WorkbookId, sheet: u32, col: u32, row: u32) -> CellContent;

    /// Sheet id for a given name, if the sheet exists.
    fn sheet_id(&self, workbook: WorkbookId, name: &str) -> Option<u32>;

    /// Last non-empty row/col on the given sheet axis, used to clamp open
    /// ranges (spec §4.A "Range iteration", §4.D frontier deps).
    fn last_row(&self, workbook: WorkbookId, sheet: u32) -> u32;
    fn last_col(&self, workbook: WorkbookId, sheet: u32) -> u32;
}

/// Named-expression resolution: sheet-scoped shadows global (spec §3).
pub trait NamedExpressionResolver {
    /// Resolve `name` for `sheet`, returning the expression source and which
    /// scope satisfied the lookup (needed so the caller can build the right
    /// dep-node key for the cache).
    fn resolve_named_expression(
        &self,
        workbook: WorkbookId,
        sheet: u32,
        name: &str,
    ) -> Option<(String, NameScope)>;
}

/// Table catalog lookups.
pub trait TableCatalog {
    fn get_table(&self, workbook: WorkbookId, name: &str) -> Option<TableDef>;
}

/// Everything the evaluator needs from the surrounding workbook.
pub trait WorkbookStore: CellStore + NamedExpressionResolver + TableCatalog {}
impl<T> WorkbookStore for T where T: CellStore + NamedExpressionResolver + TableCatalog {}
