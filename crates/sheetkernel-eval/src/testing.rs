//! In-memory workbook fixture for evaluator tests, grounded on the teacher's
//! `TestWorkbook` builder pattern (`_teacher_reference/src/test_workbook.rs`).

use rustc_hash::FxHashMap;

use crate::key::{NameScope, WorkbookId};
use crate::store::{CellContent, CellStore, NamedExpressionResolver, TableCatalog, TableDef};

#[derive(Debug, Clone, Default)]
struct TestSheet {
    name: String,
    cells: FxHashMap<(u32, u32), CellContent>,
}

impl TestSheet {
    fn last_row(&self) -> u32 {
        self.cells.keys().map(|(_, r)| *r).max().unwrap_or(0)
    }

    fn last_col(&self) -> u32 {
        self.cells.keys().map(|(c, _)| *c).max().unwrap_or(0)
    }
}

/// A minimal, fully in-memory `WorkbookStore` for unit and integration tests.
#[derive(Debug, Clone, Default)]
pub struct TestWorkbook {
    sheets: Vec<TestSheet>,
    global_names: FxHashMap<String, String>,
    sheet_names: FxHashMap<(u32, String), String>,
    tables: FxHashMap<String, TableDef>,
}

impl TestWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: &str) -> u32 {
        let id = self.sheets.len() as u32;
        self.sheets.push(TestSheet {
            name: name.to_string(),
            cells: FxHashMap::default(),
        });
        id
    }

    pub fn set_cell(&mut self, sheet: u32, col: u32, row: u32, content: CellContent) {
        self.sheets[sheet as usize].cells.insert((col, row), content);
    }

    pub fn set_formula(&mut self, sheet: u32, col: u32, row: u32, formula_without_eq: &str) {
        self.set_cell(
            sheet,
            col,
            row,
            CellContent::Formula(formula_without_eq.to_string()),
        );
    }

    pub fn set_number(&mut self, sheet: u32, col: u32, row: u32, n: f64) {
        self.set_cell(sheet, col, row, CellContent::Number(n));
    }

    pub fn set_text(&mut self, sheet: u32, col: u32, row: u32, s: &str) {
        self.set_cell(sheet, col, row, CellContent::Text(s.to_string()));
    }

    pub fn add_global_name(&mut self, name: &str, expr_without_eq: &str) {
        self.global_names
            .insert(name.to_uppercase(), expr_without_eq.to_string());
    }

    pub fn add_sheet_name(&mut self, sheet: u32, name: &str, expr_without_eq: &str) {
        self.sheet_names
            .insert((sheet, name.to_uppercase()), expr_without_eq.to_string());
    }

    pub fn add_table(&mut self, def: TableDef) {
        self.tables.insert(def.name.to_uppercase(), def);
    }
}

impl CellStore for TestWorkbook {
    fn get_cell(&self, _workbook: WorkbookId, sheet: u32, col: u32, row: u32) -> CellContent {
        self.sheets
            .get(sheet as usize)
            .and_then(|s| s.cells.get(&(col, row)))
            .cloned()
            .unwrap_or(CellContent::Empty)
    }

    fn sheet_id(&self, _workbook: WorkbookId, name: &str) -> Option<u32> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
            .map(|i| i as u32)
    }

    fn last_row(&self, _workbook: WorkbookId, sheet: u32) -> u32 {
        self.sheets.get(sheet as usize).map(|s| s.last_row()).unwrap_or(0)
    }

    fn last_col(&self, _workbook: WorkbookId, sheet: u32) -> u32 {
        self.sheets.get(sheet as usize).map(|s| s.last_col()).unwrap_or(0)
    }
}

impl NamedExpressionResolver for TestWorkbook {
    fn resolve_named_expression(
        &self,
        _workbook: WorkbookId,
        sheet: u32,
        name: &str,
    ) -> Option<(String, NameScope)> {
        let upper = name.to_uppercase();
        if let Some(src) = self.sheet_names.get(&(sheet, upper.clone())) {
            return Some((src.clone(), NameScope::Sheet(sheet)));
        }
        self.global_names
            .get(&upper)
            .map(|src| (src.clone(), NameScope::Global))
    }
}

impl TableCatalog for TestWorkbook {
    fn get_table(&self, _workbook: WorkbookId, name: &str) -> Option<TableDef> {
        self.tables.get(&name.to_uppercase()).cloned()
    }
}
