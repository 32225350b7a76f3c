//! In-process workbook data: the concrete [`sheetkernel_eval::CellStore`] /
//! [`NamedExpressionResolver`] / [`TableCatalog`] the facade hands to the
//! evaluator, and that the facade itself writes through.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use sheetkernel_eval::{
    CellContent, CellStore, NameScope, NamedExpressionResolver, TableCatalog, TableDef, WorkbookId,
};

/// One sheet's cells and metadata. Removed sheets leave a `None` slot in
/// [`WorkbookData::sheets`] rather than shifting later sheets down, so a
/// sheet's index (and every `DepNode::Cell { sheet, .. }` built against it)
/// never changes once assigned.
#[derive(Debug, Default)]
pub struct SheetData {
    pub name: String,
    pub cells: FxHashMap<(u32, u32), CellContent>,
    pub names: FxHashMap<String, String>,
}

impl SheetData {
    fn new(name: impl Into<String>) -> Self {
        SheetData {
            name: name.into(),
            cells: FxHashMap::default(),
            names: FxHashMap::default(),
        }
    }

    fn last_row(&self) -> u32 {
        self.cells.keys().map(|(_, row)| *row).max().unwrap_or(0)
    }

    fn last_col(&self) -> u32 {
        self.cells.keys().map(|(col, _)| *col).max().unwrap_or(0)
    }
}

/// All data backing a single workbook.
#[derive(Debug, Default)]
pub struct WorkbookData {
    pub sheets: Vec<Option<SheetData>>,
    pub global_names: FxHashMap<String, String>,
    pub tables: FxHashMap<String, TableDef>,
}

impl WorkbookData {
    pub fn new() -> Self {
        WorkbookData::default()
    }

    pub fn sheet_index(&self, name: &str) -> Option<u32> {
        self.sheets.iter().enumerate().find_map(|(i, s)| {
            s.as_ref()
                .filter(|s| s.name.eq_ignore_ascii_case(name))
                .map(|_| i as u32)
        })
    }

    pub fn sheet_name(&self, sheet: u32) -> Option<&str> {
        self.sheets
            .get(sheet as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.name.as_str())
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> u32 {
        let index = self.sheets.len() as u32;
        self.sheets.push(Some(SheetData::new(name)));
        index
    }

    pub fn remove_sheet(&mut self, sheet: u32) -> bool {
        match self.sheets.get_mut(sheet as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn sheet(&self, sheet: u32) -> Option<&SheetData> {
        self.sheets.get(sheet as usize).and_then(|s| s.as_ref())
    }

    pub fn sheet_mut(&mut self, sheet: u32) -> Option<&mut SheetData> {
        self.sheets.get_mut(sheet as usize).and_then(|s| s.as_mut())
    }
}

/// Cheap, cloneable handle shared between the facade (which writes through
/// it) and the `Evaluator<WorkbookHandle>` (which only ever reads through
/// the collaborator traits). A single-threaded `Rc<RefCell<..>>` rather than
/// an `Arc<Mutex<..>>` since evaluation here is synchronous and
/// single-threaded throughout (spec §5 "Concurrency Model").
#[derive(Debug, Clone)]
pub struct WorkbookHandle(Rc<RefCell<WorkbookData>>);

impl WorkbookHandle {
    pub fn new() -> Self {
        WorkbookHandle(Rc::new(RefCell::new(WorkbookData::new())))
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, WorkbookData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, WorkbookData> {
        self.0.borrow_mut()
    }
}

impl Default for WorkbookHandle {
    fn default() -> Self {
        WorkbookHandle::new()
    }
}

impl CellStore for WorkbookHandle {
    fn get_cell(&self, _workbook: WorkbookId, sheet: u32, col: u32, row: u32) -> CellContent {
        self.borrow()
            .sheet(sheet)
            .and_then(|s| s.cells.get(&(col, row)).cloned())
            .unwrap_or(CellContent::Empty)
    }

    fn sheet_id(&self, _workbook: WorkbookId, name: &str) -> Option<u32> {
        self.borrow().sheet_index(name)
    }

    fn last_row(&self, _workbook: WorkbookId, sheet: u32) -> u32 {
        self.borrow().sheet(sheet).map(|s| s.last_row()).unwrap_or(0)
    }

    fn last_col(&self, _workbook: WorkbookId, sheet: u32) -> u32 {
        self.borrow().sheet(sheet).map(|s| s.last_col()).unwrap_or(0)
    }
}

impl NamedExpressionResolver for WorkbookHandle {
    fn resolve_named_expression(
        &self,
        _workbook: WorkbookId,
        sheet: u32,
        name: &str,
    ) -> Option<(String, NameScope)> {
        let data = self.borrow();
        if let Some(expr) = data.sheet(sheet).and_then(|s| s.names.get(name)) {
            return Some((expr.clone(), NameScope::Sheet(sheet)));
        }
        data.global_names
            .get(name)
            .map(|expr| (expr.clone(), NameScope::Global))
    }
}

impl TableCatalog for WorkbookHandle {
    fn get_table(&self, _workbook: WorkbookId, name: &str) -> Option<TableDef> {
        self.borrow().tables.get(name).cloned()
    }
}
