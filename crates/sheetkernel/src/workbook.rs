//! The facade: a workbook a caller can mutate cell-by-cell, with eviction
//! and recomputation handled entirely by the evaluator underneath (spec §6
//! "External Interfaces").

use sheetkernel_common::{LiteralValue, RangeEnd};
use sheetkernel_eval::{CellContent, Evaluator, TableDef};

use crate::config::WorkbookConfig;
use crate::error::WorkbookError;
use crate::events::{CellAddress, CellChange, SheetEvent};
use crate::store::WorkbookHandle;

/// A value a caller can write into a cell. `Formula`'s leading `=` is
/// optional; it's stripped if present before the source is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Formula(String),
}

impl CellValue {
    fn into_content(self) -> Result<CellContent, WorkbookError> {
        match self {
            CellValue::Empty => Ok(CellContent::Empty),
            CellValue::Number(n) => Ok(CellContent::Number(n)),
            CellValue::Text(s) => Ok(CellContent::Text(s)),
            CellValue::Boolean(b) => Ok(CellContent::Boolean(b)),
            CellValue::Formula(src) => {
                let stripped = src.strip_prefix('=').unwrap_or(&src);
                sheetkernel_parse::parse(format!("={stripped}"))
                    .map_err(|e| WorkbookError::InvalidFormula(e.to_string()))?;
                Ok(CellContent::Formula(stripped.to_string()))
            }
        }
    }
}

type CellListener = Box<dyn FnMut(&[CellChange])>;
type SheetListener = Box<dyn FnMut(&SheetEvent)>;

/// A single in-process workbook: cell storage plus the evaluator kernel
/// sitting over it, wired together through a [`WorkbookHandle`].
pub struct Workbook {
    handle: WorkbookHandle,
    evaluator: Evaluator<WorkbookHandle>,
    #[allow(dead_code)]
    config: WorkbookConfig,
    cell_listeners: Vec<CellListener>,
    sheet_listeners: Vec<SheetListener>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook::with_config(WorkbookConfig::default())
    }

    pub fn with_config(config: WorkbookConfig) -> Self {
        let handle = WorkbookHandle::new();
        let evaluator = Evaluator::new(0, handle.clone());
        Workbook {
            handle,
            evaluator,
            config,
            cell_listeners: Vec::new(),
            sheet_listeners: Vec::new(),
        }
    }

    pub fn on_cell_change(&mut self, listener: impl FnMut(&[CellChange]) + 'static) {
        self.cell_listeners.push(Box::new(listener));
    }

    pub fn on_sheet_event(&mut self, listener: impl FnMut(&SheetEvent) + 'static) {
        self.sheet_listeners.push(Box::new(listener));
    }

    fn fire_cell_changes(&mut self, changes: Vec<CellChange>) {
        if changes.is_empty() {
            return;
        }
        for listener in &mut self.cell_listeners {
            listener(&changes);
        }
    }

    fn fire_sheet_event(&mut self, event: SheetEvent) {
        for listener in &mut self.sheet_listeners {
            listener(&event);
        }
    }

    /// Add a new sheet, returning its stable index.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> Result<u32, WorkbookError> {
        let name = name.into();
        if self.handle.borrow().sheet_index(&name).is_some() {
            return Err(WorkbookError::DuplicateSheet(name));
        }
        let index = self.handle.borrow_mut().add_sheet(name.clone());
        self.fire_sheet_event(SheetEvent::Added { sheet: index, name });
        Ok(index)
    }

    /// Remove a sheet, tombstoning its slot so other sheets' indices (and
    /// every formula reference built against them) stay valid.
    pub fn remove_sheet(&mut self, name: &str) -> Result<(), WorkbookError> {
        let sheet = self
            .handle
            .borrow()
            .sheet_index(name)
            .ok_or_else(|| WorkbookError::UnknownSheet(name.to_string()))?;
        self.handle.borrow_mut().remove_sheet(sheet);
        self.evaluator.clear_cache();
        #[cfg(feature = "tracing")]
        tracing::info!(sheet, name, "sheet removed, cache cleared");
        self.fire_sheet_event(SheetEvent::Removed {
            sheet,
            name: name.to_string(),
        });
        Ok(())
    }

    /// Rename a sheet, rewriting every formula that refers to it by name and
    /// clearing the cache (formula text changed out from under the cached
    /// dependency graph).
    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<(), WorkbookError> {
        let sheet = self
            .handle
            .borrow()
            .sheet_index(old)
            .ok_or_else(|| WorkbookError::UnknownSheet(old.to_string()))?;
        if self.handle.borrow().sheet_index(new).is_some() {
            return Err(WorkbookError::DuplicateSheet(new.to_string()));
        }

        {
            let mut data = self.handle.borrow_mut();
            let sheet_count = data.sheets.len();
            for s in 0..sheet_count as u32 {
                let Some(sheet_data) = data.sheet_mut(s) else {
                    continue;
                };
                let keys: Vec<(u32, u32)> = sheet_data.cells.keys().copied().collect();
                for key in keys {
                    if let Some(CellContent::Formula(src)) = sheet_data.cells.get(&key) {
                        let rewritten = rewrite_sheet_references(src, old, new);
                        if rewritten != *src {
                            sheet_data
                                .cells
                                .insert(key, CellContent::Formula(rewritten));
                        }
                    }
                }
            }
            if let Some(sheet_data) = data.sheet_mut(sheet) {
                sheet_data.name = new.to_string();
            }
        }

        self.evaluator.clear_cache();
        #[cfg(feature = "tracing")]
        tracing::info!(sheet, old, new, "sheet renamed, cache cleared");
        self.fire_sheet_event(SheetEvent::Renamed {
            sheet,
            old: old.to_string(),
            new: new.to_string(),
        });
        Ok(())
    }

    fn sheet_index(&self, name: &str) -> Result<u32, WorkbookError> {
        self.handle
            .borrow()
            .sheet_index(name)
            .ok_or_else(|| WorkbookError::UnknownSheet(name.to_string()))
    }

    /// Write a single cell, invalidate its cached result, and fire one
    /// `CellChange` event.
    pub fn set_cell(
        &mut self,
        sheet: &str,
        col: u32,
        row: u32,
        value: CellValue,
    ) -> Result<(), WorkbookError> {
        let sheet_idx = self.sheet_index(sheet)?;
        let content = value.into_content()?;

        let old_value = self.evaluator.get_cell_value(sheet_idx, col, row);
        {
            let mut data = self.handle.borrow_mut();
            let sheet_data = data
                .sheet_mut(sheet_idx)
                .expect("sheet index resolved above");
            if matches!(content, CellContent::Empty) {
                sheet_data.cells.remove(&(col, row));
            } else {
                sheet_data.cells.insert((col, row), content);
            }
        }
        self.evaluator.invalidate_cell(sheet_idx, col, row);
        let new_value = self.evaluator.get_cell_value(sheet_idx, col, row);

        self.fire_cell_changes(vec![CellChange {
            address: CellAddress {
                sheet: sheet_idx,
                col,
                row,
            },
            old_value,
            new_value,
        }]);
        Ok(())
    }

    /// Bulk-load a rectangular block of cells, row-major, starting at
    /// `(start_col, start_row)`. Fires one batched `CellChange` event.
    pub fn set_sheet_content(
        &mut self,
        sheet: &str,
        start_col: u32,
        start_row: u32,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<(), WorkbookError> {
        let sheet_idx = self.sheet_index(sheet)?;
        let mut changes = Vec::new();
        for (r, row_values) in rows.into_iter().enumerate() {
            for (c, value) in row_values.into_iter().enumerate() {
                let col = start_col + c as u32;
                let row = start_row + r as u32;
                let content = value.into_content()?;
                let old_value = self.evaluator.get_cell_value(sheet_idx, col, row);
                {
                    let mut data = self.handle.borrow_mut();
                    let sheet_data = data
                        .sheet_mut(sheet_idx)
                        .expect("sheet index resolved above");
                    if matches!(content, CellContent::Empty) {
                        sheet_data.cells.remove(&(col, row));
                    } else {
                        sheet_data.cells.insert((col, row), content);
                    }
                }
                self.evaluator.invalidate_cell(sheet_idx, col, row);
                let new_value = self.evaluator.get_cell_value(sheet_idx, col, row);
                if old_value != new_value {
                    changes.push(CellChange {
                        address: CellAddress {
                            sheet: sheet_idx,
                            col,
                            row,
                        },
                        old_value,
                        new_value,
                    });
                }
            }
        }
        self.fire_cell_changes(changes);
        Ok(())
    }

    /// Read a cell's current value, serialized per the facade's wire
    /// contract: `debug` controls whether `#ERR!` values carry their human
    /// message.
    pub fn get_cell_value(
        &mut self,
        sheet: &str,
        col: u32,
        row: u32,
        debug: bool,
    ) -> Result<String, WorkbookError> {
        let sheet_idx = self.sheet_index(sheet)?;
        let value = self.evaluator.get_cell_value(sheet_idx, col, row);
        Ok(serialize_literal(&value, debug))
    }

    /// Read a cell's raw result, for callers that want the typed value
    /// rather than its serialized form.
    pub fn get_cell_literal(&mut self, sheet: &str, col: u32, row: u32) -> Result<LiteralValue, WorkbookError> {
        let sheet_idx = self.sheet_index(sheet)?;
        Ok(self.evaluator.get_cell_value(sheet_idx, col, row))
    }

    /// Define (or redefine) a workbook-global named expression.
    pub fn add_named_expression(&mut self, name: &str, expression: &str) {
        self.handle
            .borrow_mut()
            .global_names
            .insert(name.to_string(), expression.to_string());
        self.evaluator.clear_cache();
        #[cfg(feature = "tracing")]
        tracing::info!(name, "named expression updated, cache cleared");
    }

    /// Define (or redefine) a sheet-scoped named expression, shadowing any
    /// global name of the same name for formulas on that sheet.
    pub fn add_sheet_named_expression(
        &mut self,
        sheet: &str,
        name: &str,
        expression: &str,
    ) -> Result<(), WorkbookError> {
        let sheet_idx = self.sheet_index(sheet)?;
        let mut data = self.handle.borrow_mut();
        data.sheet_mut(sheet_idx)
            .expect("sheet index resolved above")
            .names
            .insert(name.to_string(), expression.to_string());
        drop(data);
        self.evaluator.clear_cache();
        Ok(())
    }

    pub fn add_table(
        &mut self,
        name: &str,
        sheet: &str,
        start_col: u32,
        start_row: u32,
        headers: Vec<String>,
        end_row: RangeEnd,
    ) -> Result<(), WorkbookError> {
        let sheet_idx = self.sheet_index(sheet)?;
        {
            let data = self.handle.borrow();
            if data.tables.contains_key(name) {
                return Err(WorkbookError::DuplicateTable(name.to_string()));
            }
        }
        let headers: Vec<(String, u32)> = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| (h, i as u32))
            .collect();
        let table = TableDef {
            name: name.to_string(),
            sheet: sheet_idx,
            start_col,
            start_row,
            headers,
            end_row,
        };
        self.handle.borrow_mut().tables.insert(name.to_string(), table);
        self.evaluator.clear_cache();
        Ok(())
    }

    pub fn update_table_end_row(&mut self, name: &str, end_row: RangeEnd) -> Result<(), WorkbookError> {
        let mut data = self.handle.borrow_mut();
        let table = data
            .tables
            .get_mut(name)
            .ok_or_else(|| WorkbookError::UnknownTable(name.to_string()))?;
        table.end_row = end_row;
        drop(data);
        self.evaluator.clear_cache();
        Ok(())
    }

    pub fn rename_table(&mut self, old: &str, new: &str) -> Result<(), WorkbookError> {
        let mut data = self.handle.borrow_mut();
        if data.tables.contains_key(new) {
            return Err(WorkbookError::DuplicateTable(new.to_string()));
        }
        let mut table = data
            .tables
            .remove(old)
            .ok_or_else(|| WorkbookError::UnknownTable(old.to_string()))?;
        table.name = new.to_string();
        data.tables.insert(new.to_string(), table);

        let sheet_count = data.sheets.len();
        for s in 0..sheet_count as u32 {
            let Some(sheet_data) = data.sheet_mut(s) else {
                continue;
            };
            let keys: Vec<(u32, u32)> = sheet_data.cells.keys().copied().collect();
            for key in keys {
                if let Some(CellContent::Formula(src)) = sheet_data.cells.get(&key) {
                    let rewritten = rewrite_table_references(src, old, new);
                    if rewritten != *src {
                        sheet_data.cells.insert(key, CellContent::Formula(rewritten));
                    }
                }
            }
        }
        drop(data);
        self.evaluator.clear_cache();
        Ok(())
    }

    pub fn remove_table(&mut self, name: &str) -> Result<(), WorkbookError> {
        let mut data = self.handle.borrow_mut();
        data.tables
            .remove(name)
            .ok_or_else(|| WorkbookError::UnknownTable(name.to_string()))?;
        drop(data);
        self.evaluator.clear_cache();
        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Workbook::new()
    }
}

/// Render a computed value the way the facade's callers see it: errors
/// collapse to just their code unless `debug` is set, in which case the
/// human message (if any) rides along; everything else reuses
/// `LiteralValue`'s own `Display`.
pub fn serialize_literal(value: &LiteralValue, debug: bool) -> String {
    match value {
        LiteralValue::Error(e) => {
            if debug {
                e.to_string()
            } else {
                e.kind.to_string()
            }
        }
        LiteralValue::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Rewrite `Old!A1` / `'Old Sheet'!A1` style references to `New!` /
/// `'New Sheet'!` in a formula's source text. `sheetkernel-parse` exposes no
/// AST-to-formula-text serializer (only a tokenizer renderer and the AST's
/// own debug `Display`), so a sheet rename rewrites references textually
/// rather than by re-serializing a parsed tree.
fn rewrite_sheet_references(formula: &str, old: &str, new: &str) -> String {
    let quoted_old = format!("'{old}'!");
    let quoted_new = format!("'{new}'!");
    if formula.contains(&quoted_old) {
        return formula.replace(&quoted_old, &quoted_new);
    }

    let bare_old = format!("{old}!");
    if !formula.contains(&bare_old) {
        return formula.to_string();
    }

    let needs_quoting = new.chars().any(|c| !(c.is_alphanumeric() || c == '_'));
    let replacement = if needs_quoting {
        format!("'{new}'!")
    } else {
        format!("{new}!")
    };

    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0;
    while i < bytes.len() {
        if formula[i..].starts_with(&bare_old) {
            let boundary_ok = i == 0 || !is_identifier_byte(bytes[i - 1]);
            if boundary_ok {
                out.push_str(&replacement);
                i += bare_old.len();
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Rewrite `OldTable[...]` structured references to `NewTable[...]`.
fn rewrite_table_references(formula: &str, old: &str, new: &str) -> String {
    let bare_old = format!("{old}[");
    if !formula.contains(&bare_old) {
        return formula.to_string();
    }
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0;
    while i < bytes.len() {
        if formula[i..].starts_with(&bare_old) {
            let boundary_ok = i == 0 || !is_identifier_byte(bytes[i - 1]);
            if boundary_ok {
                out.push_str(new);
                out.push('[');
                i += bare_old.len();
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wb_with_sheet(name: &str) -> Workbook {
        let mut wb = Workbook::new();
        wb.add_sheet(name).unwrap();
        wb
    }

    #[test]
    fn arithmetic_with_references() {
        let mut wb = wb_with_sheet("Sheet1");
        wb.set_cell("Sheet1", 1, 1, CellValue::Number(2.0)).unwrap();
        wb.set_cell("Sheet1", 1, 2, CellValue::Number(3.0)).unwrap();
        wb.set_cell("Sheet1", 1, 3, CellValue::Formula("A1+A2".into()))
            .unwrap();
        assert_eq!(wb.get_cell_value("Sheet1", 1, 3, false).unwrap(), "5");
    }

    #[test]
    fn set_cell_fires_change_event() {
        let mut wb = wb_with_sheet("Sheet1");
        let changes = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let changes_clone = changes.clone();
        wb.on_cell_change(move |batch| changes_clone.borrow_mut().extend_from_slice(batch));
        wb.set_cell("Sheet1", 1, 1, CellValue::Number(7.0)).unwrap();
        assert_eq!(changes.borrow().len(), 1);
        assert_eq!(changes.borrow()[0].new_value, LiteralValue::Number(7.0));
    }

    #[test]
    fn unknown_sheet_is_an_error() {
        let mut wb = Workbook::new();
        let err = wb.set_cell("Nope", 1, 1, CellValue::Number(1.0)).unwrap_err();
        assert_eq!(err, WorkbookError::UnknownSheet("Nope".to_string()));
    }

    #[test]
    fn invalid_formula_is_rejected_before_storage() {
        let mut wb = wb_with_sheet("Sheet1");
        let err = wb
            .set_cell("Sheet1", 1, 1, CellValue::Formula("SUM(".into()))
            .unwrap_err();
        assert!(matches!(err, WorkbookError::InvalidFormula(_)));
    }

    #[test]
    fn rename_sheet_rewrites_cross_sheet_formula() {
        let mut wb = Workbook::new();
        wb.add_sheet("Data").unwrap();
        wb.add_sheet("Summary").unwrap();
        wb.set_cell("Data", 1, 1, CellValue::Number(42.0)).unwrap();
        wb.set_cell("Summary", 1, 1, CellValue::Formula("Data!A1".into()))
            .unwrap();
        wb.rename_sheet("Data", "Raw").unwrap();
        assert_eq!(wb.get_cell_value("Summary", 1, 1, false).unwrap(), "42");
    }

    #[test]
    fn remove_sheet_keeps_other_sheet_indices_stable() {
        let mut wb = Workbook::new();
        wb.add_sheet("A").unwrap();
        wb.add_sheet("B").unwrap();
        wb.set_cell("B", 1, 1, CellValue::Number(1.0)).unwrap();
        wb.remove_sheet("A").unwrap();
        assert_eq!(wb.get_cell_value("B", 1, 1, false).unwrap(), "1");
    }

    #[test]
    fn named_expression_update_invalidates_dependents() {
        let mut wb = wb_with_sheet("Sheet1");
        wb.add_named_expression("RATE", "0.1");
        wb.set_cell("Sheet1", 1, 1, CellValue::Formula("RATE*100".into()))
            .unwrap();
        assert_eq!(wb.get_cell_value("Sheet1", 1, 1, false).unwrap(), "10");
        wb.add_named_expression("RATE", "0.2");
        assert_eq!(wb.get_cell_value("Sheet1", 1, 1, false).unwrap(), "20");
    }

    #[test]
    fn division_by_zero_reports_code_or_message_by_debug_flag() {
        let mut wb = wb_with_sheet("Sheet1");
        wb.set_cell("Sheet1", 1, 1, CellValue::Formula("1/0".into()))
            .unwrap();
        assert_eq!(wb.get_cell_value("Sheet1", 1, 1, false).unwrap(), "#DIV/0!");
    }
}
