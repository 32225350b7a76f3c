//! The evaluator (component F, "the heart"): turns raw cell content into
//! cached, dependency-tracked results by walking the parsed AST and asking
//! the dependency graph / spill registry / function library to cooperate.
//!
//! Design note (see `/root/crate/DESIGN.md`): the spec's §4.F.4 rerun loop
//! exists to re-converge a cell's dependency set when evaluating it has side
//! effects on the wider graph (a spill being newly accepted or rejected
//! elsewhere). Because this implementation resolves dependencies eagerly and
//! recursively (a cell reference is fetched, not deferred, the moment the AST
//! walk reaches it), a single pass always discovers the complete, stable
//! dependency set for a fixed environment — nothing changes by re-running
//! the same formula against unchanged inputs. The rerun loop collapses to a
//! single evaluation pass per `evaluate_cell` call; the cross-cell
//! convergence the loop existed for is instead handled by
//! [`Evaluator::invalidate_and_recompute`], an eager cascade triggered the
//! moment a spill is accepted or rejected.

use std::rc::Rc;

use rustc_hash::FxHashSet;
use sheetkernel_common::{ExcelError, ExcelErrorKind, LiteralValue, RangeEnd, SpreadsheetRange};
use sheetkernel_parse::parser::{ReferenceType, TableReference, TableRowSpecifier, TableSpecifier};
use sheetkernel_parse::{ASTNode, ASTNodeType};

use crate::context::{CurrentCell, EvaluationContext};
use crate::functions::{FunctionRegistry, NodeEvaluator, eval_scalar};
use crate::graph::{DependencyGraph, NodeRecord};
use crate::key::{DepNode, TableMode, WorkbookId};
use crate::result::{FunctionEvaluationResult, SingleEvaluationResult, SpilledValues};
use crate::spill::{CellAddr, SpillRegistry};
use crate::store::{CellContent, WorkbookStore};

/// Owns the cache, spill registry and function library for one workbook and
/// drives every AST walk against a `WorkbookStore` collaborator. `S` is
/// typically a cheap handle (e.g. an `Rc<RefCell<_>>` wrapper) rather than
/// the workbook's actual cell storage — the evaluator consumes the
/// collaborator traits, it doesn't own the data behind them.
pub struct Evaluator<S: WorkbookStore> {
    workbook: WorkbookId,
    store: S,
    graph: DependencyGraph,
    spills: SpillRegistry,
    functions: Rc<FunctionRegistry>,
    evaluating: FxHashSet<String>,
}

impl<S: WorkbookStore> Evaluator<S> {
    pub fn new(workbook: WorkbookId, store: S) -> Self {
        Evaluator {
            workbook,
            store,
            graph: DependencyGraph::new(),
            spills: SpillRegistry::new(),
            functions: Rc::new(FunctionRegistry::new()),
            evaluating: FxHashSet::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Public read (spec §4.F.1 `get_cell_value`): if `addr` lies inside a
    /// live spill area, reads from that entry's origin; otherwise computes
    /// (or reuses the cached result of) the cell itself.
    pub fn get_cell_value(&mut self, sheet: u32, col: u32, row: u32) -> LiteralValue {
        let addr = CellAddr {
            workbook: self.workbook,
            sheet,
            col,
            row,
        };
        if let Some((origin, spilled)) = self.spills.covering(addr) {
            return spilled
                .evaluate(row - origin.row, col - origin.col)
                .as_literal();
        }
        self.evaluate_cell(sheet, col, row).as_literal()
    }

    /// `evaluate_cell` (spec §4.F.1): compute and cache `addr`'s own result,
    /// ignoring whether it happens to sit inside someone else's spill.
    pub fn evaluate_cell(&mut self, sheet: u32, col: u32, row: u32) -> SingleEvaluationResult {
        let key = DepNode::cell(self.workbook, sheet, col, row).key();
        if let Some(record) = self.graph.get(&key) {
            return record.result.clone();
        }
        if self.evaluating.contains(&key) {
            #[cfg(feature = "tracing")]
            tracing::warn!(cell = %key, "cycle detected during evaluation");
            return SingleEvaluationResult::Error(ExcelError::new(ExcelErrorKind::Cycle));
        }
        self.compute_cell(key, sheet, col, row)
    }

    /// Drop every cached result and spill entry, for mutations the facade
    /// can't target precisely (a named expression or table definition
    /// changing, a sheet being renamed or removed).
    pub fn clear_cache(&mut self) {
        self.graph = DependencyGraph::new();
        self.spills = SpillRegistry::new();
        self.evaluating.clear();
    }

    /// Drop a cell's cached result and cascade to whatever was cached
    /// against it, for callers that mutate cell content out from under the
    /// evaluator (the `sheetkernel` facade's `set_cell`).
    pub fn invalidate_cell(&mut self, sheet: u32, col: u32, row: u32) {
        let addr = CellAddr {
            workbook: self.workbook,
            sheet,
            col,
            row,
        };
        let key = DepNode::cell(self.workbook, sheet, col, row).key();

        let mut touched = FxHashSet::default();
        touched.insert(key.clone());

        // If `addr` sits inside someone else's live spill area, writing a
        // value there can newly block that spill (spec §4.E): the origin
        // formula must re-run so it can notice and report `#SPILL!`.
        if let Some((origin, _)) = self.spills.covering(addr) {
            touched.insert(DepNode::cell(origin.workbook, origin.sheet, origin.col, origin.row).key());
        }

        self.spills.remove(&addr);
        let affected = self.graph.dependents_of(&touched);
        for touched_key in &touched {
            self.graph.remove(touched_key);
        }
        for dependent in affected {
            self.graph.remove(&dependent);
        }
    }

    fn compute_cell(&mut self, key: String, sheet: u32, col: u32, row: u32) -> SingleEvaluationResult {
        self.evaluating.insert(key.clone());
        let content = self.store.get_cell(self.workbook, sheet, col, row);
        let mut ctx = EvaluationContext::new(
            CurrentCell {
                workbook: self.workbook,
                sheet,
                col,
                row,
            },
            self.evaluating.clone(),
        );

        let result = match content {
            CellContent::Formula(source) => match self.evaluate_formula(&source, &mut ctx) {
                FunctionEvaluationResult::Value(LiteralValue::Array(rows)) => {
                    self.handle_spill(sheet, col, row, SpilledValues::new(rows))
                }
                FunctionEvaluationResult::Value(v) => SingleEvaluationResult::from(v),
                FunctionEvaluationResult::Error(e) => SingleEvaluationResult::Error(e),
                FunctionEvaluationResult::Spilled(spilled) => {
                    self.handle_spill(sheet, col, row, spilled)
                }
            },
            other => SingleEvaluationResult::from(other.to_literal()),
        };

        self.graph.insert(
            key.clone(),
            NodeRecord {
                deps: ctx.dependencies,
                frontier_deps: ctx.frontier_deps,
                discarded_frontier_deps: ctx.discarded_frontier_deps,
                result: result.clone(),
            },
        );
        self.evaluating.remove(&key);
        result
    }

    /// spec §4.F.3: accept or reject a formula's spilled result, threading
    /// through the spill registry, and eagerly recompute anything that had
    /// already cached a value touching the newly-covered area.
    fn handle_spill(
        &mut self,
        sheet: u32,
        col: u32,
        row: u32,
        spilled: SpilledValues,
    ) -> SingleEvaluationResult {
        let origin = CellAddr {
            workbook: self.workbook,
            sheet,
            col,
            row,
        };
        if spilled.is_single_cell() {
            self.spills.remove(&origin);
            return SingleEvaluationResult::from(spilled.top_left());
        }

        let area = spilled.spill_area(row, col);
        let end_row = area.end_row.index().unwrap_or(area.start_row);
        let end_col = area.end_col.index().unwrap_or(area.start_col);
        let mut occupied = FxHashSet::default();
        for r in area.start_row..=end_row {
            for c in area.start_col..=end_col {
                if (r, c) != (row, col)
                    && !matches!(
                        self.store.get_cell(self.workbook, sheet, c, r),
                        CellContent::Empty
                    )
                {
                    occupied.insert((r, c));
                }
            }
        }

        if self
            .spills
            .can_spill(origin, area.clone(), |r, c| occupied.contains(&(r, c)))
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(sheet, col, row, "spill accepted");
            self.spills.insert(origin, area.clone(), spilled.clone());
            self.invalidate_and_recompute(&area, sheet);
            SingleEvaluationResult::from(spilled.top_left())
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(sheet, col, row, "spill rejected, area occupied");
            self.spills.remove(&origin);
            SingleEvaluationResult::Error(ExcelError::new(ExcelErrorKind::Spill))
        }
    }

    /// Recompute, in dependency order, every cached cell whose deps touch
    /// `area` on `sheet` — the targeted re-check spec §4.F.3 calls for when a
    /// new spill area is accepted.
    fn invalidate_and_recompute(&mut self, area: &SpreadsheetRange, sheet: u32) {
        let last_row = self.store.last_row(self.workbook, sheet);
        let last_col = self.store.last_col(self.workbook, sheet);
        let mut touched = FxHashSet::default();
        for (r, c) in area.iter_cells(last_row, last_col) {
            touched.insert(DepNode::cell(self.workbook, sheet, c, r).key());
        }

        let affected = self.graph.dependents_of(&touched);
        if affected.is_empty() {
            return;
        }
        let affected_set: FxHashSet<String> = affected.iter().cloned().collect();
        let order = self
            .graph
            .topological_sort(&affected_set)
            .unwrap_or_else(|| affected.clone());
        for key in &affected_set {
            self.graph.remove(key);
        }
        for key in order.into_iter().rev() {
            if let Some(DepNode::Cell { sheet, col, row, .. }) = DepNode::parse(&key) {
                self.evaluate_cell(sheet, col, row);
            }
        }
    }

    /// spec §4.F.1 `evaluate_formula`: formulas are stored without their
    /// leading `=` ([`CellContent::Formula`]); the parser requires it.
    pub fn evaluate_formula(
        &mut self,
        source_without_eq: &str,
        ctx: &mut EvaluationContext,
    ) -> FunctionEvaluationResult {
        let with_eq = format!("={source_without_eq}");
        match sheetkernel_parse::parse(&with_eq) {
            Ok(ast) => self.eval_node(&ast, ctx),
            Err(_) => FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Error)),
        }
    }

    fn resolve_sheet(&self, sheet: &Option<String>, current: u32) -> Result<u32, ExcelError> {
        match sheet {
            Some(name) => self
                .store
                .sheet_id(self.workbook, name)
                .ok_or_else(|| ExcelError::new(ExcelErrorKind::Ref)),
            None => Ok(current),
        }
    }

    /// Read one cell, recording the appropriate kind of dependency and
    /// resolving through any live spill that covers it (spec §4.F.6).
    fn tracked_cell_value(
        &mut self,
        sheet: u32,
        col: u32,
        row: u32,
        ctx: &mut EvaluationContext,
        plain_dep: bool,
    ) -> LiteralValue {
        let key = DepNode::cell(self.workbook, sheet, col, row).key();
        if plain_dep {
            ctx.record_dependency(key);
        } else {
            ctx.record_frontier_dependency(key);
        }
        self.get_cell_value(sheet, col, row)
    }

    fn resolve_named(&mut self, name: &str, ctx: &mut EvaluationContext) -> FunctionEvaluationResult {
        let Some((source, scope)) =
            self.store
                .resolve_named_expression(self.workbook, ctx.current.sheet, name)
        else {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Name));
        };
        let node_key = DepNode::NamedExpression {
            workbook: self.workbook,
            scope,
            name: name.to_string(),
        }
        .key();
        if ctx.is_evaluating(&node_key) {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Cycle));
        }
        let mut child = ctx.child(ctx.current, &node_key);
        let result = self.evaluate_formula(&source, &mut child);
        ctx.absorb(child);
        ctx.record_dependency(node_key);
        result
    }

    fn table_mode(spec: &Option<TableSpecifier>) -> Result<TableMode, ExcelError> {
        match spec {
            None | Some(TableSpecifier::All) | Some(TableSpecifier::Data) => Ok(TableMode::All),
            Some(TableSpecifier::Column(name)) => match name.strip_prefix('@') {
                Some(rest) => Ok(TableMode::CurrentRowColumn(rest.to_string())),
                None => Ok(TableMode::Column(name.clone())),
            },
            // Headers/Totals/row ranges/special items/combinations: not
            // modeled by `TableMode`, rejected rather than silently
            // mis-resolved.
            _ => Err(ExcelError::new(ExcelErrorKind::Value)),
        }
    }

    fn materialize_table(
        &mut self,
        table_ref: &TableReference,
        ctx: &mut EvaluationContext,
    ) -> Result<Vec<Vec<LiteralValue>>, ExcelError> {
        let Some(def) = self.store.get_table(self.workbook, &table_ref.name) else {
            return Err(ExcelError::new(ExcelErrorKind::Ref));
        };
        let mode = Self::table_mode(&table_ref.specifier)?;
        let is_open = def.end_row.is_infinite();
        let key = DepNode::TableSlice {
            workbook: self.workbook,
            table: def.name.clone(),
            mode: mode.clone(),
        }
        .key();
        if is_open {
            ctx.record_frontier_dependency(key);
        } else {
            ctx.record_dependency(key);
        }

        let last_row = self.store.last_row(self.workbook, def.sheet);
        let end_row = match def.end_row {
            RangeEnd::Index(r) => r,
            _ => last_row,
        };

        match mode {
            TableMode::All => {
                let mut grid = Vec::new();
                for r in def.first_data_row()..=end_row {
                    let mut row_vec = Vec::new();
                    for c in 0..def.width() {
                        row_vec.push(self.tracked_cell_value(
                            def.sheet,
                            def.start_col + c,
                            r,
                            ctx,
                            !is_open,
                        ));
                    }
                    grid.push(row_vec);
                }
                Ok(grid)
            }
            TableMode::Column(name) => {
                let Some(offset) = def.column_offset(&name) else {
                    return Err(ExcelError::new(ExcelErrorKind::Ref));
                };
                let mut grid = Vec::new();
                for r in def.first_data_row()..=end_row {
                    grid.push(vec![self.tracked_cell_value(
                        def.sheet,
                        def.start_col + offset,
                        r,
                        ctx,
                        !is_open,
                    )]);
                }
                Ok(grid)
            }
            TableMode::CurrentRowColumn(name) => {
                let Some(offset) = def.column_offset(&name) else {
                    return Err(ExcelError::new(ExcelErrorKind::Ref));
                };
                let value =
                    self.tracked_cell_value(def.sheet, def.start_col + offset, ctx.current.row, ctx, true);
                Ok(vec![vec![value]])
            }
        }
    }

    fn materialize_reference(
        &mut self,
        reference: &ReferenceType,
        ctx: &mut EvaluationContext,
    ) -> Result<Vec<Vec<LiteralValue>>, ExcelError> {
        match reference {
            ReferenceType::Cell { sheet, row, col } => {
                let sheet_id = self.resolve_sheet(sheet, ctx.current.sheet)?;
                Ok(vec![vec![self.tracked_cell_value(sheet_id, *col, *row, ctx, true)]])
            }
            ReferenceType::Range {
                sheet,
                start_row,
                start_col,
                end_row,
                end_col,
            } => {
                let sheet_id = self.resolve_sheet(sheet, ctx.current.sheet)?;
                let range = build_range(*start_row, *start_col, *end_row, *end_col);
                let is_open = range.is_open();
                let last_row = self.store.last_row(self.workbook, sheet_id);
                let last_col = self.store.last_col(self.workbook, sheet_id);
                let (sr, sc, er, ec) = range.clamped(last_row, last_col);
                let mut grid = Vec::new();
                for r in sr..=er {
                    let mut row_vec = Vec::new();
                    for c in sc..=ec {
                        row_vec.push(self.tracked_cell_value(sheet_id, c, r, ctx, !is_open));
                    }
                    grid.push(row_vec);
                }
                Ok(grid)
            }
            ReferenceType::Table(table_ref) => self.materialize_table(table_ref, ctx),
            ReferenceType::NamedRange(name) => match self.resolve_named(name, ctx) {
                FunctionEvaluationResult::Value(v) => Ok(vec![vec![v]]),
                FunctionEvaluationResult::Error(e) => Err(e),
                FunctionEvaluationResult::Spilled(s) => Ok(s.rows),
            },
        }
    }
}

fn build_range(
    start_row: Option<u32>,
    start_col: Option<u32>,
    end_row: Option<u32>,
    end_col: Option<u32>,
) -> SpreadsheetRange {
    SpreadsheetRange {
        start_row: start_row.unwrap_or(1),
        start_col: start_col.unwrap_or(1),
        end_row: end_row.map(RangeEnd::Index).unwrap_or(RangeEnd::PosInfinity),
        end_col: end_col.map(RangeEnd::Index).unwrap_or(RangeEnd::PosInfinity),
    }
}

impl<S: WorkbookStore> NodeEvaluator for Evaluator<S> {
    fn eval_node(&mut self, node: &ASTNode, ctx: &mut EvaluationContext) -> FunctionEvaluationResult {
        match &node.node_type {
            ASTNodeType::Literal(v) => FunctionEvaluationResult::value(v.clone()),
            ASTNodeType::UnaryOp { op, expr } => match eval_scalar(expr, ctx, self) {
                Ok(v) => FunctionEvaluationResult::value(crate::ops::unary_op(op, v)),
                Err(e) => FunctionEvaluationResult::error(e),
            },
            ASTNodeType::BinaryOp { op, left, right } => {
                let l_result = self.eval_node(left, ctx);
                if let FunctionEvaluationResult::Error(e) = &l_result {
                    return FunctionEvaluationResult::error(e.clone());
                }
                let r_result = self.eval_node(right, ctx);
                if let FunctionEvaluationResult::Error(e) = &r_result {
                    return FunctionEvaluationResult::error(e.clone());
                }
                let l_grid = function_result_grid(l_result);
                let r_grid = function_result_grid(r_result);
                if l_grid.len() == 1
                    && l_grid[0].len() == 1
                    && r_grid.len() == 1
                    && r_grid[0].len() == 1
                {
                    FunctionEvaluationResult::value(crate::ops::binary_op(
                        op,
                        l_grid[0][0].clone(),
                        r_grid[0][0].clone(),
                    ))
                } else {
                    match broadcast_binary(op, l_grid, r_grid) {
                        Ok(grid) => FunctionEvaluationResult::value(LiteralValue::Array(grid)),
                        Err(e) => FunctionEvaluationResult::error(e),
                    }
                }
            }
            ASTNodeType::Function { name, args } => {
                let functions = Rc::clone(&self.functions);
                functions.call(name, args, ctx, self)
            }
            ASTNodeType::Reference { reference, .. } => match reference {
                ReferenceType::Cell { sheet, row, col } => {
                    let sheet_id = match self.resolve_sheet(sheet, ctx.current.sheet) {
                        Ok(s) => s,
                        Err(e) => return FunctionEvaluationResult::error(e),
                    };
                    FunctionEvaluationResult::value(self.tracked_cell_value(sheet_id, *col, *row, ctx, true))
                }
                _ => match self.materialize_reference(reference, ctx) {
                    Ok(grid) if grid.len() == 1 && grid[0].len() == 1 => {
                        FunctionEvaluationResult::value(grid[0][0].clone())
                    }
                    Ok(grid) => FunctionEvaluationResult::Spilled(SpilledValues::new(grid)),
                    Err(e) => FunctionEvaluationResult::error(e),
                },
            },
            ASTNodeType::Array(rows) => {
                let mut grid = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut row_vec = Vec::with_capacity(row.len());
                    for cell in row {
                        match eval_scalar(cell, ctx, self) {
                            Ok(v) => row_vec.push(v),
                            Err(e) => return FunctionEvaluationResult::error(e),
                        }
                    }
                    grid.push(row_vec);
                }
                FunctionEvaluationResult::value(LiteralValue::Array(grid))
            }
        }
    }

    fn eval_range_arg(
        &mut self,
        node: &ASTNode,
        ctx: &mut EvaluationContext,
    ) -> Result<Vec<Vec<LiteralValue>>, ExcelError> {
        match &node.node_type {
            ASTNodeType::Reference { reference, .. } => self.materialize_reference(reference, ctx),
            ASTNodeType::Array(rows) => {
                let mut grid = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut row_vec = Vec::with_capacity(row.len());
                    for cell in row {
                        row_vec.push(eval_scalar(cell, ctx, self)?);
                    }
                    grid.push(row_vec);
                }
                Ok(grid)
            }
            _ => match self.eval_node(node, ctx) {
                FunctionEvaluationResult::Value(v) => Ok(vec![vec![v]]),
                FunctionEvaluationResult::Error(e) => Err(e),
                FunctionEvaluationResult::Spilled(s) => Ok(s.rows),
            },
        }
    }
}

#[allow(unused_imports)]
use TableRowSpecifier as _TableRowSpecifierUsedForDocs;

/// Reduce a non-error function result to its grid form: a 1x1 grid for a
/// plain scalar, the underlying rows for an array or spilled result.
fn function_result_grid(result: FunctionEvaluationResult) -> Vec<Vec<LiteralValue>> {
    match result {
        FunctionEvaluationResult::Value(LiteralValue::Array(g)) => g,
        FunctionEvaluationResult::Spilled(s) => s.rows,
        FunctionEvaluationResult::Value(v) => vec![vec![v]],
        FunctionEvaluationResult::Error(e) => vec![vec![LiteralValue::Error(e)]],
    }
}

/// Elementwise binary op across two grids, broadcasting a 1x1 side against
/// the other's shape (spec §4.A "dynamic array arithmetic"). Mismatched
/// non-scalar shapes are a `#VALUE!`, matching Excel's own behavior.
fn broadcast_binary(
    op: &str,
    l: Vec<Vec<LiteralValue>>,
    r: Vec<Vec<LiteralValue>>,
) -> Result<Vec<Vec<LiteralValue>>, ExcelError> {
    let l_scalar = l.len() == 1 && l[0].len() == 1;
    let r_scalar = r.len() == 1 && r[0].len() == 1;

    if r_scalar {
        let rv = r[0][0].clone();
        return Ok(l
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| crate::ops::binary_op(op, v, rv.clone()))
                    .collect()
            })
            .collect());
    }
    if l_scalar {
        let lv = l[0][0].clone();
        return Ok(r
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| crate::ops::binary_op(op, lv.clone(), v))
                    .collect()
            })
            .collect());
    }
    if l.len() == r.len() && l.iter().zip(&r).all(|(a, b)| a.len() == b.len()) {
        return Ok(l
            .into_iter()
            .zip(r)
            .map(|(lr, rr)| {
                lr.into_iter()
                    .zip(rr)
                    .map(|(a, b)| crate::ops::binary_op(op, a, b))
                    .collect()
            })
            .collect());
    }
    Err(ExcelError::new(ExcelErrorKind::Value).with_message("array shapes do not match"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableDef;
    use crate::testing::TestWorkbook;

    fn wb_with_sheet() -> (TestWorkbook, u32) {
        let mut wb = TestWorkbook::new();
        let sheet = wb.add_sheet("Sheet1");
        (wb, sheet)
    }

    #[test]
    fn arithmetic_with_references() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_number(sheet, 1, 1, 2.0);
        wb.set_number(sheet, 1, 2, 3.0);
        wb.set_formula(sheet, 1, 3, "A1+A2*2");
        let mut ev = Evaluator::new(1, wb);
        assert_eq!(ev.get_cell_value(sheet, 1, 3), LiteralValue::Int(8));
    }

    #[test]
    fn find_left_composition() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_text(sheet, 1, 1, "apple,banana");
        wb.set_formula(sheet, 1, 2, "LEFT(A1,FIND(\",\",A1)-1)");
        let mut ev = Evaluator::new(1, wb);
        assert_eq!(
            ev.get_cell_value(sheet, 1, 2),
            LiteralValue::Text("apple".into())
        );
    }

    #[test]
    fn spill_covers_neighboring_cells() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_formula(sheet, 1, 1, "INDEX({1,2;3,4},0,0)");
        let mut ev = Evaluator::new(1, wb);
        assert_eq!(ev.get_cell_value(sheet, 1, 1), LiteralValue::Number(1.0));
        assert_eq!(ev.get_cell_value(sheet, 2, 1), LiteralValue::Number(2.0));
        assert_eq!(ev.get_cell_value(sheet, 1, 2), LiteralValue::Number(3.0));
        assert_eq!(ev.get_cell_value(sheet, 2, 2), LiteralValue::Number(4.0));
    }

    #[test]
    fn spill_blocked_by_occupied_cell_reports_spill_error() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_formula(sheet, 1, 1, "INDEX({1,2;3,4},0,0)");
        wb.set_number(sheet, 2, 2, 99.0);
        let mut ev = Evaluator::new(1, wb);
        let result = ev.evaluate_cell(sheet, 1, 1);
        assert!(matches!(
            result,
            SingleEvaluationResult::Error(e) if e.kind == ExcelErrorKind::Spill
        ));
    }

    #[test]
    fn direct_self_reference_is_a_cycle() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_formula(sheet, 1, 1, "A1+1");
        let mut ev = Evaluator::new(1, wb);
        let result = ev.evaluate_cell(sheet, 1, 1);
        assert!(matches!(
            result,
            SingleEvaluationResult::Error(e) if e.kind == ExcelErrorKind::Cycle
        ));
    }

    #[test]
    fn mutual_cycle_poisons_both_cells() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_formula(sheet, 1, 1, "A2");
        wb.set_formula(sheet, 1, 2, "A1");
        let mut ev = Evaluator::new(1, wb);
        let a1 = ev.evaluate_cell(sheet, 1, 1);
        assert!(matches!(
            a1,
            SingleEvaluationResult::Error(e) if e.kind == ExcelErrorKind::Cycle
        ));
    }

    #[test]
    fn named_expression_resolves_relative_to_caller() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_number(sheet, 1, 1, 10.0);
        wb.set_number(sheet, 1, 2, 20.0);
        wb.add_global_name("DOUBLE_LEFT", "A1*2");
        wb.set_formula(sheet, 2, 1, "DOUBLE_LEFT");
        wb.set_formula(sheet, 2, 2, "DOUBLE_LEFT");
        let mut ev = Evaluator::new(1, wb);
        assert_eq!(ev.get_cell_value(sheet, 2, 1), LiteralValue::Int(20));
        assert_eq!(ev.get_cell_value(sheet, 2, 2), LiteralValue::Int(20));
    }

    #[test]
    fn table_column_structured_reference() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_text(sheet, 1, 1, "Name");
        wb.set_text(sheet, 2, 1, "Price");
        wb.set_text(sheet, 1, 2, "Widget");
        wb.set_number(sheet, 2, 2, 9.0);
        wb.set_text(sheet, 1, 3, "Gadget");
        wb.set_number(sheet, 2, 3, 15.0);
        wb.add_table(TableDef {
            name: "Products".into(),
            sheet,
            start_col: 1,
            start_row: 1,
            headers: vec![("Name".into(), 0), ("Price".into(), 1)],
            end_row: RangeEnd::Index(3),
        });
        wb.set_formula(sheet, 4, 2, "Products[@Price]*2");
        let mut ev = Evaluator::new(1, wb);
        assert_eq!(ev.get_cell_value(sheet, 4, 2), LiteralValue::Int(18));
    }

    #[test]
    fn open_ended_column_reference_is_a_frontier_dependency() {
        let (mut wb, sheet) = wb_with_sheet();
        wb.set_number(sheet, 1, 1, 1.0);
        wb.set_number(sheet, 1, 2, 2.0);
        wb.set_formula(sheet, 2, 1, "SUM(A:A)");
        let mut ev = Evaluator::new(1, wb);
        assert_eq!(ev.get_cell_value(sheet, 2, 1), LiteralValue::Int(3));
        let key = DepNode::cell(1, sheet, 2, 1).key();
        let record = ev.graph.get(&key).unwrap();
        assert!(!record.frontier_deps.is_empty());
    }
}
