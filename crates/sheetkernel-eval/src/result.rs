//! The `value | error | spilled-values` union (spec §3 "Evaluation result",
//! §9 "Polymorphism of evaluation results").

use sheetkernel_common::{ExcelError, LiteralValue, SpreadsheetRange};

/// A result that is never `spilled-values` — the flattened form consumed at
/// cell boundaries (a single cached cell always holds one of these).
#[derive(Debug, Clone, PartialEq)]
pub enum SingleEvaluationResult {
    Value(LiteralValue),
    Error(ExcelError),
}

impl SingleEvaluationResult {
    pub fn is_error(&self) -> bool {
        matches!(self, SingleEvaluationResult::Error(_))
    }

    pub fn into_literal(self) -> LiteralValue {
        match self {
            SingleEvaluationResult::Value(v) => v,
            SingleEvaluationResult::Error(e) => LiteralValue::Error(e),
        }
    }

    pub fn as_literal(&self) -> LiteralValue {
        match self {
            SingleEvaluationResult::Value(v) => v.clone(),
            SingleEvaluationResult::Error(e) => LiteralValue::Error(e.clone()),
        }
    }
}

impl From<LiteralValue> for SingleEvaluationResult {
    fn from(value: LiteralValue) -> Self {
        match value {
            LiteralValue::Error(e) => SingleEvaluationResult::Error(e),
            other => SingleEvaluationResult::Value(other),
        }
    }
}

impl From<ExcelError> for SingleEvaluationResult {
    fn from(e: ExcelError) -> Self {
        SingleEvaluationResult::Error(e)
    }
}

/// Evaluation result as returned by a function/AST node (component G).
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionEvaluationResult {
    Value(LiteralValue),
    Error(ExcelError),
    /// An array-valued result spilling from its origin. Stored materialised
    /// (`Vec<Vec<LiteralValue>>`) rather than as a boxed closure: the spec's
    /// `spill_area`/`evaluate(offset, ctx)` contract is satisfied by indexing
    /// into the materialised grid, which keeps the cache's record type plain
    /// data instead of `dyn` trait objects holding borrowed evaluator state.
    Spilled(SpilledValues),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpilledValues {
    pub rows: Vec<Vec<LiteralValue>>,
}

impl SpilledValues {
    pub fn new(rows: Vec<Vec<LiteralValue>>) -> Self {
        SpilledValues { rows }
    }

    pub fn height(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn width(&self) -> u32 {
        self.rows.first().map(|r| r.len()).unwrap_or(0) as u32
    }

    pub fn is_single_cell(&self) -> bool {
        self.height() == 1 && self.width() == 1
    }

    pub fn spill_area(&self, origin_row: u32, origin_col: u32) -> SpreadsheetRange {
        let h = self.height().max(1);
        let w = self.width().max(1);
        SpreadsheetRange::finite(
            origin_row,
            origin_col,
            origin_row + h - 1,
            origin_col + w - 1,
        )
    }

    pub fn evaluate(&self, row_offset: u32, col_offset: u32) -> SingleEvaluationResult {
        match self
            .rows
            .get(row_offset as usize)
            .and_then(|r| r.get(col_offset as usize))
        {
            Some(v) => SingleEvaluationResult::from(v.clone()),
            None => SingleEvaluationResult::Value(LiteralValue::Empty),
        }
    }

    /// Flatten to the single top-left value (used where a function consumes
    /// a spilled argument but only ever wants its scalar coercion).
    pub fn top_left(&self) -> LiteralValue {
        self.rows
            .first()
            .and_then(|r| r.first())
            .cloned()
            .unwrap_or(LiteralValue::Empty)
    }
}

impl FunctionEvaluationResult {
    pub fn error(e: ExcelError) -> Self {
        FunctionEvaluationResult::Error(e)
    }

    pub fn value(v: LiteralValue) -> Self {
        match v {
            LiteralValue::Error(e) => FunctionEvaluationResult::Error(e),
            other => FunctionEvaluationResult::Value(other),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FunctionEvaluationResult::Error(_))
    }

    /// Flatten to a `SingleEvaluationResult`, taking the spilled origin's
    /// top-left value per spec §3 ("flattened at the boundary").
    pub fn flatten(self) -> SingleEvaluationResult {
        match self {
            FunctionEvaluationResult::Value(v) => SingleEvaluationResult::from(v),
            FunctionEvaluationResult::Error(e) => SingleEvaluationResult::Error(e),
            FunctionEvaluationResult::Spilled(s) => SingleEvaluationResult::from(s.top_left()),
        }
    }
}

impl From<LiteralValue> for FunctionEvaluationResult {
    fn from(v: LiteralValue) -> Self {
        FunctionEvaluationResult::value(v)
    }
}

impl From<ExcelError> for FunctionEvaluationResult {
    fn from(e: ExcelError) -> Self {
        FunctionEvaluationResult::Error(e)
    }
}

impl From<SingleEvaluationResult> for FunctionEvaluationResult {
    fn from(r: SingleEvaluationResult) -> Self {
        match r {
            SingleEvaluationResult::Value(v) => FunctionEvaluationResult::Value(v),
            SingleEvaluationResult::Error(e) => FunctionEvaluationResult::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetkernel_common::ExcelErrorKind;

    #[test]
    fn flatten_takes_top_left_of_spill() {
        let spill = SpilledValues::new(vec![
            vec![LiteralValue::Int(1), LiteralValue::Int(2)],
            vec![LiteralValue::Int(3), LiteralValue::Int(4)],
        ]);
        let result = FunctionEvaluationResult::Spilled(spill);
        assert_eq!(
            result.flatten(),
            SingleEvaluationResult::Value(LiteralValue::Int(1))
        );
    }

    #[test]
    fn spill_area_is_relative_to_origin() {
        let spill = SpilledValues::new(vec![
            vec![LiteralValue::Int(1), LiteralValue::Int(2)],
            vec![LiteralValue::Int(3), LiteralValue::Int(4)],
        ]);
        let area = spill.spill_area(2, 3);
        assert_eq!(area, SpreadsheetRange::finite(2, 3, 3, 4));
    }

    #[test]
    fn error_short_circuits_flatten() {
        let result = FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value));
        assert!(result.flatten().is_error());
    }
}
