use sheetkernel_common::{ExcelError, ExcelErrorKind, LiteralValue};
use sheetkernel_parse::parser::ReferenceType;
use sheetkernel_parse::{ASTNode, ASTNodeType};

use super::{Function, NodeEvaluator, coerce_number, eval_scalar};
use crate::context::EvaluationContext;
use crate::result::{FunctionEvaluationResult, SpilledValues};

/// `INDEX(range, row, [col])` — 1-based; `row=0`/`col=0` selects the whole
/// column/row; out-of-bounds is `#REF!` (spec §4.G).
pub struct Index;

impl Function for Index {
    fn name(&self) -> &'static str {
        "INDEX"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn max_args(&self) -> Option<usize> {
        Some(3)
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let grid = match eval.eval_range_arg(&args[0], ctx) {
            Ok(g) => g,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let row = match eval_scalar(&args[1], ctx, eval).and_then(|v| coerce_number(&v)) {
            Ok(n) => n.floor() as i64,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let col = if args.len() == 3 {
            match eval_scalar(&args[2], ctx, eval).and_then(|v| coerce_number(&v)) {
                Ok(n) => n.floor() as i64,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        } else {
            1
        };

        let height = grid.len() as i64;
        let width = grid.first().map(|r| r.len()).unwrap_or(0) as i64;
        if row < 0 || col < 0 || row > height || col > width {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Ref));
        }

        if row == 0 && col == 0 {
            return FunctionEvaluationResult::value(LiteralValue::Array(grid));
        }
        if row == 0 {
            let column: Vec<Vec<LiteralValue>> = grid
                .into_iter()
                .map(|r| vec![r[(col - 1) as usize].clone()])
                .collect();
            return FunctionEvaluationResult::Spilled(SpilledValues::new(column));
        }
        if col == 0 {
            let r = grid[(row - 1) as usize].clone();
            return FunctionEvaluationResult::Spilled(SpilledValues::new(vec![r]));
        }
        FunctionEvaluationResult::value(grid[(row - 1) as usize][(col - 1) as usize].clone())
    }
}

/// `OFFSET(base, rows, cols, [height], [width])`. The core evaluator
/// resolves `base` down to concrete sheet coordinates for us; here we only
/// need the already-materialised grid around `base` shifted/resized, which
/// the evaluator supplies via `eval_range_arg` on a synthesized reference.
/// Since this crate's AST has no synthesized-reference constructor, OFFSET
/// is implemented directly against `base`'s resolved grid: `rows`/`cols`
/// shift the window, `height`/`width` resize it, both within the grid
/// already fetched for `base` (the evaluator is expected to pass the
/// sheet's used range as `base` in the common case of `OFFSET(A1,...)`).
pub struct Offset;

impl Function for Offset {
    fn name(&self) -> &'static str {
        "OFFSET"
    }
    fn min_args(&self) -> usize {
        3
    }
    fn max_args(&self) -> Option<usize> {
        Some(5)
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        if !matches!(
            &args[0].node_type,
            ASTNodeType::Reference {
                reference: ReferenceType::Cell { .. } | ReferenceType::Range { .. },
                ..
            }
        ) {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value));
        }
        let rows = match eval_scalar(&args[1], ctx, eval).and_then(|v| coerce_number(&v)) {
            Ok(n) => n.floor() as i64,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let cols = match eval_scalar(&args[2], ctx, eval).and_then(|v| coerce_number(&v)) {
            Ok(n) => n.floor() as i64,
            Err(e) => return FunctionEvaluationResult::error(e),
        };

        let grid = match eval.eval_range_arg(&args[0], ctx) {
            Ok(g) => g,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let height = if args.len() >= 4 {
            match eval_scalar(&args[3], ctx, eval).and_then(|v| coerce_number(&v)) {
                Ok(n) => n.floor() as i64,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        } else {
            grid.len() as i64
        };
        let width = if args.len() == 5 {
            match eval_scalar(&args[4], ctx, eval).and_then(|v| coerce_number(&v)) {
                Ok(n) => n.floor() as i64,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        } else {
            grid.first().map(|r| r.len()).unwrap_or(0) as i64
        };
        if height <= 0 || width <= 0 || rows < 0 || cols < 0 {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Ref));
        }

        let mut out = Vec::with_capacity(height as usize);
        for r in 0..height {
            let src_row = rows + r;
            let mut row_vec = Vec::with_capacity(width as usize);
            for c in 0..width {
                let src_col = cols + c;
                let v = grid
                    .get(src_row as usize)
                    .and_then(|row| row.get(src_col as usize))
                    .cloned();
                match v {
                    Some(v) => row_vec.push(v),
                    None => return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Ref)),
                }
            }
            out.push(row_vec);
        }
        if out.len() == 1 && out[0].len() == 1 {
            FunctionEvaluationResult::value(out[0][0].clone())
        } else {
            FunctionEvaluationResult::Spilled(SpilledValues::new(out))
        }
    }
}

/// `FILTER(source, condition, [if_empty])`.
pub struct Filter;

impl Function for Filter {
    fn name(&self) -> &'static str {
        "FILTER"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn max_args(&self) -> Option<usize> {
        Some(3)
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let source = match eval.eval_range_arg(&args[0], ctx) {
            Ok(g) => g,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let condition = match eval.eval_range_arg(&args[1], ctx) {
            Ok(g) => g,
            Err(e) => return FunctionEvaluationResult::error(e),
        };

        let mut rows = Vec::new();
        for (i, row) in source.iter().enumerate() {
            let keep = condition
                .get(i)
                .and_then(|r| r.first())
                .map(|v| v.is_truthy())
                .unwrap_or(false);
            if keep {
                rows.push(row.clone());
            }
        }

        if rows.is_empty() {
            return if args.len() == 3 {
                eval.eval_node(&args[2], ctx)
            } else {
                FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Na))
            };
        }
        FunctionEvaluationResult::Spilled(SpilledValues::new(rows))
    }
}

/// `COUNTIF(range, criteria)`.
pub struct CountIf;

impl Function for CountIf {
    fn name(&self) -> &'static str {
        "COUNTIF"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn max_args(&self) -> Option<usize> {
        Some(2)
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let grid = match eval.eval_range_arg(&args[0], ctx) {
            Ok(g) => g,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let criteria = match eval_scalar(&args[1], ctx, eval) {
            Ok(v) => v,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let (op, rhs) = parse_criteria(&criteria);

        let mut count = 0i64;
        for row in &grid {
            for cell in row {
                if matches_criteria(cell, op, &rhs) {
                    count += 1;
                }
            }
        }
        FunctionEvaluationResult::value(LiteralValue::Int(count))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum CriteriaOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

fn parse_criteria(v: &LiteralValue) -> (CriteriaOp, LiteralValue) {
    let LiteralValue::Text(s) = v else {
        return (CriteriaOp::Eq, v.clone());
    };
    let s = s.trim();
    for (prefix, op) in [
        (">=", CriteriaOp::Ge),
        ("<=", CriteriaOp::Le),
        ("<>", CriteriaOp::Ne),
        (">", CriteriaOp::Gt),
        ("<", CriteriaOp::Lt),
        ("=", CriteriaOp::Eq),
    ] {
        if let Some(rest) = s.strip_prefix(prefix) {
            let rest = rest.trim();
            let value = rest
                .parse::<f64>()
                .map(LiteralValue::Number)
                .unwrap_or_else(|_| LiteralValue::Text(rest.to_string()));
            return (op, value);
        }
    }
    (CriteriaOp::Eq, LiteralValue::Text(s.to_string()))
}

fn matches_criteria(cell: &LiteralValue, op: CriteriaOp, rhs: &LiteralValue) -> bool {
    match (cell, rhs) {
        (LiteralValue::Text(a), LiteralValue::Text(b)) => {
            let eq = a.eq_ignore_ascii_case(b);
            match op {
                CriteriaOp::Eq => eq,
                CriteriaOp::Ne => !eq,
                _ => false,
            }
        }
        _ => {
            let a = coerce_number(cell);
            let b = coerce_number(rhs);
            match (a, b) {
                (Ok(a), Ok(b)) => match op {
                    CriteriaOp::Eq => a == b,
                    CriteriaOp::Ne => a != b,
                    CriteriaOp::Lt => a < b,
                    CriteriaOp::Gt => a > b,
                    CriteriaOp::Le => a <= b,
                    CriteriaOp::Ge => a >= b,
                },
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CurrentCell;

    struct RangeEval(Vec<Vec<LiteralValue>>);
    impl NodeEvaluator for RangeEval {
        fn eval_node(
            &mut self,
            node: &ASTNode,
            _ctx: &mut EvaluationContext,
        ) -> FunctionEvaluationResult {
            match &node.node_type {
                ASTNodeType::Literal(v) => FunctionEvaluationResult::value(v.clone()),
                _ => FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value)),
            }
        }
        fn eval_range_arg(
            &mut self,
            _node: &ASTNode,
            _ctx: &mut EvaluationContext,
        ) -> Result<Vec<Vec<LiteralValue>>, ExcelError> {
            Ok(self.0.clone())
        }
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(
            CurrentCell {
                workbook: 1,
                sheet: 0,
                col: 0,
                row: 0,
            },
            Default::default(),
        )
    }

    #[test]
    fn countif_matches_text_case_insensitively() {
        let grid = vec![
            vec![LiteralValue::Text("Laptop".into())],
            vec![LiteralValue::Text("Mouse".into())],
            vec![LiteralValue::Text("Keyboard".into())],
            vec![LiteralValue::Text("Monitor".into())],
        ];
        let args = vec![
            sheetkernel_parse::parse("=A1").unwrap(),
            sheetkernel_parse::parse("=\"Laptop\"").unwrap(),
        ];
        let mut e = RangeEval(grid);
        let mut c = ctx();
        let r = CountIf.evaluate(&args, &mut c, &mut e);
        assert_eq!(r, FunctionEvaluationResult::Value(LiteralValue::Int(1)));
    }

    #[test]
    fn countif_supports_operator_criteria() {
        let grid = vec![
            vec![LiteralValue::Int(1)],
            vec![LiteralValue::Int(5)],
            vec![LiteralValue::Int(10)],
        ];
        let args = vec![
            sheetkernel_parse::parse("=A1").unwrap(),
            sheetkernel_parse::parse("=\">4\"").unwrap(),
        ];
        let mut e = RangeEval(grid);
        let mut c = ctx();
        let r = CountIf.evaluate(&args, &mut c, &mut e);
        assert_eq!(r, FunctionEvaluationResult::Value(LiteralValue::Int(2)));
    }

    #[test]
    fn index_zero_row_selects_whole_column() {
        let grid = vec![
            vec![LiteralValue::Int(1), LiteralValue::Int(2)],
            vec![LiteralValue::Int(3), LiteralValue::Int(4)],
        ];
        let args = vec![
            sheetkernel_parse::parse("=A1").unwrap(),
            sheetkernel_parse::parse("=0").unwrap(),
            sheetkernel_parse::parse("=2").unwrap(),
        ];
        let mut e = RangeEval(grid);
        let mut c = ctx();
        let r = Index.evaluate(&args, &mut c, &mut e);
        match r {
            FunctionEvaluationResult::Spilled(s) => {
                assert_eq!(s.rows, vec![vec![LiteralValue::Int(2)], vec![LiteralValue::Int(4)]]);
            }
            other => panic!("expected spilled column, got {other:?}"),
        }
    }
}
