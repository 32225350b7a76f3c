use sheetkernel_common::{ExcelError, ExcelErrorKind, LiteralValue};
use sheetkernel_parse::ASTNode;

use super::{Function, NodeEvaluator, eval_scalar, truthy_for_logical};
use crate::context::EvaluationContext;
use crate::result::FunctionEvaluationResult;

/// `IF(condition, then, [else])`.
pub struct If;

impl Function for If {
    fn name(&self) -> &'static str {
        "IF"
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
        let cond = match eval_scalar(&args[0], ctx, eval).and_then(|v| truthy_for_logical(&v)) {
            Ok(b) => b,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        if cond {
            eval.eval_node(&args[1], ctx)
        } else if args.len() == 3 {
            eval.eval_node(&args[2], ctx)
        } else {
            FunctionEvaluationResult::value(LiteralValue::Boolean(false))
        }
    }
}

/// `AND(arg1, arg2, ...)`.
pub struct And;

impl Function for And {
    fn name(&self) -> &'static str {
        "AND"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        None
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let mut result = true;
        for arg in args {
            match eval_scalar(arg, ctx, eval).and_then(|v| truthy_for_logical(&v)) {
                Ok(b) => result &= b,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        }
        FunctionEvaluationResult::value(LiteralValue::Boolean(result))
    }
}

/// `OR(arg1, arg2, ...)`.
pub struct Or;

impl Function for Or {
    fn name(&self) -> &'static str {
        "OR"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        None
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let mut result = false;
        for arg in args {
            match eval_scalar(arg, ctx, eval).and_then(|v| truthy_for_logical(&v)) {
                Ok(b) => result |= b,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        }
        FunctionEvaluationResult::value(LiteralValue::Boolean(result))
    }
}

/// `NOT(arg)`.
pub struct Not;

impl Function for Not {
    fn name(&self) -> &'static str {
        "NOT"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        match eval_scalar(&args[0], ctx, eval).and_then(|v| truthy_for_logical(&v)) {
            Ok(b) => FunctionEvaluationResult::value(LiteralValue::Boolean(!b)),
            Err(e) => FunctionEvaluationResult::error(e),
        }
    }
}

/// `NA()`.
pub struct Na;

impl Function for Na {
    fn name(&self) -> &'static str {
        "NA"
    }
    fn min_args(&self) -> usize {
        0
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }

    fn evaluate(
        &self,
        _args: &[ASTNode],
        _ctx: &mut EvaluationContext,
        _eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Na))
    }
}

/// `ISERROR(value)` — the one function allowed to intercept any error.
pub struct IsError;

impl Function for IsError {
    fn name(&self) -> &'static str {
        "ISERROR"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let is_err = eval.eval_node(&args[0], ctx).is_error();
        FunctionEvaluationResult::value(LiteralValue::Boolean(is_err))
    }
}

/// `ISNA(value)` — true only for `#N/A`.
pub struct IsNa;

impl Function for IsNa {
    fn name(&self) -> &'static str {
        "ISNA"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let is_na = matches!(
            eval.eval_node(&args[0], ctx),
            FunctionEvaluationResult::Error(ref e) if e.kind == ExcelErrorKind::Na
        );
        FunctionEvaluationResult::value(LiteralValue::Boolean(is_na))
    }
}

/// `IFERROR(value, fallback)` — the other function allowed to intercept
/// errors.
pub struct IfError;

impl Function for IfError {
    fn name(&self) -> &'static str {
        "IFERROR"
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
        let primary = eval.eval_node(&args[0], ctx);
        if primary.is_error() {
            eval.eval_node(&args[1], ctx)
        } else {
            primary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CurrentCell;
    use sheetkernel_parse::{ASTNodeType, parse};

    struct NoopEval;
    impl NodeEvaluator for NoopEval {
        fn eval_node(
            &mut self,
            node: &ASTNode,
            _ctx: &mut EvaluationContext,
        ) -> FunctionEvaluationResult {
            match &node.node_type {
                ASTNodeType::Literal(v) => FunctionEvaluationResult::value(v.clone()),
                ASTNodeType::Function { name, args } if name.eq_ignore_ascii_case("NA") => {
                    let _ = args;
                    FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Na))
                }
                _ => FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value)),
            }
        }
        fn eval_range_arg(
            &mut self,
            _node: &ASTNode,
            _ctx: &mut EvaluationContext,
        ) -> Result<Vec<Vec<LiteralValue>>, ExcelError> {
            Err(ExcelError::new(ExcelErrorKind::Value))
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
    fn if_picks_branch_by_truthiness() {
        let args = vec![parse("=TRUE").unwrap(), parse("=1").unwrap(), parse("=2").unwrap()];
        let mut e = NoopEval;
        let mut c = ctx();
        let r = If.evaluate(&args, &mut c, &mut e);
        assert_eq!(r, FunctionEvaluationResult::Value(LiteralValue::Number(1.0)));
    }

    #[test]
    fn iferror_intercepts_only_error_branch() {
        let args = vec![parse("=NA()").unwrap(), parse("=\"fallback\"").unwrap()];
        let mut e = NoopEval;
        let mut c = ctx();
        let r = IfError.evaluate(&args, &mut c, &mut e);
        assert_eq!(
            r,
            FunctionEvaluationResult::Value(LiteralValue::Text("fallback".into()))
        );
    }
}
