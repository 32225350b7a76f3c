use sheetkernel_common::LiteralValue;
use sheetkernel_parse::ASTNode;

use super::{Function, NodeEvaluator};
use crate::context::EvaluationContext;
use crate::result::FunctionEvaluationResult;

/// `SUM(arg1, arg2, ...)` — numbers only; text/booleans inside ranges are
/// ignored, errors propagate (spec §4.G).
pub struct Sum;

impl Function for Sum {
    fn name(&self) -> &'static str {
        "SUM"
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
        let mut total = 0.0;
        for arg in args {
            match eval.eval_range_arg(arg, ctx) {
                Ok(grid) => {
                    for row in grid {
                        for cell in row {
                            match cell {
                                LiteralValue::Error(e) => {
                                    return FunctionEvaluationResult::error(e);
                                }
                                LiteralValue::Int(i) => total += i as f64,
                                LiteralValue::Number(n) => total += n,
                                _ => {}
                            }
                        }
                    }
                }
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        }
        FunctionEvaluationResult::value(wrap(total))
    }
}

fn wrap(n: f64) -> LiteralValue {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        LiteralValue::Int(n as i64)
    } else {
        LiteralValue::Number(n)
    }
}
