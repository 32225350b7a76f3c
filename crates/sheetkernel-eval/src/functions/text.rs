use sheetkernel_common::{ExcelError, ExcelErrorKind, LiteralValue};
use sheetkernel_parse::ASTNode;

use super::{Function, NodeEvaluator, coerce_number, coerce_text, eval_scalar};
use crate::context::EvaluationContext;
use crate::result::FunctionEvaluationResult;

fn scalar_text(
    node: &ASTNode,
    ctx: &mut EvaluationContext,
    eval: &mut dyn NodeEvaluator,
) -> Result<String, ExcelError> {
    coerce_text(&eval_scalar(node, ctx, eval)?)
}

fn scalar_number(
    node: &ASTNode,
    ctx: &mut EvaluationContext,
    eval: &mut dyn NodeEvaluator,
) -> Result<f64, ExcelError> {
    coerce_number(&eval_scalar(node, ctx, eval)?)
}

/// `FIND(find, within, [start=1])` — 1-based, case-sensitive.
pub struct Find;

impl Function for Find {
    fn name(&self) -> &'static str {
        "FIND"
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
        let find = match scalar_text(&args[0], ctx, eval) {
            Ok(s) => s,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let within = match scalar_text(&args[1], ctx, eval) {
            Ok(s) => s,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let start = if args.len() == 3 {
            match scalar_number(&args[2], ctx, eval) {
                Ok(n) => n.floor() as i64,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        } else {
            1
        };

        let chars: Vec<char> = within.chars().collect();
        if start < 1 || start as usize > chars.len().max(1) {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value));
        }
        if find.is_empty() {
            return FunctionEvaluationResult::value(LiteralValue::Int(1));
        }
        let haystack: String = chars[(start as usize - 1)..].iter().collect();
        match haystack.find(find.as_str()) {
            Some(byte_pos) => {
                let char_pos = haystack[..byte_pos].chars().count();
                FunctionEvaluationResult::value(LiteralValue::Int(
                    start + char_pos as i64,
                ))
            }
            None => FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value)),
        }
    }
}

/// `LEFT(text, [n=1])`.
pub struct Left;

impl Function for Left {
    fn name(&self) -> &'static str {
        "LEFT"
    }
    fn min_args(&self) -> usize {
        1
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
        let text = match scalar_text(&args[0], ctx, eval) {
            Ok(s) => s,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let n = if args.len() == 2 {
            match scalar_number(&args[1], ctx, eval) {
                Ok(n) => n.floor() as i64,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        } else {
            1
        };
        if n < 0 {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value));
        }
        let chars: Vec<char> = text.chars().collect();
        let take = (n as usize).min(chars.len());
        FunctionEvaluationResult::value(LiteralValue::Text(chars[..take].iter().collect()))
    }
}

/// `RIGHT(text, [n=1])`.
pub struct Right;

impl Function for Right {
    fn name(&self) -> &'static str {
        "RIGHT"
    }
    fn min_args(&self) -> usize {
        1
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
        let text = match scalar_text(&args[0], ctx, eval) {
            Ok(s) => s,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let n = if args.len() == 2 {
            match scalar_number(&args[1], ctx, eval) {
                Ok(n) => n.floor() as i64,
                Err(e) => return FunctionEvaluationResult::error(e),
            }
        } else {
            1
        };
        if n < 0 {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value));
        }
        let chars: Vec<char> = text.chars().collect();
        let take = (n as usize).min(chars.len());
        let start = chars.len() - take;
        FunctionEvaluationResult::value(LiteralValue::Text(chars[start..].iter().collect()))
    }
}

/// `MID(text, start, num)`.
pub struct Mid;

impl Function for Mid {
    fn name(&self) -> &'static str {
        "MID"
    }
    fn min_args(&self) -> usize {
        3
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
        let text = match scalar_text(&args[0], ctx, eval) {
            Ok(s) => s,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let start = match scalar_number(&args[1], ctx, eval) {
            Ok(n) => n.floor() as i64,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        let num = match scalar_number(&args[2], ctx, eval) {
            Ok(n) => n.floor() as i64,
            Err(e) => return FunctionEvaluationResult::error(e),
        };
        if start < 1 || num < 0 {
            return FunctionEvaluationResult::error(ExcelError::new(ExcelErrorKind::Value));
        }
        if num == 0 {
            return FunctionEvaluationResult::value(LiteralValue::Text(String::new()));
        }
        let chars: Vec<char> = text.chars().collect();
        let start_idx = (start as usize - 1).min(chars.len());
        let end_idx = (start_idx + num as usize).min(chars.len());
        FunctionEvaluationResult::value(LiteralValue::Text(
            chars[start_idx..end_idx].iter().collect(),
        ))
    }
}

/// `LEN(text)`.
pub struct Len;

impl Function for Len {
    fn name(&self) -> &'static str {
        "LEN"
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
        match scalar_text(&args[0], ctx, eval) {
            Ok(s) => FunctionEvaluationResult::value(LiteralValue::Int(s.chars().count() as i64)),
            Err(e) => FunctionEvaluationResult::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::WorkbookId;
    use sheetkernel_parse::parse;

    struct NoopEval;
    impl NodeEvaluator for NoopEval {
        fn eval_node(
            &mut self,
            node: &ASTNode,
            _ctx: &mut EvaluationContext,
        ) -> FunctionEvaluationResult {
            match &node.node_type {
                sheetkernel_parse::ASTNodeType::Literal(v) => {
                    FunctionEvaluationResult::value(v.clone())
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
            crate::context::CurrentCell {
                workbook: 1 as WorkbookId,
                sheet: 0,
                col: 0,
                row: 0,
            },
            Default::default(),
        )
    }

    #[test]
    fn find_is_one_based() {
        let args = vec![
            parse("=\",\"").unwrap(),
            parse("=\"apple,banana\"").unwrap(),
        ];
        let mut e = NoopEval;
        let mut c = ctx();
        let r = Find.evaluate(&args, &mut c, &mut e);
        assert_eq!(r, FunctionEvaluationResult::Value(LiteralValue::Int(6)));
    }

    #[test]
    fn left_composes_with_find() {
        let args = vec![parse("=\"apple,banana\"").unwrap(), parse("=5").unwrap()];
        let mut e = NoopEval;
        let mut c = ctx();
        let r = Left.evaluate(&args, &mut c, &mut e);
        assert_eq!(
            r,
            FunctionEvaluationResult::Value(LiteralValue::Text("apple".into()))
        );
    }

    #[test]
    fn mid_clamps_and_zero_length() {
        let args = vec![
            parse("=\"hello\"").unwrap(),
            parse("=2").unwrap(),
            parse("=0").unwrap(),
        ];
        let mut e = NoopEval;
        let mut c = ctx();
        let r = Mid.evaluate(&args, &mut c, &mut e);
        assert_eq!(
            r,
            FunctionEvaluationResult::Value(LiteralValue::Text(String::new()))
        );
    }
}
