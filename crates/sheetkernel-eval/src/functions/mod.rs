//! Built-in function library (component G): a map from uppercase name to a
//! small trait object, each evaluating its own argument ASTs via the
//! evaluator passed in as a [`NodeEvaluator`].

mod logical;
mod lookup;
mod math;
mod text;

use rustc_hash::FxHashMap;
use sheetkernel_common::{ExcelError, ExcelErrorKind, LiteralValue};
use sheetkernel_parse::ASTNode;

use crate::context::EvaluationContext;
use crate::result::FunctionEvaluationResult;

/// The callback surface a function body uses to recurse into its own
/// argument nodes without knowing anything about the evaluator's cache,
/// graph, or spill registry (spec §9 "the evaluator as a context object").
pub trait NodeEvaluator {
    fn eval_node(
        &mut self,
        node: &ASTNode,
        ctx: &mut EvaluationContext,
    ) -> FunctionEvaluationResult;

    /// Materialise a reference/range argument to a 2D grid of values,
    /// flattening any nested spill. Used by functions whose semantics need
    /// the whole range rather than a single flattened scalar (SUM, COUNTIF,
    /// INDEX, FILTER).
    fn eval_range_arg(
        &mut self,
        node: &ASTNode,
        ctx: &mut EvaluationContext,
    ) -> Result<Vec<Vec<LiteralValue>>, ExcelError>;
}

pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn min_args(&self) -> usize;
    /// `None` means unbounded (variadic).
    fn max_args(&self) -> Option<usize>;

    fn evaluate(
        &self,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult;
}

pub struct FunctionRegistry {
    functions: FxHashMap<&'static str, Box<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut reg = FunctionRegistry {
            functions: FxHashMap::default(),
        };
        reg.register(math::Sum);
        reg.register(text::Find);
        reg.register(text::Left);
        reg.register(text::Right);
        reg.register(text::Mid);
        reg.register(text::Len);
        reg.register(logical::If);
        reg.register(logical::And);
        reg.register(logical::Or);
        reg.register(logical::Not);
        reg.register(logical::Na);
        reg.register(logical::IsError);
        reg.register(logical::IsNa);
        reg.register(logical::IfError);
        reg.register(lookup::Index);
        reg.register(lookup::Offset);
        reg.register(lookup::Filter);
        reg.register(lookup::CountIf);
        reg
    }

    pub fn register(&mut self, f: impl Function + 'static) {
        self.functions.insert(f.name(), Box::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Function> {
        self.functions
            .get(name.to_ascii_uppercase().as_str())
            .map(|b| b.as_ref())
    }

    pub fn call(
        &self,
        name: &str,
        args: &[ASTNode],
        ctx: &mut EvaluationContext,
        eval: &mut dyn NodeEvaluator,
    ) -> FunctionEvaluationResult {
        let Some(f) = self.get(name) else {
            return FunctionEvaluationResult::error(
                ExcelError::new(ExcelErrorKind::Name)
                    .with_message(format!("unknown function {name}")),
            );
        };
        if args.len() < f.min_args() || f.max_args().is_some_and(|max| args.len() > max) {
            return FunctionEvaluationResult::error(
                ExcelError::new(ExcelErrorKind::Value)
                    .with_message(format!("wrong number of arguments to {name}")),
            );
        }
        f.evaluate(args, ctx, eval)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Truthiness for logical functions (IF/AND/OR/NOT), spec §4.G: numbers via
/// `!=0`, `"TRUE"`/`"FALSE"` case-insensitively, `""` falsy. Differs from
/// `LiteralValue::is_truthy`, which treats any non-empty text as truthy.
pub fn truthy_for_logical(v: &LiteralValue) -> Result<bool, ExcelError> {
    match v {
        LiteralValue::Boolean(b) => Ok(*b),
        LiteralValue::Int(i) => Ok(*i != 0),
        LiteralValue::Number(n) => Ok(*n != 0.0),
        LiteralValue::Text(s) if s.is_empty() => Ok(false),
        LiteralValue::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        LiteralValue::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        LiteralValue::Error(e) => Err(e.clone()),
        _ => Err(ExcelError::new(ExcelErrorKind::Value)),
    }
}

/// Coerce an evaluated scalar to `f64`, per the strict-but-numeric rules
/// functions like FIND/MID/LEFT/RIGHT use for their numeric arguments.
pub fn coerce_number(v: &LiteralValue) -> Result<f64, ExcelError> {
    match v {
        LiteralValue::Int(i) => Ok(*i as f64),
        LiteralValue::Number(n) => Ok(*n),
        LiteralValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        LiteralValue::Error(e) => Err(e.clone()),
        _ => Err(ExcelError::new(ExcelErrorKind::Value)),
    }
}

pub fn coerce_text(v: &LiteralValue) -> Result<String, ExcelError> {
    match v {
        LiteralValue::Text(s) => Ok(s.clone()),
        LiteralValue::Error(e) => Err(e.clone()),
        LiteralValue::Int(_) | LiteralValue::Number(_) | LiteralValue::Boolean(_) => {
            Ok(v.to_string())
        }
        _ => Err(ExcelError::new(ExcelErrorKind::Value)),
    }
}

/// Evaluate a scalar argument: run the node, flatten any spill to its
/// top-left value, and surface errors directly.
pub fn eval_scalar(
    node: &ASTNode,
    ctx: &mut EvaluationContext,
    eval: &mut dyn NodeEvaluator,
) -> Result<LiteralValue, ExcelError> {
    match eval.eval_node(node, ctx).flatten() {
        crate::result::SingleEvaluationResult::Value(v) => Ok(v),
        crate::result::SingleEvaluationResult::Error(e) => Err(e),
    }
}
