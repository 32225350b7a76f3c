//! Single-threaded, synchronous formula evaluation kernel: dependency graph,
//! cache, spill registry, cycle detection, and the built-in function library.

pub mod context;
pub mod evaluator;
pub mod functions;
pub mod graph;
pub mod key;
pub mod ops;
pub mod result;
pub mod spill;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use context::{CurrentCell, EvaluationContext};
pub use evaluator::Evaluator;
pub use functions::{Function, FunctionRegistry, NodeEvaluator};
pub use graph::{DependencyGraph, NodeRecord};
pub use key::{DepNode, NameScope, TableMode, WorkbookId};
pub use result::{FunctionEvaluationResult, SingleEvaluationResult, SpilledValues};
pub use spill::{CellAddr, SpillRegistry};
pub use store::{CellContent, CellStore, NamedExpressionResolver, TableCatalog, TableDef, WorkbookStore};
