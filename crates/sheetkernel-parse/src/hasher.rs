//! Hasher used for AST fingerprinting (structural equality / memoization keys).

pub type FormulaHasher = std::collections::hash_map::DefaultHasher;
