//! Facade-level configuration. A plain, `Default`-able struct passed at
//! construction rather than loaded from a file.

/// In-process configuration for a [`crate::Workbook`].
#[derive(Debug, Clone)]
pub struct WorkbookConfig {
    /// Cap on the spill invalidation-and-recompute cascade depth, guarding
    /// against runaway recomputation in pathological dependency graphs.
    pub recalculation_iteration_cap: u32,
    /// Whether `get_cell_value` appends the error's message to its code
    /// when the caller doesn't pass an explicit `debug` flag.
    pub debug_errors_by_default: bool,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        WorkbookConfig {
            recalculation_iteration_cap: 8,
            debug_errors_by_default: false,
        }
    }
}
