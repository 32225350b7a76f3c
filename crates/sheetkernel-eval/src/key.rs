//! Dependency-node key codec (component B): a bijective mapping between
//! [`DepNode`] and the string keys the cache and graph index on.

use std::fmt;

pub type WorkbookId = u32;

/// Scope of a named expression: global to the workbook, or shadowed per sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScope {
    Global,
    Sheet(u32),
}

/// The part of a table a table-slice node resolves against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableMode {
    /// The entire table body (all data rows, all columns).
    All,
    /// A single column, every data row.
    Column(String),
    /// A single column, current-row only (`Table[@col]`).
    CurrentRowColumn(String),
}

impl fmt::Display for TableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableMode::All => write!(f, "all"),
            TableMode::Column(c) => write!(f, "col:{c}"),
            TableMode::CurrentRowColumn(c) => write!(f, "row:{c}"),
        }
    }
}

/// A node in the dependency graph: a cell, a named expression, or a
/// table slice. See spec §3 "Dependency node".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepNode {
    Cell {
        workbook: WorkbookId,
        sheet: u32,
        col: u32,
        row: u32,
    },
    NamedExpression {
        workbook: WorkbookId,
        scope: NameScope,
        name: String,
    },
    TableSlice {
        workbook: WorkbookId,
        table: String,
        mode: TableMode,
    },
}

impl DepNode {
    pub fn cell(workbook: WorkbookId, sheet: u32, col: u32, row: u32) -> Self {
        DepNode::Cell {
            workbook,
            sheet,
            col,
            row,
        }
    }

    /// Encode this node to its canonical string key. Injective by construction:
    /// each field is pipe-delimited and names/table identifiers cannot contain
    /// `|` (rejected upstream at parse time — structured refs and named
    /// expressions share the tokenizer's identifier character set).
    pub fn key(&self) -> String {
        match self {
            DepNode::Cell {
                workbook,
                sheet,
                col,
                row,
            } => format!("C|{workbook}|{sheet}|{col}|{row}"),
            DepNode::NamedExpression {
                workbook,
                scope,
                name,
            } => match scope {
                NameScope::Global => format!("N|{workbook}|g|{name}"),
                NameScope::Sheet(sheet) => format!("N|{workbook}|s{sheet}|{name}"),
            },
            DepNode::TableSlice {
                workbook,
                table,
                mode,
            } => format!("T|{workbook}|{table}|{mode}"),
        }
    }

    /// Reconstruct a node from its key. Used by tests and by diagnostics that
    /// need to go from a cache key back to an addressable node.
    pub fn parse(key: &str) -> Option<DepNode> {
        let (tag, rest) = key.split_once('|')?;
        match tag {
            "C" => {
                let mut f = rest.split('|');
                let workbook: WorkbookId = f.next()?.parse().ok()?;
                let sheet: u32 = f.next()?.parse().ok()?;
                let col: u32 = f.next()?.parse().ok()?;
                let row: u32 = f.next()?.parse().ok()?;
                Some(DepNode::Cell {
                    workbook,
                    sheet,
                    col,
                    row,
                })
            }
            "N" => {
                let mut f = rest.splitn(3, '|');
                let workbook: WorkbookId = f.next()?.parse().ok()?;
                let scope_tag = f.next()?;
                let name = f.next()?.to_string();
                let scope = if scope_tag == "g" {
                    NameScope::Global
                } else {
                    let sheet: u32 = scope_tag.strip_prefix('s')?.parse().ok()?;
                    NameScope::Sheet(sheet)
                };
                Some(DepNode::NamedExpression {
                    workbook,
                    scope,
                    name,
                })
            }
            "T" => {
                let mut f = rest.splitn(3, '|');
                let workbook: WorkbookId = f.next()?.parse().ok()?;
                let table = f.next()?.to_string();
                let mode_tag = f.next()?;
                let mode = if let Some(col) = mode_tag.strip_prefix("col:") {
                    TableMode::Column(col.to_string())
                } else if let Some(col) = mode_tag.strip_prefix("row:") {
                    TableMode::CurrentRowColumn(col.to_string())
                } else {
                    TableMode::All
                };
                Some(DepNode::TableSlice {
                    workbook,
                    table,
                    mode,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_key_roundtrip() {
        let node = DepNode::cell(1, 0, 2, 9);
        let key = node.key();
        assert_eq!(key, "C|1|0|2|9");
        assert_eq!(DepNode::parse(&key), Some(node));
    }

    #[test]
    fn named_expression_key_roundtrip_global_and_sheet() {
        let global = DepNode::NamedExpression {
            workbook: 1,
            scope: NameScope::Global,
            name: "MULT".into(),
        };
        assert_eq!(DepNode::parse(&global.key()), Some(global.clone()));

        let sheet = DepNode::NamedExpression {
            workbook: 1,
            scope: NameScope::Sheet(3),
            name: "MULT".into(),
        };
        assert_eq!(DepNode::parse(&sheet.key()), Some(sheet.clone()));
        assert_ne!(global.key(), sheet.key());
    }

    #[test]
    fn table_slice_key_roundtrip() {
        let node = DepNode::TableSlice {
            workbook: 1,
            table: "Products".into(),
            mode: TableMode::Column("Price".into()),
        };
        assert_eq!(DepNode::parse(&node.key()), Some(node));
    }

    #[test]
    fn distinct_nodes_have_distinct_keys() {
        let a = DepNode::cell(1, 0, 0, 0);
        let b = DepNode::cell(1, 1, 0, 0);
        assert_ne!(a.key(), b.key());
    }
}
