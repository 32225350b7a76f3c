//! Spill registry (component E): tracks which cell originated which spilled
//! array and what rectangle it currently covers.

use rustc_hash::FxHashMap;
use sheetkernel_common::SpreadsheetRange;

use crate::result::SpilledValues;
use crate::key::WorkbookId;

/// Origin cell address, scoped to a workbook + sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddr {
    pub workbook: WorkbookId,
    pub sheet: u32,
    pub col: u32,
    pub row: u32,
}

#[derive(Debug, Clone)]
struct SpillEntry {
    origin: CellAddr,
    area: SpreadsheetRange,
    values: SpilledValues,
}

/// Tracks every live spill by origin cell. Cleared entries are dropped
/// outright rather than tombstoned: a dependent re-evaluating after a spill
/// shrinks or disappears simply finds no covering entry anymore.
#[derive(Debug, Default)]
pub struct SpillRegistry {
    entries: FxHashMap<CellAddr, SpillEntry>,
}

impl SpillRegistry {
    pub fn new() -> Self {
        SpillRegistry::default()
    }

    /// spec §4.E: false if a non-origin raw cell or another entry's area
    /// already covers `area`. `is_occupied` is supplied by the caller since
    /// raw-cell occupancy lives in the cell store, not here.
    pub fn can_spill(
        &self,
        origin: CellAddr,
        area: SpreadsheetRange,
        is_non_empty_raw_cell: impl Fn(u32, u32) -> bool,
    ) -> bool {
        let end_row = area.end_row.index().unwrap_or(area.start_row);
        let end_col = area.end_col.index().unwrap_or(area.start_col);
        for row in area.start_row..=end_row {
            for col in area.start_col..=end_col {
                if (row, col) != (origin.row, origin.col) && is_non_empty_raw_cell(row, col) {
                    return false;
                }
            }
        }
        for (addr, entry) in &self.entries {
            if *addr == origin {
                continue;
            }
            if ranges_intersect(&entry.area, &area) {
                return false;
            }
        }
        true
    }

    pub fn insert(&mut self, origin: CellAddr, area: SpreadsheetRange, values: SpilledValues) {
        self.entries.insert(
            origin,
            SpillEntry {
                origin,
                area,
                values,
            },
        );
    }

    pub fn remove(&mut self, origin: &CellAddr) {
        self.entries.remove(origin);
    }

    /// Entry (if any) whose area covers `addr` and whose origin isn't `addr`
    /// itself (spec §4.E `is_spilled`).
    pub fn covering(&self, addr: CellAddr) -> Option<(CellAddr, &SpilledValues)> {
        self.entries.values().find_map(|entry| {
            if entry.origin == addr {
                return None;
            }
            if entry.area.contains(addr.row, addr.col) {
                Some((entry.origin, &entry.values))
            } else {
                None
            }
        })
    }

    /// All spill areas, used to find cached entries whose deps intersect a
    /// newly-accepted spill and need a targeted re-check.
    pub fn areas(&self) -> impl Iterator<Item = (CellAddr, SpreadsheetRange)> + '_ {
        self.entries.values().map(|e| (e.origin, e.area.clone()))
    }
}

fn ranges_intersect(a: &SpreadsheetRange, b: &SpreadsheetRange) -> bool {
    let a_end_row = a.end_row.index().unwrap_or(a.start_row);
    let a_end_col = a.end_col.index().unwrap_or(a.start_col);
    let b_end_row = b.end_row.index().unwrap_or(b.start_row);
    let b_end_col = b.end_col.index().unwrap_or(b.start_col);
    a.start_row <= b_end_row
        && b.start_row <= a_end_row
        && a.start_col <= b_end_col
        && b.start_col <= a_end_col
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetkernel_common::LiteralValue;

    fn addr(col: u32, row: u32) -> CellAddr {
        CellAddr {
            workbook: 1,
            sheet: 0,
            col,
            row,
        }
    }

    #[test]
    fn can_spill_blocked_by_raw_cell() {
        let reg = SpillRegistry::new();
        let area = SpreadsheetRange::finite(0, 0, 1, 1);
        assert!(!reg.can_spill(addr(0, 0), area, |row, col| row == 1 && col == 1));
    }

    #[test]
    fn can_spill_blocked_by_other_entry() {
        let mut reg = SpillRegistry::new();
        let values = SpilledValues::new(vec![vec![LiteralValue::Int(1)]]);
        reg.insert(addr(5, 5), SpreadsheetRange::finite(5, 5, 6, 6), values);
        let area = SpreadsheetRange::finite(0, 0, 6, 6);
        assert!(!reg.can_spill(addr(0, 0), area, |_, _| false));
    }

    #[test]
    fn covering_excludes_origin_itself() {
        let mut reg = SpillRegistry::new();
        let values = SpilledValues::new(vec![vec![LiteralValue::Int(1), LiteralValue::Int(2)]]);
        reg.insert(addr(0, 0), SpreadsheetRange::finite(0, 0, 0, 1), values);
        assert!(reg.covering(addr(0, 0)).is_none());
        let (origin, _) = reg.covering(addr(1, 0)).unwrap();
        assert_eq!(origin, addr(0, 0));
    }
}
