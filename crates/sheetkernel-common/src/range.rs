//! Rectangular ranges, including the open-ended (`A:A`, `5:5`) kind that shows
//! up once a sheet has unbounded column/row references.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::fmt;

/// A 1-based, inclusive range over a single sheet. Kept for callers that only
/// ever deal in finite, fully-bounded ranges (table definitions, structured
/// refs resolved to concrete bounds, …).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub sheet: String,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl RangeAddress {
    pub fn new(
        sheet: impl Into<String>,
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<Self, &'static str> {
        if start_row == 0 || start_col == 0 || end_row == 0 || end_col == 0 {
            return Err("Row and column indices must be 1-based");
        }
        if start_row > end_row || start_col > end_col {
            return Err("Range must be ordered: start <= end");
        }
        Ok(Self {
            sheet: sheet.into(),
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }
    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }
}

/// One endpoint of an open range axis: either a concrete 0-based index, or an
/// unbounded direction (`A:A` has an infinite end row; `5:5` has an infinite
/// end column).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RangeEnd {
    Index(u32),
    PosInfinity,
    NegInfinity,
}

impl RangeEnd {
    pub fn is_infinite(self) -> bool {
        !matches!(self, RangeEnd::Index(_))
    }

    pub fn index(self) -> Option<u32> {
        match self {
            RangeEnd::Index(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for RangeEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeEnd::Index(i) => write!(f, "{i}"),
            RangeEnd::PosInfinity => write!(f, "+inf"),
            RangeEnd::NegInfinity => write!(f, "-inf"),
        }
    }
}

/// A 0-based sheet range whose ends may be open. `A:A` becomes
/// `start=(0,0) end=(+inf, 0)`; `5:5` becomes `start=(4,0) end=(4,+inf)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpreadsheetRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: RangeEnd,
    pub end_col: RangeEnd,
}

impl SpreadsheetRange {
    pub fn finite(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self {
            start_row,
            start_col,
            end_row: RangeEnd::Index(end_row),
            end_col: RangeEnd::Index(end_col),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_row.is_infinite() || self.end_col.is_infinite()
    }

    /// Clamp an open range to a concrete last-row/last-col for iteration
    /// purposes (the evaluator supplies the sheet's last non-empty bounds).
    pub fn clamped(&self, last_row: u32, last_col: u32) -> (u32, u32, u32, u32) {
        let end_row = match self.end_row {
            RangeEnd::Index(i) => i,
            RangeEnd::PosInfinity => last_row,
            RangeEnd::NegInfinity => self.start_row,
        };
        let end_col = match self.end_col {
            RangeEnd::Index(i) => i,
            RangeEnd::PosInfinity => last_col,
            RangeEnd::NegInfinity => self.start_col,
        };
        (self.start_row, self.start_col, end_row, end_col)
    }

    /// Row-major iteration over a range already clamped to finite bounds.
    pub fn iter_cells(&self, last_row: u32, last_col: u32) -> impl Iterator<Item = (u32, u32)> {
        let (sr, sc, er, ec) = self.clamped(last_row, last_col);
        (sr..=er).flat_map(move |r| (sc..=ec).map(move |c| (r, c)))
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        if row < self.start_row || col < self.start_col {
            return false;
        }
        let row_ok = match self.end_row {
            RangeEnd::Index(i) => row <= i,
            RangeEnd::PosInfinity => true,
            RangeEnd::NegInfinity => row <= self.start_row,
        };
        let col_ok = match self.end_col {
            RangeEnd::Index(i) => col <= i,
            RangeEnd::PosInfinity => true,
            RangeEnd::NegInfinity => col <= self.start_col,
        };
        row_ok && col_ok
    }

    pub fn overlaps(&self, other: &SpreadsheetRange) -> bool {
        let self_end_row = self.end_row.index().unwrap_or(u32::MAX);
        let self_end_col = self.end_col.index().unwrap_or(u32::MAX);
        let other_end_row = other.end_row.index().unwrap_or(u32::MAX);
        let other_end_col = other.end_col.index().unwrap_or(u32::MAX);
        self.start_row <= other_end_row
            && other.start_row <= self_end_row
            && self.start_col <= other_end_col
            && other.start_col <= self_end_col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_open_column() {
        let r = SpreadsheetRange {
            start_row: 0,
            start_col: 0,
            end_row: RangeEnd::PosInfinity,
            end_col: RangeEnd::Index(0),
        };
        assert_eq!(r.clamped(99, 5), (0, 0, 99, 0));
        assert!(r.contains(50, 0));
        assert!(!r.contains(50, 1));
    }

    #[test]
    fn overlap_detection() {
        let a = SpreadsheetRange::finite(0, 0, 3, 3);
        let b = SpreadsheetRange::finite(2, 2, 5, 5);
        let c = SpreadsheetRange::finite(10, 10, 11, 11);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
