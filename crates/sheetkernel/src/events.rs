//! Change notifications fired on return of the outermost mutating call
//! (spec "Event emission").

use sheetkernel_common::LiteralValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub sheet: u32,
    pub col: u32,
    pub row: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub address: CellAddress,
    pub old_value: LiteralValue,
    pub new_value: LiteralValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetEvent {
    Added { sheet: u32, name: String },
    Removed { sheet: u32, name: String },
    Renamed { sheet: u32, old: String, new: String },
}
