//! End-to-end scenarios exercised through the public facade.

use sheetkernel::{CellValue, RangeEnd, Workbook};

fn sheet(wb: &mut Workbook, name: &str) {
    wb.add_sheet(name).unwrap();
}

#[test]
fn arithmetic_with_references_reacts_to_edits() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    wb.set_cell("Sheet1", 1, 1, CellValue::Number(10.0)).unwrap();
    wb.set_cell("Sheet1", 2, 1, CellValue::Number(20.0)).unwrap();
    wb.set_cell("Sheet1", 3, 1, CellValue::Formula("A1+B1".into()))
        .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 3, 1, false).unwrap(), "30");

    wb.set_cell("Sheet1", 1, 1, CellValue::Number(15.0)).unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 3, 1, false).unwrap(), "35");
}

#[test]
fn find_left_composition() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    wb.set_cell("Sheet1", 1, 1, CellValue::Text("apple,banana".into()))
        .unwrap();
    wb.set_cell("Sheet1", 2, 1, CellValue::Formula("FIND(\",\",A1)".into()))
        .unwrap();
    wb.set_cell("Sheet1", 3, 1, CellValue::Formula("LEFT(A1,B1-1)".into()))
        .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 2, 1, false).unwrap(), "6");
    assert_eq!(wb.get_cell_value("Sheet1", 3, 1, false).unwrap(), "apple");
}

#[test]
fn spill_retreats_when_blocked() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    let mut n = 1.0;
    for col in 1..=4u32 {
        for row in 1..=4u32 {
            wb.set_cell("Sheet1", col, row, CellValue::Number(n)).unwrap();
            n += 1.0;
        }
    }
    wb.set_cell("Sheet1", 6, 1, CellValue::Formula("A1:D4*10".into()))
        .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 6, 1, false).unwrap(), "10");
    assert_eq!(wb.get_cell_value("Sheet1", 8, 1, false).unwrap(), "90");

    wb.set_cell("Sheet1", 6, 2, CellValue::Number(1.0)).unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 6, 1, false).unwrap(), "#SPILL!");
    assert_eq!(wb.get_cell_value("Sheet1", 8, 1, false).unwrap(), "");
}

#[test]
fn countif_drives_if_branch() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    for (row, text) in ["Laptop", "Mouse", "Keyboard", "Monitor"].into_iter().enumerate() {
        wb.set_cell("Sheet1", 1, row as u32 + 2, CellValue::Text(text.into()))
            .unwrap();
    }
    wb.set_cell(
        "Sheet1",
        2,
        14,
        CellValue::Formula("IF(COUNTIF(A2:A5,\"Laptop\")>0,\"Yes\",\"No\")".into()),
    )
    .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 2, 14, false).unwrap(), "Yes");
}

#[test]
fn direct_cycle_poisons_both_cells() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    wb.set_cell("Sheet1", 1, 1, CellValue::Formula("B1".into())).unwrap();
    wb.set_cell("Sheet1", 2, 1, CellValue::Formula("A1".into())).unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 1, 1, false).unwrap(), "#CYCLE!");
    assert_eq!(wb.get_cell_value("Sheet1", 2, 1, false).unwrap(), "#CYCLE!");
}

#[test]
fn named_expression_update_propagates() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    wb.add_named_expression("MULT", "2");
    wb.set_cell("Sheet1", 1, 1, CellValue::Number(100.0)).unwrap();
    wb.set_cell("Sheet1", 2, 1, CellValue::Formula("A1*MULT".into()))
        .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 2, 1, false).unwrap(), "200");

    wb.add_named_expression("MULT", "3");
    assert_eq!(wb.get_cell_value("Sheet1", 2, 1, false).unwrap(), "300");
}

#[test]
fn table_structured_reference_sums_and_evaluates_per_row() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    wb.set_cell("Sheet1", 1, 1, CellValue::Text("Name".into())).unwrap();
    wb.set_cell("Sheet1", 2, 1, CellValue::Text("Price".into())).unwrap();
    wb.set_cell("Sheet1", 1, 2, CellValue::Text("Widget".into())).unwrap();
    wb.set_cell("Sheet1", 2, 2, CellValue::Number(100.0)).unwrap();
    wb.set_cell("Sheet1", 1, 3, CellValue::Text("Gadget".into())).unwrap();
    wb.set_cell("Sheet1", 2, 3, CellValue::Number(150.0)).unwrap();
    wb.add_table(
        "Products",
        "Sheet1",
        1,
        1,
        vec!["Name".into(), "Price".into()],
        RangeEnd::Index(3),
    )
    .unwrap();

    wb.set_cell("Sheet1", 3, 1, CellValue::Formula("SUM(Products[Price])".into()))
        .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 3, 1, false).unwrap(), "250");

    wb.set_cell("Sheet1", 4, 2, CellValue::Formula("Products[@Price]*10".into()))
        .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 4, 2, false).unwrap(), "1000");
}

#[test]
fn open_ended_column_reference_tracks_new_writes() {
    let mut wb = Workbook::new();
    sheet(&mut wb, "Sheet1");
    wb.set_cell("Sheet1", 1, 1, CellValue::Number(10.0)).unwrap();
    wb.set_cell("Sheet1", 1, 2, CellValue::Number(20.0)).unwrap();
    wb.set_cell("Sheet1", 1, 3, CellValue::Number(30.0)).unwrap();
    wb.set_cell("Sheet1", 1, 10000, CellValue::Number(40.0)).unwrap();
    wb.set_cell("Sheet1", 3, 1, CellValue::Formula("SUM(A:A)".into()))
        .unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 3, 1, false).unwrap(), "100");

    wb.set_cell("Sheet1", 1, 20, CellValue::Number(5.0)).unwrap();
    assert_eq!(wb.get_cell_value("Sheet1", 3, 1, false).unwrap(), "105");
}
