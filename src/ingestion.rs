use crate::error::{BillError, Result};
use crate::schema::{ExtractedBill, ItemSheet, LineItem, TitleInfo};
use crate::utils::normalize_date;
use crate::workbook::{SheetRow, Workbook};
use log::debug;

pub const TITLE_SHEET: &str = "Title";
pub const WORK_ORDER_SHEET: &str = "Work Order";
pub const BILL_QUANTITY_SHEET: &str = "Bill Quantity";
pub const EXTRA_ITEMS_SHEET: &str = "Extra Items";

pub const REQUIRED_SHEETS: [&str; 3] = [TITLE_SHEET, WORK_ORDER_SHEET, BILL_QUANTITY_SHEET];

// Positional columns shared by every item sheet.
const COL_SERIAL: usize = 0;
const COL_DESCRIPTION: usize = 1;
const COL_UNIT: usize = 2;
const COL_QUANTITY: usize = 3;
const COL_RATE: usize = 4;
const COL_AMOUNT: usize = 5;
const COL_REMARK: usize = 6;

pub fn extract_bill(workbook: &Workbook) -> Result<ExtractedBill> {
    validate_required_sheets(workbook)?;

    let title = extract_title(sheet_rows(workbook, TITLE_SHEET));
    let work_order = extract_work_order(sheet_rows(workbook, WORK_ORDER_SHEET));
    let bill_quantity = extract_bill_quantity(sheet_rows(workbook, BILL_QUANTITY_SHEET));
    let extra_items = extract_extra_items(sheet_rows(workbook, EXTRA_ITEMS_SHEET));

    debug!(
        "Extracted {} work order items, {} bill items, {} extra items",
        work_order.items.len(),
        bill_quantity.items.len(),
        extra_items.items.len()
    );

    Ok(ExtractedBill {
        title,
        work_order,
        bill_quantity,
        extra_items,
    })
}

pub fn validate_required_sheets(workbook: &Workbook) -> Result<()> {
    let missing: Vec<String> = REQUIRED_SHEETS
        .iter()
        .filter(|name| workbook.sheet(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(BillError::MissingSheets {
            missing,
            available: workbook.sheet_names(),
        });
    }

    Ok(())
}

fn sheet_rows<'a>(workbook: &'a Workbook, name: &str) -> &'a [SheetRow] {
    workbook.sheet(name).map(|rows| rows.as_slice()).unwrap_or(&[])
}

/// Reads label/value pairs. Labels are matched by case-insensitive substring,
/// first rule wins; labels that match nothing are ignored.
pub fn extract_title(rows: &[SheetRow]) -> TitleInfo {
    let mut title = TitleInfo::default();

    for row in rows {
        if row.cell(0).is_blank() {
            continue;
        }

        let key = row.text(0).to_lowercase();
        let value = row.text(1);

        if key.contains("agreement") {
            title.agreement_no = value;
        } else if key.contains("work") && key.contains("name") {
            title.name_of_work = value;
        } else if key.contains("firm") || key.contains("contractor") {
            title.name_of_firm = value;
        } else if key.contains("commencement") {
            title.date_commencement = normalize_date(&value);
        } else if key.contains("completion") {
            title.date_completion = normalize_date(&value);
        } else if key.contains("measurement") {
            title.measurement_date = normalize_date(&value);
        }
    }

    title.actual_completion = title.date_completion.clone();
    title
}

/// Work Order rows: the full contractual scope, zero quantities included.
pub fn extract_work_order(rows: &[SheetRow]) -> ItemSheet {
    extract_items(rows, false)
}

/// Bill Quantity rows: only quantities actually executed (> 0).
pub fn extract_bill_quantity(rows: &[SheetRow]) -> ItemSheet {
    extract_items(rows, true)
}

/// Extra Items rows: like the bill, only executed quantities count.
pub fn extract_extra_items(rows: &[SheetRow]) -> ItemSheet {
    extract_items(rows, true)
}

fn extract_items(rows: &[SheetRow], executed_only: bool) -> ItemSheet {
    let items = rows
        .iter()
        .filter(|row| !is_header_or_blank(row))
        .filter(|row| !executed_only || row.number(COL_QUANTITY) > 0.0)
        .map(line_item_from_row)
        .collect();

    ItemSheet::from_items(items)
}

fn is_header_or_blank(row: &SheetRow) -> bool {
    row.cell(COL_SERIAL).is_blank() || row.text(COL_SERIAL).to_lowercase().contains("serial")
}

fn line_item_from_row(row: &SheetRow) -> LineItem {
    let quantity = row.number(COL_QUANTITY);
    let rate = row.number(COL_RATE);
    let supplied = row.number(COL_AMOUNT);

    // A zero amount is read as "not filled in" when both operands are present.
    let amount_derived = supplied == 0.0 && quantity > 0.0 && rate > 0.0;
    let amount = if amount_derived { quantity * rate } else { supplied };

    LineItem {
        serial_no: row.text(COL_SERIAL),
        description: row.text(COL_DESCRIPTION),
        unit: row.text(COL_UNIT),
        quantity,
        rate,
        amount,
        remark: row.text(COL_REMARK),
        amount_derived,
    }
}
