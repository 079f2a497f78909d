//! Spreadsheet rendering with `rust_xlsxwriter`.

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::models::{Order, Product};

use super::format_timestamp;

fn header(sheet: &mut Worksheet, columns: &[&str]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, title) in (0u16..).zip(columns) {
        sheet.write_string_with_format(0, col, *title, &bold)?;
        sheet.set_column_width(col, 18)?;
    }
    Ok(())
}

fn money(value: rust_decimal::Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn finish(mut workbook: Workbook) -> Result<Vec<u8>, XlsxError> {
    workbook.save_to_buffer()
}

/// Columns: Order ID, Customer, Total Amount, Status, Date.
///
/// # Errors
///
/// Returns `XlsxError` if the workbook cannot be written.
pub fn sales(orders: &[Order]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sales")?;
    header(
        sheet,
        &["Order ID", "Customer", "Total Amount", "Status", "Date"],
    )?;

    for (row, order) in (1u32..).zip(orders) {
        sheet.write_number(row, 0, order.id.as_i32())?;
        sheet.write_string(row, 1, &order.user_name)?;
        sheet.write_number(row, 2, money(order.total_amount))?;
        sheet.write_string(row, 3, order.status.as_str())?;
        sheet.write_string(row, 4, format_timestamp(order.created_at))?;
    }
    finish(workbook)
}

/// Columns: Product ID, Product Name, Category, Price, Stock.
///
/// # Errors
///
/// Returns `XlsxError` if the workbook cannot be written.
pub fn product_stock(products: &[Product]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Products")?;
    header(
        sheet,
        &["Product ID", "Product Name", "Category", "Price", "Stock"],
    )?;

    for (row, product) in (1u32..).zip(products) {
        sheet.write_number(row, 0, product.id.as_i32())?;
        sheet.write_string(row, 1, &product.name)?;
        sheet.write_string(row, 2, &product.category_name)?;
        sheet.write_number(row, 3, money(product.price))?;
        sheet.write_number(row, 4, product.stock)?;
    }
    finish(workbook)
}

/// Columns: Order ID, Customer, Status, Total Amount, Date.
///
/// # Errors
///
/// Returns `XlsxError` if the workbook cannot be written.
pub fn staff_orders(orders: &[Order]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Orders")?;
    header(
        sheet,
        &["Order ID", "Customer", "Status", "Total Amount", "Date"],
    )?;

    for (row, order) in (1u32..).zip(orders) {
        sheet.write_number(row, 0, order.id.as_i32())?;
        sheet.write_string(row, 1, &order.user_name)?;
        sheet.write_string(row, 2, order.status.as_str())?;
        sheet.write_number(row, 3, money(order.total_amount))?;
        sheet.write_string(row, 4, format_timestamp(order.created_at))?;
    }
    finish(workbook)
}

/// Columns: Order ID, Total Amount, Status, Date.
///
/// # Errors
///
/// Returns `XlsxError` if the workbook cannot be written.
pub fn order_history(orders: &[Order]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Order History")?;
    header(sheet, &["Order ID", "Total Amount", "Status", "Date"])?;

    for (row, order) in (1u32..).zip(orders) {
        sheet.write_number(row, 0, order.id.as_i32())?;
        sheet.write_number(row, 1, money(order.total_amount))?;
        sheet.write_string(row, 2, order.status.as_str())?;
        sheet.write_string(row, 3, format_timestamp(order.created_at))?;
    }
    finish(workbook)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_workbooks_are_zip_files() {
        for bytes in [
            sales(&[]).unwrap(),
            product_stock(&[]).unwrap(),
            staff_orders(&[]).unwrap(),
            order_history(&[]).unwrap(),
        ] {
            assert!(bytes.starts_with(b"PK"));
        }
    }

    #[test]
    fn test_money_conversion() {
        assert!((money(rust_decimal::Decimal::new(1999, 2)) - 19.99).abs() < f64::EPSILON);
    }
}
