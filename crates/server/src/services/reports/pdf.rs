//! Plain text-line PDF documents with `printpdf`.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use rust_decimal::Decimal;

use crate::models::{Order, Product};

use super::format_timestamp;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 7.0;
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 11.0;

/// Writes lines top to bottom, starting a new page when one fills up.
struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Writer {
    fn new(title: &str) -> Result<Self, printpdf::Error> {
        let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);

        let mut writer = Self {
            doc,
            layer,
            font,
            bold,
            y: PAGE_HEIGHT.0 - MARGIN,
        };
        writer.title(title);
        Ok(writer)
    }

    fn title(&mut self, text: &str) {
        self.layer
            .use_text(text, TITLE_SIZE, Mm(MARGIN), Mm(self.y), &self.bold);
        self.y -= LINE_HEIGHT * 2.0;
    }

    fn line(&mut self, text: &str) {
        if self.y < MARGIN {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT.0 - MARGIN;
        }
        self.layer
            .use_text(text, BODY_SIZE, Mm(MARGIN), Mm(self.y), &self.font);
        self.y -= LINE_HEIGHT;
    }

    fn blank(&mut self) {
        self.y -= LINE_HEIGHT;
    }

    fn finish(self) -> Result<Vec<u8>, printpdf::Error> {
        self.doc.save_to_bytes()
    }
}

/// Delivered orders with a count and grand total.
///
/// # Errors
///
/// Returns `printpdf::Error` if the document cannot be built.
pub fn sales(orders: &[Order]) -> Result<Vec<u8>, printpdf::Error> {
    let total: Decimal = orders.iter().map(|o| o.total_amount).sum();

    let mut w = Writer::new("Sales Report")?;
    w.line(&format!("Total Orders: {}", orders.len()));
    w.line(&format!("Total Sales: ${total:.2}"));
    w.blank();
    for order in orders {
        w.line(&format!(
            "Order #{} - {} - ${:.2} - {}",
            order.id,
            order.user_name,
            order.total_amount,
            format_timestamp(order.created_at)
        ));
    }
    w.finish()
}

/// One "name - Stock: n" line per product.
///
/// # Errors
///
/// Returns `printpdf::Error` if the document cannot be built.
pub fn product_stock(products: &[Product]) -> Result<Vec<u8>, printpdf::Error> {
    let mut w = Writer::new("Product Stock Report")?;
    for product in products {
        w.line(&format!(
            "{} - Stock: {} ({})",
            product.name, product.stock, product.category_name
        ));
    }
    w.finish()
}

/// # Errors
///
/// Returns `printpdf::Error` if the document cannot be built.
pub fn order_history(orders: &[Order]) -> Result<Vec<u8>, printpdf::Error> {
    let mut w = Writer::new("Order History")?;
    if orders.is_empty() {
        w.line("No orders yet.");
    }
    for order in orders {
        w.line(&format!(
            "Order #{} - ${:.2} - {}",
            order.id, order.total_amount, order.status
        ));
    }
    w.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_have_pdf_header() {
        for bytes in [
            sales(&[]).unwrap(),
            product_stock(&[]).unwrap(),
            order_history(&[]).unwrap(),
        ] {
            assert!(bytes.starts_with(b"%PDF"));
        }
    }
}
