use crate::invoice::jurisdiction::Jurisdiction;
use crate::invoice::record::{InvoiceRecord, LineItem, StoredTotals};

/// Stored totals are compared with this tolerance before being called stale
const STALE_EPSILON: f64 = 0.005;

/// Totals recomputed from the line items
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub show_tax: bool,
    /// Effective percentage, 0 when the tax line is hidden
    pub tax_rate: f64,
    pub tax: f64,
    pub grand_total: f64,
}

impl Totals {
    pub fn compute(items: &[LineItem], tax_rate: Option<f64>, show_tax: bool) -> Self {
        let subtotal: f64 = items.iter().map(LineItem::amount).sum();
        let tax_rate = if show_tax { tax_rate.unwrap_or(0.0) } else { 0.0 };
        let tax = subtotal * (tax_rate / 100.0);

        Self {
            subtotal,
            show_tax,
            tax_rate,
            tax,
            grand_total: subtotal + tax,
        }
    }

    pub fn for_record(record: &InvoiceRecord) -> Self {
        let jurisdiction = Jurisdiction::lookup(record.country.as_deref());
        Self::compute(
            &record.items,
            record.tax_rate,
            jurisdiction.shows_tax(record.show_consumption_tax),
        )
    }

    /// Fields of the stored cache that disagree with the recomputed values
    pub fn stale_fields(&self, stored: &StoredTotals) -> Vec<&'static str> {
        let checks = [
            ("subtotal", stored.subtotal, self.subtotal),
            ("tax", stored.tax, self.tax),
            (
                "final_amount",
                stored.final_amount,
                self.grand_total + stored.round_off.unwrap_or(0.0),
            ),
        ];

        checks
            .into_iter()
            .filter_map(|(name, stored, computed)| match stored {
                Some(value) if (value - computed).abs() > STALE_EPSILON => Some(name),
                _ => None,
            })
            .collect()
    }
}
