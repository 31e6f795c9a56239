use serde::{Deserialize, Serialize};

/// Whether the invoice is addressed to a company or to a person
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    #[default]
    Organization,
    Individual,
}

/// The "Bill To" party
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Recipient {
    #[serde(default)]
    pub kind: ClientType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct BankDetails {
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub branch_code: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub account_holder: Option<String>,
    #[serde(default)]
    pub swift_code: Option<String>,
    #[serde(default)]
    pub ifsc_code: Option<String>,
}

/// Snapshot of the issuing company taken when the invoice was created
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CompanyInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Upload URL, absolute path or remote URL of the company logo
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub bank: Option<BankDetails>,
}

/// A billable line on the invoice
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub hours: f64,
    pub rate: f64,
    /// Total as stored upstream; rendering always uses `hours * rate`
    #[serde(default)]
    pub total: Option<f64>,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.hours * self.rate
    }
}

/// Totals persisted next to the record. Treated as a cache: the renderer
/// recomputes everything from the line items.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct StoredTotals {
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub round_off: Option<f64>,
    #[serde(default)]
    pub final_amount: Option<f64>,
}

/// Immutable invoice snapshot handed to the renderer
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct InvoiceRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
    /// Forces the tax line for jurisdictions that hide it by default
    #[serde(default)]
    pub show_consumption_tax: bool,
    #[serde(default)]
    pub company: Option<CompanyInfo>,
    #[serde(default)]
    pub client: Recipient,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub totals: Option<StoredTotals>,
}

impl InvoiceRecord {
    /// Best human-facing identifier: invoice number, then id
    pub fn display_number(&self) -> &str {
        non_empty(self.invoice_number.as_deref())
            .or_else(|| non_empty(self.id.as_deref()))
            .unwrap_or("(unnumbered)")
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company
            .as_ref()
            .and_then(|c| non_empty(c.name.as_deref()))
    }

    pub fn logo_reference(&self) -> Option<&str> {
        self.company
            .as_ref()
            .and_then(|c| non_empty(c.logo_url.as_deref()))
    }

    pub fn bank(&self) -> Option<&BankDetails> {
        self.company.as_ref().and_then(|c| c.bank.as_ref())
    }
}

/// Treat empty and whitespace-only strings like absent values
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
