mod jurisdiction;
mod record;
mod store;
mod totals;

pub use jurisdiction::{Jurisdiction, RoutingCode, INDIA, JAPAN};
pub use record::{
    non_empty, BankDetails, ClientType, CompanyInfo, InvoiceRecord, LineItem, Recipient,
    StoredTotals,
};
pub use store::{FileStore, InvoiceStore};
pub use totals::Totals;
