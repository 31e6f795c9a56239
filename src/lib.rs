pub mod config;
pub mod error;
pub mod format;
pub mod invoice;
pub mod notify;
pub mod pdf;

pub use config::{BrandIdentity, Config, FontCandidate, OutboxSettings, RenderSettings};
pub use error::{InvoiceError, NotificationError, RenderError, Result};
pub use format::{format_currency, format_date, mm_to_pt};
pub use invoice::{FileStore, InvoiceRecord, InvoiceStore, Jurisdiction, Totals};
pub use notify::{Notifier, OutboxNotifier, Recipients};
pub use pdf::{FsResolver, Renderer, ResourceResolver};
