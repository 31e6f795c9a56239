//! Invoice notification. Delivery itself is someone else's job: the only
//! implementation here spools messages to an outbox directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::NotificationError;
use crate::invoice::{non_empty, InvoiceRecord};

/// Validated, de-duplicated list of email addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// The client's address followed by any extra addresses. Blanks are
    /// dropped and duplicates removed, ignoring case.
    pub fn for_invoice(
        invoice: &InvoiceRecord,
        additional: &[String],
    ) -> Result<Self, NotificationError> {
        let candidates = invoice
            .client
            .email
            .as_deref()
            .into_iter()
            .chain(additional.iter().map(String::as_str));
        Self::collect(invoice, candidates)
    }

    /// Exactly one explicit recipient instead of the client
    pub fn single(invoice: &InvoiceRecord, email: &str) -> Result<Self, NotificationError> {
        Self::collect(invoice, std::iter::once(email))
    }

    fn collect<'a>(
        invoice: &InvoiceRecord,
        candidates: impl Iterator<Item = &'a str>,
    ) -> Result<Self, NotificationError> {
        let mut addresses: Vec<String> = Vec::new();
        for candidate in candidates {
            let Some(address) = non_empty(Some(candidate)).map(str::trim) else {
                continue;
            };
            if !addresses.iter().any(|a| a.eq_ignore_ascii_case(address)) {
                addresses.push(address.to_string());
            }
        }

        if addresses.is_empty() {
            return Err(NotificationError::NoRecipients(
                invoice.display_number().to_string(),
            ));
        }
        Ok(Self(addresses))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Capability for telling recipients about an invoice, optionally with the
/// rendered document attached
pub trait Notifier {
    fn send(
        &self,
        invoice: &InvoiceRecord,
        recipients: &Recipients,
        attachment: Option<&[u8]>,
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    invoice: &'a str,
    from: Option<&'a str>,
    to: &'a [String],
    subject: String,
    body: String,
    attachment: Option<String>,
    created_at: String,
}

/// Writes each message as `message.json` plus the attachment into its own
/// timestamped directory under the outbox
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Spool one message and return the directory it was written to
    pub fn spool(
        &self,
        invoice: &InvoiceRecord,
        recipients: &Recipients,
        attachment: Option<&[u8]>,
    ) -> Result<PathBuf, NotificationError> {
        let now = Utc::now();
        let number = invoice.display_number();
        let slug = file_slug(number);
        let entry = self.create_entry(&format!("{}-{}", slug, now.format("%Y%m%dT%H%M%S")))?;

        let attachment_name = attachment.map(|_| format!("{slug}.pdf"));
        if let (Some(bytes), Some(name)) = (attachment, attachment_name.as_deref()) {
            let path = entry.join(name);
            fs::write(&path, bytes).map_err(|source| NotificationError::Outbox { path, source })?;
        }

        let client = non_empty(Some(invoice.client.name.as_str())).unwrap_or("Customer");
        let envelope = Envelope {
            invoice: number,
            from: non_empty(invoice.from_email.as_deref()),
            to: recipients.as_slice(),
            subject: format!("Invoice {} from {}", number, invoice.company_name().unwrap_or("Your Company")),
            body: format!(
                "Dear {},\n\nPlease find attached invoice {}.\n\nRegards,\n{}",
                client.trim(),
                number,
                invoice.company_name().unwrap_or("Your Company")
            ),
            attachment: attachment_name,
            created_at: now.to_rfc3339(),
        };

        let path = entry.join("message.json");
        let json = serde_json::to_string_pretty(&envelope)?;
        fs::write(&path, json).map_err(|source| NotificationError::Outbox { path, source })?;

        info!(
            invoice = number,
            recipients = recipients.len(),
            entry = %entry.display(),
            "spooled invoice notification"
        );
        Ok(entry)
    }

    /// A fresh directory; a numeric suffix is added when the name is taken
    fn create_entry(&self, name: &str) -> Result<PathBuf, NotificationError> {
        fs::create_dir_all(&self.dir).map_err(|source| NotificationError::Outbox {
            path: self.dir.clone(),
            source,
        })?;

        let mut candidate = self.dir.join(name);
        let mut attempt = 1;
        loop {
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    attempt += 1;
                    candidate = self.dir.join(format!("{name}-{attempt}"));
                }
                Err(source) => {
                    return Err(NotificationError::Outbox {
                        path: candidate,
                        source,
                    })
                }
            }
        }
    }
}

impl Notifier for OutboxNotifier {
    fn send(
        &self,
        invoice: &InvoiceRecord,
        recipients: &Recipients,
        attachment: Option<&[u8]>,
    ) -> Result<(), NotificationError> {
        self.spool(invoice, recipients, attachment).map(|_| ())
    }
}

/// Invoice number reduced to characters that are safe in a file name
pub fn file_slug(value: &str) -> String {
    let slug: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() {
        "invoice".to_string()
    } else {
        slug
    }
}
