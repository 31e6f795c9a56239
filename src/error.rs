use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Config directory not found at {0}. Run 'invoice init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invoice '{0}' not found in the invoice store")]
    InvoiceNotFound(String),

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Unrecoverable failure while assembling a document. Nothing is returned
/// alongside it: the caller gets either complete bytes or this error.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to generate PDF: font '{name}' could not be embedded: {reason}")]
    FontEmbedding { name: String, reason: String },

    #[error("Failed to generate PDF: image '{name}' has invalid dimensions {width}x{height}")]
    InvalidImage {
        name: String,
        width: u32,
        height: u32,
    },

    #[error("Failed to generate PDF: non-finite {what} on page {page}")]
    InvalidGeometry { what: String, page: usize },

    #[error("Failed to generate PDF: {0} is not a finite number")]
    InvalidAmount(String),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("No recipients for invoice {0}")]
    NoRecipients(String),

    #[error("Failed to write outbox entry {path}: {source}")]
    Outbox {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode message envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
