use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InvoiceError, Result};
use crate::invoice::record::InvoiceRecord;

/// Source of invoice records. The store owns identity and ownership fields;
/// everything downstream only reads what it returns.
pub trait InvoiceStore {
    fn load(&self, id: &str) -> Result<InvoiceRecord>;

    /// All records with their ids, sorted by id
    fn list(&self) -> Result<Vec<(String, InvoiceRecord)>>;

    fn list_for_user(&self, user_id: &str) -> Result<Vec<(String, InvoiceRecord)>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|(_, record)| record.user_id.as_deref() == Some(user_id))
            .collect())
    }
}

/// One TOML file per invoice; the file stem is the record id
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, id: &str, path: PathBuf) -> Result<InvoiceRecord> {
        let content = fs::read_to_string(&path)?;
        let mut record: InvoiceRecord =
            toml::from_str(&content).map_err(|e| InvoiceError::ConfigParse { path, source: e })?;
        if record.id.is_none() {
            record.id = Some(id.to_string());
        }
        Ok(record)
    }
}

impl InvoiceStore for FileStore {
    fn load(&self, id: &str) -> Result<InvoiceRecord> {
        // Ids are file stems; anything path-like is not a valid id
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(InvoiceError::InvoiceNotFound(id.to_string()));
        }

        let path = self.dir.join(format!("{id}.toml"));
        if !path.exists() {
            return Err(InvoiceError::InvoiceNotFound(id.to_string()));
        }
        self.read(id, path)
    }

    fn list(&self) -> Result<Vec<(String, InvoiceRecord)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<(String, PathBuf)> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some((stem, path))
            })
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));

        ids.into_iter()
            .map(|(id, path)| {
                let record = self.read(&id, path)?;
                Ok((id, record))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECORD: &str = r#"
invoice_number = "INV-7"
user_id = "alice"

[client]
name = "Acme"
"#;

    #[test]
    fn load_fills_id_from_file_stem() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("inv-7.toml"), RECORD).unwrap();

        let store = FileStore::new(dir.path());
        let record = store.load("inv-7").unwrap();

        assert_eq!(record.id.as_deref(), Some("inv-7"));
        assert_eq!(record.client.name, "Acme");
    }

    #[test]
    fn load_rejects_missing_and_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        assert!(matches!(store.load("nope"), Err(InvoiceError::InvoiceNotFound(_))));
        assert!(matches!(store.load("../x"), Err(InvoiceError::InvoiceNotFound(_))));
    }

    #[test]
    fn list_is_sorted_and_filterable_by_user() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.toml"), RECORD).unwrap();
        fs::write(dir.path().join("a.toml"), "user_id = \"bob\"\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = FileStore::new(dir.path());
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let alice = store.list_for_user("alice").unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].0, "b");
    }
}
