//! Directory Store
//!
//! Persistent name -> address book backed by a pretty-printed JSON object.
//! Names keep their original casing but are unique case-insensitively. The file
//! is re-read on every operation so external edits show up immediately; there
//! is no locking between the read and the write of a mutation.

pub mod resolver;

pub use resolver::{resolve, suggest, Resolution};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Snapshot of the directory in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactBook {
    entries: IndexMap<String, String>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored key matching `name` case-insensitively
    pub fn find_key(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.entries
            .keys()
            .find(|k| k.to_lowercase() == wanted)
            .map(|k| k.as_str())
    }

    /// Address for a case-insensitive exact name
    pub fn address_of(&self, name: &str) -> Option<&str> {
        let key = self.find_key(name)?;
        self.entries.get(key).map(|a| a.as_str())
    }

    /// Insert or replace, dropping any entry whose name differs only in casing
    pub fn insert(&mut self, name: &str, address: &str) {
        if let Some(existing) = self.find_key(name).map(|k| k.to_string()) {
            if existing != name {
                self.entries.shift_remove(&existing);
            }
        }
        self.entries.insert(name.to_string(), address.to_string());
    }

    /// Remove an entry by its exact stored key
    pub fn remove_key(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, A: Into<String>> FromIterator<(N, A)> for ContactBook {
    fn from_iter<I: IntoIterator<Item = (N, A)>>(iter: I) -> Self {
        let mut book = ContactBook::new();
        for (name, address) in iter {
            book.insert(&name.into(), &address.into());
        }
        book
    }
}

/// File-backed contact store
pub struct ContactStore {
    path: PathBuf,
}

impl ContactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ContactBook, String> {
        if !self.path.exists() {
            self.save(&ContactBook::new())?;
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read contacts file {}: {}", self.path.display(), e))?;
        if content.trim().is_empty() {
            return Ok(ContactBook::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse contacts file {}: {}", self.path.display(), e))
    }

    fn save(&self, book: &ContactBook) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
            }
        }
        let json = serde_json::to_string_pretty(book)
            .map_err(|e| format!("Failed to serialize contacts: {}", e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| format!("Failed to write contacts file {}: {}", self.path.display(), e))
    }

    /// Current directory snapshot
    pub fn get(&self) -> Result<ContactBook, String> {
        self.load()
    }

    /// Save a contact; a case-insensitive name collision replaces the old entry
    pub fn add(&self, name: &str, address: &str) -> Result<(), String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Contact name cannot be empty".to_string());
        }
        let mut book = self.load()?;
        book.insert(name, address.trim());
        self.save(&book)?;
        log::info!("[CONTACTS] Saved contact '{}'", name);
        Ok(())
    }

    /// Delete the contact `name` resolves to. Returns false unless the
    /// resolution was unambiguous.
    pub fn remove(&self, name: &str) -> Result<bool, String> {
        let mut book = self.load()?;
        let key = match resolve(name, &book) {
            Resolution::Exact(key) => key,
            _ => return Ok(false),
        };
        book.remove_key(&key);
        self.save(&book)?;
        log::info!("[CONTACTS] Deleted contact '{}'", key);
        Ok(true)
    }

    /// Wipe the whole directory
    pub fn clear(&self) -> Result<(), String> {
        self.save(&ContactBook::new())?;
        log::info!("[CONTACTS] Cleared all contacts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, ContactStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContactStore::new(dir.path().join("contacts.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_initialized_empty() {
        let (_dir, store) = temp_store();
        assert!(store.get().unwrap().is_empty());
        assert!(store.path().exists());
    }

    #[test]
    fn test_latest_casing_wins() {
        let (_dir, store) = temp_store();
        store.add("bob", "0x1").unwrap();
        store.add("Bob", "0x2").unwrap();

        let book = store.get().unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.names().collect::<Vec<_>>(), vec!["Bob"]);
        assert_eq!(book.address_of("BOB"), Some("0x2"));
    }

    #[test]
    fn test_directory_order_survives_round_trip() {
        let (_dir, store) = temp_store();
        store.add("Zed", "0x1").unwrap();
        store.add("Amy", "0x2").unwrap();
        store.add("Moe", "0x3").unwrap();

        let names: Vec<String> = store.get().unwrap().names().map(String::from).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Moe"]);
    }

    #[test]
    fn test_remove_uses_resolver() {
        let (_dir, store) = temp_store();
        store.add("Sam A", "0x1").unwrap();
        store.add("Sam B", "0x2").unwrap();
        store.add("Ritika Edge", "0x3").unwrap();

        // ambiguous partial name deletes nothing
        assert!(!store.remove("sam").unwrap());
        assert_eq!(store.get().unwrap().len(), 3);

        // unique partial name resolves
        assert!(store.remove("ritika").unwrap());
        assert_eq!(store.get().unwrap().address_of("Ritika Edge"), None);

        assert!(!store.remove("nobody").unwrap());
    }

    #[test]
    fn test_clear() {
        let (_dir, store) = temp_store();
        store.add("Farzi", "0xabc").unwrap();
        store.clear().unwrap();
        assert!(store.get().unwrap().is_empty());
    }

    #[test]
    fn test_external_edits_are_visible() {
        let (_dir, store) = temp_store();
        store.add("Farzi", "0xabc").unwrap();
        std::fs::write(store.path(), r#"{"Samay": "0xdef"}"#).unwrap();

        let book = store.get().unwrap();
        assert_eq!(book.address_of("samay"), Some("0xdef"));
        assert_eq!(book.address_of("farzi"), None);
    }
}
