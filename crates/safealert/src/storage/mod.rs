//! Storage layer for safealert.
//!
//! Contacts live as one JSON array under a single key, the same shape a
//! browser page keeps in local storage. The [`ContactStore`] re-reads that key
//! on every call and rewrites it in full on every change; the backend only
//! needs to load and save whole values.
//!
//! There is no concurrency control around read-modify-write: two writers
//! racing on the same key lose one update (last write wins).

pub mod migrations;
pub mod schema;
mod sqlite;

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::contact::Contact;
use crate::error::{Error, Result};

pub use sqlite::SqliteBackend;

/// Whole-value key/value storage.
pub trait StorageBackend: Send + Sync {
    /// Read the value under `key`, `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Create an empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory backend holding `value` under `key`.
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let backend = Self::new();
        if let Ok(mut values) = backend.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        backend
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::internal("memory storage lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::internal("memory storage lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The ordered list of trusted contacts.
#[derive(Debug)]
pub struct ContactStore<B> {
    backend: B,
    key: String,
}

impl<B: StorageBackend> ContactStore<B> {
    /// Create a store reading and writing `key` in `backend`.
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// The storage key this store uses.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Give the backend back, e.g. to reopen a store over the same data.
    #[must_use]
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Current contacts in insertion order.
    ///
    /// Never fails: unreadable or corrupt storage reads as an empty list.
    #[must_use]
    pub fn list(&self) -> Vec<Contact> {
        match self.try_list() {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!("Treating contact list under '{}' as empty: {e}", self.key);
                Vec::new()
            }
        }
    }

    /// Current contacts, surfacing storage and parse failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageCorrupt`] if the stored value is not a contact
    /// array or holds a contact with a blank name, or the backend's error if
    /// it cannot be read. Stored fields are trimmed on the way out.
    pub fn try_list(&self) -> Result<Vec<Contact>> {
        let Some(raw) = self.backend.load(&self.key)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        // A stored `null` is an empty list too
        let contacts: Option<Vec<Contact>> =
            serde_json::from_str(&raw).map_err(|e| Error::StorageCorrupt {
                key: self.key.clone(),
                message: e.to_string(),
            })?;
        contacts
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, c)| {
                Contact::new(&c.name, c.phone.as_deref(), c.email.as_deref()).map_err(|e| {
                    Error::StorageCorrupt {
                        key: self.key.clone(),
                        message: format!("contact {index}: {e}"),
                    }
                })
            })
            .collect()
    }

    /// Contact at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Contact> {
        self.list().into_iter().nth(index)
    }

    /// Append a contact and persist the whole list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the name is blank, in which case
    /// nothing is written. Returns [`Error::StorageCorrupt`] rather than
    /// overwriting a stored value that does not parse.
    pub fn add(&self, contact: Contact) -> Result<()> {
        let contact = Contact::new(
            &contact.name,
            contact.phone.as_deref(),
            contact.email.as_deref(),
        )?;
        let mut contacts = self.try_list()?;
        info!("Adding trusted contact '{}'", contact.name);
        contacts.push(contact);
        self.persist(&contacts)
    }

    /// Remove the contact at `index` and persist the remaining list.
    ///
    /// Returns the removed contact, or `None` when `index` is out of range;
    /// storage is not touched in that case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageCorrupt`] rather than overwriting a stored
    /// value that does not parse, or the backend's error on write failure.
    pub fn remove(&self, index: usize) -> Result<Option<Contact>> {
        let mut contacts = self.try_list()?;
        if index >= contacts.len() {
            debug!(
                "Ignoring removal of contact {index}; only {} stored",
                contacts.len()
            );
            return Ok(None);
        }
        let removed = contacts.remove(index);
        info!("Removing trusted contact '{}'", removed.name);
        self.persist(&contacts)?;
        Ok(Some(removed))
    }

    /// Replace whatever is stored with an empty list.
    ///
    /// This is the way out of corrupt storage.
    ///
    /// # Errors
    ///
    /// Returns the backend's error on write failure.
    pub fn clear(&self) -> Result<()> {
        info!("Clearing contact list under '{}'", self.key);
        self.persist(&[])
    }

    fn persist(&self, contacts: &[Contact]) -> Result<()> {
        let raw = serde_json::to_string(contacts)?;
        self.backend.save(&self.key, &raw)
    }
}
