//! Passkey storage backends.
//!
//! The backend is caller selected: [`MemoryStore`] for tests and ephemeral
//! processes, [`Keychain`] for JSON file persistence. `name` is a unique
//! secondary key in both; inserting under an existing id replaces that
//! entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::proto::Passkey;

/// The storage collaborator contract for passkeys.
pub trait PasskeyStore {
    /// Store a passkey. Replaces an entry with the same id; fails with
    /// [`StoreError::DuplicateName`] if a *different* entry holds the name.
    fn insert(&self, passkey: Passkey) -> Result<(), StoreError>;

    fn get_by_id(&self, id: &Uuid) -> Result<Option<Passkey>, StoreError>;

    fn get_by_name(&self, name: &str) -> Result<Option<Passkey>, StoreError>;

    /// Remove by id. `Ok(false)` when no entry matched.
    fn remove(&self, id: &Uuid) -> Result<bool, StoreError>;

    fn list(&self) -> Result<Vec<Passkey>, StoreError>;
}

fn upsert(entries: &mut Vec<Passkey>, passkey: Passkey) -> Result<(), StoreError> {
    if entries
        .iter()
        .any(|p| p.name == passkey.name && p.id != passkey.id)
    {
        return Err(StoreError::DuplicateName(passkey.name));
    }
    match entries.iter_mut().find(|p| p.id == passkey.id) {
        Some(existing) => *existing = passkey,
        None => entries.push(passkey),
    }
    Ok(())
}

/// An in-memory store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<Passkey>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Passkey>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PasskeyStore for MemoryStore {
    fn insert(&self, passkey: Passkey) -> Result<(), StoreError> {
        upsert(&mut self.lock(), passkey)
    }

    fn get_by_id(&self, id: &Uuid) -> Result<Option<Passkey>, StoreError> {
        Ok(self.lock().iter().find(|p| p.id == *id).cloned())
    }

    fn get_by_name(&self, name: &str) -> Result<Option<Passkey>, StoreError> {
        Ok(self.lock().iter().find(|p| p.name == name).cloned())
    }

    fn remove(&self, id: &Uuid) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|p| p.id != *id);
        Ok(entries.len() < before)
    }

    fn list(&self) -> Result<Vec<Passkey>, StoreError> {
        Ok(self.lock().clone())
    }
}

/// A file backed store: one JSON document holding the passkey list.
///
/// Every operation reads the file fresh and writes it back whole, so
/// multiple `Keychain` values over the same path stay coherent within one
/// process. A missing file reads as an empty keychain.
pub struct Keychain {
    path: PathBuf,
}

impl Keychain {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Keychain {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<Vec<Passkey>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &[Passkey]) -> Result<(), StoreError> {
        fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }
}

impl PasskeyStore for Keychain {
    fn insert(&self, passkey: Passkey) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        debug!(id = %passkey.id, name = %passkey.name, "storing passkey");
        upsert(&mut entries, passkey)?;
        self.save(&entries)
    }

    fn get_by_id(&self, id: &Uuid) -> Result<Option<Passkey>, StoreError> {
        Ok(self.load()?.into_iter().find(|p| p.id == *id))
    }

    fn get_by_name(&self, name: &str) -> Result<Option<Passkey>, StoreError> {
        Ok(self.load()?.into_iter().find(|p| p.name == name))
    }

    fn remove(&self, id: &Uuid) -> Result<bool, StoreError> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|p| p.id != *id);
        let removed = entries.len() < before;
        if removed {
            self.save(&entries)?;
        }
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<Passkey>, StoreError> {
        self.load()
    }
}
