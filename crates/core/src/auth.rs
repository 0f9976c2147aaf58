// crates/core/src/auth.rs
//! Demo-grade sign-in gate.
//!
//! One fixed credential pair unlocks the dashboard. The signed-in user is
//! stored as plain JSON under a single key in a key/value session storage,
//! the same shape a browser keeps in local storage. There is no hashing, no
//! token, and no expiry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{AuthError, StorageError};

pub const STORAGE_KEY: &str = "crysta_dashboard_auth";

const DEMO_EMAIL: &str = "admin@crysta.com";
const DEMO_PASSWORD: &str = "admin123";
const DEMO_NAME: &str = "Admin User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

// ============================================================================
// Storage
// ============================================================================

/// String key/value storage with local-storage semantics.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: SessionStorage + ?Sized> SessionStorage for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.items.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Storage persisted as a JSON object in a single file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let body = serde_json::to_string_pretty(items).map_err(|e| StorageError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, body).map_err(|e| StorageError::io(&self.path, e))
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut items = self.read_all()?;
        f(&mut items);
        self.write_all(&items)
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }
}

// ============================================================================
// Gate
// ============================================================================

pub struct AuthGate<S> {
    storage: S,
}

impl<S: SessionStorage> AuthGate<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Sign in with the demo credentials. Any other pair yields `None` and
    /// leaves storage untouched.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Option<AuthUser>, AuthError> {
        if email != DEMO_EMAIL || password != DEMO_PASSWORD {
            tracing::debug!(email, "sign-in rejected");
            return Ok(None);
        }
        let user = AuthUser {
            id: "1".to_string(),
            email: DEMO_EMAIL.to_string(),
            name: Some(DEMO_NAME.to_string()),
            role: Some(Role::Admin),
        };
        self.storage
            .set_item(STORAGE_KEY, &serde_json::to_string(&user)?)?;
        tracing::info!(email, "signed in");
        Ok(Some(user))
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.storage.remove_item(STORAGE_KEY)?;
        Ok(())
    }

    /// The stored user; missing or unreadable entries mean signed out.
    pub fn current_user(&self) -> Option<AuthUser> {
        match self.storage.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read session storage");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sign_in_with_demo_credentials() {
        let storage = Arc::new(MemoryStorage::new());
        let gate = AuthGate::new(storage.clone());

        let user = gate.sign_in("admin@crysta.com", "admin123").unwrap().unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.name.as_deref(), Some("Admin User"));
        assert_eq!(user.role, Some(Role::Admin));
        assert!(gate.is_authenticated());

        let raw = storage.get_item(STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains("\"role\":\"admin\""));
    }

    #[test]
    fn test_wrong_password_writes_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let gate = AuthGate::new(storage.clone());

        assert!(gate.sign_in("admin@crysta.com", "wrong").unwrap().is_none());
        assert!(gate.sign_in("ADMIN@crysta.com", "admin123").unwrap().is_none());
        assert!(storage.get_item(STORAGE_KEY).unwrap().is_none());
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn test_sign_out_clears_session() {
        let gate = AuthGate::new(MemoryStorage::new());
        gate.sign_in("admin@crysta.com", "admin123").unwrap();
        gate.sign_out().unwrap();
        assert!(gate.current_user().is_none());
    }

    #[test]
    fn test_malformed_entry_means_signed_out() {
        let storage = MemoryStorage::new();
        storage.set_item(STORAGE_KEY, "{not json").unwrap();
        let gate = AuthGate::new(storage);
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let gate = AuthGate::new(FileStorage::new(&path));
        gate.sign_in("admin@crysta.com", "admin123").unwrap();
        assert!(path.exists());

        let reopened = AuthGate::new(FileStorage::new(&path));
        assert_eq!(
            reopened.current_user().map(|u| u.email),
            Some("admin@crysta.com".to_string())
        );

        reopened.sign_out().unwrap();
        assert!(!AuthGate::new(FileStorage::new(&path)).is_authenticated());
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get_item("x").unwrap(), None);
    }
}
