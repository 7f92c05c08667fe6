//! Persisted identity storage.
//!
//! The store holds a single value: the rendered identity
//! (`"<base_name>-<suffix>"`). It is read once when a session mounts and
//! written only when the user submits a name. Nothing else touches it.

use thiserror::Error;

/// Errors from identity storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("identity store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes are not a usable value.
    #[error("identity store is corrupt: {reason}")]
    Corrupt {
        /// Description of the corruption.
        reason: String,
    },
}

/// Single-slot persistence for the rendered identity.
pub trait IdentityStore {
    /// Read the stored value, if any.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored value.
    fn save(&mut self, rendered: &str) -> Result<(), StoreError>;
}

/// In-memory store. Lives as long as the value that owns it.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    value: Option<String>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `rendered`.
    pub fn with_value(rendered: impl Into<String>) -> Self {
        Self { value: Some(rendered.into()) }
    }

    /// Current raw value.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.value.clone())
    }

    fn save(&mut self, rendered: &str) -> Result<(), StoreError> {
        self.value = Some(rendered.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_loads_none() {
        let store = MemoryIdentityStore::new();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_overwrites_previous_value() {
        let mut store = MemoryIdentityStore::with_value("ana-aaaaa");
        store.save("bia-bbbbb").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("bia-bbbbb"));
    }
}
