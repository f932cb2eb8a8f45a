use crate::domain::DomainError;

/// String key-value store port, the shape of browser local/session storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Delete a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), DomainError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}
