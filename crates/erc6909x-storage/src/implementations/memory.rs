//! Volatile backend keeping the authorization state in process memory.
//!
//! Suited to tests and to embedders that persist state themselves.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Name used in configuration files to select this backend.
pub const NAME: &str = "memory";

/// Grants, balances and nonces in a map; everything is lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of keys currently stored.
	pub async fn len(&self) -> usize {
		self.store.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.store.read().await.is_empty()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}
}

/// Creates the backend from its `[storage.implementations.memory]` table, which takes no keys.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	if !config.is_table() {
		return Err(StorageError::Configuration(
			"memory storage configuration must be a table".into(),
		));
	}
	Ok(Box::new(MemoryStorage::new()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		let key = "nonces:0xabc:0x1";
		let value = b"true".to_vec();
		storage.set_bytes(key, value.clone()).await.unwrap();

		assert_eq!(storage.get_bytes(key).await.unwrap(), value);
		assert!(storage.exists(key).await.unwrap());
		assert_eq!(storage.len().await, 1);

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(storage.is_empty().await);

		let result = storage.get_bytes(key).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_overwrite() {
		let storage = MemoryStorage::new();

		let key = "allowances:k";
		storage.set_bytes(key, b"\"0x1\"".to_vec()).await.unwrap();
		storage.set_bytes(key, b"\"0x2\"".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"\"0x2\"".to_vec());
	}

	#[test]
	fn test_factory_rejects_non_table() {
		assert!(create_storage(&toml::Value::Integer(1)).is_err());
		assert!(create_storage(&toml::Value::Table(Default::default())).is_ok());
	}
}
