//! Storage module for the ERC-6909X authorization state.
//!
//! This module provides abstractions for persistent storage of allowances,
//! operator grants, balances and consumed nonces, supporting different backend
//! implementations such as in-memory or file-based storage.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the authorization engine. It provides basic key-value
/// operations over raw bytes.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key. Deleting a missing key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must provide
/// to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::NAME, file::create_storage as StorageFactory),
		(memory::NAME, memory::create_storage as StorageFactory),
	]
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with
/// automatic JSON serialization/deserialization.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Combines a namespace and an id into a backend key.
	pub fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves a value, mapping a missing key to `None`.
	pub async fn retrieve_optional<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Retrieves the raw bytes stored under a full backend key, if any.
	pub async fn retrieve_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
		match self.backend.get_bytes(key).await {
			Ok(bytes) => Ok(Some(bytes)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Writes raw bytes under a full backend key, or deletes the key for `None`.
	pub async fn restore_raw(&self, key: &str, value: Option<Vec<u8>>) -> Result<(), StorageError> {
		match value {
			Some(bytes) => self.backend.set_bytes(key, bytes).await,
			None => self.backend.delete(key).await,
		}
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Entry {
		amount: u64,
	}

	#[tokio::test]
	async fn test_typed_round_trip() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));

		service
			.store("allowances", "a", &Entry { amount: 7 })
			.await
			.unwrap();
		let entry: Entry = service.retrieve("allowances", "a").await.unwrap();
		assert_eq!(entry, Entry { amount: 7 });
		assert!(service.exists("allowances", "a").await.unwrap());

		let missing: Option<Entry> = service.retrieve_optional("allowances", "b").await.unwrap();
		assert!(missing.is_none());
	}

	#[tokio::test]
	async fn test_raw_restore() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let key = StorageService::key("nonces", "x");

		assert_eq!(service.retrieve_raw(&key).await.unwrap(), None);
		service
			.restore_raw(&key, Some(b"true".to_vec()))
			.await
			.unwrap();
		assert_eq!(
			service.retrieve_raw(&key).await.unwrap(),
			Some(b"true".to_vec())
		);

		service.restore_raw(&key, None).await.unwrap();
		assert!(!service.exists("nonces", "x").await.unwrap());
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["file", "memory"]);
	}
}
