//! File-based storage backend.
//!
//! Each key is stored as one file under a directory per namespace, so the
//! authorization state survives restarts of the CLI without an external
//! database.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use erc6909x_types::StorageKey;
use std::path::PathBuf;
use tokio::fs;

/// Name used in configuration files to select this backend.
pub const NAME: &str = "file";

const DEFAULT_STORAGE_PATH: &str = "./data/authorizations";

/// Fixed-size file header.
///
/// Binary layout (16 bytes total):
/// - [0-3]: Magic bytes "6909"
/// - [4-5]: Version (u16, little-endian)
/// - [6-15]: Reserved
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileHeader {
	version: u16,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"6909";
	const VERSION: u16 = 1;
	const SIZE: usize = 16;

	fn current() -> Self {
		Self {
			version: Self::VERSION,
		}
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}
		if &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized file format".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		Ok(Self { version })
	}
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a storage key to a filesystem-safe file path.
	///
	/// Keys of a known namespace (`allowances:...`) go into that namespace's
	/// sub-directory; everything else lands in the base directory.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let sanitize = |s: &str| s.replace(['/', '\\', ':'], "_");

		match key.split_once(':') {
			Some((namespace, rest)) if namespace.parse::<StorageKey>().is_ok() => self
				.base_path
				.join(namespace)
				.join(format!("{}.bin", sanitize(rest))),
			_ => self.base_path.join(format!("{}.bin", sanitize(key))),
		}
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			},
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		FileHeader::deserialize(&data)?;
		Ok(data[FileHeader::SIZE..].to_vec())
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&FileHeader::current().serialize());
		file_data.extend_from_slice(&value);

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		tracing::trace!(path = %path.display(), "Wrote storage file");
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/authorizations")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = match config.get("storage_path") {
		None => DEFAULT_STORAGE_PATH,
		Some(value) => value.as_str().ok_or_else(|| {
			StorageError::Configuration("storage_path must be a string".into())
		})?,
	};
	if storage_path.is_empty() {
		return Err(StorageError::Configuration(
			"storage_path cannot be empty".into(),
		));
	}

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}
