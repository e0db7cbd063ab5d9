//! Builder for constructing authorization engines.
//!
//! Composes an [`AuthorizationEngine`] from configuration by instantiating
//! the configured storage backend through its factory function.

use crate::engine::AuthorizationEngine;
use erc6909x_config::Config;
use erc6909x_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct EngineFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for an [`AuthorizationEngine`] with a pluggable storage backend.
pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine using the primary storage implementation from the configuration.
	pub fn build<SF>(self, factories: EngineFactories<SF>) -> Result<AuthorizationEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(primary)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					primary
				))
			})?;
		let factory = factories.storage_factories.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;

		let backend = match factory(storage_config) {
			Ok(backend) => {
				tracing::info!(component = "storage", implementation = %primary, "Loaded");
				backend
			},
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Failed to create storage implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create storage implementation '{}': {}",
					primary, e
				)));
			},
		};

		let domain_separator = self.config.domain_separator();
		tracing::info!(
			component = "engine",
			name = %self.config.domain.name,
			chain_id = self.config.domain.chain_id,
			verifying_contract = %self.config.domain.verifying_contract,
			domain_separator = %domain_separator,
			"Built authorization engine"
		);

		Ok(AuthorizationEngine::new(
			Arc::new(StorageService::new(backend)),
			domain_separator,
		))
	}
}

impl EngineFactories<erc6909x_storage::StorageFactory> {
	/// Factories for every storage implementation shipped with the workspace.
	pub fn with_default_implementations() -> Self {
		Self {
			storage_factories: erc6909x_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use erc6909x_types::{Address, U256};
	use tempfile::TempDir;

	fn config(storage: &str) -> Config {
		format!(
			r#"
[domain]
name = "Example Multi Token"
chain_id = 1
verifying_contract = "0x00000000000000000000000000000000000069f1"

[storage]
primary = "{storage}"
[storage.implementations.memory]
[storage.implementations.file]
storage_path = "{path}"
"#,
			storage = storage,
			path = "/nonexistent"
		)
		.parse()
		.unwrap()
	}

	#[test]
	fn test_builds_with_default_factories() {
		let config = config("memory");
		let expected = config.domain_separator();

		let engine = EngineBuilder::new(config)
			.build(EngineFactories::with_default_implementations())
			.unwrap();
		assert_eq!(engine.domain_separator(), expected);
	}

	#[test]
	fn test_missing_factory() {
		let factories: EngineFactories<erc6909x_storage::StorageFactory> = EngineFactories {
			storage_factories: HashMap::new(),
		};
		assert!(matches!(
			EngineBuilder::new(config("memory")).build(factories),
			Err(BuilderError::MissingComponent(_))
		));
	}

	#[tokio::test]
	async fn test_file_backed_state_survives_rebuild() {
		let dir = TempDir::new().unwrap();
		let mut config = config("file");
		config.storage.implementations.insert(
			"file".into(),
			toml::Value::Table(toml::map::Map::from_iter([(
				"storage_path".to_string(),
				toml::Value::String(dir.path().display().to_string()),
			)])),
		);
		let owner = Address::repeat_byte(0x01);

		let engine = EngineBuilder::new(config.clone())
			.build(EngineFactories::with_default_implementations())
			.unwrap();
		engine.invalidate_nonce(owner, U256::from(77)).await.unwrap();
		engine
			.approve(owner, Address::repeat_byte(0x02), U256::from(1), U256::from(5))
			.await
			.unwrap();
		drop(engine);

		let rebuilt = EngineBuilder::new(config)
			.build(EngineFactories::with_default_implementations())
			.unwrap();
		assert!(rebuilt
			.is_nonce_consumed(owner, U256::from(77))
			.await
			.unwrap());
		assert_eq!(
			rebuilt
				.allowance(owner, Address::repeat_byte(0x02), U256::from(1))
				.await
				.unwrap(),
			U256::from(5)
		);
	}
}
