//! Configuration module for the ERC-6909X authorization engine.
//!
//! This module provides structures and utilities for loading the engine's
//! configuration from TOML files. Values of the form `${VAR}` or
//! `${VAR:-default}` are substituted from the environment before parsing, so
//! private keys never need to be written into the file itself.

use erc6909x_types::{utils::compute_domain_hash, Address, B256};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// EIP-712 domain the signed approvals are bound to.
	pub domain: DomainConfig,
	/// Configuration for the storage backend holding grants and nonces.
	pub storage: StorageConfig,
	/// Signing account, only needed for producing signatures.
	pub account: Option<AccountConfig>,
}

/// EIP-712 domain of the token contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
	/// Token name as used in the domain.
	pub name: String,
	/// Domain version string.
	#[serde(default = "default_domain_version")]
	pub version: String,
	/// Chain ID the token lives on.
	pub chain_id: u64,
	/// Address of the token contract.
	pub verifying_contract: Address,
}

fn default_domain_version() -> String {
	"1".to_string()
}

impl DomainConfig {
	/// The 32-byte domain separator derived from this domain.
	pub fn separator(&self) -> B256 {
		compute_domain_hash(
			&self.name,
			&self.version,
			self.chain_id,
			&self.verifying_contract,
		)
	}
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut replacements = Vec::new();
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match (std::env::var(var_name.as_str()), default_value) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	let mut result = input.to_string();
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables first.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// The domain separator every signature is checked against.
	pub fn domain_separator(&self) -> B256 {
		self.domain.separator()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - The domain must carry a name and a non-zero verifying contract
	/// - The primary storage implementation must be configured
	/// - If an account section exists, its primary implementation must be configured
	fn validate(&self) -> Result<(), ConfigError> {
		if self.domain.name.is_empty() {
			return Err(ConfigError::Validation("Domain name cannot be empty".into()));
		}
		if self.domain.chain_id == 0 {
			return Err(ConfigError::Validation("Domain chain_id cannot be 0".into()));
		}
		if self.domain.verifying_contract.is_zero() {
			return Err(ConfigError::Validation(
				"Domain verifying_contract cannot be the zero address".into(),
			));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' has no entry in [storage.implementations]",
				self.storage.primary
			)));
		}

		if let Some(account) = &self.account {
			if !account.implementations.contains_key(&account.primary) {
				return Err(ConfigError::Validation(format!(
					"Primary account '{}' has no entry in [account.implementations]",
					account.primary
				)));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
