//! Account management for owners signing approvals.
//!
//! This module provides abstractions for the keys that produce
//! `ERC6909XApproveAndCall` signatures. The engine itself never needs a key;
//! accounts are used by tooling that prepares by-signature requests.

use alloy_primitives::{Bytes, Signature, B256};
use async_trait::async_trait;
use erc6909x_types::{Address, ApproveAndCall};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
///
/// Implementations only need to sign 32-byte prehashed digests; typed-data
/// hashing happens in [`AccountService`].
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a prehashed digest without any message prefix.
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;
}

/// Type alias for account factory functions.
///
/// This is the function signature that all account implementations must provide
/// to create instances of their account interface.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Get all registered account implementations.
///
/// Returns a vector of (name, factory) tuples for all available account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::NAME, local::create_account as AccountFactory)]
}

/// Service that signs approval payloads with a configured account.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs an approval payload under a domain separator.
	///
	/// Returns the 65-byte `r || s || v` encoding with `v` in `{27, 28}`, the
	/// form accepted by the ECDSA path of the signature verifier.
	pub async fn sign_approval(
		&self,
		payload: &ApproveAndCall,
		domain_separator: &B256,
	) -> Result<Bytes, AccountError> {
		let signer = self.implementation.address().await?;
		if signer != payload.owner {
			return Err(AccountError::SigningFailed(format!(
				"account {} cannot sign for owner {}",
				signer, payload.owner
			)));
		}
		if !payload.deadline_in_range() {
			return Err(AccountError::SigningFailed(format!(
				"deadline {} does not fit uint48",
				payload.deadline
			)));
		}

		let digest = payload.signing_hash(domain_separator);
		let signature = self.implementation.sign_hash(&digest).await?;
		tracing::debug!(
			owner = %payload.owner,
			digest = %digest,
			temporary = payload.temporary,
			"Signed approval payload"
		);
		Ok(Bytes::copy_from_slice(&signature.as_bytes()))
	}
}
