//! Account implementation backed by an in-process private key.

use crate::{AccountError, AccountInterface};
use alloy_primitives::{Signature, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use erc6909x_types::{Address, SecretString};

/// Name used in configuration files to select this implementation.
pub const NAME: &str = "local";

/// Local wallet signing with a secp256k1 key held in memory.
#[derive(Debug)]
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex-encoded private key, with or without `0x`.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key
			.with_exposed(|key| key.trim().parse::<PrivateKeySigner>())
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))
	}
}

/// Factory function to create a local account from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key (required)
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".into()))?;
	if private_key.is_empty() {
		return Err(AccountError::InvalidKey("private_key cannot be empty".into()));
	}

	let wallet = LocalWallet::new(&SecretString::from(private_key))?;
	Ok(Box::new(wallet))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::AccountService;
	use erc6909x_types::{ApproveAndCall, U256};

	// Well-known development key, never funded anywhere.
	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn dev_wallet() -> LocalWallet {
		LocalWallet::new(&SecretString::from(DEV_KEY)).unwrap()
	}

	#[tokio::test]
	async fn test_address_from_key() {
		let wallet = dev_wallet();
		assert_eq!(
			wallet.address().await.unwrap(),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
				.parse::<Address>()
				.unwrap()
		);
	}

	#[tokio::test]
	async fn test_sign_approval_recovers_owner() {
		let wallet = dev_wallet();
		let owner = wallet.address().await.unwrap();
		let service = AccountService::new(Box::new(wallet));

		let payload = ApproveAndCall::permanent(
			owner,
			Address::repeat_byte(0x22),
			false,
			U256::from(1),
			U256::from(50),
			U256::from(7),
			u64::MAX >> 16,
		);
		let separator = B256::repeat_byte(0x5e);
		let signature = service.sign_approval(&payload, &separator).await.unwrap();

		assert_eq!(signature.len(), 65);
		assert!(signature[64] == 27 || signature[64] == 28);
		let parsed = Signature::from_raw(&signature).unwrap();
		let recovered = parsed
			.recover_address_from_prehash(&payload.signing_hash(&separator))
			.unwrap();
		assert_eq!(recovered, owner);
	}

	#[tokio::test]
	async fn test_refuses_foreign_owner() {
		let service = AccountService::new(Box::new(dev_wallet()));
		let payload = ApproveAndCall::permanent(
			Address::repeat_byte(0x11),
			Address::repeat_byte(0x22),
			true,
			U256::ZERO,
			U256::ZERO,
			U256::ZERO,
			0,
		);

		assert!(matches!(
			service.sign_approval(&payload, &B256::ZERO).await,
			Err(AccountError::SigningFailed(_))
		));
	}

	#[tokio::test]
	async fn test_refuses_deadline_beyond_uint48() {
		let wallet = dev_wallet();
		let owner = wallet.address().await.unwrap();
		let service = AccountService::new(Box::new(wallet));
		let payload = ApproveAndCall::permanent(
			owner,
			Address::repeat_byte(0x22),
			true,
			U256::ZERO,
			U256::ZERO,
			U256::ZERO,
			1 << 48,
		);

		assert!(matches!(
			service.sign_approval(&payload, &B256::ZERO).await,
			Err(AccountError::SigningFailed(_))
		));
	}

	#[test]
	fn test_factory_requires_key() {
		let config: toml::Value = toml::from_str("").unwrap();
		assert!(matches!(
			create_account(&config),
			Err(AccountError::InvalidKey(_))
		));

		let config: toml::Value = toml::from_str("private_key = \"0xnothex\"").unwrap();
		assert!(create_account(&config).is_err());

		let config: toml::Value = toml::from_str(&format!("private_key = \"{}\"", DEV_KEY)).unwrap();
		assert!(create_account(&config).is_ok());
	}
}
