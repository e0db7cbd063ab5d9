//! Registry of consumed nonces.
//!
//! Nonces form an unordered sparse set over the full 256-bit space: any
//! unused value may be consumed at any time, and a consumed value can never
//! become usable again.

use crate::state::journal::JournaledStorage;
use crate::AuthorizationError;
use erc6909x_types::{truncate_id, Address, StorageKey, TokenEvent, U256};
use std::sync::Arc;

/// Tracks consumed `(owner, nonce)` pairs.
pub struct NonceRegistry {
	storage: Arc<JournaledStorage>,
}

impl NonceRegistry {
	pub fn new(storage: Arc<JournaledStorage>) -> Self {
		Self { storage }
	}

	fn id(owner: &Address, nonce: &U256) -> String {
		format!("{}:{}", owner, nonce)
	}

	/// Returns whether the nonce was consumed or invalidated.
	pub async fn is_consumed(&self, owner: Address, nonce: U256) -> Result<bool, AuthorizationError> {
		let consumed: Option<bool> = self
			.storage
			.load(StorageKey::Nonces.as_str(), &Self::id(&owner, &nonce))
			.await?;
		Ok(consumed.unwrap_or(false))
	}

	/// Marks a nonce consumed on behalf of an accepted signature.
	pub async fn consume(&self, owner: Address, nonce: U256) -> Result<(), AuthorizationError> {
		self.mark(owner, nonce).await?;
		tracing::debug!(owner = %owner, nonce = %truncate_id(&nonce.to_string()), "Consumed nonce");
		Ok(())
	}

	/// Burns a nonce at the owner's request so that no signature using it can be accepted.
	pub async fn invalidate(&self, owner: Address, nonce: U256) -> Result<(), AuthorizationError> {
		self.mark(owner, nonce).await?;
		tracing::info!(owner = %owner, nonce = %truncate_id(&nonce.to_string()), "Invalidated nonce");
		Ok(())
	}

	async fn mark(&self, owner: Address, nonce: U256) -> Result<(), AuthorizationError> {
		if self.is_consumed(owner, nonce).await? {
			return Err(AuthorizationError::NonceAlreadyConsumed { owner, nonce });
		}

		self.storage
			.store(StorageKey::Nonces.as_str(), &Self::id(&owner, &nonce), &true)
			.await?;
		self.storage
			.emit(TokenEvent::NonceInvalidation { owner, nonce });
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use erc6909x_storage::{implementations::memory::MemoryStorage, StorageService};

	fn registry() -> (NonceRegistry, Arc<JournaledStorage>) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let journaled = Arc::new(JournaledStorage::new(storage));
		(NonceRegistry::new(journaled.clone()), journaled)
	}

	#[tokio::test]
	async fn test_consume_once() {
		let (registry, storage) = registry();
		let owner = Address::repeat_byte(0xaa);

		assert!(!registry.is_consumed(owner, U256::from(5)).await.unwrap());
		registry.consume(owner, U256::from(5)).await.unwrap();
		assert!(registry.is_consumed(owner, U256::from(5)).await.unwrap());

		let err = registry.consume(owner, U256::from(5)).await.unwrap_err();
		assert!(matches!(
			err,
			AuthorizationError::NonceAlreadyConsumed { nonce, .. } if nonce == U256::from(5)
		));
		assert_eq!(
			storage.events(),
			vec![TokenEvent::NonceInvalidation {
				owner,
				nonce: U256::from(5)
			}]
		);
	}

	#[tokio::test]
	async fn test_unordered_and_per_owner() {
		let (registry, _) = registry();
		let alice = Address::repeat_byte(0x01);
		let bob = Address::repeat_byte(0x02);

		registry.consume(alice, U256::from(100)).await.unwrap();
		registry.consume(alice, U256::from(3)).await.unwrap();
		assert!(!registry.is_consumed(alice, U256::from(4)).await.unwrap());
		assert!(!registry.is_consumed(bob, U256::from(100)).await.unwrap());
	}

	#[tokio::test]
	async fn test_full_width_nonces() {
		let (registry, _) = registry();
		let owner = Address::repeat_byte(0x01);
		let high = U256::MAX;
		let wrapped = U256::MAX - U256::from(1);

		registry.invalidate(owner, high).await.unwrap();
		assert!(registry.is_consumed(owner, high).await.unwrap());
		assert!(!registry.is_consumed(owner, wrapped).await.unwrap());
		assert!(!registry.is_consumed(owner, U256::ZERO).await.unwrap());
		assert!(registry.invalidate(owner, high).await.is_err());
	}
}
