//! Persisted authorization state.
//!
//! Allowances, operator grants and balances live in their own storage
//! namespaces. Zero allowances, revoked operators and empty balances are
//! stored as absent keys.

pub mod journal;

use crate::AuthorizationError;
use erc6909x_types::{Address, GrantKey, GrantValue, StorageKey, U256};
use journal::JournaledStorage;
use std::sync::Arc;

fn allowance_id(owner: &Address, spender: &Address, id: &U256) -> String {
	format!("{}:{}:{}", owner, spender, id)
}

fn operator_id(owner: &Address, spender: &Address) -> String {
	format!("{}:{}", owner, spender)
}

fn balance_id(owner: &Address, id: &U256) -> String {
	format!("{}:{}", owner, id)
}

/// Reads and writes allowances, operator grants and balances.
pub struct AuthorizationState {
	storage: Arc<JournaledStorage>,
}

impl AuthorizationState {
	pub fn new(storage: Arc<JournaledStorage>) -> Self {
		Self { storage }
	}

	pub async fn allowance(
		&self,
		owner: Address,
		spender: Address,
		id: U256,
	) -> Result<U256, AuthorizationError> {
		let amount: Option<U256> = self
			.storage
			.load(
				StorageKey::Allowances.as_str(),
				&allowance_id(&owner, &spender, &id),
			)
			.await?;
		Ok(amount.unwrap_or(U256::ZERO))
	}

	pub async fn set_allowance(
		&self,
		owner: Address,
		spender: Address,
		id: U256,
		amount: U256,
	) -> Result<(), AuthorizationError> {
		let key = allowance_id(&owner, &spender, &id);
		let namespace = StorageKey::Allowances.as_str();
		if amount.is_zero() {
			self.storage.remove(namespace, &key).await?;
		} else {
			self.storage.store(namespace, &key, &amount).await?;
		}
		Ok(())
	}

	pub async fn is_operator(
		&self,
		owner: Address,
		spender: Address,
	) -> Result<bool, AuthorizationError> {
		let approved: Option<bool> = self
			.storage
			.load(
				StorageKey::Operators.as_str(),
				&operator_id(&owner, &spender),
			)
			.await?;
		Ok(approved.unwrap_or(false))
	}

	pub async fn set_operator(
		&self,
		owner: Address,
		spender: Address,
		approved: bool,
	) -> Result<(), AuthorizationError> {
		let key = operator_id(&owner, &spender);
		let namespace = StorageKey::Operators.as_str();
		if approved {
			self.storage.store(namespace, &key, &true).await?;
		} else {
			self.storage.remove(namespace, &key).await?;
		}
		Ok(())
	}

	/// Reads the value stored under a grant key.
	pub async fn read(&self, key: &GrantKey) -> Result<GrantValue, AuthorizationError> {
		Ok(match *key {
			GrantKey::Allowance { owner, spender, id } => {
				GrantValue::Amount(self.allowance(owner, spender, id).await?)
			},
			GrantKey::Operator { owner, spender } => {
				GrantValue::Approved(self.is_operator(owner, spender).await?)
			},
		})
	}

	/// Writes a value under a grant key.
	///
	/// Mismatched pairs (an amount for an operator key or the reverse) are a
	/// programming error and leave the state untouched.
	pub async fn write(&self, key: &GrantKey, value: GrantValue) -> Result<(), AuthorizationError> {
		match (*key, value) {
			(GrantKey::Allowance { owner, spender, id }, GrantValue::Amount(amount)) => {
				self.set_allowance(owner, spender, id, amount).await
			},
			(GrantKey::Operator { owner, spender }, GrantValue::Approved(approved)) => {
				self.set_operator(owner, spender, approved).await
			},
			(key, value) => {
				debug_assert!(false, "mismatched grant write {:?} <- {:?}", key, value);
				tracing::error!(key = ?key, value = ?value, "Ignored mismatched grant write");
				Ok(())
			},
		}
	}

	pub async fn balance_of(&self, owner: Address, id: U256) -> Result<U256, AuthorizationError> {
		let balance: Option<U256> = self
			.storage
			.load(StorageKey::Balances.as_str(), &balance_id(&owner, &id))
			.await?;
		Ok(balance.unwrap_or(U256::ZERO))
	}

	pub async fn set_balance(
		&self,
		owner: Address,
		id: U256,
		balance: U256,
	) -> Result<(), AuthorizationError> {
		let key = balance_id(&owner, &id);
		let namespace = StorageKey::Balances.as_str();
		if balance.is_zero() {
			self.storage.remove(namespace, &key).await?;
		} else {
			self.storage.store(namespace, &key, &balance).await?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use erc6909x_storage::{implementations::memory::MemoryStorage, StorageService};

	fn state() -> AuthorizationState {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		AuthorizationState::new(Arc::new(JournaledStorage::new(storage)))
	}

	#[tokio::test]
	async fn test_defaults_are_zero() {
		let state = state();
		let (owner, spender) = (Address::repeat_byte(1), Address::repeat_byte(2));

		assert_eq!(
			state.allowance(owner, spender, U256::from(1)).await.unwrap(),
			U256::ZERO
		);
		assert!(!state.is_operator(owner, spender).await.unwrap());
		assert_eq!(
			state.balance_of(owner, U256::from(1)).await.unwrap(),
			U256::ZERO
		);
	}

	#[tokio::test]
	async fn test_allowances_are_per_id() {
		let state = state();
		let (owner, spender) = (Address::repeat_byte(1), Address::repeat_byte(2));

		state
			.set_allowance(owner, spender, U256::from(3), U256::MAX)
			.await
			.unwrap();
		assert_eq!(
			state.allowance(owner, spender, U256::from(3)).await.unwrap(),
			U256::MAX
		);
		assert_eq!(
			state.allowance(owner, spender, U256::from(4)).await.unwrap(),
			U256::ZERO
		);
		assert_eq!(
			state.allowance(spender, owner, U256::from(3)).await.unwrap(),
			U256::ZERO
		);
	}

	#[tokio::test]
	async fn test_grant_key_read_write() {
		let state = state();
		let key = GrantKey::Operator {
			owner: Address::repeat_byte(1),
			spender: Address::repeat_byte(2),
		};

		assert_eq!(state.read(&key).await.unwrap(), GrantValue::Approved(false));
		state.write(&key, GrantValue::Approved(true)).await.unwrap();
		assert_eq!(state.read(&key).await.unwrap(), GrantValue::Approved(true));
		state.write(&key, GrantValue::Approved(false)).await.unwrap();
		assert_eq!(state.read(&key).await.unwrap(), GrantValue::Approved(false));
	}
}
