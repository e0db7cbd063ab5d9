//! Base ERC-6909 ledger.
//!
//! Balances and the permanent approval calls of the multi-token standard.
//! Callbacks spend temporary grants through [`AuthorizationEngine::transfer_from`]
//! exactly as they would spend permanent ones.

use super::AuthorizationEngine;
use crate::AuthorizationError;
use erc6909x_types::{Address, TokenEvent, U256};
use tracing::instrument;

impl AuthorizationEngine {
	pub async fn balance_of(&self, owner: Address, id: U256) -> Result<U256, AuthorizationError> {
		self.state.balance_of(owner, id).await
	}

	/// Moves `amount` of `id` from the caller to `receiver`.
	#[instrument(skip_all, fields(caller = %caller, receiver = %receiver, id = %id))]
	pub async fn transfer(
		&self,
		caller: Address,
		receiver: Address,
		id: U256,
		amount: U256,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			self.move_tokens(caller, caller, receiver, id, amount).await?;
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Moves `amount` of `id` from `sender` to `receiver` on the caller's authority.
	///
	/// Operators bypass the allowance; an allowance of `U256::MAX` is never decreased.
	#[instrument(skip_all, fields(caller = %caller, sender = %sender, receiver = %receiver, id = %id))]
	pub async fn transfer_from(
		&self,
		caller: Address,
		sender: Address,
		receiver: Address,
		id: U256,
		amount: U256,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			if caller != sender && !self.state.is_operator(sender, caller).await? {
				self.spend_allowance(sender, caller, id, amount).await?;
			}
			self.move_tokens(caller, sender, receiver, id, amount).await?;
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Sets the caller's allowance for `spender` on `id`.
	#[instrument(skip_all, fields(owner = %caller, spender = %spender, id = %id))]
	pub async fn approve(
		&self,
		caller: Address,
		spender: Address,
		id: U256,
		amount: U256,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			Self::check_spender(spender)?;
			self.state.set_allowance(caller, spender, id, amount).await?;
			self.journal.emit(TokenEvent::Approval {
				owner: caller,
				spender,
				id,
				amount,
			});
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Grants or revokes `spender` as operator over all of the caller's ids.
	#[instrument(skip_all, fields(owner = %caller, spender = %spender, approved = approved))]
	pub async fn set_operator(
		&self,
		caller: Address,
		spender: Address,
		approved: bool,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			Self::check_spender(spender)?;
			self.state.set_operator(caller, spender, approved).await?;
			self.journal.emit(TokenEvent::OperatorSet {
				owner: caller,
				spender,
				approved,
			});
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Creates `amount` of `id` for `receiver`.
	///
	/// Issuance policy is left to the embedder; the engine only enforces the
	/// arithmetic and the receiver rule.
	#[instrument(skip_all, fields(receiver = %receiver, id = %id))]
	pub async fn mint(
		&self,
		caller: Address,
		receiver: Address,
		id: U256,
		amount: U256,
	) -> Result<(), AuthorizationError> {
		self.in_frame(async {
			if receiver.is_zero() {
				return Err(AuthorizationError::InvalidReceiver(receiver));
			}
			self.credit(receiver, id, amount).await?;
			self.journal.emit(TokenEvent::Transfer {
				caller,
				sender: Address::ZERO,
				receiver,
				id,
				amount,
			});
			Ok::<_, AuthorizationError>(())
		})
		.await
	}

	/// Destroys `amount` of `id` held by `sender`.
	#[instrument(skip_all, fields(sender = %sender, id = %id))]
	pub async fn burn(
		&self,
		caller: Address,
		sender: Address,
		id: U256,
		amount: U256,
	) -> Result<(), AuthorizationError> {
		self.in_frame(async {
			if sender.is_zero() {
				return Err(AuthorizationError::InvalidSender(sender));
			}
			self.debit(sender, id, amount).await?;
			self.journal.emit(TokenEvent::Transfer {
				caller,
				sender,
				receiver: Address::ZERO,
				id,
				amount,
			});
			Ok::<_, AuthorizationError>(())
		})
		.await
	}

	async fn spend_allowance(
		&self,
		owner: Address,
		spender: Address,
		id: U256,
		amount: U256,
	) -> Result<(), AuthorizationError> {
		let allowance = self.state.allowance(owner, spender, id).await?;
		if allowance == U256::MAX {
			return Ok(());
		}
		let remaining =
			allowance
				.checked_sub(amount)
				.ok_or(AuthorizationError::InsufficientAllowance {
					spender,
					id,
					allowance,
					needed: amount,
				})?;
		self.state.set_allowance(owner, spender, id, remaining).await
	}

	async fn move_tokens(
		&self,
		caller: Address,
		sender: Address,
		receiver: Address,
		id: U256,
		amount: U256,
	) -> Result<(), AuthorizationError> {
		if sender.is_zero() {
			return Err(AuthorizationError::InvalidSender(sender));
		}
		if receiver.is_zero() {
			return Err(AuthorizationError::InvalidReceiver(receiver));
		}

		self.debit(sender, id, amount).await?;
		self.credit(receiver, id, amount).await?;
		self.journal.emit(TokenEvent::Transfer {
			caller,
			sender,
			receiver,
			id,
			amount,
		});
		Ok(())
	}

	async fn debit(&self, owner: Address, id: U256, amount: U256) -> Result<(), AuthorizationError> {
		let balance = self.state.balance_of(owner, id).await?;
		let remaining =
			balance
				.checked_sub(amount)
				.ok_or(AuthorizationError::InsufficientBalance {
					sender: owner,
					id,
					balance,
					needed: amount,
				})?;
		self.state.set_balance(owner, id, remaining).await
	}

	async fn credit(&self, owner: Address, id: U256, amount: U256) -> Result<(), AuthorizationError> {
		let balance = self.state.balance_of(owner, id).await?;
		let updated = balance
			.checked_add(amount)
			.ok_or(AuthorizationError::Overflow)?;
		self.state.set_balance(owner, id, updated).await
	}
}
