//! The ERC-6909X authorization engine.
//!
//! Entry points take `&self` plus the address of the immediate caller, so a
//! callback holding `&AuthorizationEngine` can re-enter any of them. Each
//! entry point runs in its own journal frame.

mod ledger;

use crate::nonce::NonceRegistry;
use crate::orchestrator::{TemporaryApprovalOrchestrator, TemporaryGrant};
use crate::receiver::ContractRegistry;
use crate::request::{SignedApproval, SignedTemporaryApproval, TemporaryApproval};
use crate::signature::SignatureVerifier;
use crate::state::{journal::JournaledStorage, AuthorizationState};
use crate::AuthorizationError;
use erc6909x_storage::StorageService;
use erc6909x_types::{
	current_timestamp, erc6909x_interface_id, truncate_id, Address, ApproveAndCall, Bytes,
	FixedBytes, Grant, TokenEvent, B256, ERC165_INTERFACE_ID, ERC6909_INTERFACE_ID, U256,
};
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::instrument;

/// Authorization engine of a single ERC-6909X token.
pub struct AuthorizationEngine {
	domain_separator: B256,
	journal: Arc<JournaledStorage>,
	state: Arc<AuthorizationState>,
	nonces: NonceRegistry,
	verifier: SignatureVerifier,
	orchestrator: TemporaryApprovalOrchestrator,
	contracts: Arc<ContractRegistry>,
	/// Pinned block timestamp; the system clock is used when unset.
	block_timestamp: RwLock<Option<u64>>,
}

impl AuthorizationEngine {
	/// Creates an engine over `storage`, accepting signatures made under `domain_separator`.
	pub fn new(storage: Arc<StorageService>, domain_separator: B256) -> Self {
		let journal = Arc::new(JournaledStorage::new(storage));
		let state = Arc::new(AuthorizationState::new(journal.clone()));
		let contracts = Arc::new(ContractRegistry::new());

		Self {
			domain_separator,
			nonces: NonceRegistry::new(journal.clone()),
			verifier: SignatureVerifier::new(contracts.clone()),
			orchestrator: TemporaryApprovalOrchestrator::new(state.clone(), contracts.clone()),
			journal,
			state,
			contracts,
			block_timestamp: RwLock::new(None),
		}
	}

	pub fn domain_separator(&self) -> B256 {
		self.domain_separator
	}

	/// Contracts reachable as callback targets or signature validators.
	pub fn contracts(&self) -> &Arc<ContractRegistry> {
		&self.contracts
	}

	/// Current block timestamp used for deadline checks.
	pub fn block_timestamp(&self) -> u64 {
		let pinned = *self
			.block_timestamp
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		pinned.unwrap_or_else(current_timestamp)
	}

	/// Pins the block timestamp, or returns to the system clock with `None`.
	pub fn set_block_timestamp(&self, timestamp: Option<u64>) {
		*self
			.block_timestamp
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner()) = timestamp;
	}

	/// ERC-165 introspection.
	pub fn supports_interface(&self, interface_id: FixedBytes<4>) -> bool {
		interface_id == ERC165_INTERFACE_ID
			|| interface_id == ERC6909_INTERFACE_ID
			|| interface_id == erc6909x_interface_id()
	}

	pub async fn allowance(
		&self,
		owner: Address,
		spender: Address,
		id: U256,
	) -> Result<U256, AuthorizationError> {
		self.state.allowance(owner, spender, id).await
	}

	pub async fn is_operator(
		&self,
		owner: Address,
		spender: Address,
	) -> Result<bool, AuthorizationError> {
		self.state.is_operator(owner, spender).await
	}

	pub async fn is_nonce_consumed(
		&self,
		owner: Address,
		nonce: U256,
	) -> Result<bool, AuthorizationError> {
		self.nonces.is_consumed(owner, nonce).await
	}

	/// Temporary grants currently in flight, outermost first.
	pub fn active_temporary_grants(&self) -> Vec<TemporaryGrant> {
		self.orchestrator.active_grants()
	}

	/// Events emitted by committed top-level calls, oldest first.
	pub fn events(&self) -> Vec<TokenEvent> {
		self.journal.events()
	}

	/// Drains the emitted events.
	pub fn take_events(&self) -> Vec<TokenEvent> {
		self.journal.take_events()
	}

	/// Grants a permanent allowance or operator right from a signed payload.
	///
	/// The caller is only a relayer; the owner is authenticated by the
	/// signature and the nonce is consumed on success.
	#[instrument(skip_all, fields(owner = %request.owner, spender = %request.spender, nonce = %truncate_id(&request.nonce.to_string())))]
	pub async fn approve_by_sig(
		&self,
		caller: Address,
		request: &SignedApproval,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			let payload = request.payload();
			let grant = self.check_grant(&payload)?;
			self.authenticate(&payload, &request.signature).await?;

			self.apply_grant(payload.owner, payload.spender, grant).await?;
			tracing::info!(relayer = %caller, operator = grant.is_operator(), "Approved by signature");
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Grants the caller's right to `spender` for the duration of a callback to `target`.
	#[instrument(skip_all, fields(owner = %caller, spender = %request.spender, callback = %request.target))]
	pub async fn temporary_approve_and_call(
		&self,
		caller: Address,
		request: &TemporaryApproval,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			let grant = Grant::new(request.operator, request.id, request.amount)?;
			Self::check_spender(request.spender)?;

			self.orchestrator
				.run(
					self,
					caller,
					request.spender,
					grant,
					request.target,
					request.data.clone(),
				)
				.await?;
			tracing::info!(operator = grant.is_operator(), "Temporary approval completed");
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Same as [`Self::temporary_approve_and_call`] with the owner authenticated by signature.
	#[instrument(skip_all, fields(owner = %request.owner, spender = %request.spender, callback = %request.target, nonce = %truncate_id(&request.nonce.to_string())))]
	pub async fn temporary_approve_and_call_by_sig(
		&self,
		caller: Address,
		request: &SignedTemporaryApproval,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			let payload = request.payload();
			let grant = self.check_grant(&payload)?;
			self.authenticate(&payload, &request.signature).await?;

			self.orchestrator
				.run(
					self,
					payload.owner,
					payload.spender,
					grant,
					payload.target,
					payload.data,
				)
				.await?;
			tracing::info!(relayer = %caller, operator = grant.is_operator(), "Temporary approval by signature completed");
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Burns one of the caller's own nonces.
	#[instrument(skip_all, fields(owner = %caller, nonce = %truncate_id(&nonce.to_string())))]
	pub async fn invalidate_nonce(
		&self,
		caller: Address,
		nonce: U256,
	) -> Result<bool, AuthorizationError> {
		self.in_frame(async {
			self.nonces.invalidate(caller, nonce).await?;
			Ok::<_, AuthorizationError>(true)
		})
		.await
	}

	/// Runs `work` in a journal frame, reverting all of its writes and events on failure.
	async fn in_frame<T>(
		&self,
		work: impl Future<Output = Result<T, AuthorizationError>>,
	) -> Result<T, AuthorizationError> {
		let checkpoint = self.journal.checkpoint();
		match work.await {
			Ok(value) => {
				self.journal.commit(checkpoint)?;
				Ok(value)
			},
			Err(err) => {
				if let Err(revert_err) = self.journal.revert(checkpoint).await {
					tracing::error!(error = %revert_err, "Failed to revert call frame");
					return Err(revert_err.into());
				}
				tracing::debug!(error = %err, depth = checkpoint.depth(), "Call frame reverted");
				Err(err)
			},
		}
	}

	/// Validates everything about a signed payload that does not need the signature.
	fn check_grant(&self, payload: &ApproveAndCall) -> Result<Grant, AuthorizationError> {
		let grant = payload.grant()?;
		Self::check_spender(payload.spender)?;

		if !payload.deadline_in_range() {
			return Err(AuthorizationError::DeadlineOutOfRange(payload.deadline));
		}
		let now = self.block_timestamp();
		if now > payload.deadline {
			return Err(AuthorizationError::DeadlineExpired {
				deadline: payload.deadline,
				now,
			});
		}
		Ok(grant)
	}

	/// Verifies the owner's signature over `payload` and consumes its nonce.
	async fn authenticate(
		&self,
		payload: &ApproveAndCall,
		signature: &Bytes,
	) -> Result<(), AuthorizationError> {
		if !self
			.verifier
			.verify(payload, &self.domain_separator, signature)
			.await
		{
			return Err(AuthorizationError::InvalidSignature {
				owner: payload.owner,
			});
		}
		self.nonces.consume(payload.owner, payload.nonce).await
	}

	fn check_spender(spender: Address) -> Result<(), AuthorizationError> {
		if spender.is_zero() {
			return Err(AuthorizationError::InvalidSpender(spender));
		}
		Ok(())
	}

	/// Writes a permanent grant and emits its event.
	async fn apply_grant(
		&self,
		owner: Address,
		spender: Address,
		grant: Grant,
	) -> Result<(), AuthorizationError> {
		match grant {
			Grant::Allowance { id, amount } => {
				self.state.set_allowance(owner, spender, id, amount).await?;
				self.journal.emit(TokenEvent::Approval {
					owner,
					spender,
					id,
					amount,
				});
			},
			Grant::Operator => {
				self.state.set_operator(owner, spender, true).await?;
				self.journal.emit(TokenEvent::OperatorSet {
					owner,
					spender,
					approved: true,
				});
			},
		}
		Ok(())
	}
}
