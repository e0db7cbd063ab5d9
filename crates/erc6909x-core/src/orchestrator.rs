//! Temporary-approval orchestration.
//!
//! A temporary approval runs through `Granting -> CallbackPending ->
//! Restoring`: the prior value under the grant key is pushed on a snapshot
//! stack, the grant is written, the target's callback runs, and the snapshot
//! is popped and written back whatever the callback did. Nested temporary
//! approvals from inside a callback push and pop their own snapshots, so
//! grants on the same key unwind in LIFO order.

use crate::receiver::{decode_bytes4, ContractRegistry, OnTemporaryApprove};
use crate::state::AuthorizationState;
use crate::{AuthorizationEngine, AuthorizationError};
use erc6909x_types::{Address, Bytes, Grant, GrantKey, GrantValue, TEMPORARY_APPROVE_ACK};
use std::sync::{Arc, Mutex, MutexGuard};

/// Value a temporary grant replaced, restored when its invocation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporaryGrant {
	pub key: GrantKey,
	pub previous: GrantValue,
}

/// Grants a temporary right around a single external callback.
pub struct TemporaryApprovalOrchestrator {
	state: Arc<AuthorizationState>,
	contracts: Arc<ContractRegistry>,
	snapshots: Mutex<Vec<TemporaryGrant>>,
}

impl TemporaryApprovalOrchestrator {
	pub fn new(state: Arc<AuthorizationState>, contracts: Arc<ContractRegistry>) -> Self {
		Self {
			state,
			contracts,
			snapshots: Mutex::new(Vec::new()),
		}
	}

	fn snapshots(&self) -> MutexGuard<'_, Vec<TemporaryGrant>> {
		self.snapshots
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Number of temporary grants currently in flight.
	pub fn depth(&self) -> usize {
		self.snapshots().len()
	}

	/// Snapshots currently in flight, outermost first.
	pub fn active_grants(&self) -> Vec<TemporaryGrant> {
		self.snapshots().clone()
	}

	/// Applies `grant` from `owner` to `spender`, calls `target` and restores
	/// the previous value.
	///
	/// The restore happens on every path; the callback's outcome is returned
	/// afterwards.
	pub async fn run(
		&self,
		engine: &AuthorizationEngine,
		owner: Address,
		spender: Address,
		grant: Grant,
		target: Address,
		data: Bytes,
	) -> Result<(), AuthorizationError> {
		let key = grant.key(owner, spender);
		let previous = self.state.read(&key).await?;
		let depth = {
			let mut snapshots = self.snapshots();
			snapshots.push(TemporaryGrant { key, previous });
			snapshots.len()
		};
		tracing::debug!(owner = %owner, spender = %spender, depth, "Granted temporary approval");

		let outcome = match self.state.write(&key, grant.value()).await {
			Ok(()) => self.call_target(engine, owner, grant, target, data).await,
			Err(e) => Err(e),
		};

		let snapshot = {
			let mut snapshots = self.snapshots();
			snapshots.truncate(depth);
			snapshots.pop()
		};
		let restore = match snapshot {
			Some(snapshot) => self.state.write(&snapshot.key, snapshot.previous).await,
			None => {
				tracing::error!(depth, "Temporary approval snapshot missing");
				self.state.write(&key, previous).await
			},
		};
		tracing::debug!(owner = %owner, spender = %spender, depth, "Restored prior approval");

		restore?;
		outcome
	}

	async fn call_target(
		&self,
		engine: &AuthorizationEngine,
		owner: Address,
		grant: Grant,
		target: Address,
		data: Bytes,
	) -> Result<(), AuthorizationError> {
		let Some(receiver) = self.contracts.receiver(&target) else {
			return Err(self.rejected(target, "no callback receiver at target".into()));
		};

		let (id, amount) = grant.id_and_amount();
		let call = OnTemporaryApprove {
			owner,
			operator: grant.is_operator(),
			id,
			amount,
			data,
		};

		let returned = receiver
			.on_temporary_approve(engine, call)
			.await
			.map_err(|revert| self.rejected(target, format!("reverted: {}", revert)))?;

		match decode_bytes4(&returned) {
			Some(ack) if ack == TEMPORARY_APPROVE_ACK => Ok(()),
			Some(other) => Err(self.rejected(target, format!("unexpected acknowledgment {}", other))),
			None => Err(self.rejected(target, "malformed acknowledgment".into())),
		}
	}

	fn rejected(&self, target: Address, reason: String) -> AuthorizationError {
		tracing::warn!(callback = %target, reason = %reason, "Callback rejected");
		AuthorizationError::CallbackRejected { target, reason }
	}
}
