//! External contracts the engine can call.
//!
//! A temporary approval hands control to a callback target through
//! [`TemporaryApprovalReceiver`]; contract-based signatures are confirmed
//! through [`crate::SignatureValidator`]. Both are looked up by address in the
//! [`ContractRegistry`]. An address without a registered implementation
//! behaves like an account without code.

use crate::signature::SignatureValidator;
use crate::{AuthorizationEngine, AuthorizationError};
use async_trait::async_trait;
use dashmap::DashMap;
use erc6909x_types::{Address, Bytes, FixedBytes, U256};
use std::sync::Arc;
use thiserror::Error;

/// Arguments of `onTemporaryApprove(address,bool,uint256,uint256,bytes)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnTemporaryApprove {
	/// Owner whose rights were temporarily granted.
	pub owner: Address,
	pub operator: bool,
	pub id: U256,
	pub amount: U256,
	/// Opaque payload forwarded from the approval request.
	pub data: Bytes,
}

/// A revert raised by an external contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct CallbackRevert {
	pub reason: String,
}

impl CallbackRevert {
	pub fn new(reason: impl Into<String>) -> Self {
		Self {
			reason: reason.into(),
		}
	}
}

impl From<AuthorizationError> for CallbackRevert {
	fn from(err: AuthorizationError) -> Self {
		Self::new(err.to_string())
	}
}

/// Contract that receives control while holding a temporary approval.
///
/// The callee may re-enter any entry point of the engine. It must return the
/// ABI-encoded acknowledgment ([`erc6909x_types::TEMPORARY_APPROVE_ACK`] as a
/// `bytes4` word, see [`encode_bytes4`]) for the approval to succeed.
#[async_trait]
pub trait TemporaryApprovalReceiver: Send + Sync {
	/// Handles the callback and returns the raw return data.
	async fn on_temporary_approve(
		&self,
		engine: &AuthorizationEngine,
		call: OnTemporaryApprove,
	) -> Result<Bytes, CallbackRevert>;
}

/// ABI-encodes a `bytes4` return value as a left-aligned 32-byte word.
pub fn encode_bytes4(value: FixedBytes<4>) -> Bytes {
	let mut word = [0u8; 32];
	word[..4].copy_from_slice(value.as_slice());
	Bytes::copy_from_slice(&word)
}

/// Decodes a `bytes4` return value.
///
/// Returns `None` for return data shorter than one word or with dirty
/// padding bits, both of which a strict ABI decoder rejects.
pub fn decode_bytes4(data: &[u8]) -> Option<FixedBytes<4>> {
	let word = data.get(..32)?;
	if word[4..].iter().any(|b| *b != 0) {
		return None;
	}
	Some(FixedBytes::from_slice(&word[..4]))
}

/// Address-indexed registry of callable contracts.
#[derive(Default)]
pub struct ContractRegistry {
	receivers: DashMap<Address, Arc<dyn TemporaryApprovalReceiver>>,
	validators: DashMap<Address, Arc<dyn SignatureValidator>>,
}

impl ContractRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Deploys a callback receiver at `address`, replacing any previous one.
	pub fn register_receiver(&self, address: Address, receiver: Arc<dyn TemporaryApprovalReceiver>) {
		self.receivers.insert(address, receiver);
		tracing::debug!(address = %address, "Registered callback receiver");
	}

	/// Deploys a contract signature validator at `address`, replacing any previous one.
	pub fn register_validator(&self, address: Address, validator: Arc<dyn SignatureValidator>) {
		self.validators.insert(address, validator);
		tracing::debug!(address = %address, "Registered signature validator");
	}

	/// Removes every contract deployed at `address`.
	pub fn unregister(&self, address: &Address) {
		self.receivers.remove(address);
		self.validators.remove(address);
	}

	// Clones the Arc out so no map guard outlives the lookup
	pub fn receiver(&self, address: &Address) -> Option<Arc<dyn TemporaryApprovalReceiver>> {
		self.receivers.get(address).map(|r| Arc::clone(r.value()))
	}

	pub fn validator(&self, address: &Address) -> Option<Arc<dyn SignatureValidator>> {
		self.validators.get(address).map(|v| Arc::clone(v.value()))
	}

	/// Whether anything is deployed at `address`.
	pub fn has_code(&self, address: &Address) -> bool {
		self.receivers.contains_key(address) || self.validators.contains_key(address)
	}
}
