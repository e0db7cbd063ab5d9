//! Core authorization engine for ERC-6909X multi-tokens.
//!
//! This module ties together the pieces that grant spending rights over
//! multi-id balances: the signature verifier, the nonce registry, the
//! persisted authorization state and the temporary-approval orchestrator
//! that brackets an untrusted callback with a grant and its revocation.
//!
//! Every public entry point runs inside a call frame of the
//! [`JournaledStorage`]: when it fails, all of its writes and buffered events
//! are rolled back, including those of reentrant calls made from a callback.

use erc6909x_storage::StorageError;
use erc6909x_types::{Address, MalformedOperatorRequest, U256};
use thiserror::Error;

pub mod builder;
pub mod engine;
pub mod nonce;
pub mod orchestrator;
pub mod receiver;
pub mod request;
pub mod signature;
pub mod state;

pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use engine::AuthorizationEngine;
pub use nonce::NonceRegistry;
pub use orchestrator::{TemporaryApprovalOrchestrator, TemporaryGrant};
pub use receiver::{
	decode_bytes4, encode_bytes4, CallbackRevert, ContractRegistry, OnTemporaryApprove,
	TemporaryApprovalReceiver,
};
pub use request::{SignedApproval, SignedTemporaryApproval, TemporaryApproval};
pub use signature::{SignatureKind, SignatureValidator, SignatureVerifier};
pub use state::{journal::JournaledStorage, AuthorizationState};

/// Errors returned by the authorization engine's entry points.
///
/// Any of these aborts the whole entry point; no partial state change
/// survives a failed call.
#[derive(Debug, Error)]
pub enum AuthorizationError {
	/// The signature is malformed or was not produced by the claimed owner.
	#[error("Invalid signature for owner {owner}")]
	InvalidSignature { owner: Address },
	/// The `(owner, nonce)` pair was already consumed or invalidated.
	#[error("Nonce {nonce} of {owner} already consumed")]
	NonceAlreadyConsumed { owner: Address, nonce: U256 },
	/// The signed deadline lies before the current block timestamp.
	#[error("Deadline {deadline} expired at {now}")]
	DeadlineExpired { deadline: u64, now: u64 },
	/// The deadline does not fit the signed `uint48` field, so no owner can have signed it.
	#[error("Deadline {0} exceeds the uint48 range")]
	DeadlineOutOfRange(u64),
	/// An operator grant also carried an id or an amount.
	#[error(transparent)]
	MalformedOperatorRequest(#[from] MalformedOperatorRequest),
	/// The callback target reverted, does not exist or returned a wrong acknowledgment.
	#[error("Callback to {target} rejected: {reason}")]
	CallbackRejected { target: Address, reason: String },
	/// An addition would exceed `U256::MAX`.
	#[error("Arithmetic overflow")]
	Overflow,
	/// The sender's balance is lower than the amount moved.
	#[error("Insufficient balance of {sender} for id {id}: have {balance}, need {needed}")]
	InsufficientBalance {
		sender: Address,
		id: U256,
		balance: U256,
		needed: U256,
	},
	/// The spender's allowance is lower than the amount moved.
	#[error("Insufficient allowance of {spender} for id {id}: have {allowance}, need {needed}")]
	InsufficientAllowance {
		spender: Address,
		id: U256,
		allowance: U256,
		needed: U256,
	},
	/// Tokens cannot be moved from the zero address.
	#[error("Invalid sender: {0}")]
	InvalidSender(Address),
	/// Tokens cannot be moved to the zero address.
	#[error("Invalid receiver: {0}")]
	InvalidReceiver(Address),
	/// Rights cannot be granted to the zero address.
	#[error("Invalid spender: {0}")]
	InvalidSpender(Address),
	/// The storage backend failed.
	#[error("State error: {0}")]
	State(#[from] StorageError),
}
