//! Common types module for the ERC-6909X authorization system.
//!
//! This module defines the core data types shared by the storage, account,
//! configuration and engine crates: the signed approval payload, the grant
//! model, emitted events, storage namespaces and EIP-712 helpers.

/// Solidity ABI declarations for the extension interface and its callbacks.
pub mod abi;
/// Approval payloads and grant requests.
pub mod approval;
/// Events emitted by the authorization engine and the base ledger.
pub mod events;
/// Wrapper for sensitive strings such as private keys.
pub mod secret_string;
/// Storage namespaces for persisted authorization state.
pub mod storage;
/// Utility functions for EIP-712 hashing, formatting and time.
pub mod utils;

pub use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};

pub use abi::{
	erc6909x_interface_id, ERC1271_MAGIC_VALUE, ERC165_INTERFACE_ID, ERC6909_INTERFACE_ID,
	TEMPORARY_APPROVE_ACK,
};
pub use approval::{
	ApproveAndCall, Grant, GrantKey, GrantValue, MalformedOperatorRequest, MAX_DEADLINE,
};
pub use events::TokenEvent;
pub use secret_string::SecretString;
pub use storage::StorageKey;
pub use utils::{current_timestamp, truncate_id};
