//! Approval payloads and grant requests.
//!
//! `ApproveAndCall` is the typed-data structure an owner signs. `Grant` is the
//! validated form of the `(operator, id, amount)` triple carried by every
//! approval request: an operator grant can never carry an id or an amount.

use crate::utils::{compute_final_digest, Eip712AbiEncoder, APPROVE_AND_CALL_TYPE};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection of an operator request that also carries an id or an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operator grants must carry id 0 and amount 0 (got id {id}, amount {amount})")]
pub struct MalformedOperatorRequest {
	pub id: U256,
	pub amount: U256,
}

/// Largest deadline representable by the signed `uint48` field.
pub const MAX_DEADLINE: u64 = (1 << 48) - 1;

/// A validated approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grant {
	/// Per-id allowance of `amount`.
	Allowance { id: U256, amount: U256 },
	/// Permission to move any id on behalf of the owner.
	Operator,
}

impl Grant {
	/// Validates the raw `(operator, id, amount)` triple of an approval request.
	pub fn new(operator: bool, id: U256, amount: U256) -> Result<Self, MalformedOperatorRequest> {
		if !operator {
			return Ok(Self::Allowance { id, amount });
		}
		if !id.is_zero() || !amount.is_zero() {
			return Err(MalformedOperatorRequest { id, amount });
		}
		Ok(Self::Operator)
	}

	/// The state entry this grant writes for `(owner, spender)`.
	pub fn key(&self, owner: Address, spender: Address) -> GrantKey {
		match self {
			Self::Allowance { id, .. } => GrantKey::Allowance {
				owner,
				spender,
				id: *id,
			},
			Self::Operator => GrantKey::Operator { owner, spender },
		}
	}

	/// The value this grant writes.
	pub fn value(&self) -> GrantValue {
		match self {
			Self::Allowance { amount, .. } => GrantValue::Amount(*amount),
			Self::Operator => GrantValue::Approved(true),
		}
	}

	pub fn is_operator(&self) -> bool {
		matches!(self, Self::Operator)
	}

	/// The `(id, amount)` pair as it appears on the wire.
	pub fn id_and_amount(&self) -> (U256, U256) {
		match self {
			Self::Allowance { id, amount } => (*id, *amount),
			Self::Operator => (U256::ZERO, U256::ZERO),
		}
	}
}

/// Key of a single authorization entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantKey {
	Allowance {
		owner: Address,
		spender: Address,
		id: U256,
	},
	Operator {
		owner: Address,
		spender: Address,
	},
}

impl GrantKey {
	pub fn owner(&self) -> Address {
		match self {
			Self::Allowance { owner, .. } | Self::Operator { owner, .. } => *owner,
		}
	}

	pub fn spender(&self) -> Address {
		match self {
			Self::Allowance { spender, .. } | Self::Operator { spender, .. } => *spender,
		}
	}
}

/// Value stored under a [`GrantKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantValue {
	Amount(U256),
	Approved(bool),
}

/// The `ERC6909XApproveAndCall` typed-data payload.
///
/// The same structure is signed for both by-signature flows; the `temporary`
/// discriminator makes the two digests differ even when every other field
/// coincides. Permanent approvals sign `target = 0x0` and empty `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveAndCall {
	pub temporary: bool,
	pub owner: Address,
	pub spender: Address,
	pub operator: bool,
	pub id: U256,
	pub amount: U256,
	pub target: Address,
	pub data: Bytes,
	pub nonce: U256,
	/// Expiry as a UNIX timestamp; encoded as `uint48`.
	pub deadline: u64,
}

impl ApproveAndCall {
	/// Payload for the permanent `approveBySig` flow.
	pub fn permanent(
		owner: Address,
		spender: Address,
		operator: bool,
		id: U256,
		amount: U256,
		nonce: U256,
		deadline: u64,
	) -> Self {
		Self {
			temporary: false,
			owner,
			spender,
			operator,
			id,
			amount,
			target: Address::ZERO,
			data: Bytes::new(),
			nonce,
			deadline,
		}
	}

	/// Turns this payload into the temporary flow's payload calling `target` with `data`.
	pub fn with_callback(mut self, target: Address, data: Bytes) -> Self {
		self.temporary = true;
		self.target = target;
		self.data = data;
		self
	}

	/// Validated grant carried by this payload.
	pub fn grant(&self) -> Result<Grant, MalformedOperatorRequest> {
		Grant::new(self.operator, self.id, self.amount)
	}

	/// Whether the deadline fits the signed `uint48` field.
	pub fn deadline_in_range(&self) -> bool {
		self.deadline <= MAX_DEADLINE
	}

	/// EIP-712 `hashStruct` of the payload.
	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(APPROVE_AND_CALL_TYPE.as_bytes()));
		enc.push_bool(self.temporary);
		enc.push_address(&self.owner);
		enc.push_address(&self.spender);
		enc.push_bool(self.operator);
		enc.push_u256(self.id);
		enc.push_u256(self.amount);
		enc.push_address(&self.target);
		enc.push_bytes(&self.data);
		enc.push_u256(self.nonce);
		enc.push_u64(self.deadline);
		keccak256(enc.finish())
	}

	/// Final digest an owner signs under the given domain separator.
	pub fn signing_hash(&self, domain_separator: &B256) -> B256 {
		compute_final_digest(domain_separator, &self.struct_hash())
	}
}
