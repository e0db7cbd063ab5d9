//! Arguments of the approval entry points.
//!
//! Each by-signature request rebuilds the exact payload its owner must have
//! signed, with the `temporary` flag fixed by the entry point rather than by
//! the submitter.

use erc6909x_types::{Address, ApproveAndCall, Bytes, U256};
use serde::{Deserialize, Serialize};

/// `approveBySig`: a permanent grant authorized by the owner's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedApproval {
	pub owner: Address,
	pub spender: Address,
	pub operator: bool,
	pub id: U256,
	pub amount: U256,
	pub deadline: u64,
	pub nonce: U256,
	pub signature: Bytes,
}

impl SignedApproval {
	/// The payload the owner signed: `temporary = false`, no target and no data.
	pub fn payload(&self) -> ApproveAndCall {
		ApproveAndCall::permanent(
			self.owner,
			self.spender,
			self.operator,
			self.id,
			self.amount,
			self.nonce,
			self.deadline,
		)
	}
}

/// `temporaryApproveAndCall`: the caller grants a right for the duration of one callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryApproval {
	pub spender: Address,
	pub operator: bool,
	pub id: U256,
	pub amount: U256,
	pub target: Address,
	pub data: Bytes,
}

/// `temporaryApproveAndCallBySig`: a temporary grant authorized by the owner's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTemporaryApproval {
	pub owner: Address,
	pub spender: Address,
	pub operator: bool,
	pub id: U256,
	pub amount: U256,
	pub target: Address,
	pub data: Bytes,
	pub deadline: u64,
	pub nonce: U256,
	pub signature: Bytes,
}

impl SignedTemporaryApproval {
	/// The payload the owner signed: `temporary = true` with the callback target and data.
	pub fn payload(&self) -> ApproveAndCall {
		ApproveAndCall::permanent(
			self.owner,
			self.spender,
			self.operator,
			self.id,
			self.amount,
			self.nonce,
			self.deadline,
		)
		.with_callback(self.target, self.data.clone())
	}

	/// The callback half of the request, as the owner would have submitted it natively.
	pub fn approval(&self) -> TemporaryApproval {
		TemporaryApproval {
			spender: self.spender,
			operator: self.operator,
			id: self.id,
			amount: self.amount,
			target: self.target,
			data: self.data.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_payload_flags() {
		let temporary = SignedTemporaryApproval {
			owner: Address::repeat_byte(1),
			spender: Address::repeat_byte(2),
			operator: false,
			id: U256::from(3),
			amount: U256::from(100),
			target: Address::repeat_byte(4),
			data: Bytes::from_static(b"hi"),
			deadline: 10,
			nonce: U256::from(9),
			signature: Bytes::new(),
		};
		let payload = temporary.payload();
		assert!(payload.temporary);
		assert_eq!(payload.target, Address::repeat_byte(4));
		assert_eq!(payload.data, Bytes::from_static(b"hi"));

		let permanent = SignedApproval {
			owner: temporary.owner,
			spender: temporary.spender,
			operator: false,
			id: temporary.id,
			amount: temporary.amount,
			deadline: temporary.deadline,
			nonce: temporary.nonce,
			signature: Bytes::new(),
		}
		.payload();
		assert!(!permanent.temporary);
		assert_eq!(permanent.target, Address::ZERO);
		assert!(permanent.data.is_empty());
		assert_ne!(permanent.struct_hash(), payload.struct_hash());
	}
}
