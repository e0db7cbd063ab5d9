//! Event types emitted by the authorization engine.
//!
//! Events are buffered per call frame and only published once the outermost
//! entry point completes successfully; a failing frame drops its events along
//! with its state changes.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Events emitted by the token and its authorization extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TokenEvent {
	/// A nonce moved to the consumed set, by signature or explicit invalidation.
	NonceInvalidation { owner: Address, nonce: U256 },
	/// A per-id allowance was set permanently.
	Approval {
		owner: Address,
		spender: Address,
		id: U256,
		amount: U256,
	},
	/// An operator grant was set permanently.
	OperatorSet {
		owner: Address,
		spender: Address,
		approved: bool,
	},
	/// Tokens moved between accounts; mints use the zero sender, burns the zero receiver.
	Transfer {
		caller: Address,
		sender: Address,
		receiver: Address,
		id: U256,
		amount: U256,
	},
}

impl TokenEvent {
	/// Short name of the event, used in log output.
	pub fn name(&self) -> &'static str {
		match self {
			Self::NonceInvalidation { .. } => "NonceInvalidation",
			Self::Approval { .. } => "Approval",
			Self::OperatorSet { .. } => "OperatorSet",
			Self::Transfer { .. } => "Transfer",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_event_serialization_tag() {
		let event = TokenEvent::NonceInvalidation {
			owner: Address::repeat_byte(0xaa),
			nonce: U256::from(42),
		};
		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["event"], "nonce_invalidation");

		let decoded: TokenEvent = serde_json::from_value(json).unwrap();
		assert_eq!(decoded, event);
		assert_eq!(decoded.name(), "NonceInvalidation");
	}
}
