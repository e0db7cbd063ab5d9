//! Solidity ABI declarations for the ERC-6909X extension.
//!
//! Selectors and the typed-data struct are derived from these declarations
//! rather than written by hand, so the on-chain interface and the engine can
//! never drift apart.

use alloy_primitives::{fixed_bytes, FixedBytes};
use alloy_sol_types::{sol, SolCall};

sol! {
	/// Entry points of the ERC-6909X authorization extension.
	interface IERC6909X {
		event NonceInvalidation(address indexed owner, uint256 indexed nonce);

		function approveBySig(address owner, address spender, bool operator, uint256 id, uint256 amount, uint48 deadline, uint256 nonce, bytes signature) external returns (bool);
		function temporaryApproveAndCall(address spender, bool operator, uint256 id, uint256 amount, address target, bytes data) external returns (bool);
		function temporaryApproveAndCallBySig(address owner, address spender, bool operator, uint256 id, uint256 amount, address target, bytes data, uint48 deadline, uint256 nonce, bytes signature) external returns (bool);
		function invalidateNonce(uint256 nonce) external returns (bool);
	}

	/// Callback a temporary-approval target must implement.
	interface IERC6909XCallback {
		function onTemporaryApprove(address owner, bool operator, uint256 id, uint256 amount, bytes data) external returns (bytes4);
	}

	/// Contract-based signature validation.
	interface IERC1271 {
		function isValidSignature(bytes32 hash, bytes signature) external view returns (bytes4 magicValue);
	}

	/// Typed-data payload signed by an owner for both the permanent and the
	/// temporary by-signature flows.
	struct ERC6909XApproveAndCall {
		bool temporary;
		address owner;
		address spender;
		bool operator;
		uint256 id;
		uint256 amount;
		address target;
		bytes data;
		uint256 nonce;
		uint48 deadline;
	}
}

/// Acknowledgment a callback target must return: the `onTemporaryApprove` selector.
pub const TEMPORARY_APPROVE_ACK: FixedBytes<4> = fixed_bytes!("b74de3da");

/// Magic value returned by `isValidSignature` for a valid signature.
pub const ERC1271_MAGIC_VALUE: FixedBytes<4> = fixed_bytes!("1626ba7e");

/// ERC-165 `supportsInterface(bytes4)` interface identifier.
pub const ERC165_INTERFACE_ID: FixedBytes<4> = fixed_bytes!("01ffc9a7");

/// Base ERC-6909 interface identifier.
pub const ERC6909_INTERFACE_ID: FixedBytes<4> = fixed_bytes!("0f632fb3");

/// Interface identifier of the ERC-6909X extension: the XOR of its entry-point selectors.
pub fn erc6909x_interface_id() -> FixedBytes<4> {
	let selectors = [
		IERC6909X::approveBySigCall::SELECTOR,
		IERC6909X::temporaryApproveAndCallCall::SELECTOR,
		IERC6909X::temporaryApproveAndCallBySigCall::SELECTOR,
		IERC6909X::invalidateNonceCall::SELECTOR,
	];

	let mut id = [0u8; 4];
	for selector in selectors {
		for (byte, s) in id.iter_mut().zip(selector) {
			*byte ^= s;
		}
	}
	FixedBytes(id)
}
