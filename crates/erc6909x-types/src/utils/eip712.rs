//! EIP-712 utilities for the approval payload.
//!
//! These helpers provide:
//! - Domain separator computation
//! - Final digest computation (0x1901 || domainSeparator || structHash)
//! - A minimal ABI encoder for the field types of `ERC6909XApproveAndCall`

use alloy_primitives::{keccak256, Address, B256, U256};

pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const APPROVE_AND_CALL_TYPE: &str = "ERC6909XApproveAndCall(bool temporary,address owner,address spender,bool operator,uint256 id,uint256 amount,address target,bytes data,uint256 nonce,uint48 deadline)";

/// Compute the EIP-712 domain separator
/// (keccak256(abi.encode(typeHash, nameHash, versionHash, chainId, verifyingContract))).
pub fn compute_domain_hash(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
	enc.push_b256(&keccak256(name.as_bytes()));
	enc.push_b256(&keccak256(version.as_bytes()));
	enc.push_u256(U256::from(chain_id));
	enc.push_address(verifying_contract);
	keccak256(enc.finish())
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainSeparator || structHash).
pub fn compute_final_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_separator.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for the words of an EIP-712 struct hash.
///
/// Every push appends exactly one 32-byte word; dynamic `bytes` are pushed
/// as their keccak256 hash as EIP-712 requires.
#[derive(Debug, Default)]
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u64(&mut self, v: u64) {
		let mut word = [0u8; 32];
		word[24..].copy_from_slice(&v.to_be_bytes());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_bool(&mut self, v: bool) {
		let mut word = [0u8; 32];
		word[31] = u8::from(v);
		self.buf.extend_from_slice(&word);
	}

	pub fn push_bytes(&mut self, data: &[u8]) {
		self.push_b256(&keccak256(data));
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
