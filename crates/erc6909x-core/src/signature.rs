//! Verification of signed approval payloads.
//!
//! The shape of the signature blob selects the scheme: exactly 65 bytes is
//! an ECDSA `r || s || v` signature recovered against the owner, any other
//! length is handed to the owner as a contract (ERC-1271). Every failure,
//! including malformed input, reads as an invalid signature.

use crate::receiver::{decode_bytes4, CallbackRevert, ContractRegistry};
use alloy_primitives::Signature;
use async_trait::async_trait;
use erc6909x_types::{Address, ApproveAndCall, Bytes, B256, ERC1271_MAGIC_VALUE, U256};
use std::sync::Arc;

/// Half the order of the secp256k1 curve; larger `s` values are malleable.
const SECP256K1N_HALF: U256 = U256::from_limbs([
	0xdfe9_2f46_681b_20a0,
	0x5d57_6e73_57a4_501d,
	0xffff_ffff_ffff_ffff,
	0x7fff_ffff_ffff_ffff,
]);

const ECDSA_SIGNATURE_LENGTH: usize = 65;

/// Contract able to confirm signatures on its own behalf.
#[async_trait]
pub trait SignatureValidator: Send + Sync {
	/// `isValidSignature(bytes32,bytes)`: returns raw return data, the magic
	/// value as a `bytes4` word when the signature is accepted.
	async fn is_valid_signature(&self, hash: B256, signature: Bytes)
		-> Result<Bytes, CallbackRevert>;
}

/// Signature encoding, chosen by the length of the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
	/// 65-byte `r || s || v` secp256k1 signature.
	Ecdsa,
	/// Anything else, confirmed by the signer contract.
	Contract,
}

impl SignatureKind {
	pub fn of(signature: &[u8]) -> Self {
		if signature.len() == ECDSA_SIGNATURE_LENGTH {
			Self::Ecdsa
		} else {
			Self::Contract
		}
	}
}

/// Checks that an approval payload was authorized by its owner.
pub struct SignatureVerifier {
	contracts: Arc<ContractRegistry>,
}

impl SignatureVerifier {
	pub fn new(contracts: Arc<ContractRegistry>) -> Self {
		Self { contracts }
	}

	/// Returns whether `signature` authorizes `payload` for `payload.owner`
	/// under the given domain separator.
	pub async fn verify(
		&self,
		payload: &ApproveAndCall,
		domain_separator: &B256,
		signature: &[u8],
	) -> bool {
		let digest = payload.signing_hash(domain_separator);
		let kind = SignatureKind::of(signature);
		let valid = match kind {
			SignatureKind::Ecdsa => recover_ecdsa(&digest, signature) == Some(payload.owner),
			SignatureKind::Contract => {
				self.verify_contract(payload.owner, digest, signature).await
			},
		};

		if !valid {
			tracing::warn!(
				owner = %payload.owner,
				kind = ?kind,
				digest = %digest,
				"Rejected signature"
			);
		}
		valid
	}

	async fn verify_contract(&self, signer: Address, digest: B256, signature: &[u8]) -> bool {
		let Some(validator) = self.contracts.validator(&signer) else {
			return false;
		};

		match validator
			.is_valid_signature(digest, Bytes::copy_from_slice(signature))
			.await
		{
			Ok(data) => decode_bytes4(&data) == Some(ERC1271_MAGIC_VALUE),
			Err(revert) => {
				tracing::debug!(signer = %signer, reason = %revert, "Signature validator reverted");
				false
			},
		}
	}
}

/// Recovers the signer of a 65-byte signature over a prehashed digest.
///
/// Only `v` values of 27 and 28 and low-`s` signatures are accepted;
/// recovery to the zero address counts as failure.
pub fn recover_ecdsa(digest: &B256, signature: &[u8]) -> Option<Address> {
	if signature.len() != ECDSA_SIGNATURE_LENGTH {
		return None;
	}

	let r = U256::from_be_slice(&signature[..32]);
	let s = U256::from_be_slice(&signature[32..64]);
	let y_parity = match signature[64] {
		27 => false,
		28 => true,
		_ => return None,
	};
	if s > SECP256K1N_HALF {
		return None;
	}

	let recovered = Signature::new(r, s, y_parity)
		.recover_address_from_prehash(digest)
		.ok()?;
	(!recovered.is_zero()).then_some(recovered)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::receiver::encode_bytes4;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;

	/// Order of the secp256k1 group.
	const SECP256K1N: U256 = U256::from_limbs([
		0xbfd2_5e8c_d036_4141,
		0xbaae_dce6_af48_a03b,
		0xffff_ffff_ffff_fffe,
		0xffff_ffff_ffff_ffff,
	]);

	struct FixedAnswer(Bytes);

	#[async_trait]
	impl SignatureValidator for FixedAnswer {
		async fn is_valid_signature(
			&self,
			_hash: B256,
			_signature: Bytes,
		) -> Result<Bytes, CallbackRevert> {
			Ok(self.0.clone())
		}
	}

	struct Reverting;

	#[async_trait]
	impl SignatureValidator for Reverting {
		async fn is_valid_signature(
			&self,
			_hash: B256,
			_signature: Bytes,
		) -> Result<Bytes, CallbackRevert> {
			Err(CallbackRevert::new("nope"))
		}
	}

	fn payload(owner: Address) -> ApproveAndCall {
		ApproveAndCall::permanent(
			owner,
			Address::repeat_byte(0x22),
			false,
			U256::from(3),
			U256::from(100),
			U256::from(1),
			2_000_000_000,
		)
	}

	fn sign(signer: &PrivateKeySigner, payload: &ApproveAndCall, separator: &B256) -> Vec<u8> {
		let signature = signer
			.sign_hash_sync(&payload.signing_hash(separator))
			.unwrap();
		signature.as_bytes().to_vec()
	}

	fn verifier() -> (SignatureVerifier, Arc<ContractRegistry>) {
		let contracts = Arc::new(ContractRegistry::new());
		(SignatureVerifier::new(contracts.clone()), contracts)
	}

	#[test]
	fn test_kind_by_length() {
		assert_eq!(SignatureKind::of(&[0u8; 65]), SignatureKind::Ecdsa);
		assert_eq!(SignatureKind::of(&[0u8; 64]), SignatureKind::Contract);
		assert_eq!(SignatureKind::of(&[]), SignatureKind::Contract);
		assert_eq!(SignatureKind::of(&[0u8; 66]), SignatureKind::Contract);
	}

	#[tokio::test]
	async fn test_ecdsa_accepts_owner_signature() {
		let (verifier, _) = verifier();
		let signer = PrivateKeySigner::random();
		let separator = B256::repeat_byte(0x11);
		let payload = payload(signer.address());

		let signature = sign(&signer, &payload, &separator);
		assert!(verifier.verify(&payload, &separator, &signature).await);
	}

	#[tokio::test]
	async fn test_ecdsa_rejects_other_signer_and_domain() {
		let (verifier, _) = verifier();
		let owner = PrivateKeySigner::random();
		let other = PrivateKeySigner::random();
		let separator = B256::repeat_byte(0x11);
		let payload = payload(owner.address());

		let forged = sign(&other, &payload, &separator);
		assert!(!verifier.verify(&payload, &separator, &forged).await);

		let signature = sign(&owner, &payload, &separator);
		assert!(
			!verifier
				.verify(&payload, &B256::repeat_byte(0x12), &signature)
				.await
		);
	}

	#[tokio::test]
	async fn test_ecdsa_rejects_malleable_and_bad_v() {
		let (verifier, _) = verifier();
		let signer = PrivateKeySigner::random();
		let separator = B256::repeat_byte(0x11);
		let payload = payload(signer.address());
		let signature = sign(&signer, &payload, &separator);

		// Same point, mirrored s: recovers the same key but must be refused
		let s = U256::from_be_slice(&signature[32..64]);
		let mut malleable = signature.clone();
		malleable[32..64].copy_from_slice(&(SECP256K1N - s).to_be_bytes::<32>());
		malleable[64] = if signature[64] == 27 { 28 } else { 27 };
		assert!(!verifier.verify(&payload, &separator, &malleable).await);

		let mut bad_v = signature.clone();
		bad_v[64] = signature[64] - 27;
		assert!(!verifier.verify(&payload, &separator, &bad_v).await);

		assert!(!verifier.verify(&payload, &separator, &[0u8; 65]).await);
	}

	#[tokio::test]
	async fn test_temporary_flag_is_signed() {
		let (verifier, _) = verifier();
		let signer = PrivateKeySigner::random();
		let separator = B256::repeat_byte(0x11);
		let permanent = payload(signer.address());
		let signature = sign(&signer, &permanent, &separator);

		let temporary = permanent.with_callback(Address::ZERO, Bytes::new());
		assert!(!verifier.verify(&temporary, &separator, &signature).await);
	}

	#[tokio::test]
	async fn test_contract_signatures() {
		let (verifier, contracts) = verifier();
		let wallet = Address::repeat_byte(0x77);
		let separator = B256::repeat_byte(0x11);
		let payload = payload(wallet);

		// No code at the owner
		assert!(!verifier.verify(&payload, &separator, b"blob").await);

		contracts.register_validator(
			wallet,
			Arc::new(FixedAnswer(encode_bytes4(ERC1271_MAGIC_VALUE))),
		);
		assert!(verifier.verify(&payload, &separator, b"blob").await);
		assert!(verifier.verify(&payload, &separator, &[]).await);

		contracts.register_validator(
			wallet,
			Arc::new(FixedAnswer(encode_bytes4(erc6909x_types::FixedBytes([
				0xde, 0xad, 0xbe, 0xef,
			])))),
		);
		assert!(!verifier.verify(&payload, &separator, b"blob").await);

		contracts.register_validator(wallet, Arc::new(FixedAnswer(Bytes::new())));
		assert!(!verifier.verify(&payload, &separator, b"blob").await);

		contracts.register_validator(wallet, Arc::new(Reverting));
		assert!(!verifier.verify(&payload, &separator, b"blob").await);
	}
}
