//! Utility functions for hashing, formatting and time.
//!
//! This module provides the EIP-712 helpers used to build approval digests and
//! small string helpers used in log output.

pub mod eip712;
pub mod formatting;
pub mod helpers;

pub use eip712::{
	compute_domain_hash, compute_final_digest, Eip712AbiEncoder, APPROVE_AND_CALL_TYPE,
	DOMAIN_TYPE,
};
pub use formatting::truncate_id;
pub use helpers::current_timestamp;
