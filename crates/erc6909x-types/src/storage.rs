//! Storage-related types for the authorization state.

use std::str::FromStr;

/// Storage namespaces for the different collections of persisted state.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Per-id allowances keyed by `(owner, spender, id)`
	Allowances,
	/// Operator grants keyed by `(owner, spender)`
	Operators,
	/// Token balances keyed by `(owner, id)`
	Balances,
	/// Consumed nonces keyed by `(owner, nonce)`
	Nonces,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Allowances => "allowances",
			StorageKey::Operators => "operators",
			StorageKey::Balances => "balances",
			StorageKey::Nonces => "nonces",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Allowances,
			Self::Operators,
			Self::Balances,
			Self::Nonces,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"allowances" => Ok(Self::Allowances),
			"operators" => Ok(Self::Operators),
			"balances" => Ok(Self::Balances),
			"nonces" => Ok(Self::Nonces),
			_ => Err(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_round_trip_names() {
		for key in StorageKey::all() {
			assert_eq!(key.as_str().parse::<StorageKey>(), Ok(key));
		}
		assert!("orders".parse::<StorageKey>().is_err());
	}
}
