//! Secure string type for signer private keys.
//!
//! `SecretString` zeroes its memory on drop and never prints its contents in
//! `Debug` or `Display` output, so configuration structs holding keys can be
//! logged safely.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string that is zeroed on drop and redacted when formatted.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret to a closure, limiting the scope where it is visible.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString(***REDACTED***)")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "***REDACTED***")
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl Serialize for SecretString {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		// Never write the key back out
		serializer.serialize_str("***REDACTED***")
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		String::deserialize(deserializer).map(Self::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_redacted_formatting() {
		let secret = SecretString::from("0xdeadbeef");
		assert_eq!(format!("{}", secret), "***REDACTED***");
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(secret.with_exposed(|s| s.len()), 10);
	}

	#[test]
	fn test_serialization_redacts() {
		let secret = SecretString::from("0xdeadbeef");
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, "\"***REDACTED***\"");

		let decoded: SecretString = serde_json::from_str("\"0xabc\"").unwrap();
		assert_eq!(decoded.with_exposed(|s| s.to_string()), "0xabc");
	}
}
