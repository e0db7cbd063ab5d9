//! Truncation of long identifiers such as nonces and digests for log output.

/// Truncates an identifier to its first 10 characters for display purposes.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}
