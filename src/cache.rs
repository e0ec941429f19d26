use std::fmt::Debug;

/// Cache key for a list of arguments: the md5 hex digest of their debug
/// representation.
pub fn key_from_list<T: Debug>(arguments: &[T]) -> String {
	format!("{:x}", md5::compute(format!("{:?}", arguments)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stable_and_distinct() {
		let key = key_from_list(&["product", "en_US", "2"]);
		assert_eq!(key.len(), 32);
		assert_eq!(key, key_from_list(&["product", "en_US", "2"]));
		assert_ne!(key, key_from_list(&["product", "en_US", "3"]));
	}
}
