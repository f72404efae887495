// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key material as produced by the external toolchain. Keys are opaque
//! base64 strings; this crate never does curve arithmetic itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use wgeasy_common_secret::SecretString;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let prefix: String = self.0.chars().take(8).collect();
		f.debug_tuple("PublicKey")
			.field(&format!("{prefix}..."))
			.finish()
	}
}

impl fmt::Display for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Clone)]
pub struct KeyPair {
	pub private_key: SecretString,
	pub public_key: PublicKey,
}

impl fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyPair")
			.field("private_key", &self.private_key)
			.field("public_key", &self.public_key)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wgeasy_common_secret::Secret;

	#[test]
	fn public_key_debug_shows_prefix_only() {
		let key = PublicKey::new("xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=");
		let debug = format!("{key:?}");
		assert!(debug.contains("xTIBA5rb..."));
		assert!(!debug.contains("NAB4mZqp8Dg="));
		assert_eq!(key.to_string(), key.as_str());
	}

	#[test]
	fn keypair_debug_redacts_private_key() {
		let pair = KeyPair {
			private_key: Secret::new("yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=".to_string()),
			public_key: PublicKey::new("xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg="),
		};
		let debug = format!("{pair:?}");
		assert!(debug.contains("[REDACTED]"));
		assert!(!debug.contains("yAnz5TF"));
	}
}
