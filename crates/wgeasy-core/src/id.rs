// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

const ID_BYTES: usize = 10;

/// Opaque client identifier: 20 lowercase hex characters drawn from 10
/// random bytes. Collisions are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
	pub fn generate() -> Self {
		let mut bytes = [0u8; ID_BYTES];
		rand::thread_rng().fill_bytes(&mut bytes);
		Self(hex::encode(bytes))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ClientId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ClientId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for ClientId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

impl std::str::FromStr for ClientId {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::from(s))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn generated_ids_are_20_hex_chars() {
		let id = ClientId::generate();
		assert_eq!(id.as_str().len(), 20);
		assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn generated_ids_differ() {
		let ids: HashSet<ClientId> = (0..256).map(|_| ClientId::generate()).collect();
		assert_eq!(ids.len(), 256);
	}

	#[test]
	fn serializes_as_plain_string() {
		let id = ClientId::from("0123456789abcdef0123");
		assert_eq!(serde_json::to_string(&id).unwrap(), "\"0123456789abcdef0123\"");
	}
}
