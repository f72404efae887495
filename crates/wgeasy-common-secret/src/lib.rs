// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for key material.
//!
//! [`Secret<T>`] keeps private keys out of logs and debug dumps:
//!
//! - `Debug` and `Display` print `[REDACTED]`
//! - `Serialize` writes `"[REDACTED]"` unless a field opts in with
//!   `#[serde(with = "wgeasy_common_secret::exposed")]`
//! - the inner value is zeroized on drop
//!
//! ```
//! use wgeasy_common_secret::Secret;
//!
//! let key = Secret::new("aGVsbG8gd29ybGQ=".to_string());
//! assert_eq!(format!("{key}"), "[REDACTED]");
//! assert_eq!(key.expose(), "aGVsbG8gd29ybGQ=");
//! ```

use std::fmt;
use zeroize::Zeroize;

pub const REDACTED: &str = "[REDACTED]";

#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the wrapped value. Every call site is a place key material leaves
	/// the wrapper, so keep them easy to grep for.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self::new(self.inner.clone())
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

/// Serde adapter for documents that must store key material verbatim, such
/// as the on-disk state file. Only use it on types that never reach a log or
/// an API response.
#[cfg(feature = "serde")]
pub mod exposed {
	use super::Secret;
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	pub fn serialize<T, S>(secret: &Secret<T>, serializer: S) -> Result<S::Ok, S::Error>
	where
		T: Serialize + Zeroize,
		S: Serializer,
	{
		secret.expose().serialize(serializer)
	}

	pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Secret<T>, D::Error>
	where
		T: Deserialize<'de> + Zeroize,
		D: Deserializer<'de>,
	{
		T::deserialize(deserializer).map(Secret::new)
	}

	/// Same as the parent module, for optional fields.
	pub mod option {
		use super::Secret;
		use serde::{Deserialize, Deserializer, Serialize, Serializer};
		use zeroize::Zeroize;

		pub fn serialize<T, S>(secret: &Option<Secret<T>>, serializer: S) -> Result<S::Ok, S::Error>
		where
			T: Serialize + Zeroize,
			S: Serializer,
		{
			secret.as_ref().map(|s| s.expose()).serialize(serializer)
		}

		pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Secret<T>>, D::Error>
		where
			T: Deserialize<'de> + Zeroize,
			D: Deserializer<'de>,
		{
			Option::<T>::deserialize(deserializer).map(|v| v.map(Secret::new))
		}
	}
}
