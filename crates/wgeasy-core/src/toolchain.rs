// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use wgeasy_common_secret::SecretString;

use crate::keys::{KeyPair, PublicKey};

#[derive(Error, Debug)]
pub enum ToolchainError {
	#[error("{0} not found in PATH")]
	NotInstalled(&'static str),

	#[error("failed to run {cmd}: {source}")]
	Io {
		cmd: &'static str,
		#[source]
		source: std::io::Error,
	},

	#[error("{cmd} {args} failed: {stderr}")]
	CommandFailed {
		cmd: &'static str,
		args: String,
		stderr: String,
	},

	#[error("{cmd} timed out after {timeout:?}")]
	Timeout { cmd: &'static str, timeout: Duration },

	#[error("{cmd} produced unusable output: {message}")]
	InvalidOutput { cmd: &'static str, message: String },
}

/// The external capability that owns key generation and the live interface.
///
/// Every method is blocking I/O from the caller's point of view and is
/// expected to give up after a bounded time.
#[async_trait]
pub trait TunnelToolchain: Send + Sync {
	async fn generate_private_key(&self) -> Result<SecretString, ToolchainError>;

	async fn derive_public_key(&self, private_key: &SecretString)
		-> Result<PublicKey, ToolchainError>;

	/// Bring the interface down. Implementations may fail when the interface
	/// is not running; callers treat that as a no-op.
	async fn interface_down(&self, interface: &str) -> Result<(), ToolchainError>;

	/// Bring the interface up from a full server configuration.
	async fn interface_up(&self, interface: &str, config_text: &str) -> Result<(), ToolchainError>;

	/// Apply the peer set in `config_text` to a running interface without
	/// disturbing sessions of peers that did not change.
	async fn reconcile_peers(&self, interface: &str, config_text: &str)
		-> Result<(), ToolchainError>;

	/// Tab-separated runtime dump: one interface summary row followed by one
	/// row per peer.
	async fn dump_peers(&self, interface: &str) -> Result<String, ToolchainError>;

	async fn generate_key_pair(&self) -> Result<KeyPair, ToolchainError> {
		let private_key = self.generate_private_key().await?;
		let public_key = self.derive_public_key(&private_key).await?;
		Ok(KeyPair {
			private_key,
			public_key,
		})
	}
}
