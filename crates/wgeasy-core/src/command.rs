// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! [`TunnelToolchain`] backed by the `wg` and `wg-quick` binaries.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, trace, warn};
use wgeasy_common_secret::{Secret, SecretString};
use wgeasy_config::WireguardConfig;

use crate::files::write_owner_only_atomic;
use crate::keys::PublicKey;
use crate::toolchain::{ToolchainError, TunnelToolchain};

const WG: &str = "wg";
const WG_QUICK: &str = "wg-quick";

pub struct WgCommandToolchain {
	config_dir: PathBuf,
	timeout: Duration,
}

impl WgCommandToolchain {
	pub fn new(config_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
		Self {
			config_dir: config_dir.into(),
			timeout,
		}
	}

	pub fn from_config(config: &WireguardConfig) -> Self {
		Self::new(&config.path, config.command_timeout())
	}

	fn conf_path(&self, interface: &str) -> PathBuf {
		self.config_dir.join(format!("{interface}.conf"))
	}

	async fn write_conf(&self, interface: &str, config_text: &str) -> Result<PathBuf, ToolchainError> {
		let path = self.conf_path(interface);
		write_owner_only_atomic(&path, config_text.as_bytes())
			.await
			.map_err(|source| ToolchainError::Io {
				cmd: WG_QUICK,
				source,
			})?;
		debug!(path = %path.display(), "wrote interface config");
		Ok(path)
	}
}

#[async_trait]
impl TunnelToolchain for WgCommandToolchain {
	async fn generate_private_key(&self) -> Result<SecretString, ToolchainError> {
		let key = run_command(WG, &["genkey"], None, self.timeout).await?;
		non_empty(WG, key).map(Secret::new)
	}

	async fn derive_public_key(
		&self,
		private_key: &SecretString,
	) -> Result<PublicKey, ToolchainError> {
		let stdin = format!("{}\n", private_key.expose());
		let key = run_command(WG, &["pubkey"], Some(stdin.as_bytes()), self.timeout).await?;
		non_empty(WG, key).map(PublicKey::new)
	}

	#[instrument(skip(self))]
	async fn interface_down(&self, interface: &str) -> Result<(), ToolchainError> {
		let path = self.conf_path(interface);
		run_command(WG_QUICK, &["down", &path_arg(&path)], None, self.timeout).await?;
		Ok(())
	}

	#[instrument(skip(self, config_text))]
	async fn interface_up(&self, interface: &str, config_text: &str) -> Result<(), ToolchainError> {
		let path = self.write_conf(interface, config_text).await?;
		run_command(WG_QUICK, &["up", &path_arg(&path)], None, self.timeout).await?;
		Ok(())
	}

	#[instrument(skip(self, config_text))]
	async fn reconcile_peers(
		&self,
		interface: &str,
		config_text: &str,
	) -> Result<(), ToolchainError> {
		let path = self.write_conf(interface, config_text).await?;
		let stripped = run_command(WG_QUICK, &["strip", &path_arg(&path)], None, self.timeout).await?;
		run_command(
			WG,
			&["syncconf", interface, "/dev/stdin"],
			Some(stripped.as_bytes()),
			self.timeout,
		)
		.await?;
		Ok(())
	}

	#[instrument(skip(self))]
	async fn dump_peers(&self, interface: &str) -> Result<String, ToolchainError> {
		run_command(WG, &["show", interface, "dump"], None, self.timeout).await
	}
}

fn path_arg(path: &Path) -> String {
	path.to_string_lossy().into_owned()
}

fn non_empty(cmd: &'static str, output: String) -> Result<String, ToolchainError> {
	let trimmed = output.trim();
	if trimmed.is_empty() {
		return Err(ToolchainError::InvalidOutput {
			cmd,
			message: "empty output".to_string(),
		});
	}
	Ok(trimmed.to_string())
}

/// Runs `cmd` with `args`, optionally feeding `stdin`, and returns stdout on
/// success. The child is killed if `timeout` elapses first.
async fn run_command(
	cmd: &'static str,
	args: &[&str],
	stdin: Option<&[u8]>,
	timeout: Duration,
) -> Result<String, ToolchainError> {
	let mut command = Command::new(cmd);
	command
		.args(args)
		.stdin(if stdin.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	trace!(cmd = %format!("{cmd} {}", args.join(" ")), "running command");

	let io_err = |source: std::io::Error| {
		if source.kind() == std::io::ErrorKind::NotFound {
			warn!("{cmd} not found in PATH");
			ToolchainError::NotInstalled(cmd)
		} else {
			ToolchainError::Io { cmd, source }
		}
	};

	let run = async {
		let mut child = command.spawn().map_err(io_err)?;
		if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
			pipe.write_all(input)
				.await
				.map_err(|source| ToolchainError::Io { cmd, source })?;
		}
		child
			.wait_with_output()
			.await
			.map_err(|source| ToolchainError::Io { cmd, source })
	};

	let output = tokio::time::timeout(timeout, run)
		.await
		.map_err(|_| ToolchainError::Timeout { cmd, timeout })??;

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
		return Err(ToolchainError::CommandFailed {
			cmd,
			args: args.join(" "),
			stderr,
		});
	}

	String::from_utf8(output.stdout).map_err(|e| ToolchainError::InvalidOutput {
		cmd,
		message: e.to_string(),
	})
}
