// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

fn tmp_path(path: &Path) -> PathBuf {
	let mut name = path
		.file_name()
		.map(|n| n.to_os_string())
		.unwrap_or_default();
	name.push(".tmp");
	path.with_file_name(name)
}

/// Write `contents` next to `path` with mode 0600, flush it, then rename it
/// over `path`. Readers never observe a partially written file.
pub async fn write_owner_only_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			tokio::fs::create_dir_all(parent).await?;
		}
	}

	let tmp = tmp_path(path);

	let mut options = tokio::fs::OpenOptions::new();
	options.write(true).create(true).truncate(true);
	#[cfg(unix)]
	options.mode(0o600);

	let mut file = options.open(&tmp).await?;
	file.write_all(contents).await?;
	file.sync_all().await?;
	drop(file);

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		// A leftover tmp file from an earlier crash keeps its old mode.
		tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
	}

	tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn writes_and_replaces() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("sub").join("wg0.json");

		write_owner_only_atomic(&path, b"first").await.unwrap();
		write_owner_only_atomic(&path, b"second").await.unwrap();

		assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "second");
		assert!(!tmp_path(&path).exists());
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn file_is_owner_only() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		let path = dir.path().join("wg0.conf");
		write_owner_only_atomic(&path, b"[Interface]\n").await.unwrap();

		let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
		assert_eq!(mode, 0o600);
	}
}
