// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Write the default config to `path`. An existing file is left alone.
pub fn run(path: &Path) -> Result<()> {
	if path.exists() {
		bail!("{} already exists", path.display());
	}

	wgeasy_config::write_default_config(path)
		.with_context(|| format!("failed to write {}", path.display()))?;
	println!("wrote {}", path.display());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn writes_once() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("wgeasy.toml");

		run(&path).unwrap();
		assert!(path.exists());
		assert!(run(&path).is_err());
	}
}
