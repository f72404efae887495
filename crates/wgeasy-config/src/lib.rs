// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for wgeasy.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`WGEASY_*`)
//! 2. Config file (`/etc/wgeasy/wgeasy.toml` or an explicit path)
//! 3. Built-in defaults
//!
//! ```ignore
//! let config = wgeasy_config::load_config()?;
//! println!("state file: {}", config.wireguard.state_file().display());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::WgEasyConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WgEasyConfig {
	pub wireguard: WireguardConfig,
	pub logging: LoggingConfig,
}

impl WgEasyConfig {
	pub fn to_toml_string(&self) -> Result<String, ConfigError> {
		Ok(toml::to_string_pretty(self)?)
	}
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<WgEasyConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<WgEasyConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<WgEasyConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = WgEasyConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: WgEasyConfigLayer) -> Result<WgEasyConfig, ConfigError> {
	let wireguard = layer.wireguard.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		interface = %wireguard.interface,
		path = %wireguard.path.display(),
		port = wireguard.port,
		"configuration loaded"
	);

	Ok(WgEasyConfig { wireguard, logging })
}

/// Write a config file containing every default value, creating parent
/// directories as needed. The file is owner-readable only because hook
/// commands may embed credentials.
pub fn write_default_config(path: &Path) -> Result<WgEasyConfig, ConfigError> {
	let config = WgEasyConfig::default();
	let content = config.to_toml_string()?;

	let write_err = |source| ConfigError::FileWrite {
		path: path.to_path_buf(),
		source,
	};

	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).map_err(write_err)?;
	}

	#[cfg(unix)]
	{
		use std::io::Write;
		use std::os::unix::fs::OpenOptionsExt;

		let mut file = std::fs::OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.map_err(write_err)?;
		file.write_all(content.as_bytes()).map_err(write_err)?;
	}

	#[cfg(not(unix))]
	{
		std::fs::write(path, content).map_err(write_err)?;
	}

	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_finalize_empty_layer_is_default() {
		let config = finalize(WgEasyConfigLayer::default()).unwrap();
		assert_eq!(config, WgEasyConfig::default());
	}

	#[test]
	fn test_default_config_roundtrips_through_file() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("nested").join("wgeasy.toml");

		let written = write_default_config(&path).unwrap();
		let layer = TomlSource::new(&path).load().unwrap();
		let loaded = finalize(layer).unwrap();

		assert_eq!(written, loaded);
	}

	#[cfg(unix)]
	#[test]
	fn test_default_config_is_owner_only() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		let path = dir.path().join("wgeasy.toml");
		write_default_config(&path).unwrap();

		let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
		assert_eq!(mode, 0o600);
	}

	#[test]
	fn test_file_values_override_defaults() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("wgeasy.toml");
		std::fs::write(
			&path,
			"[wireguard]\ninterface = \"wg1\"\ndefault_address = \"10.8.0.x\"\n",
		)
		.unwrap();

		let config = finalize(TomlSource::new(&path).load().unwrap()).unwrap();
		assert_eq!(config.wireguard.interface, "wg1");
		assert_eq!(config.wireguard.default_address, "10.8.0.x");
		assert_eq!(config.wireguard.port, 51820);
	}
}
