// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::WgEasyConfigLayer;
use crate::sections::{LogFormat, LoggingConfigLayer, WireguardConfigLayer};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/wgeasy/wgeasy.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<WgEasyConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<WgEasyConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(WgEasyConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<WgEasyConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(WgEasyConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: WgEasyConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: WGEASY_WG_<FIELD> and WGEASY_LOG_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<WgEasyConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(WgEasyConfigLayer {
			wireguard: Some(load_wireguard_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_wireguard_from_env() -> Result<WireguardConfigLayer, ConfigError> {
	Ok(WireguardConfigLayer {
		path: env_var("WGEASY_WG_PATH").map(PathBuf::from),
		interface: env_var("WGEASY_WG_INTERFACE"),
		host: env_var("WGEASY_WG_HOST"),
		port: env_parse("WGEASY_WG_PORT", "u16")?,
		mtu: env_parse("WGEASY_WG_MTU", "u16")?,
		default_dns: env_var("WGEASY_WG_DEFAULT_DNS"),
		default_address: env_var("WGEASY_WG_DEFAULT_ADDRESS"),
		allowed_ips: env_var("WGEASY_WG_ALLOWED_IPS"),
		pre_up: env_var("WGEASY_WG_PRE_UP"),
		post_up: env_var("WGEASY_WG_POST_UP"),
		pre_down: env_var("WGEASY_WG_PRE_DOWN"),
		post_down: env_var("WGEASY_WG_POST_DOWN"),
		persistent_keepalive: env_var("WGEASY_WG_PERSISTENT_KEEPALIVE"),
		command_timeout_secs: env_parse("WGEASY_WG_COMMAND_TIMEOUT_SECS", "u64")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("WGEASY_LOG_FORMAT") {
		Some(v) => Some(v.parse::<LogFormat>().map_err(|message| {
			ConfigError::InvalidValue {
				key: "WGEASY_LOG_FORMAT".to_string(),
				message,
			}
		})?),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("WGEASY_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_missing_toml_file_is_empty_layer() {
		let layer = TomlSource::new("/nonexistent/wgeasy.toml").load().unwrap();
		assert!(layer.wireguard.is_none());
		assert!(layer.logging.is_none());
	}

	#[test]
	fn test_toml_file_is_parsed() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[wireguard]
host = "vpn.example.com"
mtu = 1420

[logging]
level = "debug"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let wireguard = layer.wireguard.unwrap();
		assert_eq!(wireguard.host.as_deref(), Some("vpn.example.com"));
		assert_eq!(wireguard.mtu, Some(1420));
		assert_eq!(layer.logging.unwrap().level.as_deref(), Some("debug"));
	}

	#[test]
	fn test_invalid_toml_reports_path() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "[wireguard\nport = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}
}
