// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnel endpoint configuration section.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PATH: &str = "/etc/wireguard";
pub const DEFAULT_INTERFACE: &str = "wg0";
pub const DEFAULT_PORT: u16 = 51820;
pub const DEFAULT_ADDRESS_TEMPLATE: &str = "10.0.0.x";
pub const DEFAULT_ALLOWED_IPS: &str = "0.0.0.0/0, ::/0";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

/// Tunnel endpoint configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireguardConfig {
	/// Directory holding `<interface>.json` and `<interface>.conf`.
	pub path: PathBuf,
	pub interface: String,
	/// Public host name clients use in their `Endpoint` line.
	pub host: String,
	pub port: u16,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mtu: Option<u16>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default_dns: Option<String>,
	/// Client address template with one `x` octet, e.g. `10.0.0.x`.
	pub default_address: String,
	/// AllowedIPs written into client tunnel definitions.
	pub allowed_ips: String,
	pub pre_up: String,
	pub post_up: String,
	pub pre_down: String,
	pub post_down: String,
	pub persistent_keepalive: String,
	pub command_timeout_secs: u64,
}

impl Default for WireguardConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from(DEFAULT_PATH),
			interface: DEFAULT_INTERFACE.to_string(),
			host: String::new(),
			port: DEFAULT_PORT,
			mtu: None,
			default_dns: None,
			default_address: DEFAULT_ADDRESS_TEMPLATE.to_string(),
			allowed_ips: DEFAULT_ALLOWED_IPS.to_string(),
			pre_up: String::new(),
			post_up: String::new(),
			pre_down: String::new(),
			post_down: String::new(),
			persistent_keepalive: String::new(),
			command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
		}
	}
}

impl WireguardConfig {
	pub fn state_file(&self) -> PathBuf {
		self.path.join(format!("{}.json", self.interface))
	}

	pub fn command_timeout(&self) -> Duration {
		Duration::from_secs(self.command_timeout_secs)
	}
}

/// Tunnel configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireguardConfigLayer {
	#[serde(default)]
	pub path: Option<PathBuf>,
	#[serde(default)]
	pub interface: Option<String>,
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub mtu: Option<u16>,
	#[serde(default)]
	pub default_dns: Option<String>,
	#[serde(default)]
	pub default_address: Option<String>,
	#[serde(default)]
	pub allowed_ips: Option<String>,
	#[serde(default)]
	pub pre_up: Option<String>,
	#[serde(default)]
	pub post_up: Option<String>,
	#[serde(default)]
	pub pre_down: Option<String>,
	#[serde(default)]
	pub post_down: Option<String>,
	#[serde(default)]
	pub persistent_keepalive: Option<String>,
	#[serde(default)]
	pub command_timeout_secs: Option<u64>,
}

impl WireguardConfigLayer {
	pub fn merge(&mut self, other: WireguardConfigLayer) {
		if other.path.is_some() {
			self.path = other.path;
		}
		if other.interface.is_some() {
			self.interface = other.interface;
		}
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.mtu.is_some() {
			self.mtu = other.mtu;
		}
		if other.default_dns.is_some() {
			self.default_dns = other.default_dns;
		}
		if other.default_address.is_some() {
			self.default_address = other.default_address;
		}
		if other.allowed_ips.is_some() {
			self.allowed_ips = other.allowed_ips;
		}
		if other.pre_up.is_some() {
			self.pre_up = other.pre_up;
		}
		if other.post_up.is_some() {
			self.post_up = other.post_up;
		}
		if other.pre_down.is_some() {
			self.pre_down = other.pre_down;
		}
		if other.post_down.is_some() {
			self.post_down = other.post_down;
		}
		if other.persistent_keepalive.is_some() {
			self.persistent_keepalive = other.persistent_keepalive;
		}
		if other.command_timeout_secs.is_some() {
			self.command_timeout_secs = other.command_timeout_secs;
		}
	}

	pub fn finalize(self) -> Result<WireguardConfig, ConfigError> {
		let defaults = WireguardConfig::default();

		let interface = self.interface.unwrap_or(defaults.interface);
		if interface.is_empty() || interface.contains('/') {
			return Err(ConfigError::InvalidValue {
				key: "wireguard.interface".to_string(),
				message: format!("'{interface}' is not a valid interface name"),
			});
		}

		let default_address = self.default_address.unwrap_or(defaults.default_address);
		validate_address_template(&default_address)?;

		let command_timeout_secs = self
			.command_timeout_secs
			.unwrap_or(defaults.command_timeout_secs);
		if command_timeout_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "wireguard.command_timeout_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(WireguardConfig {
			path: self.path.unwrap_or(defaults.path),
			interface,
			host: self.host.unwrap_or(defaults.host),
			port: self.port.unwrap_or(defaults.port),
			mtu: self.mtu,
			default_dns: self.default_dns.filter(|s| !s.is_empty()),
			default_address,
			allowed_ips: self.allowed_ips.unwrap_or(defaults.allowed_ips),
			pre_up: self.pre_up.unwrap_or_default(),
			post_up: self.post_up.unwrap_or_default(),
			pre_down: self.pre_down.unwrap_or_default(),
			post_down: self.post_down.unwrap_or_default(),
			persistent_keepalive: self.persistent_keepalive.unwrap_or_default(),
			command_timeout_secs,
		})
	}
}

/// Checks the shape of an address template: four dot-separated octets where
/// exactly one is the placeholder `x`.
fn validate_address_template(template: &str) -> Result<(), ConfigError> {
	let invalid = |message: &str| ConfigError::InvalidValue {
		key: "wireguard.default_address".to_string(),
		message: format!("'{template}': {message}"),
	};

	let parts: Vec<&str> = template.split('.').collect();
	if parts.len() != 4 {
		return Err(invalid("expected four octets"));
	}

	let placeholders = parts.iter().filter(|p| **p == "x").count();
	if placeholders != 1 {
		return Err(invalid("expected exactly one 'x' octet"));
	}

	for part in parts.iter().filter(|p| **p != "x") {
		if part.parse::<u8>().is_err() {
			return Err(invalid("octets must be 0-255"));
		}
	}

	Ok(())
}
