// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{LoggingConfigLayer, WireguardConfigLayer};

/// Configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WgEasyConfigLayer {
	#[serde(default)]
	pub wireguard: Option<WireguardConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl WgEasyConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: WgEasyConfigLayer) {
		merge_option(
			&mut self.wireguard,
			other.wireguard,
			WireguardConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_fills_missing_section() {
		let mut base = WgEasyConfigLayer::default();
		base.merge(WgEasyConfigLayer {
			wireguard: Some(WireguardConfigLayer {
				port: Some(51900),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(base.wireguard.unwrap().port, Some(51900));
		assert!(base.logging.is_none());
	}

	#[test]
	fn test_merge_other_overwrites_field_by_field() {
		let mut base = WgEasyConfigLayer {
			wireguard: Some(WireguardConfigLayer {
				port: Some(51820),
				host: Some("a.example.com".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(WgEasyConfigLayer {
			wireguard: Some(WireguardConfigLayer {
				port: Some(51821),
				..Default::default()
			}),
			..Default::default()
		});

		let wireguard = base.wireguard.unwrap();
		assert_eq!(wireguard.port, Some(51821));
		assert_eq!(wireguard.host.as_deref(), Some("a.example.com"));
	}
}
