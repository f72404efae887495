// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Live per-peer counters, joined onto client views by public key.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::model::StateDocument;
use crate::toolchain::TunnelToolchain;
use crate::types::{ClientListing, ClientView};

const DUMP_FIELDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStats {
	pub latest_handshake: i64,
	pub transfer_rx: u64,
	pub transfer_tx: u64,
	pub persistent_keepalive: String,
}

impl PeerStats {
	pub fn latest_handshake_at(&self) -> DateTime<Utc> {
		DateTime::from_timestamp(self.latest_handshake, 0).unwrap_or(DateTime::UNIX_EPOCH)
	}
}

/// Parse a tab-separated peer dump keyed by public key. The first line is
/// the interface summary. Short rows are skipped and unparsable counters
/// read as zero.
pub fn parse_dump(dump: &str) -> HashMap<String, PeerStats> {
	let mut peers = HashMap::new();

	for (index, line) in dump.lines().enumerate() {
		if index == 0 || line.is_empty() {
			continue;
		}

		let fields: Vec<&str> = line.split('\t').collect();
		if fields.len() < DUMP_FIELDS {
			continue;
		}

		peers.insert(
			fields[0].to_string(),
			PeerStats {
				latest_handshake: fields[4].parse().unwrap_or(0),
				transfer_rx: fields[5].parse().unwrap_or(0),
				transfer_tx: fields[6].parse().unwrap_or(0),
				persistent_keepalive: fields[7].to_string(),
			},
		);
	}

	peers
}

#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
	Available(HashMap<String, PeerStats>),
	Unavailable,
}

impl Telemetry {
	pub fn is_available(&self) -> bool {
		matches!(self, Telemetry::Available(_))
	}

	/// Overlay live values onto `view`. With no telemetry at all, the
	/// handshake reads as the epoch; with telemetry but no matching row, the
	/// view keeps its defaults.
	pub fn apply(&self, view: &mut ClientView) {
		match self {
			Telemetry::Available(peers) => {
				if let Some(stats) = peers.get(view.public_key.as_str()) {
					view.latest_handshake_at = Some(stats.latest_handshake_at());
					view.transfer_rx = stats.transfer_rx;
					view.transfer_tx = stats.transfer_tx;
					view.persistent_keepalive = stats.persistent_keepalive.clone();
				}
			}
			Telemetry::Unavailable => {
				view.latest_handshake_at = Some(DateTime::UNIX_EPOCH);
			}
		}
	}
}

pub struct TelemetryMerger {
	interface: String,
	toolchain: Arc<dyn TunnelToolchain>,
}

impl TelemetryMerger {
	pub fn new(interface: impl Into<String>, toolchain: Arc<dyn TunnelToolchain>) -> Self {
		Self {
			interface: interface.into(),
			toolchain,
		}
	}

	#[instrument(skip(self), fields(interface = %self.interface))]
	pub async fn collect(&self) -> Telemetry {
		match self.toolchain.dump_peers(&self.interface).await {
			Ok(dump) => Telemetry::Available(parse_dump(&dump)),
			Err(e) => {
				warn!(error = %e, "peer telemetry unavailable");
				Telemetry::Unavailable
			}
		}
	}

	/// Stored clients with telemetry applied, sorted by the dotted-quad
	/// string of their address.
	pub fn merge(doc: &StateDocument, telemetry: &Telemetry) -> ClientListing {
		let mut clients: Vec<ClientView> = doc
			.clients
			.values()
			.map(|client| {
				let mut view = ClientView::from(client);
				telemetry.apply(&mut view);
				view
			})
			.collect();
		clients.sort_by_cached_key(|view| view.address.to_string());

		ClientListing {
			clients,
			telemetry_available: telemetry.is_available(),
		}
	}
}
