// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::id::ClientId;
use crate::keys::PublicKey;
use crate::model::Client;

/// Read-only view of a client with live telemetry joined in. Never persisted
/// and never carries key material beyond the public key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
	pub id: ClientId,
	pub name: String,
	pub enabled: bool,
	pub address: Ipv4Addr,
	pub public_key: PublicKey,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(rename = "persistentKeepAlive")]
	pub persistent_keepalive: String,
	pub latest_handshake_at: Option<DateTime<Utc>>,
	pub transfer_rx: u64,
	pub transfer_tx: u64,
	pub downloadable_config: bool,
}

impl From<&Client> for ClientView {
	fn from(client: &Client) -> Self {
		Self {
			id: client.id.clone(),
			name: client.name.clone(),
			enabled: client.enabled,
			address: client.address,
			public_key: client.public_key.clone(),
			created_at: client.created_at,
			updated_at: client.updated_at,
			persistent_keepalive: client.persistent_keepalive.clone(),
			latest_handshake_at: None,
			transfer_rx: 0,
			transfer_tx: 0,
			downloadable_config: client.is_downloadable(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientListing {
	pub clients: Vec<ClientView>,
	/// False when the live dump could not be queried; the telemetry fields
	/// then hold defaults.
	pub telemetry_available: bool,
}

/// A client's tunnel definition, ready to hand out as a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
	pub filename: String,
	pub text: String,
}

impl ClientConfig {
	pub fn new(id: &ClientId, text: String) -> Self {
		Self {
			filename: format!("{id}.conf"),
			text,
		}
	}
}
