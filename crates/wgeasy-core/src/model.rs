// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted state document.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use wgeasy_common_secret::SecretString;

use crate::id::ClientId;
use crate::keys::PublicKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerIdentity {
	#[serde(with = "wgeasy_common_secret::exposed")]
	pub private_key: SecretString,
	pub public_key: PublicKey,
	pub address: Ipv4Addr,
}

/// Where a client's key pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyProvenance {
	/// Generated by this server; the private key is retained.
	Generated,
	/// Supplied by the client; only the public key is known.
	External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
	pub id: ClientId,
	pub name: String,
	pub enabled: bool,
	pub address: Ipv4Addr,
	pub public_key: PublicKey,
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		with = "wgeasy_common_secret::exposed::option"
	)]
	pub private_key: Option<SecretString>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(default, rename = "persistentKeepAlive")]
	pub persistent_keepalive: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provenance: Option<KeyProvenance>,
}

impl Client {
	/// Documents written before provenance was recorded fall back to
	/// private-key presence.
	pub fn provenance(&self) -> KeyProvenance {
		match self.provenance {
			Some(provenance) => provenance,
			None if self.private_key.is_some() => KeyProvenance::Generated,
			None => KeyProvenance::External,
		}
	}

	pub fn is_downloadable(&self) -> bool {
		self.provenance() == KeyProvenance::Generated
	}

	pub(crate) fn touch(&mut self) {
		self.updated_at = Utc::now();
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
	pub server: ServerIdentity,
	#[serde(default, deserialize_with = "null_as_empty")]
	pub clients: BTreeMap<ClientId, Client>,
}

impl StateDocument {
	pub fn new(server: ServerIdentity) -> Self {
		Self {
			server,
			clients: BTreeMap::new(),
		}
	}

	pub fn client(&self, id: &ClientId) -> Option<&Client> {
		self.clients.get(id)
	}

	pub fn client_mut(&mut self, id: &ClientId) -> Option<&mut Client> {
		self.clients.get_mut(id)
	}

	pub fn enabled_clients(&self) -> impl Iterator<Item = &Client> {
		self.clients.values().filter(|c| c.enabled)
	}

	/// Every address held by the document, server first.
	pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
		std::iter::once(self.server.address).chain(self.clients.values().map(|c| c.address))
	}
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<ClientId, Client>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<BTreeMap<ClientId, Client>>::deserialize(deserializer)?.unwrap_or_default())
}
