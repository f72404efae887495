// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client lifecycle: every mutation runs load, mutate, persist and then a
//! best-effort peer reconcile while holding a single write gate.

use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};
use wgeasy_config::WireguardConfig;

use crate::allocator::{AddressAllocator, SubnetTemplate};
use crate::command::WgCommandToolchain;
use crate::error::{Result, WgEasyError};
use crate::id::ClientId;
use crate::model::{Client, KeyProvenance, StateDocument};
use crate::render::{render_client_tunnel, RenderSettings};
use crate::store::StateStore;
use crate::sync::InterfaceSynchronizer;
use crate::telemetry::TelemetryMerger;
use crate::toolchain::TunnelToolchain;
use crate::types::{ClientConfig, ClientListing, ClientView};

pub struct ClientService {
	store: StateStore,
	allocator: AddressAllocator,
	synchronizer: InterfaceSynchronizer,
	telemetry: TelemetryMerger,
	settings: RenderSettings,
	toolchain: Arc<dyn TunnelToolchain>,
	default_keepalive: String,
	write_gate: Mutex<()>,
}

impl ClientService {
	pub fn new(config: &WireguardConfig, toolchain: Arc<dyn TunnelToolchain>) -> Result<Self> {
		let template = SubnetTemplate::parse(&config.default_address)?;
		let settings = RenderSettings::from(config);

		Ok(Self {
			store: StateStore::new(config.state_file(), toolchain.clone(), template),
			allocator: AddressAllocator::new(template),
			synchronizer: InterfaceSynchronizer::new(
				&config.interface,
				settings.clone(),
				toolchain.clone(),
			),
			telemetry: TelemetryMerger::new(&config.interface, toolchain.clone()),
			settings,
			toolchain,
			default_keepalive: config.persistent_keepalive.clone(),
			write_gate: Mutex::new(()),
		})
	}

	/// Service driving the real `wg`/`wg-quick` binaries.
	pub fn with_command_toolchain(config: &WireguardConfig) -> Result<Self> {
		Self::new(config, Arc::new(WgCommandToolchain::from_config(config)))
	}

	/// A copy of the current document. Mutation only goes through the
	/// lifecycle operations below.
	pub async fn snapshot(&self) -> Result<StateDocument> {
		self.store.snapshot().await
	}

	/// Load the document and bring the interface up from it.
	#[instrument(skip(self), fields(interface = %self.synchronizer.interface()))]
	pub async fn start(&self) -> Result<()> {
		let _gate = self.write_gate.lock().await;
		let doc = self.store.read().await?;
		self.synchronizer.startup(&doc).await?;
		Ok(())
	}

	#[instrument(skip(self), fields(interface = %self.synchronizer.interface()))]
	pub async fn shutdown(&self) -> Result<()> {
		let _gate = self.write_gate.lock().await;
		self.synchronizer.shutdown().await?;
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn list_clients(&self) -> Result<ClientListing> {
		let telemetry = self.telemetry.collect().await;
		let doc = self.store.read().await?;
		Ok(TelemetryMerger::merge(&doc, &telemetry))
	}

	#[instrument(skip(self), fields(client_id = %id))]
	pub async fn get_client(&self, id: &ClientId) -> Result<Option<ClientView>> {
		let doc = self.store.read().await?;
		Ok(doc.client(id).map(ClientView::from))
	}

	/// The client's tunnel definition, or `None` for an unknown id.
	#[instrument(skip(self), fields(client_id = %id))]
	pub async fn client_config(&self, id: &ClientId) -> Result<Option<ClientConfig>> {
		let doc = self.store.read().await?;
		Ok(render_client_tunnel(&doc, id, &self.settings).map(|text| ClientConfig::new(id, text)))
	}

	#[instrument(skip(self))]
	pub async fn create_client(&self, name: &str) -> Result<ClientView> {
		let name = validate_name(name)?;
		let _gate = self.write_gate.lock().await;

		{
			let doc = self.store.read().await?;
			self.allocator.allocate(&doc)?;
		}

		let keys = self.toolchain.generate_key_pair().await?;
		let default_keepalive = self.default_keepalive.clone();

		let view = self
			.store
			.update(|doc| {
				let address = self.allocator.allocate(doc)?;

				let mut id = ClientId::generate();
				while doc.clients.contains_key(&id) {
					id = ClientId::generate();
				}

				let now = Utc::now();
				let client = Client {
					id: id.clone(),
					name,
					enabled: true,
					address,
					public_key: keys.public_key,
					private_key: Some(keys.private_key),
					created_at: now,
					updated_at: now,
					persistent_keepalive: default_keepalive,
					provenance: Some(KeyProvenance::Generated),
				};
				let view = ClientView::from(&client);
				doc.clients.insert(id, client);
				Ok(view)
			})
			.await?;

		info!(client_id = %view.id, address = %view.address, "client created");
		self.sync_best_effort().await;
		Ok(view)
	}

	/// Removes the client. An unknown id succeeds without touching state.
	#[instrument(skip(self), fields(client_id = %id))]
	pub async fn delete_client(&self, id: &ClientId) -> Result<()> {
		let _gate = self.write_gate.lock().await;

		if self.store.read().await?.client(id).is_none() {
			debug!("client already absent");
			return Ok(());
		}

		self.store
			.update(|doc| {
				doc.clients.remove(id);
				Ok(())
			})
			.await?;

		info!("client deleted");
		self.sync_best_effort().await;
		Ok(())
	}

	pub async fn enable_client(&self, id: &ClientId) -> Result<ClientView> {
		self.set_enabled(id, true).await
	}

	pub async fn disable_client(&self, id: &ClientId) -> Result<ClientView> {
		self.set_enabled(id, false).await
	}

	#[instrument(skip(self), fields(client_id = %id))]
	async fn set_enabled(&self, id: &ClientId, enabled: bool) -> Result<ClientView> {
		self.mutate_client(id, |client| {
			client.enabled = enabled;
			Ok(())
		})
		.await
	}

	#[instrument(skip(self), fields(client_id = %id))]
	pub async fn rename_client(&self, id: &ClientId, name: &str) -> Result<ClientView> {
		let name = validate_name(name)?;
		self.mutate_client(id, |client| {
			client.name = name;
			Ok(())
		})
		.await
	}

	/// Moves the client to `address`, which must be a dotted-quad IPv4
	/// address not held by the server or any other client.
	#[instrument(skip(self), fields(client_id = %id))]
	pub async fn readdress_client(&self, id: &ClientId, address: &str) -> Result<ClientView> {
		let address = self.parse_host_address(address)?;

		let _gate = self.write_gate.lock().await;
		let view = self
			.store
			.update(|doc| {
				if doc.client(id).is_none() {
					return Err(WgEasyError::NotFound(id.clone()));
				}

				let taken = doc.server.address == address
					|| doc
						.clients
						.values()
						.any(|other| other.id != *id && other.address == address);
				if taken {
					return Err(WgEasyError::AddressInUse(address));
				}

				let client = doc
					.client_mut(id)
					.ok_or_else(|| WgEasyError::NotFound(id.clone()))?;
				client.address = address;
				client.touch();
				Ok(ClientView::from(&*client))
			})
			.await?;

		info!(address = %address, "client re-addressed");
		self.sync_best_effort().await;
		Ok(view)
	}

	/// A dotted-quad usable as a peer address: not unspecified, not a
	/// broadcast, and not the network or broadcast ordinal of the template
	/// subnet.
	fn parse_host_address(&self, raw: &str) -> Result<Ipv4Addr> {
		let invalid = || WgEasyError::InvalidAddress(raw.to_string());
		let address: Ipv4Addr = raw.trim().parse().map_err(|_| invalid())?;

		if address.is_unspecified() || address.is_broadcast() {
			return Err(invalid());
		}
		if matches!(self.allocator.template().ordinal_of(address), Some(0 | 255)) {
			return Err(invalid());
		}
		Ok(address)
	}

	async fn mutate_client<F>(&self, id: &ClientId, apply: F) -> Result<ClientView>
	where
		F: FnOnce(&mut Client) -> Result<()>,
	{
		let _gate = self.write_gate.lock().await;
		let view = self
			.store
			.update(|doc| {
				let client = doc
					.client_mut(id)
					.ok_or_else(|| WgEasyError::NotFound(id.clone()))?;
				apply(client)?;
				client.touch();
				Ok(ClientView::from(&*client))
			})
			.await?;

		debug!("client updated");
		self.sync_best_effort().await;
		Ok(view)
	}

	/// Must be called with the write gate held.
	async fn sync_best_effort(&self) {
		let doc = match self.store.read().await {
			Ok(doc) => doc,
			Err(e) => {
				error!(error = %e, "state unavailable for sync");
				return;
			}
		};
		if let Err(e) = self.synchronizer.reconcile(&doc).await {
			error!(error = %e, "interface sync failed; next mutation will retry");
		}
	}
}

/// Trimmed display name; empty names and control characters are rejected.
fn validate_name(name: &str) -> Result<String> {
	let trimmed = name.trim();
	if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
		return Err(WgEasyError::InvalidName(name.to_string()));
	}
	Ok(trimmed.to_string())
}
