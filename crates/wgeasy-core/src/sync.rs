// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::SyncError;
use crate::model::StateDocument;
use crate::render::{render_server_interface, RenderSettings};
use crate::toolchain::TunnelToolchain;

/// Pushes rendered server text onto the live interface.
pub struct InterfaceSynchronizer {
	interface: String,
	settings: RenderSettings,
	toolchain: Arc<dyn TunnelToolchain>,
}

impl InterfaceSynchronizer {
	pub fn new(
		interface: impl Into<String>,
		settings: RenderSettings,
		toolchain: Arc<dyn TunnelToolchain>,
	) -> Self {
		Self {
			interface: interface.into(),
			settings,
			toolchain,
		}
	}

	pub fn interface(&self) -> &str {
		&self.interface
	}

	/// Down (ignoring failure), up from the full text, then a peer reconcile.
	#[instrument(skip(self, doc), fields(interface = %self.interface))]
	pub async fn startup(&self, doc: &StateDocument) -> Result<(), SyncError> {
		if let Err(e) = self.toolchain.interface_down(&self.interface).await {
			debug!(error = %e, "interface was not running");
		}

		let text = render_server_interface(doc, &self.settings);
		self.toolchain
			.interface_up(&self.interface, &text)
			.await
			.map_err(SyncError::InterfaceUp)?;
		self.toolchain
			.reconcile_peers(&self.interface, &text)
			.await
			.map_err(SyncError::Reconcile)?;

		info!(peers = doc.enabled_clients().count(), "interface up");
		Ok(())
	}

	/// Apply the current peer set without a down/up cycle.
	#[instrument(skip(self, doc), fields(interface = %self.interface))]
	pub async fn reconcile(&self, doc: &StateDocument) -> Result<(), SyncError> {
		let text = render_server_interface(doc, &self.settings);
		self.toolchain
			.reconcile_peers(&self.interface, &text)
			.await
			.map_err(SyncError::Reconcile)?;
		debug!(peers = doc.enabled_clients().count(), "peers reconciled");
		Ok(())
	}

	#[instrument(skip(self), fields(interface = %self.interface))]
	pub async fn shutdown(&self) -> Result<(), SyncError> {
		self.toolchain
			.interface_down(&self.interface)
			.await
			.map_err(SyncError::InterfaceDown)?;
		info!("interface down");
		Ok(())
	}
}
