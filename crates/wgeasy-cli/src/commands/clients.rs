// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Write;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use tracing::instrument;
use wgeasy_core::{ClientId, ClientListing, ClientService, ClientView};

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
	/// List clients with live transfer counters
	List {
		/// Print JSON instead of a table
		#[arg(long)]
		json: bool,
	},
	/// Print a client's tunnel definition
	Show { id: ClientId },
	/// Create a client with a generated key pair
	Create { name: String },
	/// Delete a client (no-op if it does not exist)
	Delete { id: ClientId },
	/// Enable a client
	Enable { id: ClientId },
	/// Disable a client without deleting it
	Disable { id: ClientId },
	/// Change a client's display name
	Rename { id: ClientId, name: String },
	/// Move a client to another IPv4 address
	Readdress { id: ClientId, address: String },
}

pub async fn run(command: ClientCommand, service: &ClientService) -> Result<()> {
	let output = execute(command, service).await?;
	print!("{output}");
	Ok(())
}

#[instrument(skip(service))]
pub async fn execute(command: ClientCommand, service: &ClientService) -> Result<String> {
	let output = match command {
		ClientCommand::List { json } => {
			let listing = service.list_clients().await?;
			if json {
				format!("{}\n", serde_json::to_string_pretty(&listing)?)
			} else {
				format_listing(&listing)
			}
		}
		ClientCommand::Show { id } => {
			let config = service
				.client_config(&id)
				.await?
				.ok_or_else(|| anyhow!("client not found: {id}"))?;
			config.text
		}
		ClientCommand::Create { name } => format_view(&service.create_client(&name).await?),
		ClientCommand::Delete { id } => {
			service.delete_client(&id).await?;
			format!("deleted {id}\n")
		}
		ClientCommand::Enable { id } => format_view(&service.enable_client(&id).await?),
		ClientCommand::Disable { id } => format_view(&service.disable_client(&id).await?),
		ClientCommand::Rename { id, name } => {
			format_view(&service.rename_client(&id, &name).await?)
		}
		ClientCommand::Readdress { id, address } => {
			format_view(&service.readdress_client(&id, &address).await?)
		}
	};
	Ok(output)
}

fn format_view(view: &ClientView) -> String {
	format!(
		"{}\t{}\t{}\t{}\n",
		view.id,
		view.address,
		if view.enabled { "enabled" } else { "disabled" },
		view.name
	)
}

fn format_listing(listing: &ClientListing) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "ID\tADDRESS\tSTATE\tHANDSHAKE\tRX\tTX\tNAME");
	for view in &listing.clients {
		let handshake = view
			.latest_handshake_at
			.filter(|at| at.timestamp() > 0)
			.map(|at| at.to_rfc3339())
			.unwrap_or_else(|| "never".to_string());
		let _ = writeln!(
			out,
			"{}\t{}\t{}\t{}\t{}\t{}\t{}",
			view.id,
			view.address,
			if view.enabled { "enabled" } else { "disabled" },
			handshake,
			view.transfer_rx,
			view.transfer_tx,
			view.name
		);
	}
	if !listing.telemetry_available {
		let _ = writeln!(out, "(live telemetry unavailable)");
	}
	out
}
