// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire-format text for the server interface and client tunnels.

use std::fmt::Write;

use wgeasy_config::WireguardConfig;

use crate::id::ClientId;
use crate::model::StateDocument;

/// Written in place of a private key the server never held.
pub const PRIVATE_KEY_PLACEHOLDER: &str = "REPLACE_ME";

/// The subset of [`WireguardConfig`] that shapes rendered text.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
	pub host: String,
	pub port: u16,
	pub mtu: Option<u16>,
	pub dns: Option<String>,
	pub allowed_ips: String,
	pub pre_up: String,
	pub post_up: String,
	pub pre_down: String,
	pub post_down: String,
}

impl From<&WireguardConfig> for RenderSettings {
	fn from(config: &WireguardConfig) -> Self {
		Self {
			host: config.host.clone(),
			port: config.port,
			mtu: config.mtu,
			dns: config.default_dns.clone(),
			allowed_ips: config.allowed_ips.clone(),
			pre_up: config.pre_up.clone(),
			post_up: config.post_up.clone(),
			pre_down: config.pre_down.clone(),
			post_down: config.post_down.clone(),
		}
	}
}

// Writes into a String never fail; the results below are discarded.

fn hook(out: &mut String, key: &str, command: &str) {
	if !command.is_empty() {
		let _ = writeln!(out, "{key} = {command}");
	}
}

/// Interface stanza followed by one peer stanza per enabled client, in
/// client id order.
pub fn render_server_interface(doc: &StateDocument, settings: &RenderSettings) -> String {
	let mut out = String::new();

	let _ = writeln!(out, "# Server");
	let _ = writeln!(out, "[Interface]");
	let _ = writeln!(out, "PrivateKey = {}", doc.server.private_key.expose());
	let _ = writeln!(out, "Address = {}/24", doc.server.address);
	let _ = writeln!(out, "ListenPort = {}", settings.port);
	hook(&mut out, "PreUp", &settings.pre_up);
	hook(&mut out, "PostUp", &settings.post_up);
	hook(&mut out, "PreDown", &settings.pre_down);
	hook(&mut out, "PostDown", &settings.post_down);

	for client in doc.enabled_clients() {
		let _ = writeln!(out);
		let _ = writeln!(out, "# Client {} ({})", client.name, client.id);
		let _ = writeln!(out, "[Peer]");
		let _ = writeln!(out, "PublicKey = {}", client.public_key);
		let _ = writeln!(out, "AllowedIPs = {}/32", client.address);
	}

	out
}

/// Tunnel definition for one client, or `None` for an unknown id.
pub fn render_client_tunnel(
	doc: &StateDocument,
	id: &ClientId,
	settings: &RenderSettings,
) -> Option<String> {
	let client = doc.client(id)?;
	let mut out = String::new();

	let private_key = client
		.private_key
		.as_ref()
		.map(|k| k.expose().as_str())
		.unwrap_or(PRIVATE_KEY_PLACEHOLDER);

	let _ = writeln!(out, "[Interface]");
	let _ = writeln!(out, "PrivateKey = {private_key}");
	let _ = writeln!(out, "Address = {}/24", client.address);
	if let Some(dns) = &settings.dns {
		let _ = writeln!(out, "DNS = {dns}");
	}
	if let Some(mtu) = settings.mtu {
		let _ = writeln!(out, "MTU = {mtu}");
	}

	let _ = writeln!(out);
	let _ = writeln!(out, "[Peer]");
	let _ = writeln!(out, "PublicKey = {}", doc.server.public_key);
	let _ = writeln!(out, "AllowedIPs = {}", settings.allowed_ips);
	if let Ok(keepalive) = client.persistent_keepalive.trim().parse::<u16>() {
		if keepalive > 0 {
			let _ = writeln!(out, "PersistentKeepalive = {keepalive}");
		}
	}
	let _ = writeln!(out, "Endpoint = {}:{}", settings.host, settings.port);

	Some(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{fixture_client, fixture_document, parse_stanzas};
	use std::net::Ipv4Addr;

	fn settings() -> RenderSettings {
		RenderSettings {
			host: "vpn.example.com".to_string(),
			port: 51820,
			mtu: None,
			dns: None,
			allowed_ips: "0.0.0.0/0, ::/0".to_string(),
			pre_up: String::new(),
			post_up: "iptables -A FORWARD -i wg0 -j ACCEPT".to_string(),
			pre_down: String::new(),
			post_down: String::new(),
		}
	}

	#[test]
	fn server_text_has_interface_and_enabled_peers() {
		let mut doc = fixture_document();
		let on = fixture_client("aaaaaaaaaaaaaaaaaaaa", "phone", Ipv4Addr::new(10, 0, 0, 2));
		let mut off = fixture_client("bbbbbbbbbbbbbbbbbbbb", "tablet", Ipv4Addr::new(10, 0, 0, 3));
		off.enabled = false;
		doc.clients.insert(on.id.clone(), on.clone());
		doc.clients.insert(off.id.clone(), off.clone());

		let text = render_server_interface(&doc, &settings());
		assert!(text.starts_with("# Server\n[Interface]\n"));
		assert!(text.contains("Address = 10.0.0.1/24\n"));
		assert!(text.contains("ListenPort = 51820\n"));
		assert!(text.contains("PostUp = iptables -A FORWARD -i wg0 -j ACCEPT\n"));
		assert!(!text.contains("PreUp"));
		assert!(text.contains("# Client phone (aaaaaaaaaaaaaaaaaaaa)\n"));
		assert!(text.contains(&format!("PublicKey = {}\n", on.public_key)));
		assert!(text.contains("AllowedIPs = 10.0.0.2/32\n"));
		assert!(!text.contains(off.public_key.as_str()));

		let stanzas = parse_stanzas(&text);
		assert_eq!(stanzas.len(), 2);
		assert_eq!(stanzas[1].section, "Peer");
	}

	#[test]
	fn client_text_round_trips_address_and_server_key() {
		let mut doc = fixture_document();
		let client = fixture_client("aaaaaaaaaaaaaaaaaaaa", "phone", Ipv4Addr::new(10, 0, 0, 7));
		doc.clients.insert(client.id.clone(), client.clone());

		let mut settings = settings();
		settings.dns = Some("1.1.1.1".to_string());
		settings.mtu = Some(1420);

		let text = render_client_tunnel(&doc, &client.id, &settings).unwrap();
		let stanzas = parse_stanzas(&text);
		assert_eq!(stanzas[0].get("Address"), Some("10.0.0.7/24"));
		assert_eq!(stanzas[0].get("DNS"), Some("1.1.1.1"));
		assert_eq!(stanzas[0].get("MTU"), Some("1420"));
		assert_eq!(stanzas[1].get("PublicKey"), Some(doc.server.public_key.as_str()));
		assert_eq!(stanzas[1].get("Endpoint"), Some("vpn.example.com:51820"));
		assert_eq!(stanzas[1].get("AllowedIPs"), Some("0.0.0.0/0, ::/0"));
		assert_eq!(stanzas[1].get("PersistentKeepalive"), None);
	}

	#[test]
	fn client_without_private_key_gets_placeholder() {
		let mut doc = fixture_document();
		let mut client = fixture_client("aaaaaaaaaaaaaaaaaaaa", "phone", Ipv4Addr::new(10, 0, 0, 2));
		client.private_key = None;
		doc.clients.insert(client.id.clone(), client.clone());

		let text = render_client_tunnel(&doc, &client.id, &settings()).unwrap();
		assert!(text.contains(&format!("PrivateKey = {PRIVATE_KEY_PLACEHOLDER}\n")));
		assert!(!text.contains("DNS"));
		assert!(!text.contains("MTU"));
	}

	#[test]
	fn numeric_keepalive_is_rendered() {
		let mut doc = fixture_document();
		let mut client = fixture_client("aaaaaaaaaaaaaaaaaaaa", "phone", Ipv4Addr::new(10, 0, 0, 2));
		client.persistent_keepalive = "25".to_string();
		doc.clients.insert(client.id.clone(), client.clone());

		let text = render_client_tunnel(&doc, &client.id, &settings()).unwrap();
		assert!(text.contains("PersistentKeepalive = 25\n"));
	}

	#[test]
	fn unknown_client_renders_nothing() {
		let doc = fixture_document();
		assert!(render_client_tunnel(&doc, &ClientId::from("missing"), &settings()).is_none());
	}
}
