// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the client lifecycle against an in-memory toolchain.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use tempfile::TempDir;
use wgeasy_config::WireguardConfig;
use wgeasy_core::testing::{fixture_client, fixture_document, parse_stanzas, FakeToolchain};
use wgeasy_core::{
	render_server_interface, ClientId, ClientService, RenderSettings, StateDocument, WgEasyError,
};

fn config(dir: &TempDir) -> WireguardConfig {
	WireguardConfig {
		path: dir.path().to_path_buf(),
		host: "vpn.example.com".to_string(),
		..Default::default()
	}
}

fn service(dir: &TempDir) -> (ClientService, Arc<FakeToolchain>) {
	let toolchain = Arc::new(FakeToolchain::new());
	let service = ClientService::new(&config(dir), toolchain.clone()).unwrap();
	(service, toolchain)
}

fn read_disk(dir: &TempDir) -> StateDocument {
	serde_json::from_slice(&std::fs::read(dir.path().join("wg0.json")).unwrap()).unwrap()
}

/// Tests lowest-available allocation.
///
/// Purpose: with ordinals 2, 3 and 5 taken, the next client gets 10.0.0.4.
#[tokio::test]
async fn test_next_address_fills_gap() {
	let dir = TempDir::new().unwrap();
	let (service, _) = service(&dir);

	let mut ids = Vec::new();
	for name in ["a", "b", "c", "d"] {
		ids.push(service.create_client(name).await.unwrap().id);
	}
	// 2, 3, 4, 5 -> drop 4
	service.delete_client(&ids[2]).await.unwrap();

	let next = service.create_client("e").await.unwrap();
	assert_eq!(next.address, Ipv4Addr::new(10, 0, 0, 4));
}

/// Tests idempotent delete.
///
/// Purpose: deleting an absent id twice succeeds and leaves the document
/// untouched, with no reconcile issued.
#[tokio::test]
async fn test_delete_absent_twice_is_noop() {
	let dir = TempDir::new().unwrap();
	let (service, toolchain) = service(&dir);
	service.create_client("a").await.unwrap();

	let before = service.snapshot().await.unwrap();
	let before_disk = std::fs::read(dir.path().join("wg0.json")).unwrap();
	toolchain.clear_calls();

	let missing = ClientId::from("ffffffffffffffffffff");
	service.delete_client(&missing).await.unwrap();
	service.delete_client(&missing).await.unwrap();

	assert_eq!(service.snapshot().await.unwrap(), before);
	assert_eq!(std::fs::read(dir.path().join("wg0.json")).unwrap(), before_disk);
	assert!(toolchain.interface_calls().is_empty());
}

/// Tests exhaustion.
///
/// Purpose: with 2..=254 occupied, create fails with AddressSpaceExhausted,
/// generates no keys, and changes neither memory nor disk.
#[tokio::test]
async fn test_exhaustion_leaves_document_unchanged() {
	let dir = TempDir::new().unwrap();

	let mut full = fixture_document();
	for ordinal in 2..=254u8 {
		let id = format!("{ordinal:020}");
		let client = fixture_client(&id, &id, Ipv4Addr::new(10, 0, 0, ordinal));
		full.clients.insert(client.id.clone(), client);
	}
	std::fs::write(
		dir.path().join("wg0.json"),
		serde_json::to_vec_pretty(&full).unwrap(),
	)
	.unwrap();

	let (service, toolchain) = service(&dir);
	assert_eq!(service.snapshot().await.unwrap(), full);

	let before = service.snapshot().await.unwrap();
	let keys_before = toolchain.keys_generated();
	toolchain.clear_calls();

	let result = service.create_client("one too many").await;
	assert!(matches!(result, Err(WgEasyError::AddressSpaceExhausted(_))));

	assert_eq!(service.snapshot().await.unwrap(), before);
	assert_eq!(read_disk(&dir), before);
	assert_eq!(toolchain.keys_generated(), keys_before);
	assert!(toolchain.interface_calls().is_empty());
}

/// Tests persistence failure.
///
/// Purpose: when the state file cannot be written, create still succeeds
/// and the in-memory document keeps the new client.
#[tokio::test]
async fn test_persist_failure_keeps_memory_authoritative() {
	let dir = TempDir::new().unwrap();
	let blocker = dir.path().join("not-a-dir");
	std::fs::write(&blocker, "occupied").unwrap();

	let config = WireguardConfig {
		path: blocker.clone(),
		..config(&dir)
	};
	let toolchain = Arc::new(FakeToolchain::new());
	let service = ClientService::new(&config, toolchain.clone()).unwrap();

	let created = service.create_client("phone").await.unwrap();
	assert_eq!(created.address, Ipv4Addr::new(10, 0, 0, 2));

	let doc = service.snapshot().await.unwrap();
	assert_eq!(doc.clients.len(), 1);
	assert!(doc.clients.contains_key(&created.id));
	assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "occupied");
	assert!(toolchain
		.last_reconciled()
		.unwrap()
		.contains(created.public_key.as_str()));
}

/// Tests disabled peers.
///
/// Purpose: a disabled client is absent from the server text but still listed.
#[tokio::test]
async fn test_disabled_client_listed_but_not_rendered() {
	let dir = TempDir::new().unwrap();
	let (service, toolchain) = service(&dir);
	toolchain.set_dump(Some("summary\n".to_string()));

	let on = service.create_client("on").await.unwrap();
	let off = service.create_client("off").await.unwrap();
	service.disable_client(&off.id).await.unwrap();

	let doc = service.snapshot().await.unwrap();
	let text = render_server_interface(&doc, &RenderSettings::from(&config(&dir)));
	assert!(text.contains(on.public_key.as_str()));
	assert!(!text.contains(off.public_key.as_str()));

	let reconciled = toolchain.last_reconciled().unwrap();
	assert!(!reconciled.contains(off.public_key.as_str()));

	let listing = service.list_clients().await.unwrap();
	let ids: HashSet<_> = listing.clients.iter().map(|c| c.id.clone()).collect();
	assert!(ids.contains(&on.id));
	assert!(ids.contains(&off.id));
	assert!(listing.clients.iter().all(|c| c.downloadable_config));
}

/// Tests client text round trip.
///
/// Purpose: parsing the rendered tunnel text yields the stored client
/// address and server public key.
#[tokio::test]
async fn test_client_tunnel_round_trip() {
	let dir = TempDir::new().unwrap();
	let (service, _) = service(&dir);
	let created = service.create_client("phone").await.unwrap();

	let config = service.client_config(&created.id).await.unwrap().unwrap();
	let stanzas = parse_stanzas(&config.text);
	let doc = service.snapshot().await.unwrap();

	assert_eq!(stanzas[0].section, "Interface");
	assert_eq!(
		stanzas[0].get("Address"),
		Some(format!("{}/24", created.address).as_str())
	);
	assert_eq!(stanzas[1].section, "Peer");
	assert_eq!(stanzas[1].get("PublicKey"), Some(doc.server.public_key.as_str()));
}

/// Tests telemetry overlay.
///
/// Purpose: a dump row for the client's key shows up in the listing.
#[tokio::test]
async fn test_telemetry_overlay() {
	let dir = TempDir::new().unwrap();
	let (service, toolchain) = service(&dir);
	let created = service.create_client("phone").await.unwrap();

	toolchain.set_dump(Some(format!(
		"cHJpdg==\tcHVi\t51820\toff\n{}\t(none)\t198.51.100.7:5000\t{}/32\t1700000000\t100\t200\toff\n",
		created.public_key, created.address
	)));

	let listing = service.list_clients().await.unwrap();
	assert!(listing.telemetry_available);
	let view = &listing.clients[0];
	assert_eq!(view.transfer_rx, 100);
	assert_eq!(view.transfer_tx, 200);
	assert_eq!(view.latest_handshake_at, DateTime::<Utc>::from_timestamp(1_700_000_000, 0));
}

/// Tests telemetry failure.
///
/// Purpose: when the dump fails, every handshake is the epoch and the
/// listing says telemetry is unavailable.
#[tokio::test]
async fn test_telemetry_unavailable() {
	let dir = TempDir::new().unwrap();
	let (service, toolchain) = service(&dir);
	service.create_client("a").await.unwrap();
	service.create_client("b").await.unwrap();
	toolchain.set_dump(None);

	let listing = service.list_clients().await.unwrap();
	assert!(!listing.telemetry_available);
	assert_eq!(listing.clients.len(), 2);
	assert!(listing
		.clients
		.iter()
		.all(|c| c.latest_handshake_at == Some(DateTime::UNIX_EPOCH) && c.transfer_rx == 0));
}

/// Tests persistence across restarts.
///
/// Purpose: a new service over the same directory sees the same clients
/// and server identity.
#[tokio::test]
async fn test_state_survives_restart() {
	let dir = TempDir::new().unwrap();
	let created = {
		let (service, _) = service(&dir);
		service.create_client("phone").await.unwrap()
	};

	let (reopened, _) = service(&dir);
	let view = reopened.get_client(&created.id).await.unwrap().unwrap();
	assert_eq!(view.address, created.address);
	assert_eq!(view.public_key, created.public_key);
}

/// Tests the write gate.
///
/// Purpose: concurrent creates never hand out the same address.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_addresses() {
	let dir = TempDir::new().unwrap();
	let (service, _) = service(&dir);
	let service = Arc::new(service);

	let mut handles = Vec::new();
	for i in 0..32 {
		let service = service.clone();
		handles.push(tokio::spawn(async move {
			service.create_client(&format!("client-{i}")).await.unwrap().address
		}));
	}

	let mut addresses = HashSet::new();
	for handle in handles {
		assert!(addresses.insert(handle.await.unwrap()));
	}
	assert_eq!(addresses.len(), 32);
}

#[derive(Debug, Clone)]
enum Op {
	Create,
	Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
	prop_oneof![Just(Op::Create), any::<usize>().prop_map(Op::Delete)]
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(32))]

	#[test]
	fn prop_addresses_stay_distinct(ops in proptest::collection::vec(op(), 1..40)) {
		let dir = TempDir::new().unwrap();
		let (service, _) = service(&dir);

		let doc = tokio_test::block_on(async {
			let mut live: Vec<ClientId> = Vec::new();
			for op in ops {
				match op {
					Op::Create => live.push(service.create_client("p").await.unwrap().id),
					Op::Delete(i) if !live.is_empty() => {
						let id = live.remove(i % live.len());
						service.delete_client(&id).await.unwrap();
					}
					Op::Delete(_) => {}
				}
			}
			service.snapshot().await.unwrap()
		});

		let addresses: Vec<Ipv4Addr> = doc.addresses().collect();
		let unique: HashSet<Ipv4Addr> = addresses.iter().copied().collect();
		prop_assert_eq!(addresses.len(), unique.len());
	}
}
