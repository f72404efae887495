// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers: an in-memory toolchain and document fixtures.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use wgeasy_common_secret::{Secret, SecretString};

use crate::id::ClientId;
use crate::keys::PublicKey;
use crate::model::{Client, KeyProvenance, ServerIdentity, StateDocument};
use crate::toolchain::{ToolchainError, TunnelToolchain};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainCall {
	Down(String),
	Up(String, String),
	Reconcile(String, String),
	Dump(String),
}

/// Deterministic toolchain: private keys are `private-<n>`, public keys are
/// the private key with `-pub` appended. Interface calls are recorded.
#[derive(Default)]
pub struct FakeToolchain {
	next_key: AtomicU64,
	fail_keygen: AtomicBool,
	fail_down: AtomicBool,
	fail_up: AtomicBool,
	fail_reconcile: AtomicBool,
	dump: Mutex<Option<String>>,
	calls: Mutex<Vec<ToolchainCall>>,
}

impl FakeToolchain {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_keygen(&self, fail: bool) {
		self.fail_keygen.store(fail, Ordering::SeqCst);
	}

	pub fn fail_down(&self, fail: bool) {
		self.fail_down.store(fail, Ordering::SeqCst);
	}

	pub fn fail_up(&self, fail: bool) {
		self.fail_up.store(fail, Ordering::SeqCst);
	}

	pub fn fail_reconcile(&self, fail: bool) {
		self.fail_reconcile.store(fail, Ordering::SeqCst);
	}

	/// `None` makes the dump query fail.
	pub fn set_dump(&self, dump: Option<String>) {
		*self.dump.lock().unwrap() = dump;
	}

	pub fn keys_generated(&self) -> u64 {
		self.next_key.load(Ordering::SeqCst)
	}

	pub fn calls(&self) -> Vec<ToolchainCall> {
		self.calls.lock().unwrap().clone()
	}

	/// Recorded calls other than dump queries.
	pub fn interface_calls(&self) -> Vec<ToolchainCall> {
		self.calls()
			.into_iter()
			.filter(|c| !matches!(c, ToolchainCall::Dump(_)))
			.collect()
	}

	/// Config text of the most recent reconcile, if any.
	pub fn last_reconciled(&self) -> Option<String> {
		self.calls().into_iter().rev().find_map(|c| match c {
			ToolchainCall::Reconcile(_, text) => Some(text),
			_ => None,
		})
	}

	pub fn clear_calls(&self) {
		self.calls.lock().unwrap().clear();
	}

	fn record(&self, call: ToolchainCall) {
		self.calls.lock().unwrap().push(call);
	}

	fn failed(cmd: &'static str) -> ToolchainError {
		ToolchainError::CommandFailed {
			cmd,
			args: String::new(),
			stderr: "injected failure".to_string(),
		}
	}
}

#[async_trait]
impl TunnelToolchain for FakeToolchain {
	async fn generate_private_key(&self) -> Result<SecretString, ToolchainError> {
		if self.fail_keygen.load(Ordering::SeqCst) {
			return Err(Self::failed("wg"));
		}
		let n = self.next_key.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(Secret::new(format!("private-{n}")))
	}

	async fn derive_public_key(
		&self,
		private_key: &SecretString,
	) -> Result<PublicKey, ToolchainError> {
		Ok(PublicKey::new(format!("{}-pub", private_key.expose())))
	}

	async fn interface_down(&self, interface: &str) -> Result<(), ToolchainError> {
		self.record(ToolchainCall::Down(interface.to_string()));
		if self.fail_down.load(Ordering::SeqCst) {
			return Err(Self::failed("wg-quick"));
		}
		Ok(())
	}

	async fn interface_up(&self, interface: &str, config_text: &str) -> Result<(), ToolchainError> {
		self.record(ToolchainCall::Up(interface.to_string(), config_text.to_string()));
		if self.fail_up.load(Ordering::SeqCst) {
			return Err(Self::failed("wg-quick"));
		}
		Ok(())
	}

	async fn reconcile_peers(
		&self,
		interface: &str,
		config_text: &str,
	) -> Result<(), ToolchainError> {
		self.record(ToolchainCall::Reconcile(
			interface.to_string(),
			config_text.to_string(),
		));
		if self.fail_reconcile.load(Ordering::SeqCst) {
			return Err(Self::failed("wg"));
		}
		Ok(())
	}

	async fn dump_peers(&self, interface: &str) -> Result<String, ToolchainError> {
		self.record(ToolchainCall::Dump(interface.to_string()));
		self.dump
			.lock()
			.unwrap()
			.clone()
			.ok_or_else(|| Self::failed("wg"))
	}
}

/// A document with server `10.0.0.1` and no clients.
pub fn fixture_document() -> StateDocument {
	StateDocument::new(ServerIdentity {
		private_key: Secret::new("server-private".to_string()),
		public_key: PublicKey::new("server-public"),
		address: Ipv4Addr::new(10, 0, 0, 1),
	})
}

/// An enabled client with a server-generated key pair derived from `id`.
pub fn fixture_client(id: &str, name: &str, address: Ipv4Addr) -> Client {
	let now = Utc::now();
	Client {
		id: ClientId::from(id),
		name: name.to_string(),
		enabled: true,
		address,
		public_key: PublicKey::new(format!("{id}-pub")),
		private_key: Some(Secret::new(format!("{id}-private"))),
		created_at: now,
		updated_at: now,
		persistent_keepalive: String::new(),
		provenance: Some(KeyProvenance::Generated),
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
	pub section: String,
	pub entries: Vec<(String, String)>,
}

impl Stanza {
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}
}

/// Split rendered text into `[Section]` stanzas of `Key = Value` pairs.
/// Comments and blank lines are ignored.
pub fn parse_stanzas(text: &str) -> Vec<Stanza> {
	let mut stanzas: Vec<Stanza> = Vec::new();

	for line in text.lines().map(str::trim) {
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
			stanzas.push(Stanza {
				section: section.to_string(),
				entries: Vec::new(),
			});
			continue;
		}
		if let (Some(stanza), Some((key, value))) = (stanzas.last_mut(), line.split_once('=')) {
			stanza
				.entries
				.push((key.trim().to_string(), value.trim().to_string()));
		}
	}

	stanzas
}
