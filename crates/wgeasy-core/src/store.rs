// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The cached state document and its backing JSON file.
//!
//! The file is read once, on first access. Every later read and write goes
//! through the in-memory copy; edits made to the file by other processes are
//! not observed until the store is recreated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock, RwLockReadGuard};
use tracing::{error, info, instrument, warn};

use crate::allocator::SubnetTemplate;
use crate::error::{Result, StoreError};
use crate::files::write_owner_only_atomic;
use crate::model::{ServerIdentity, StateDocument};
use crate::toolchain::TunnelToolchain;

pub struct StateStore {
	path: PathBuf,
	toolchain: Arc<dyn TunnelToolchain>,
	template: SubnetTemplate,
	cell: OnceCell<RwLock<StateDocument>>,
}

impl StateStore {
	pub fn new(
		path: impl Into<PathBuf>,
		toolchain: Arc<dyn TunnelToolchain>,
		template: SubnetTemplate,
	) -> Self {
		Self {
			path: path.into(),
			toolchain,
			template,
			cell: OnceCell::new(),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Load the document into the cache if it is not there yet.
	///
	/// A missing or unreadable file yields a freshly initialised document,
	/// which is persisted before returning. Only a failure to generate the
	/// server key pair is reported.
	pub async fn load(&self) -> Result<&RwLock<StateDocument>> {
		self.cell
			.get_or_try_init(|| async { self.read_or_init().await.map(RwLock::new) })
			.await
	}

	/// Shared access to the cached document.
	pub async fn read(&self) -> Result<RwLockReadGuard<'_, StateDocument>> {
		Ok(self.load().await?.read().await)
	}

	pub async fn snapshot(&self) -> Result<StateDocument> {
		Ok(self.read().await?.clone())
	}

	/// Apply `mutate` to a copy of the document. On success the copy replaces
	/// the cached document and is persisted; on error nothing changes.
	/// Persistence failures are logged and do not fail the update.
	pub async fn update<T, F>(&self, mutate: F) -> Result<T>
	where
		F: FnOnce(&mut StateDocument) -> Result<T>,
	{
		let lock = self.load().await?;
		let mut guard = lock.write().await;

		let mut next = guard.clone();
		let value = mutate(&mut next)?;
		*guard = next;

		if let Err(e) = self.save(&guard).await {
			error!(path = %self.path.display(), error = %e, "failed to persist state document");
		}

		Ok(value)
	}

	/// Serialize `doc` and write it atomically with owner-only permissions.
	#[instrument(skip(self, doc), fields(path = %self.path.display(), clients = doc.clients.len()))]
	pub async fn save(&self, doc: &StateDocument) -> std::result::Result<(), StoreError> {
		let json = serde_json::to_string_pretty(doc)?;
		write_owner_only_atomic(&self.path, json.as_bytes()).await?;
		Ok(())
	}

	async fn read_or_init(&self) -> Result<StateDocument> {
		match tokio::fs::read(&self.path).await {
			Ok(bytes) => match serde_json::from_slice::<StateDocument>(&bytes) {
				Ok(doc) => {
					info!(
						path = %self.path.display(),
						clients = doc.clients.len(),
						"loaded state document"
					);
					return Ok(doc);
				}
				Err(e) => {
					warn!(path = %self.path.display(), error = %e, "state document is unreadable, reinitialising");
					self.backup_unreadable().await;
				}
			},
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				info!(path = %self.path.display(), "no state document, initialising");
			}
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "failed to read state document, reinitialising");
				self.backup_unreadable().await;
			}
		}

		let keys = self.toolchain.generate_key_pair().await?;
		let doc = StateDocument::new(ServerIdentity {
			private_key: keys.private_key,
			public_key: keys.public_key,
			address: self.template.server_address(),
		});

		if let Err(e) = self.save(&doc).await {
			error!(path = %self.path.display(), error = %e, "failed to persist new state document");
		}

		Ok(doc)
	}

	async fn backup_unreadable(&self) {
		let mut backup = self.path.clone().into_os_string();
		backup.push(".bak");
		if let Err(e) = tokio::fs::rename(&self.path, &backup).await {
			warn!(error = %e, "failed to back up unreadable state document");
		}
	}
}
