// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::id::ClientId;
use crate::toolchain::ToolchainError;

/// Errors that abort a client operation and reach the caller.
#[derive(Error, Debug)]
pub enum WgEasyError {
	#[error("no free address left in {0}")]
	AddressSpaceExhausted(String),

	#[error("client not found: {0}")]
	NotFound(ClientId),

	#[error("address {0} is already in use")]
	AddressInUse(Ipv4Addr),

	#[error("invalid address: {0}")]
	InvalidAddress(String),

	#[error("invalid address template: {0}")]
	InvalidTemplate(String),

	#[error("invalid client name: {0}")]
	InvalidName(String),

	#[error("toolchain error: {0}")]
	Toolchain(#[from] ToolchainError),

	/// Only returned by explicit interface start and stop, never by a
	/// client operation.
	#[error("interface sync failed: {0}")]
	Sync(#[from] SyncError),
}

pub type Result<T> = std::result::Result<T, WgEasyError>;

/// Persisting the state document failed. Logged, never returned from a
/// client operation: the in-memory document stays authoritative.
#[derive(Error, Debug)]
pub enum StoreError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Applying the rendered configuration to the live interface failed.
/// Logged, never returned from a client operation.
#[derive(Error, Debug)]
pub enum SyncError {
	#[error("bringing interface up failed: {0}")]
	InterfaceUp(#[source] ToolchainError),

	#[error("bringing interface down failed: {0}")]
	InterfaceDown(#[source] ToolchainError),

	#[error("reconciling peers failed: {0}")]
	Reconcile(#[source] ToolchainError),
}
