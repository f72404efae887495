// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Declarative tunnel endpoint management.
//!
//! A single JSON state document holds the server identity and every client.
//! [`ClientService`] mutates it under one write gate, persists it, and then
//! reconciles the live interface through a [`TunnelToolchain`]. Reads join
//! the stored clients with live peer telemetry.

pub mod allocator;
pub mod clients;
pub mod command;
pub mod error;
mod files;
pub mod id;
pub mod keys;
pub mod model;
pub mod render;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod testing;
pub mod toolchain;
pub mod types;

pub use allocator::{AddressAllocator, SubnetTemplate};
pub use clients::ClientService;
pub use command::WgCommandToolchain;
pub use error::{Result, StoreError, SyncError, WgEasyError};
pub use id::ClientId;
pub use keys::{KeyPair, PublicKey};
pub use model::{Client, KeyProvenance, ServerIdentity, StateDocument};
pub use render::{render_client_tunnel, render_server_interface, RenderSettings};
pub use store::StateStore;
pub use sync::InterfaceSynchronizer;
pub use telemetry::{parse_dump, PeerStats, Telemetry, TelemetryMerger};
pub use toolchain::{ToolchainError, TunnelToolchain};
pub use types::{ClientConfig, ClientListing, ClientView};
