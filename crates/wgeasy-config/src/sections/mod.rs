// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for wgeasy.

pub mod logging;
pub mod wireguard;

pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use wireguard::{WireguardConfig, WireguardConfigLayer};
