// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod clients;
pub mod init;
pub mod interface;

pub use clients::ClientCommand;
