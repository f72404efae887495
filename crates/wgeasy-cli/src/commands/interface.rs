// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::{Context, Result};
use tracing::instrument;
use wgeasy_core::ClientService;

#[instrument(skip(service))]
pub async fn up(service: &ClientService) -> Result<()> {
	service.start().await.context("failed to bring interface up")?;
	println!("interface up");
	Ok(())
}

#[instrument(skip(service))]
pub async fn down(service: &ClientService) -> Result<()> {
	service
		.shutdown()
		.await
		.context("failed to bring interface down")?;
	println!("interface down");
	Ok(())
}
