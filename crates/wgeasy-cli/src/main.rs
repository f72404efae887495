// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wgeasy_config::{LogFormat, LoggingConfig, WgEasyConfig};
use wgeasy_core::ClientService;

use commands::ClientCommand;

#[derive(Parser, Debug)]
#[command(name = "wgeasy", version, about, long_about = None)]
struct Args {
	/// Config file (defaults to /etc/wgeasy/wgeasy.toml)
	#[arg(short, long, env = "WGEASY_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Bring the interface down and up again from the stored state
	Up,
	/// Bring the interface down
	Down,
	/// Write a config file containing every default value
	InitConfig {
		/// Destination (defaults to --config or the system path)
		#[arg(long)]
		output: Option<PathBuf>,
	},
	#[command(flatten)]
	Client(ClientCommand),
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

fn load_config(path: Option<&PathBuf>) -> Result<WgEasyConfig> {
	let config = match path {
		Some(path) => wgeasy_config::load_config_with_file(path),
		None => wgeasy_config::load_config(),
	};
	config.context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	if let Command::InitConfig { output } = &args.command {
		let path = output
			.clone()
			.or_else(|| args.config.clone())
			.unwrap_or_else(|| PathBuf::from(wgeasy_config::SYSTEM_CONFIG_PATH));
		return commands::init::run(&path);
	}

	let config = load_config(args.config.as_ref())?;
	init_tracing(&config.logging);
	debug!(state_file = %config.wireguard.state_file().display(), "starting wgeasy");

	let service = ClientService::with_command_toolchain(&config.wireguard)
		.context("failed to initialise client service")?;

	match args.command {
		Command::Up => commands::interface::up(&service).await,
		Command::Down => commands::interface::down(&service).await,
		Command::Client(command) => commands::clients::run(command, &service).await,
		Command::InitConfig { .. } => Ok(()),
	}
}
