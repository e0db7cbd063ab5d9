//! Main entry point for the ERC-6909X authorization tool.
//!
//! This binary loads an engine configuration, opens the configured storage
//! backend and runs a single command against it: computing or signing
//! approval digests, applying signed approvals, burning nonces and reading
//! back the authorization state.

use clap::Parser;
use erc6909x_config::Config;
use std::path::PathBuf;

mod commands;

use commands::Command;

/// Command-line arguments for the authorization tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", global = true)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Logs go to stderr so command output can be piped.
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		domain = %config.domain.name,
		chain_id = config.domain.chain_id,
		"Loaded configuration"
	);

	let output = commands::execute(args.command, &config).await?;
	println!("{}", output);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use erc6909x_types::{Address, Bytes, U256};

	#[test]
	fn test_args_default_values() {
		let args = Args::try_parse_from(["erc6909x", "interface-id"]).unwrap();

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
		assert!(matches!(args.command, Command::InterfaceId));
	}

	#[test]
	fn test_global_args_after_subcommand() {
		let args = Args::try_parse_from([
			"erc6909x",
			"nonce-status",
			"--owner",
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
			"--nonce",
			"42",
			"--config",
			"custom.toml",
			"-l",
			"debug",
		])
		.unwrap();

		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
		match args.command {
			Command::NonceStatus { owner, nonce } => {
				assert_eq!(
					owner,
					"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
						.parse::<Address>()
						.unwrap()
				);
				assert_eq!(nonce, U256::from(42));
			},
			other => panic!("unexpected command {:?}", other),
		}
	}

	#[test]
	fn test_payload_flags() {
		let args = Args::try_parse_from([
			"erc6909x",
			"digest",
			"--owner",
			"0x0101010101010101010101010101010101010101",
			"--spender",
			"0x0202020202020202020202020202020202020202",
			"--operator",
			"--nonce",
			"7",
			"--deadline",
			"1700000000",
		])
		.unwrap();

		let Command::Digest(payload) = args.command else {
			panic!("expected digest");
		};
		assert!(payload.operator);
		assert_eq!(payload.id, U256::ZERO);
		assert_eq!(payload.deadline, Some(1_700_000_000));
		assert!(payload.target.is_none());
	}

	#[test]
	fn test_signature_requires_owner_and_deadline() {
		let base = [
			"erc6909x",
			"approve-by-sig",
			"--spender",
			"0x0202020202020202020202020202020202020202",
			"--nonce",
			"1",
			"--signature",
			"0x1234",
		];
		assert!(Args::try_parse_from(base).is_err());

		let args = Args::try_parse_from(base.into_iter().chain([
			"--owner",
			"0x0101010101010101010101010101010101010101",
			"--deadline",
			"1700000000",
		]))
		.unwrap();
		let Command::ApproveBySig { payload, signature } = args.command else {
			panic!("expected approve-by-sig");
		};
		assert_eq!(payload.deadline, Some(1_700_000_000));
		assert_eq!(signature, Some(Bytes::from_static(&[0x12, 0x34])));
	}

	#[test]
	fn test_data_requires_target() {
		let result = Args::try_parse_from([
			"erc6909x",
			"digest",
			"--owner",
			"0x0101010101010101010101010101010101010101",
			"--spender",
			"0x0202020202020202020202020202020202020202",
			"--nonce",
			"1",
			"--data",
			"0x1234",
		]);
		assert!(result.is_err());
	}
}
