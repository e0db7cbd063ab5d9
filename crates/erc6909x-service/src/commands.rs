//! Subcommands of the authorization tool.
//!
//! Each command builds what it needs from the configuration: the engine for
//! anything touching persisted state, the account for anything that signs.
//! Commands return their output instead of printing it.

use clap::{Args as ClapArgs, Subcommand};
use erc6909x_account::AccountService;
use erc6909x_config::Config;
use erc6909x_core::{AuthorizationEngine, EngineBuilder, EngineFactories, SignedApproval};
use erc6909x_types::{
	current_timestamp, erc6909x_interface_id, Address, ApproveAndCall, Bytes, U256,
	ERC165_INTERFACE_ID, ERC6909_INTERFACE_ID,
};
use std::error::Error;

/// Validity window applied when no deadline is given.
const DEFAULT_VALIDITY_SECS: u64 = 3600;

/// Fields of an `ERC6909XApproveAndCall` payload.
#[derive(ClapArgs, Debug, Clone)]
pub struct PayloadArgs {
	/// Token owner; defaults to the configured account
	#[arg(long)]
	pub owner: Option<Address>,

	#[arg(long)]
	pub spender: Address,

	/// Grant operator rights over every id instead of an allowance
	#[arg(long)]
	pub operator: bool,

	#[arg(long, default_value = "0")]
	pub id: U256,

	#[arg(long, default_value = "0")]
	pub amount: U256,

	#[arg(long)]
	pub nonce: U256,

	/// Expiry as a UNIX timestamp; defaults to one hour from now
	#[arg(long)]
	pub deadline: Option<u64>,

	/// Callback target, making the payload a temporary approval
	#[arg(long)]
	pub target: Option<Address>,

	/// Hex-encoded callback data
	#[arg(long, requires = "target")]
	pub data: Option<Bytes>,
}

impl PayloadArgs {
	fn payload(&self, owner: Address) -> ApproveAndCall {
		let deadline = self
			.deadline
			.unwrap_or_else(|| current_timestamp() + DEFAULT_VALIDITY_SECS);
		let payload = ApproveAndCall::permanent(
			owner,
			self.spender,
			self.operator,
			self.id,
			self.amount,
			self.nonce,
			deadline,
		);
		match self.target {
			Some(target) => payload.with_callback(target, self.data.clone().unwrap_or_default()),
			None => payload,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Prints the EIP-712 digest an owner signs for a payload
	Digest(PayloadArgs),
	/// Signs a payload with the configured account
	Sign(PayloadArgs),
	/// Verifies and applies a signed permanent approval
	ApproveBySig {
		#[command(flatten)]
		payload: PayloadArgs,

		/// Owner signature as printed by `sign`; the configured account signs when absent
		#[arg(long, requires_all = ["owner", "deadline"])]
		signature: Option<Bytes>,
	},
	/// Burns a nonce of the configured account
	InvalidateNonce {
		#[arg(long)]
		nonce: U256,
	},
	/// Prints the allowance of a spender on one id
	Allowance {
		#[arg(long)]
		owner: Address,
		#[arg(long)]
		spender: Address,
		#[arg(long)]
		id: U256,
	},
	/// Prints whether a spender is an operator of an owner
	IsOperator {
		#[arg(long)]
		owner: Address,
		#[arg(long)]
		spender: Address,
	},
	/// Prints whether a nonce of an owner is still usable
	NonceStatus {
		#[arg(long)]
		owner: Address,
		#[arg(long)]
		nonce: U256,
	},
	/// Prints the balance of an owner on one id
	Balance {
		#[arg(long)]
		owner: Address,
		#[arg(long)]
		id: U256,
	},
	/// Prints the ERC-165 interface ids the token reports as supported
	InterfaceId,
}

/// Runs `command` against the state and account described by `config`.
pub async fn execute(command: Command, config: &Config) -> Result<String, Box<dyn Error>> {
	match command {
		Command::Digest(args) => {
			let owner = match args.owner {
				Some(owner) => owner,
				None => load_account(config)?.get_address().await?,
			};
			let digest = args.payload(owner).signing_hash(&config.domain_separator());
			Ok(digest.to_string())
		},
		Command::Sign(args) => {
			let account = load_account(config)?;
			let owner = match args.owner {
				Some(owner) => owner,
				None => account.get_address().await?,
			};
			let signature = account
				.sign_approval(&args.payload(owner), &config.domain_separator())
				.await?;
			Ok(signature.to_string())
		},
		Command::ApproveBySig {
			payload: args,
			signature,
		} => {
			if args.target.is_some() {
				return Err("approve-by-sig grants permanently and takes no callback target".into());
			}
			let (relayer, payload, signature) = match signature {
				Some(signature) => {
					let owner = args.owner.ok_or("--signature needs the signing --owner")?;
					if args.deadline.is_none() {
						return Err("--signature needs the signed --deadline".into());
					}
					// Without an account the relayer is anonymous.
					let relayer = if config.account.is_some() {
						load_account(config)?.get_address().await?
					} else {
						Address::ZERO
					};
					(relayer, args.payload(owner), signature)
				},
				None => {
					let account = load_account(config)?;
					let relayer = account.get_address().await?;
					let owner = args.owner.unwrap_or(relayer);
					if owner != relayer {
						return Err(format!(
							"Configured account {} cannot sign for {}; pass --signature",
							relayer, owner
						)
						.into());
					}
					let payload = args.payload(owner);
					let signature = account
						.sign_approval(&payload, &config.domain_separator())
						.await?;
					(relayer, payload, signature)
				},
			};

			let engine = build_engine(config)?;
			engine
				.approve_by_sig(
					relayer,
					&SignedApproval {
						owner: payload.owner,
						spender: payload.spender,
						operator: payload.operator,
						id: payload.id,
						amount: payload.amount,
						deadline: payload.deadline,
						nonce: payload.nonce,
						signature,
					},
				)
				.await?;
			render_events(&engine)
		},
		Command::InvalidateNonce { nonce } => {
			let owner = load_account(config)?.get_address().await?;
			let engine = build_engine(config)?;
			engine.invalidate_nonce(owner, nonce).await?;
			render_events(&engine)
		},
		Command::Allowance { owner, spender, id } => {
			let engine = build_engine(config)?;
			Ok(engine.allowance(owner, spender, id).await?.to_string())
		},
		Command::IsOperator { owner, spender } => {
			let engine = build_engine(config)?;
			Ok(engine.is_operator(owner, spender).await?.to_string())
		},
		Command::NonceStatus { owner, nonce } => {
			let engine = build_engine(config)?;
			let status = if engine.is_nonce_consumed(owner, nonce).await? {
				"consumed"
			} else {
				"unused"
			};
			Ok(status.to_string())
		},
		Command::Balance { owner, id } => {
			let engine = build_engine(config)?;
			Ok(engine.balance_of(owner, id).await?.to_string())
		},
		Command::InterfaceId => Ok(format!(
			"ERC165 {}\nERC6909 {}\nERC6909X {}",
			ERC165_INTERFACE_ID,
			ERC6909_INTERFACE_ID,
			erc6909x_interface_id()
		)),
	}
}

fn build_engine(config: &Config) -> Result<AuthorizationEngine, Box<dyn Error>> {
	let engine =
		EngineBuilder::new(config.clone()).build(EngineFactories::with_default_implementations())?;
	Ok(engine)
}

fn load_account(config: &Config) -> Result<AccountService, Box<dyn Error>> {
	let account = config
		.account
		.as_ref()
		.ok_or("No [account] section configured")?;
	let account_config = account
		.implementations
		.get(&account.primary)
		.ok_or_else(|| format!("Primary account '{}' has no configuration", account.primary))?;
	let factory = erc6909x_account::get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == account.primary)
		.map(|(_, factory)| factory)
		.ok_or_else(|| format!("Unknown account implementation '{}'", account.primary))?;

	let implementation = factory(account_config)?;
	tracing::info!(component = "account", implementation = %account.primary, "Loaded");
	Ok(AccountService::new(implementation))
}

/// One JSON object per published event.
fn render_events(engine: &AuthorizationEngine) -> Result<String, Box<dyn Error>> {
	let lines = engine
		.take_events()
		.iter()
		.map(serde_json::to_string)
		.collect::<Result<Vec<_>, _>>()?;
	Ok(lines.join("\n"))
}
