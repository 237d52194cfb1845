mod config;
mod deployments;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use time::OffsetDateTime;
use tracing::info;

use multisig_contracts::Wallet;
use multisig_encoder::{approve_body, approve_comment, new_order_body, pack_large};
use multisig_types::{boc::serialize_boc_hex, Address};

use crate::{
    config::{load_actions, WalletConfig},
    deployments::{timestamp, DeploymentsFile, WalletDeployment},
};

/// Derive multisig Wallet addresses, build order and approval bodies, and
/// quote order fees.
///
/// Bodies are printed as hex bags of cells, ready to attach to an internal
/// message from the sender's wallet.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the Wallet address and record its state init in the deployments JSON.
    Address {
        #[command(flatten)]
        wallet: WalletArgs,

        /// Path to write deployment info (eg, deployments.testnet.json).
        #[arg(long, env = "DEPLOYMENTS_PATH", default_value = "deployments.testnet.json")]
        deployments_path: PathBuf,

        /// Key under `deployments` to store this wallet.
        #[arg(long, default_value = "multisig")]
        contract_key: String,

        /// Network name (eg, testnet, mainnet).
        #[arg(long, env = "NETWORK", default_value = "testnet")]
        network: String,
    },

    /// Build a `new_order` body for `sender`.
    NewOrder {
        #[command(flatten)]
        wallet: WalletArgs,

        /// Address of the signer or proposer sending the order.
        #[arg(long, env = "SENDER")]
        sender: Address,

        /// Unix time after which the order can no longer execute.
        #[arg(long)]
        expiration: u64,

        /// JSON file with the actions to batch.
        #[arg(long)]
        actions: PathBuf,

        #[arg(long, default_value_t = 0)]
        query_id: u64,
    },

    /// Quote the minimum value a `new_order` must carry.
    Estimate {
        #[command(flatten)]
        wallet: WalletArgs,

        #[arg(long)]
        actions: PathBuf,

        #[arg(long)]
        expiration: u64,

        /// Unix time the order is created at; defaults to now.
        #[arg(long)]
        now: Option<u64>,
    },

    /// Build an approval body for the signer at `signer_index`.
    Approve {
        #[arg(long)]
        signer_index: u8,

        #[arg(long, default_value_t = 0)]
        query_id: u64,

        /// Emit the `approve` text comment instead.
        #[arg(long, default_value_t = false)]
        comment: bool,
    },
}

#[derive(Args, Debug)]
struct WalletArgs {
    /// Wallet config JSON (threshold, signers, proposers, ...).
    #[arg(long, env = "MULTISIG_CONFIG")]
    config: PathBuf,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Address {
            wallet,
            deployments_path,
            contract_key,
            network,
        } => {
            let config = WalletConfig::load(&wallet.config)?;
            let address = config.address()?;
            let entry = WalletDeployment {
                address,
                workchain: config.workchain,
                threshold: config.threshold,
                signers: config.signers.len(),
                proposers: config.proposers.len(),
                state_init_boc: serialize_boc_hex(&config.state_init()?.to_cell()?),
                recorded_at: timestamp()?,
            };
            let mut file = DeploymentsFile::load(&deployments_path)?;
            file.record(&network, &contract_key, &entry)?;
            file.save(&deployments_path)?;
            info!(%address, path = %deployments_path.display(), "recorded wallet");
            println!("{address}");
        }
        Command::NewOrder {
            wallet,
            sender,
            expiration,
            actions,
            query_id,
        } => {
            let config = WalletConfig::load(&wallet.config)?;
            let (is_signer, index) = config.proposer_slot(&sender)?;
            let actions = load_actions(&actions)?;
            let order = pack_large(&actions, &config.address()?).context("failed packing order")?;
            let body = new_order_body(&order, expiration, is_signer, index, query_id)?;
            info!(actions = actions.len(), is_signer, index, "built new_order");
            println!("{}", serialize_boc_hex(&body));
        }
        Command::Estimate {
            wallet,
            actions,
            expiration,
            now,
        } => {
            let config = WalletConfig::load(&wallet.config)?;
            let address = config.address()?;
            let order = pack_large(&load_actions(&actions)?, &address)?;
            let data = config.wallet_state()?.to_cell()?;
            let now = now.unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp().max(0) as u64);
            let quote = Wallet::order_estimate(&config.network, &address, &data, &order, now, expiration)
                .context("failed estimating order")?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Command::Approve {
            signer_index,
            query_id,
            comment,
        } => {
            let body = if comment {
                approve_comment()?
            } else {
                approve_body(signer_index, query_id)?
            };
            println!("{}", serialize_boc_hex(&body));
        }
    }
    Ok(())
}
