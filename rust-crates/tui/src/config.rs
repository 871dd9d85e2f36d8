use crate::{
    client::DEFAULT_CONFIRMATIONS,
    provider::DEFAULT_RPC_URL,
};
use clap::Parser;
use deployments::DEFAULT_ADDRESSES_FILE;
use raffle_abi::Address;
use std::{
    path::PathBuf,
    time::Duration,
};

/// Terminal client for a decentralized raffle contract. Transactions are
/// signed by the web3 provider behind `--rpc-url`.
#[derive(Parser, Debug)]
#[command(name = "lottery-entrance", version, about)]
pub struct Args {
    /// JSON-RPC endpoint of the wallet or node holding the accounts.
    #[arg(long, env = "RAFFLE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// JSON table of raffle deployments keyed by chain id.
    #[arg(long, env = "RAFFLE_ADDRESSES_FILE", default_value = DEFAULT_ADDRESSES_FILE)]
    pub addresses_file: String,

    /// Account to enter from. Defaults to the first account the provider exposes.
    #[arg(long, env = "RAFFLE_ACCOUNT")]
    pub account: Option<Address>,

    /// Blocks a transaction must be buried under before it counts as confirmed.
    #[arg(
        long,
        default_value_t = DEFAULT_CONFIRMATIONS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub confirmations: u64,

    #[arg(
        long,
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(50..)
    )]
    pub poll_interval_ms: u64,

    #[arg(long, default_value_t = 300)]
    pub confirmation_timeout_secs: u64,

    /// How long the transaction toast stays on screen.
    #[arg(long, default_value_t = 6)]
    pub notification_secs: u64,

    /// Ask the wallet to expose accounts (`eth_requestAccounts`) at startup.
    #[arg(long)]
    pub request_accounts: bool,

    #[arg(long, env = "RAFFLE_LOG_DIR", default_value = ".logs")]
    pub log_dir: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub rpc_url: String,
    pub addresses_file: PathBuf,
    pub preferred_account: Option<Address>,
    pub confirmations: u64,
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    pub notification_ttl: Duration,
    pub request_accounts: bool,
    pub log_dir: PathBuf,
}

impl Args {
    pub fn into_config(self) -> AppConfig {
        AppConfig {
            rpc_url: self.rpc_url,
            addresses_file: expand_path(&self.addresses_file),
            preferred_account: self.account,
            confirmations: self.confirmations,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            notification_ttl: Duration::from_secs(self.notification_secs),
            request_accounts: self.request_accounts,
            log_dir: expand_path(&self.log_dir),
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
