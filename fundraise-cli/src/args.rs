use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fundraise_contract_clients::{
    ANVIL_DEFAULT_CONTRACT_ADDRESS, AccountSource, ContractConfig, DEFAULT_RPC_URL,
};
use state_file::StateFile;
use std::path::PathBuf;
use tracing::info;

pub const STATE_FILE_CLIENT: &str = "chain_fundraise.env";

pub const DEFAULT_EXPLORER_URL: &str = "https://etherscan.io";

/// CLI arguments for the ChainFundraise client
#[derive(Parser, Debug)]
#[command(name = "fundraise")]
#[command(
    about = "ChainFundraise client - create, fund and track on-chain crowdfunding campaigns",
    long_about = None
)]
pub struct CliArgs {
    /// Ethereum RPC endpoint (HTTP or WebSocket)
    #[arg(long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Deployed ChainFundraise contract address
    #[arg(long, env = "CONTRACT_ADDRESS", global = true)]
    pub contract_address: Option<String>,

    /// Private key for signing transactions. Without one, accounts unlocked
    /// on the node are used.
    #[arg(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    /// Node account to send from (only without --private-key)
    #[arg(long = "from", env = "FROM_ADDRESS", global = true)]
    pub from_address: Option<Address>,

    /// Block explorer used for transaction links
    #[arg(long, env = "EXPLORER_URL", global = true)]
    pub explorer_url: Option<String>,

    /// File remembering the last deployment
    #[arg(long, env = "STATE_FILE", global = true, default_value = STATE_FILE_CLIENT)]
    pub state_file: PathBuf,

    /// Submit transactions without asking for confirmation
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the connected account, balance, network and contract
    Status,

    /// List every campaign, newest first
    List {
        /// Only show campaigns whose card contains this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Show a single campaign
    Show {
        /// Campaign ID
        id: u64,
    },

    /// Create a new campaign
    Create {
        /// Campaign title (at least 3 characters)
        #[arg(long)]
        title: String,

        /// Funding goal in ETH
        #[arg(long)]
        goal: String,

        /// Duration in days
        #[arg(long)]
        duration_days: u64,

        /// Minimum contribution in ETH
        #[arg(long, default_value = "0.01")]
        min_contribution: String,
    },

    /// Contribute ETH to a campaign
    Contribute {
        /// Campaign ID
        id: u64,

        /// Amount in ETH
        amount: String,
    },

    /// Withdraw the funds of a successful campaign (creator only)
    Withdraw {
        /// Campaign ID
        id: u64,
    },

    /// Claim a refund from a campaign that did not reach its goal
    Refund {
        /// Campaign ID
        id: u64,
    },

    /// Show how much an address has contributed to a campaign
    Contribution {
        /// Campaign ID
        id: u64,

        /// Contributor (defaults to the connected account)
        address: Option<Address>,
    },

    /// Follow contract events and keep the campaign list up to date
    Watch {
        /// Full refresh interval in seconds
        #[arg(long, default_value_t = 30)]
        refresh_secs: u64,

        /// Account / network change polling interval in seconds
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
    },

    /// Deploy the ChainFundraise contract from a compiled artifact
    Deploy {
        /// Hardhat or Foundry artifact JSON
        #[arg(long)]
        artifact: PathBuf,
    },
}

/// Client configuration with all required values resolved
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub contract: ContractConfig,
    pub account: AccountSource,
    pub explorer_url: String,
    pub assume_yes: bool,
    pub json: bool,
    pub state_file: StateFile,
}

impl ClientConfig {
    /// Load configuration with priority: CLI/env -> state file -> defaults
    pub fn load(cli_args: &CliArgs) -> Result<Self> {
        let state_file = StateFile::new(&cli_args.state_file);
        Self::load_with_state(cli_args, state_file)
    }

    fn load_with_state(cli_args: &CliArgs, state_file: StateFile) -> Result<Self> {
        let rpc_url = cli_args
            .rpc_url
            .clone()
            .or_else(|| state_file.load_value("RPC_URL"))
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let contract_address = match cli_args
            .contract_address
            .clone()
            .or_else(|| state_file.load_value("CONTRACT_ADDRESS"))
        {
            Some(address) => address
                .parse::<Address>()
                .with_context(|| format!("invalid contract address {address}"))?,
            None => ANVIL_DEFAULT_CONTRACT_ADDRESS,
        };

        let account = match cli_args
            .private_key
            .clone()
            .or_else(|| state_file.load_value("PRIVATE_KEY"))
        {
            Some(key) => AccountSource::LocalKey(key),
            None => AccountSource::Node {
                from: cli_args.from_address,
            },
        };

        let explorer_url = cli_args
            .explorer_url
            .clone()
            .or_else(|| state_file.load_value("EXPLORER_URL"))
            .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        info!(
            "Loaded ClientConfig: rpc_url={rpc_url}, contract_address={contract_address}, account={account:?}"
        );

        Ok(ClientConfig {
            contract: ContractConfig::new(rpc_url, contract_address),
            account,
            explorer_url,
            assume_yes: cli_args.yes,
            json: cli_args.json,
            state_file,
        })
    }
}
