//! Definitions of CLI arguments and commands for deploy scripts

use std::{path::PathBuf, time::Duration};

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy_bridge, deploy_vaults, print_addresses},
    config::{ConfigFile, DeployConfig},
    constants::{DEFAULT_CONFIRMATION_TIMEOUT_SECS, NUM_DEPLOY_CONFIRMATIONS},
    errors::ScriptError,
    types::{ChainSlug, DeploymentMode, TokenSymbol},
};

/// Deploy and wire the superbridge contracts across chains
#[derive(Parser)]
#[command(name = "deploy")]
pub struct Cli {
    /// Settings shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every command
#[derive(Args)]
pub struct GlobalArgs {
    /// Private key of the deployer
    #[arg(long, env = "SOCKET_SIGNER_KEY", hide_env_values = true)]
    pub signer_key: Option<String>,

    /// Address expected to own the deployed contracts
    #[arg(long, env = "SOCKET_OWNER_ADDRESS")]
    pub owner: Option<Address>,

    /// The messaging layer deployment to bind to
    #[arg(long, env = "DEPLOYMENT_MODE", value_enum)]
    pub mode: DeploymentMode,

    /// The project whose contracts are deployed
    #[arg(long, env = "PROJECT")]
    pub project: String,

    /// Path to the JSON config file
    #[arg(long, env = "DEPLOY_CONFIG", default_value = "deploy-config.json")]
    pub config: PathBuf,

    /// Directory holding the addresses and verification files
    #[arg(long, env = "DEPLOYMENTS_DIR", default_value = "deployments")]
    pub deployments_dir: PathBuf,
}

impl GlobalArgs {
    /// Build the configuration of a deploying command
    pub fn deploy_config(&self, options: &DeployOptions) -> Result<DeployConfig, ScriptError> {
        if options.confirmation_timeout_secs == 0 {
            return Err(ScriptError::Config(
                "confirmation timeout must be positive".to_string(),
            ));
        }

        Ok(DeployConfig {
            mode: self.mode,
            project: self.project.clone(),
            owner: self.owner,
            deployments_dir: self.deployments_dir.clone(),
            artifacts_dir: options.artifacts_dir.clone(),
            confirmations: options.confirmations,
            confirmation_timeout: Duration::from_secs(options.confirmation_timeout_secs),
            check_code: options.check_code,
            file: ConfigFile::from_path(&self.config)?,
        })
    }
}

/// Settings of commands that send transactions
#[derive(Args)]
pub struct DeployOptions {
    /// Directory of the compiled contract artifacts
    #[arg(long, env = "ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Number of confirmations to wait for on each deployment
    #[arg(long, env = "DEPLOY_CONFIRMATIONS", default_value_t = NUM_DEPLOY_CONFIRMATIONS)]
    pub confirmations: u64,

    /// Seconds to wait for a deployment to be confirmed
    #[arg(
        long,
        env = "CONFIRMATION_TIMEOUT_SECS",
        default_value_t = DEFAULT_CONFIRMATION_TIMEOUT_SECS
    )]
    pub confirmation_timeout_secs: u64,

    /// Check that recorded addresses hold code before reusing them
    #[arg(long)]
    pub check_code: bool,
}

/// The commands of the deploy scripts
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a token's bridge: hubs, then connectors
    Deploy(DeployArgs),
    /// Deploy vault markets: implementation, strategies and vault proxies
    DeployVaults(DeployVaultsArgs),
    /// Print the recorded addresses
    Addresses(AddressesArgs),
}

impl Command {
    /// Run the command
    pub async fn run(self, global: GlobalArgs) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy_bridge(args, &global).await,
            Command::DeployVaults(args) => deploy_vaults(args, &global).await,
            Command::Addresses(args) => print_addresses(args, &global).await,
        }
    }
}

/// Deploy a token's bridge
#[derive(Args)]
pub struct DeployArgs {
    /// The token to deploy the bridge of
    #[arg(long, env = "TOKEN")]
    pub token: TokenSymbol,

    /// Chains to deploy, by chain ID or name; every chain of the bridge if empty
    #[arg(long, env = "CHAINS", value_delimiter = ',')]
    pub chains: Vec<ChainSlug>,

    /// Transaction settings
    #[command(flatten)]
    pub options: DeployOptions,
}

/// Deploy vault markets
#[derive(Args)]
pub struct DeployVaultsArgs {
    /// Networks to deploy markets on; every configured market if empty
    #[arg(long = "network", env = "CHAINS", value_delimiter = ',')]
    pub networks: Vec<ChainSlug>,

    /// Transaction settings
    #[command(flatten)]
    pub options: DeployOptions,
}

/// Print the recorded addresses
#[derive(Args)]
pub struct AddressesArgs {
    /// Chains to print; every recorded chain if empty
    #[arg(long, env = "CHAINS", value_delimiter = ',')]
    pub chains: Vec<ChainSlug>,
}
