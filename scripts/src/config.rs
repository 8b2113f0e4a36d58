//! Deployment configuration, built once at process start and passed by
//! reference into the deploy flows

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_primitives::{utils::parse_units, Address, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    constants::{default_fee_overrides, ADDRESSES_FILE_SUFFIX, VERIFICATION_FILE_SUFFIX},
    errors::ScriptError,
    types::{ChainSlug, DeploymentMode, IntegrationType, StrategyKind, TokenSymbol},
};

// ---------------
// | Config File |
// ---------------

/// A project's bridge constants, per mode and then per token
pub type ProjectModes = BTreeMap<DeploymentMode, BTreeMap<TokenSymbol, ProjectConstants>>;

/// The contents of the JSON config file
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Per project, per mode, per token bridge constants
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectModes>,
    /// Metadata of the tokens referenced by the projects
    #[serde(default)]
    pub tokens: BTreeMap<TokenSymbol, TokenInfo>,
    /// The messaging-layer socket of every chain, per mode
    #[serde(default)]
    pub socket: BTreeMap<DeploymentMode, BTreeMap<ChainSlug, Address>>,
    /// Per chain fee overrides, replacing the built-in profiles
    #[serde(default)]
    pub overrides: BTreeMap<ChainSlug, FeeOverrides>,
    /// Vault market configuration, keyed by network name
    #[serde(default)]
    pub markets: BTreeMap<String, MarketConfig>,
}

impl ConfigFile {
    /// Read and parse the config file at the given path
    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ScriptError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| ScriptError::Config(format!("{}: {e}", path.display())))
    }
}

/// The bridge layout of one token in one project
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConstants {
    /// The chain on which the token is minted and burned
    pub app_chain: ChainSlug,
    /// The chains on which the token is locked in a vault
    pub non_app_chains: Vec<ChainSlug>,
    /// Whether the app chain token is a FiatTokenV2_1, needing the matching controller
    #[serde(default, rename = "isFiatTokenV2_1")]
    pub is_fiat_token_v2_1: bool,
    /// The integrations to deploy connectors for, with their rate limits
    pub integration_types: BTreeMap<IntegrationType, IntegrationLimits>,
}

impl ProjectConstants {
    /// Whether the given chain is the app chain
    pub fn is_app_chain(&self, chain: ChainSlug) -> bool {
        self.app_chain == chain
    }

    /// Every chain of the bridge, app chain first
    pub fn chains(&self) -> Vec<ChainSlug> {
        let mut chains = vec![self.app_chain];
        chains.extend(self.non_app_chains.iter().copied());
        chains
    }

    /// The chains the given chain must hold connectors to
    pub fn siblings(&self, chain: ChainSlug) -> Vec<ChainSlug> {
        if self.is_app_chain(chain) {
            self.non_app_chains.clone()
        } else {
            vec![self.app_chain]
        }
    }

    /// The integrations connectors are deployed for
    pub fn integration_types(&self) -> Vec<IntegrationType> {
        self.integration_types.keys().copied().collect()
    }
}

/// The rate limits of a connector, in whole token units
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationLimits {
    /// The maximum deposit amount
    pub deposit_limit: String,
    /// The rate at which the deposit limit refills, per second
    pub deposit_rate: String,
    /// The maximum withdrawal amount
    pub withdraw_limit: String,
    /// The rate at which the withdrawal limit refills, per second
    pub withdraw_rate: String,
    /// The number of liquidity pools behind the integration
    #[serde(default)]
    pub pool_count: u32,
}

impl IntegrationLimits {
    /// The deposit or withdrawal limit, in base units
    pub fn limit(&self, is_deposit: bool, decimals: u8) -> Result<U256, ScriptError> {
        let amount = if is_deposit {
            &self.deposit_limit
        } else {
            &self.withdraw_limit
        };
        to_base_units(amount, decimals)
    }

    /// The deposit or withdrawal refill rate, in base units
    pub fn rate(&self, is_deposit: bool, decimals: u8) -> Result<U256, ScriptError> {
        let amount = if is_deposit {
            &self.deposit_rate
        } else {
            &self.withdraw_rate
        };
        to_base_units(amount, decimals)
    }
}

/// Convert a decimal amount of whole tokens into base units
fn to_base_units(amount: &str, decimals: u8) -> Result<U256, ScriptError> {
    parse_units(amount, decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| ScriptError::Config(format!("invalid amount `{amount}`: {e}")))
}

/// Token metadata
#[derive(Clone, Debug, Deserialize)]
pub struct TokenInfo {
    /// The token's name
    pub name: String,
    /// The token's symbol
    pub symbol: String,
    /// The token's decimals
    pub decimals: u8,
}

/// Transaction fee settings applied to every deployment on a chain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeOverrides {
    /// The EIP-2718 transaction type
    #[serde(default, rename = "type")]
    pub tx_type: Option<u8>,
    /// A fixed gas limit
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// A fixed gas price, for legacy and access-list transactions
    #[serde(default)]
    pub gas_price: Option<u128>,
    /// The fee cap, for EIP-1559 transactions
    #[serde(default)]
    pub max_fee_per_gas: Option<u128>,
    /// The priority fee, for EIP-1559 transactions
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<u128>,
}

/// The vault market of one network
#[derive(Clone, Debug, Deserialize)]
pub struct MarketConfig {
    /// The owner of the vaults and strategies
    #[serde(rename = "vaultOwner")]
    pub vault_owner: Address,
    /// The admin of every vault proxy
    #[serde(rename = "upgradeAdmin")]
    pub upgrade_admin: Address,
    /// The wstETH token, required by ETH strategies
    #[serde(default, rename = "wstETH")]
    pub wst_eth: Option<Address>,
    /// The tokens to open vaults for
    #[serde(rename = "Tokens")]
    pub tokens: BTreeMap<TokenSymbol, MarketToken>,
}

/// A token listed in a vault market
#[derive(Clone, Debug, Deserialize)]
pub struct MarketToken {
    /// The underlying token
    pub address: Address,
    /// The strategy the vault deploys into
    pub strategy: StrategyKind,
    /// The pool the strategy lends to
    #[serde(rename = "strategyPool")]
    pub strategy_pool: Address,
}

// -----------------
// | Deploy Config |
// -----------------

/// The path of the addresses file for a mode and project
pub fn addresses_path(dir: &Path, mode: DeploymentMode, project: &str) -> PathBuf {
    dir.join(format!("{mode}_{project}_{ADDRESSES_FILE_SUFFIX}"))
}

/// The path of the verification file for a mode and project
pub fn verification_path(dir: &Path, mode: DeploymentMode, project: &str) -> PathBuf {
    dir.join(format!("{mode}_{project}_{VERIFICATION_FILE_SUFFIX}"))
}

/// Everything a deploy flow needs to know that is not on-chain state
#[derive(Clone, Debug)]
pub struct DeployConfig {
    /// The deployment mode
    pub mode: DeploymentMode,
    /// The project being deployed
    pub project: String,
    /// The address expected to own the deployed contracts
    pub owner: Option<Address>,
    /// The directory holding the addresses and verification files
    pub deployments_dir: PathBuf,
    /// The directory holding compilation artifacts
    pub artifacts_dir: PathBuf,
    /// The number of confirmations to wait for each deployment
    pub confirmations: u64,
    /// The maximum time to wait for those confirmations
    pub confirmation_timeout: Duration,
    /// Whether to confirm that recorded addresses hold code before reusing them
    pub check_code: bool,
    /// The parsed config file
    pub file: ConfigFile,
}

impl DeployConfig {
    /// The addresses file of this mode and project
    pub fn addresses_path(&self) -> PathBuf {
        addresses_path(&self.deployments_dir, self.mode, &self.project)
    }

    /// The verification file of this mode and project
    pub fn verification_path(&self) -> PathBuf {
        verification_path(&self.deployments_dir, self.mode, &self.project)
    }

    /// Look up and validate the bridge constants for a token
    pub fn project_constants(&self, token: &TokenSymbol) -> Result<&ProjectConstants, ScriptError> {
        let modes = self
            .file
            .projects
            .get(&self.project)
            .ok_or_else(|| ScriptError::Config(format!("project `{}` is invalid", self.project)))?;

        let constants = modes
            .get(&self.mode)
            .and_then(|tokens| tokens.get(token))
            .ok_or_else(|| {
                ScriptError::Config(format!(
                    "config not found for {}, {}, {token}",
                    self.project, self.mode
                ))
            })?;

        if constants.integration_types.is_empty() {
            return Err(ScriptError::Config(format!(
                "no integration types configured for {token}"
            )));
        }
        if constants.non_app_chains.contains(&constants.app_chain) {
            return Err(ScriptError::Config(format!(
                "chain {} is both the app chain and a non-app chain",
                constants.app_chain
            )));
        }

        let decimals = self.token_info(token)?.decimals;
        for (integration, limits) in constants.integration_types.iter() {
            for is_deposit in [true, false] {
                let limit = limits.limit(is_deposit, decimals)?;
                let rate = limits.rate(is_deposit, decimals)?;
                info!(
                    token = %token,
                    integration = %integration,
                    is_deposit,
                    limit = %limit,
                    rate = %rate,
                    "connector limits"
                );
            }
        }

        Ok(constants)
    }

    /// The metadata of a token
    pub fn token_info(&self, token: &TokenSymbol) -> Result<&TokenInfo, ScriptError> {
        self.file
            .tokens
            .get(token)
            .ok_or_else(|| ScriptError::Config(format!("no token metadata for {token}")))
    }

    /// The messaging-layer socket on a chain in this mode
    pub fn socket(&self, chain: ChainSlug) -> Result<Address, ScriptError> {
        self.file
            .socket
            .get(&self.mode)
            .and_then(|sockets| sockets.get(&chain))
            .copied()
            .ok_or_else(|| {
                ScriptError::Config(format!("no socket address for chain {chain} in {}", self.mode))
            })
    }

    /// The fee settings of a chain, preferring the config file over the built-in profile
    pub fn fee_overrides(&self, chain: ChainSlug) -> FeeOverrides {
        self.file
            .overrides
            .get(&chain)
            .copied()
            .unwrap_or_else(|| default_fee_overrides(chain))
    }

    /// The vault markets to deploy, optionally restricted to the given networks
    pub fn markets(
        &self,
        selection: &[ChainSlug],
    ) -> Result<Vec<(ChainSlug, &MarketConfig)>, ScriptError> {
        let mut markets = Vec::new();
        for (network, market) in self.file.markets.iter() {
            let chain: ChainSlug = network.parse()?;
            if selection.is_empty() || selection.contains(&chain) {
                markets.push((chain, market));
            }
        }

        if let Some(missing) = selection
            .iter()
            .find(|chain| !markets.iter().any(|(c, _)| c == *chain))
        {
            return Err(ScriptError::Config(format!(
                "no market configured for chain {missing}"
            )));
        }

        Ok(markets)
    }
}
