//! Type definitions used throughout the scripts

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// The identifier of a chain in the messaging layer.
///
/// For every chain the scripts know about, the slug is equal to the EVM chain ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainSlug(pub u32);

impl ChainSlug {
    /// Ethereum mainnet
    pub const MAINNET: ChainSlug = ChainSlug(1);
    /// Ethereum Sepolia
    pub const SEPOLIA: ChainSlug = ChainSlug(11_155_111);
    /// Arbitrum One
    pub const ARBITRUM: ChainSlug = ChainSlug(42_161);
    /// Arbitrum Sepolia
    pub const ARBITRUM_SEPOLIA: ChainSlug = ChainSlug(421_614);
    /// Optimism Sepolia
    pub const OPTIMISM_SEPOLIA: ChainSlug = ChainSlug(11_155_420);
    /// Mode testnet
    pub const MODE_TESTNET: ChainSlug = ChainSlug(919);
    /// A local Hardhat / Anvil node
    pub const HARDHAT: ChainSlug = ChainSlug(31_337);

    /// Chains with a known network name
    const NAMED: [(ChainSlug, &'static str); 7] = [
        (ChainSlug::MAINNET, "mainnet"),
        (ChainSlug::SEPOLIA, "sepolia"),
        (ChainSlug::ARBITRUM, "arbitrum"),
        (ChainSlug::ARBITRUM_SEPOLIA, "arbitrum_sepolia"),
        (ChainSlug::OPTIMISM_SEPOLIA, "optimism_sepolia"),
        (ChainSlug::MODE_TESTNET, "mode_testnet"),
        (ChainSlug::HARDHAT, "hardhat"),
    ];

    /// The network name of the chain, if it is a known chain
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(slug, _)| slug == self)
            .map(|(_, name)| *name)
    }

    /// The EVM chain ID the chain's RPC endpoint must report
    pub fn chain_id(&self) -> u64 {
        self.0 as u64
    }
}

impl Display for ChainSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainSlug {
    type Err = ScriptError;

    /// Parses either a numeric slug or a known network name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(slug) = s.parse::<u32>() {
            return Ok(ChainSlug(slug));
        }

        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::NAMED
            .iter()
            .find(|(_, name)| *name == normalized)
            .map(|(slug, _)| *slug)
            .ok_or_else(|| ScriptError::Config(format!("unknown chain `{s}`")))
    }
}

/// The deployment mode, selecting which messaging layer deployment to bind to
#[derive(
    ValueEnum, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Development deployment
    Dev,
    /// Staging deployment
    Surge,
    /// Production deployment
    Prod,
}

impl Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Dev => write!(f, "dev"),
            DeploymentMode::Surge => write!(f, "surge"),
            DeploymentMode::Prod => write!(f, "prod"),
        }
    }
}

/// The messaging-layer integration a connector is bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntegrationType {
    /// Fast switchboard
    #[serde(rename = "FAST")]
    Fast,
    /// Optimistic switchboard
    #[serde(rename = "OPTIMISTIC")]
    Optimistic,
    /// Native bridge switchboard
    #[serde(rename = "NATIVE_BRIDGE")]
    NativeBridge,
}

impl IntegrationType {
    /// The key of the integration in the addresses file
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Fast => "FAST",
            IntegrationType::Optimistic => "OPTIMISTIC",
            IntegrationType::NativeBridge => "NATIVE_BRIDGE",
        }
    }
}

impl Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The symbol of a bridged or vaulted token, e.g. `USDC`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSymbol(String);

impl TokenSymbol {
    /// The symbol as it appears in the addresses file
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TokenSymbol {
    fn from(symbol: &str) -> Self {
        TokenSymbol(symbol.to_string())
    }
}

impl FromStr for TokenSymbol {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim();
        if symbol.is_empty() {
            return Err(ScriptError::Config("empty token symbol".to_string()));
        }
        Ok(TokenSymbol(symbol.to_string()))
    }
}

impl Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A logical contract identity, independent of its deployed address
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// The token minted and burned by the controller on the app chain
    MintableToken,
    /// The token locked in the vault on a non-app chain
    NonMintableToken,
    /// The lock/release hub on a non-app chain
    Vault,
    /// The mint/burn hub on the app chain
    Controller,
    /// The exchange rate oracle used by the controller
    ExchangeRate,
    /// The ParallelVault implementation behind every vault proxy on a chain
    ParallelVault,
    /// An Aave lending strategy
    AaveStrategy,
    /// An Aave strategy for ETH-denominated vaults
    EthAaveStrategy,
    /// The upgradeable proxy fronting a token's vault
    VaultProxy,
    /// The admin of a token's vault proxy
    ProxyAdmin,
}

impl Role {
    /// The key of the role in the addresses file
    pub fn key(&self) -> &'static str {
        match self {
            Role::MintableToken => "MintableToken",
            Role::NonMintableToken => "NonMintableToken",
            Role::Vault => "Vault",
            Role::Controller => "Controller",
            Role::ExchangeRate => "ExchangeRate",
            Role::ParallelVault => "ParallelVault",
            Role::AaveStrategy => "AaveStrategy",
            Role::EthAaveStrategy => "EthAaveStrategy",
            Role::VaultProxy => "VaultProxy",
            Role::ProxyAdmin => "ProxyAdmin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The yield strategy a vault's funds are deployed into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Lend the underlying token on Aave
    #[serde(rename = "AAVE")]
    Aave,
    /// Lend ETH on Aave through wstETH
    #[serde(rename = "ETHAAVE")]
    EthAave,
}

impl StrategyKind {
    /// The ledger role under which the strategy is recorded
    pub fn role(&self) -> Role {
        match self {
            StrategyKind::Aave => Role::AaveStrategy,
            StrategyKind::EthAave => Role::EthAaveStrategy,
        }
    }
}
