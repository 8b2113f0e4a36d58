//! Constants used in the deploy scripts

use crate::{artifacts::ArtifactRef, config::FeeOverrides, types::ChainSlug};

// -------------
// | Artifacts |
// -------------

/// The superbridge vault, locking the underlying token on non-app chains
pub const VAULT_ARTIFACT: ArtifactRef =
    ArtifactRef::new("contracts/superbridge/Vault.sol", "Vault");

/// The superbridge controller, minting and burning the token on the app chain
pub const CONTROLLER_ARTIFACT: ArtifactRef =
    ArtifactRef::new("contracts/superbridge/Controller.sol", "Controller");

/// The controller variant for tokens implementing Circle's FiatTokenV2_1
pub const FIAT_TOKEN_CONTROLLER_ARTIFACT: ArtifactRef = ArtifactRef::new(
    "contracts/superbridge/FiatTokenV2_1/FiatTokenV2_1_Controller.sol",
    "FiatTokenV2_1_Controller",
);

/// The exchange rate oracle consulted by the controller
pub const EXCHANGE_RATE_ARTIFACT: ArtifactRef =
    ArtifactRef::new("contracts/superbridge/ExchangeRate.sol", "ExchangeRate");

/// The per-sibling, per-integration messaging connector
pub const CONNECTOR_PLUG_ARTIFACT: ArtifactRef =
    ArtifactRef::new("contracts/superbridge/ConnectorPlug.sol", "ConnectorPlug");

/// The ParallelVault implementation contract
pub const PARALLEL_VAULT_ARTIFACT: ArtifactRef =
    ArtifactRef::new("contracts/superbridge/ParallelVault.sol", "ParallelVault");

/// The Aave lending strategy
pub const AAVE_STRATEGY_ARTIFACT: ArtifactRef =
    ArtifactRef::new("contracts/strategies/AaveStrategy.sol", "AaveStrategy");

/// The Aave strategy for ETH vaults
pub const ETH_AAVE_STRATEGY_ARTIFACT: ArtifactRef =
    ArtifactRef::new("contracts/strategies/EthAaveStrategy.sol", "EthAaveStrategy");

/// The TransparentUpgradeableProxy contract
///
/// Compiled from OpenZeppelin Contracts v5.0.0
pub const PROXY_ARTIFACT: ArtifactRef = ArtifactRef::new(
    "@openzeppelin/contracts/proxy/transparent/TransparentUpgradeableProxy.sol",
    "TransparentUpgradeableProxy",
);

// ---------
// | Proxy |
// ---------

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

// ----------------
// | Transactions |
// ----------------

/// The number of confirmations to wait for the contract deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: u64 = 1;

/// The number of seconds to wait for a deployment to be confirmed
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 300;

/// The RPC URL of a local Hardhat / Anvil node
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545/";

/// One gwei, in wei
const GWEI: u128 = 1_000_000_000;

/// The fee profiles used for a chain unless the config file overrides them
pub fn default_fee_overrides(chain: ChainSlug) -> FeeOverrides {
    match chain {
        ChainSlug::ARBITRUM | ChainSlug::ARBITRUM_SEPOLIA => FeeOverrides {
            tx_type: Some(2),
            gas_limit: Some(20_000_000),
            ..Default::default()
        },
        ChainSlug::SEPOLIA => FeeOverrides {
            tx_type: Some(1),
            gas_price: Some(10 * GWEI),
            ..Default::default()
        },
        ChainSlug::MAINNET => FeeOverrides {
            tx_type: Some(1),
            gas_limit: Some(400_000),
            gas_price: Some(25 * GWEI),
            ..Default::default()
        },
        ChainSlug::MODE_TESTNET => FeeOverrides {
            tx_type: Some(1),
            gas_limit: Some(3_000_000),
            gas_price: Some(GWEI / 10),
            ..Default::default()
        },
        _ => FeeOverrides {
            tx_type: Some(2),
            ..Default::default()
        },
    }
}

// ---------
// | Files |
// ---------

/// The suffix of the addresses file, prefixed with `{mode}_{project}`
pub const ADDRESSES_FILE_SUFFIX: &str = "addresses.json";

/// The suffix of the verification file, prefixed with `{mode}_{project}`
pub const VERIFICATION_FILE_SUFFIX: &str = "verification.json";

// ---------------
// | Environment |
// ---------------

/// The environment variable holding the RPC URL of a chain
pub fn rpc_env_var(chain: ChainSlug) -> Option<&'static str> {
    match chain {
        ChainSlug::MAINNET => Some("ETHEREUM_RPC"),
        ChainSlug::SEPOLIA => Some("SEPOLIA_RPC"),
        ChainSlug::ARBITRUM => Some("ARBITRUM_RPC"),
        ChainSlug::ARBITRUM_SEPOLIA => Some("ARB_SEPOLIA_RPC"),
        ChainSlug::OPTIMISM_SEPOLIA => Some("OPTIMISM_SEPOLIA_RPC"),
        ChainSlug::MODE_TESTNET => Some("MODE_TESTNET_RPC"),
        _ => None,
    }
}
