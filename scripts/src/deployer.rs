//! Idempotent contract deployment: a contract is only deployed when the ledger
//! holds no address for it, and a fresh address is persisted before the
//! deployment is reported back

use std::{str::FromStr, time::Duration};

use alloy::{
    network::TransactionBuilder,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{AccessList, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes, U256};
use tracing::info;

use crate::{
    artifacts::{ArtifactRef, ArtifactStore},
    config::FeeOverrides,
    constants::{NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT},
    errors::ScriptError,
    ledger::{AddressLedger, LedgerPath},
    types::ChainSlug,
    verification::{VerificationLedger, VerificationRecord},
};

/// One contract to instantiate
#[derive(Clone, Debug)]
pub struct DeployRequest {
    /// The compiled contract
    pub artifact: ArtifactRef,
    /// The ABI-encoded constructor arguments
    pub constructor_args: Bytes,
}

impl DeployRequest {
    /// A request for a contract taking no constructor arguments
    pub fn new(artifact: ArtifactRef) -> Self {
        Self {
            artifact,
            constructor_args: Bytes::new(),
        }
    }

    /// A request with the given constructor arguments
    pub fn with_args(artifact: ArtifactRef, constructor_args: Bytes) -> Self {
        Self {
            artifact,
            constructor_args,
        }
    }
}

/// A contract bound to a ledger entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// The ledger entry
    pub path: LedgerPath,
    /// The contract's address
    pub address: Address,
    /// Whether the contract was deployed by this call
    pub fresh: bool,
}

/// The chain access a deployment needs
#[allow(async_fn_in_trait)]
pub trait DeployBackend {
    /// The chain the backend sends transactions to
    fn chain(&self) -> ChainSlug;

    /// Deploy a contract, returning its address once the creation transaction
    /// is confirmed
    async fn deploy(
        &self,
        request: &DeployRequest,
        overrides: &FeeOverrides,
    ) -> Result<Address, ScriptError>;

    /// Whether there is code at an address
    async fn has_code(&self, address: Address) -> Result<bool, ScriptError>;

    /// Read a storage slot of a contract
    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, ScriptError>;
}

// -----------------
// | Alloy Backend |
// -----------------

/// A backend sending transactions through an RPC endpoint
pub struct AlloyBackend {
    /// The chain the endpoint serves
    chain: ChainSlug,
    /// The signing provider
    provider: DynProvider,
    /// The source of creation bytecode
    artifacts: ArtifactStore,
    /// The number of confirmations to wait for
    confirmations: u64,
    /// How long to wait for the confirmations
    confirmation_timeout: Duration,
}

impl AlloyBackend {
    /// Connect to a chain's RPC endpoint, checking that the endpoint serves the
    /// expected chain
    pub async fn connect(
        chain: ChainSlug,
        rpc_url: &Url,
        signer: PrivateKeySigner,
        artifacts: ArtifactStore,
        confirmations: u64,
        confirmation_timeout: Duration,
    ) -> Result<Self, ScriptError> {
        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(rpc_url.clone());
        let provider = DynProvider::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(format!("chain {chain}: {e}")))?;
        if chain_id != chain.chain_id() {
            return Err(ScriptError::Config(format!(
                "RPC endpoint for chain {chain} reports chain ID {chain_id}"
            )));
        }

        Ok(Self {
            chain,
            provider,
            artifacts,
            confirmations,
            confirmation_timeout,
        })
    }
}

/// Apply a fee profile to a transaction
fn apply_overrides(mut tx: TransactionRequest, overrides: &FeeOverrides) -> TransactionRequest {
    if let Some(gas_limit) = overrides.gas_limit {
        tx = tx.with_gas_limit(gas_limit);
    }
    if let Some(gas_price) = overrides.gas_price {
        tx = tx.with_gas_price(gas_price);
    }
    if let Some(max_fee) = overrides.max_fee_per_gas {
        tx = tx.with_max_fee_per_gas(max_fee);
    }
    if let Some(max_priority_fee) = overrides.max_priority_fee_per_gas {
        tx = tx.with_max_priority_fee_per_gas(max_priority_fee);
    }

    if let Some(tx_type) = overrides.tx_type {
        tx.transaction_type = Some(tx_type);
        // Type 1 transactions are identified by their access list
        if tx_type == 1 {
            tx = tx.with_access_list(AccessList::default());
        }
    }

    tx
}

impl DeployBackend for AlloyBackend {
    fn chain(&self) -> ChainSlug {
        self.chain
    }

    async fn deploy(
        &self,
        request: &DeployRequest,
        overrides: &FeeOverrides,
    ) -> Result<Address, ScriptError> {
        let bytecode = self.artifacts.bytecode(&request.artifact)?;
        let mut code = bytecode.to_vec();
        code.extend_from_slice(&request.constructor_args);

        let tx = TransactionRequest::default().with_deploy_code(code);
        let tx = apply_overrides(tx, overrides);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| {
                ScriptError::ContractDeployment(format!("{}: {e}", request.artifact.name))
            })?;
        let tx_hash = *pending.tx_hash();
        info!(
            chain = %self.chain,
            contract = request.artifact.name,
            tx = %tx_hash,
            "deployment submitted"
        );

        let receipt = tokio::time::timeout(
            self.confirmation_timeout,
            pending.with_required_confirmations(self.confirmations).get_receipt(),
        )
        .await
        .map_err(|_| {
            ScriptError::ConfirmationTimeout(format!(
                "{} ({tx_hash:#x}) after {}s",
                request.artifact.name,
                self.confirmation_timeout.as_secs()
            ))
        })?
        .map_err(|e| ScriptError::ContractDeployment(format!("{}: {e}", request.artifact.name)))?;

        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "{}: transaction {tx_hash:#x} reverted",
                request.artifact.name
            )));
        }

        receipt.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "{}: receipt of {tx_hash:#x} has no contract address",
                request.artifact.name
            ))
        })
    }

    async fn has_code(&self, address: Address) -> Result<bool, ScriptError> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        Ok(!code.is_empty())
    }

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, ScriptError> {
        self.provider
            .get_storage_at(address, slot)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }
}

// ------------
// | Deployer |
// ------------

/// Deploys contracts to one chain, recording them in the ledger
pub struct ChainDeployer<'a, B> {
    /// The chain access
    backend: &'a B,
    /// The address ledger
    ledger: &'a AddressLedger,
    /// The verification records
    verification: &'a VerificationLedger,
    /// The fee profile applied to every deployment
    overrides: FeeOverrides,
    /// Whether ledger hits are confirmed on chain
    check_code: bool,
}

impl<'a, B: DeployBackend> ChainDeployer<'a, B> {
    /// Create a deployer for the backend's chain
    pub fn new(
        backend: &'a B,
        ledger: &'a AddressLedger,
        verification: &'a VerificationLedger,
        overrides: FeeOverrides,
        check_code: bool,
    ) -> Self {
        Self {
            backend,
            ledger,
            verification,
            overrides,
            check_code,
        }
    }

    /// The chain deployed to
    pub fn chain(&self) -> ChainSlug {
        self.backend.chain()
    }

    /// The address recorded at a path, if any
    pub async fn recorded(&self, path: &LedgerPath) -> Result<Option<Address>, ScriptError> {
        self.ledger.get(self.chain(), path).await
    }

    /// Return the contract recorded at `path`, deploying it first if the
    /// ledger holds no address for it.
    ///
    /// A fresh address is in the ledger file before this returns.
    pub async fn get_or_deploy(
        &self,
        path: LedgerPath,
        request: DeployRequest,
    ) -> Result<DeployedContract, ScriptError> {
        let chain = self.chain();

        if let Some(address) = self.ledger.get(chain, &path).await? {
            if self.check_code && !self.backend.has_code(address).await? {
                return Err(ScriptError::Precondition(format!(
                    "{path} on chain {chain} is recorded at {address:#x}, which has no code"
                )));
            }
            info!(chain = %chain, path = %path, address = %address, "already deployed");
            return Ok(DeployedContract {
                path,
                address,
                fresh: false,
            });
        }

        info!(chain = %chain, path = %path, contract = request.artifact.name, "deploying");
        let address = self.backend.deploy(&request, &self.overrides).await?;
        info!(chain = %chain, path = %path, address = %address, "deployed");

        self.ledger.set(chain, &path, address).await?;
        self.ledger.flush(chain).await?;
        let record = VerificationRecord::new(address, &request.artifact, request.constructor_args);
        self.verification.append(chain, record).await?;

        Ok(DeployedContract {
            path,
            address,
            fresh: true,
        })
    }

    /// Record an address that was not deployed directly, e.g. a contract
    /// created by another contract's constructor
    pub async fn record(&self, path: &LedgerPath, address: Address) -> Result<(), ScriptError> {
        let chain = self.chain();
        if self.ledger.get(chain, path).await? == Some(address) {
            return Ok(());
        }

        self.ledger.set(chain, path, address).await?;
        self.ledger.flush(chain).await
    }

    /// Read the admin of an EIP-1967 proxy
    pub async fn proxy_admin(&self, proxy: Address) -> Result<Address, ScriptError> {
        let slot = U256::from_str(PROXY_ADMIN_STORAGE_SLOT)
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        let value = self.backend.storage_at(proxy, slot).await?;

        let admin = Address::from_slice(
            &value.to_be_bytes::<NUM_BYTES_STORAGE_SLOT>()
                [NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
        );
        if admin == Address::ZERO {
            return Err(ScriptError::ContractInteraction(format!(
                "proxy {proxy:#x} on chain {} has no admin",
                self.chain()
            )));
        }

        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{EXCHANGE_RATE_ARTIFACT, VAULT_ARTIFACT},
        solidity::vault_args,
        test_utils::{MockBackend, TestLedgers},
        types::{Role, TokenSymbol},
    };

    fn vault_path() -> LedgerPath {
        LedgerPath::token(&TokenSymbol::from("USDC"), Role::Vault)
    }

    #[tokio::test]
    async fn deploys_once_then_reuses() {
        let ledgers = TestLedgers::new(&[ChainSlug::SEPOLIA]).await;
        let backend = MockBackend::new(ChainSlug::SEPOLIA);
        let deployer = ledgers.deployer(&backend, false);
        let request =
            DeployRequest::with_args(VAULT_ARTIFACT, vault_args(Address::with_last_byte(1)));

        let first = deployer
            .get_or_deploy(vault_path(), request.clone())
            .await
            .unwrap();
        let second = deployer
            .get_or_deploy(vault_path(), request)
            .await
            .unwrap();

        assert!(first.fresh);
        assert!(!second.fresh);
        assert_eq!(first.address, second.address);
        assert_eq!(backend.deploy_count(), 1);

        let records = ledgers
            .verification
            .records(ChainSlug::SEPOLIA)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, first.address);
    }

    #[tokio::test]
    async fn fresh_addresses_are_on_disk_before_returning() {
        let ledgers = TestLedgers::new(&[ChainSlug::SEPOLIA]).await;
        let backend = MockBackend::new(ChainSlug::SEPOLIA);
        let deployer = ledgers.deployer(&backend, false);

        let deployed = deployer
            .get_or_deploy(vault_path(), DeployRequest::new(VAULT_ARTIFACT))
            .await
            .unwrap();

        let reloaded = AddressLedger::load(ledgers.ledger.path(), &[ChainSlug::SEPOLIA])
            .await
            .unwrap();
        assert_eq!(
            reloaded.get(ChainSlug::SEPOLIA, &vault_path()).await.unwrap(),
            Some(deployed.address)
        );
    }

    #[tokio::test]
    async fn failed_deployments_leave_no_entry() {
        let ledgers = TestLedgers::new(&[ChainSlug::SEPOLIA]).await;
        let backend = MockBackend::new(ChainSlug::SEPOLIA).failing_on("Vault");
        let deployer = ledgers.deployer(&backend, false);

        let result = deployer
            .get_or_deploy(vault_path(), DeployRequest::new(VAULT_ARTIFACT))
            .await;
        assert!(matches!(result, Err(ScriptError::ContractDeployment(_))));
        assert_eq!(
            ledgers
                .ledger
                .get(ChainSlug::SEPOLIA, &vault_path())
                .await
                .unwrap(),
            None
        );

        let path = LedgerPath::token(&TokenSymbol::from("USDC"), Role::ExchangeRate);
        deployer
            .get_or_deploy(path, DeployRequest::new(EXCHANGE_RATE_ARTIFACT))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn code_check_rejects_empty_addresses() {
        let ledgers = TestLedgers::new(&[ChainSlug::SEPOLIA]).await;
        let recorded = Address::with_last_byte(0x42);
        ledgers
            .ledger
            .set(ChainSlug::SEPOLIA, &vault_path(), recorded)
            .await
            .unwrap();

        let backend = MockBackend::new(ChainSlug::SEPOLIA);
        let unchecked = ledgers.deployer(&backend, false);
        unchecked
            .get_or_deploy(vault_path(), DeployRequest::new(VAULT_ARTIFACT))
            .await
            .unwrap();

        let checked = ledgers.deployer(&backend, true);
        let result = checked
            .get_or_deploy(vault_path(), DeployRequest::new(VAULT_ARTIFACT))
            .await;
        assert!(matches!(result, Err(ScriptError::Precondition(_))));
        assert_eq!(backend.deploy_count(), 0);
    }

    #[test]
    fn type_one_overrides_carry_an_access_list() {
        let overrides = FeeOverrides {
            tx_type: Some(1),
            gas_price: Some(7),
            ..Default::default()
        };
        let tx = apply_overrides(TransactionRequest::default(), &overrides);
        assert_eq!(tx.transaction_type, Some(1));
        assert_eq!(tx.gas_price, Some(7));
        assert!(tx.access_list.is_some());
        assert_eq!(tx.gas, None);
    }
}
