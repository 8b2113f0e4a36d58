//! Helpers for testing deployments without a chain

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use alloy_primitives::{Address, U256};
use tempfile::TempDir;

use crate::{
    config::{DeployConfig, FeeOverrides},
    constants::{NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT},
    deployer::{ChainDeployer, DeployBackend, DeployRequest},
    errors::ScriptError,
    ledger::AddressLedger,
    types::ChainSlug,
    verification::VerificationLedger,
};

/// A backend that "deploys" contracts by handing out deterministic addresses
pub struct MockBackend {
    /// The chain the backend pretends to serve
    chain: ChainSlug,
    /// The number of deployments sent
    deploys: AtomicUsize,
    /// The contract names deployed, in order
    deployed: Mutex<Vec<(&'static str, Address)>>,
    /// Deployments of this contract fail
    fail_on: Option<&'static str>,
    /// Deployments after this many succeeded ones fail
    fail_after: Option<usize>,
}

impl MockBackend {
    /// A backend for the given chain on which every deployment succeeds
    pub fn new(chain: ChainSlug) -> Self {
        Self {
            chain,
            deploys: AtomicUsize::new(0),
            deployed: Mutex::new(Vec::new()),
            fail_on: None,
            fail_after: None,
        }
    }

    /// Fail every deployment of the named contract
    pub fn failing_on(mut self, contract: &'static str) -> Self {
        self.fail_on = Some(contract);
        self
    }

    /// Fail every deployment after `n` successful ones
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// The number of deployment transactions sent
    pub fn deploy_count(&self) -> usize {
        self.deploys.load(Ordering::SeqCst)
    }

    /// The names of the contracts deployed, in order
    pub fn deployed_names(&self) -> Vec<&'static str> {
        self.deployed.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }

    /// The admin every proxy deployed through this backend reports
    pub fn proxy_admin_of(proxy: Address) -> Address {
        let mut bytes = proxy.0 .0;
        bytes[0] = 0xad;
        Address::from(bytes)
    }
}

impl DeployBackend for MockBackend {
    fn chain(&self) -> ChainSlug {
        self.chain
    }

    async fn deploy(
        &self,
        request: &DeployRequest,
        _overrides: &FeeOverrides,
    ) -> Result<Address, ScriptError> {
        let succeeded = self.deployed.lock().unwrap().len();
        let scripted = self.fail_on == Some(request.artifact.name)
            || self.fail_after.is_some_and(|n| succeeded >= n);
        if scripted {
            return Err(ScriptError::ContractDeployment(format!(
                "{}: execution reverted",
                request.artifact.name
            )));
        }

        let nonce = self.deploys.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        let mut bytes = [0u8; NUM_BYTES_ADDRESS];
        bytes[..4].copy_from_slice(&self.chain.0.to_be_bytes());
        bytes[12..].copy_from_slice(&nonce.to_be_bytes());
        let address = Address::from(bytes);

        self.deployed.lock().unwrap().push((request.artifact.name, address));
        Ok(address)
    }

    async fn has_code(&self, address: Address) -> Result<bool, ScriptError> {
        let deployed = self.deployed.lock().unwrap();
        Ok(deployed.iter().any(|(_, a)| *a == address))
    }

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, ScriptError> {
        let admin_slot: U256 = PROXY_ADMIN_STORAGE_SLOT.parse().unwrap();
        if slot != admin_slot {
            return Ok(U256::ZERO);
        }

        let mut word = [0u8; NUM_BYTES_STORAGE_SLOT];
        word[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..]
            .copy_from_slice(Self::proxy_admin_of(address).as_slice());
        Ok(U256::from_be_bytes(word))
    }
}

/// Address and verification ledgers backed by a temporary directory
pub struct TestLedgers {
    /// Keeps the directory alive
    pub dir: TempDir,
    /// The address ledger
    pub ledger: AddressLedger,
    /// The verification ledger
    pub verification: VerificationLedger,
}

impl TestLedgers {
    /// Fresh ledgers for the given chains
    pub async fn new(chains: &[ChainSlug]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::tests::test_config(dir.path());
        Self::for_config(dir, &config, chains).await
    }

    /// Ledgers at the locations the config names
    pub async fn for_config(dir: TempDir, config: &DeployConfig, chains: &[ChainSlug]) -> Self {
        let ledger = AddressLedger::load(config.addresses_path(), chains)
            .await
            .unwrap();
        let verification = VerificationLedger::new(config.verification_path());
        Self {
            dir,
            ledger,
            verification,
        }
    }

    /// Reload the address ledger from disk, as a second run would
    pub async fn reload(&mut self, chains: &[ChainSlug]) {
        self.ledger = AddressLedger::load(self.ledger.path(), chains).await.unwrap();
    }

    /// A deployer over these ledgers
    pub fn deployer<'a>(
        &'a self,
        backend: &'a MockBackend,
        check_code: bool,
    ) -> ChainDeployer<'a, MockBackend> {
        ChainDeployer::new(
            backend,
            &self.ledger,
            &self.verification,
            FeeOverrides::default(),
            check_code,
        )
    }
}

/// Mock backends for several chains, keyed by chain
pub fn backends(chains: &[ChainSlug]) -> BTreeMap<ChainSlug, MockBackend> {
    chains.iter().map(|chain| (*chain, MockBackend::new(*chain))).collect()
}
