//! Sequencing of bridge deployments across chains.
//!
//! Each chain walks its roles strictly in order: the hub (a `Vault` on chains
//! where the token is locked, an `ExchangeRate` and `Controller` on the app
//! chain where it is minted), then one connector per sibling chain and
//! integration. Chains run concurrently and fail independently; a chain's
//! ledger region is flushed when its attempt ends, whatever the outcome.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use alloy_primitives::Address;
use futures::future::try_join_all;
use tracing::{error, info};

use crate::{
    config::{DeployConfig, ProjectConstants},
    constants::{
        CONNECTOR_PLUG_ARTIFACT, CONTROLLER_ARTIFACT, EXCHANGE_RATE_ARTIFACT,
        FIAT_TOKEN_CONTROLLER_ARTIFACT, VAULT_ARTIFACT,
    },
    deployer::{ChainDeployer, DeployBackend, DeployRequest},
    errors::ScriptError,
    ledger::{AddressLedger, LedgerPath},
    solidity::{connector_args, controller_args, vault_args},
    types::{ChainSlug, Role, TokenSymbol},
    verification::VerificationLedger,
};

// -----------
// | Reports |
// -----------

/// The progress of one chain's deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainDeployState {
    /// Nothing attempted yet
    Pending,
    /// Deploying the vault or controller
    DeployingHub,
    /// Deploying connectors to sibling chains
    DeployingConnectors,
    /// Deploying the shared vault implementation
    DeployingImplementation,
    /// Deploying per-token strategies and vault proxies
    DeployingVaults,
    /// Every role is deployed
    Done,
    /// A stage failed; the chain's remaining roles were skipped
    Failed,
}

impl Display for ChainDeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainDeployState::Pending => "pending",
            ChainDeployState::DeployingHub => "deploying hub",
            ChainDeployState::DeployingConnectors => "deploying connectors",
            ChainDeployState::DeployingImplementation => "deploying implementation",
            ChainDeployState::DeployingVaults => "deploying vaults",
            ChainDeployState::Done => "done",
            ChainDeployState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The outcome of one chain's deployment
#[derive(Clone, Debug)]
pub struct ChainReport {
    /// The chain
    pub chain: ChainSlug,
    /// The final state, either `Done` or `Failed`
    pub state: ChainDeployState,
    /// The stage the chain was in when the attempt ended
    pub last_stage: ChainDeployState,
    /// The number of contracts deployed by this attempt
    pub fresh_deployments: usize,
    /// The error that failed the chain
    pub error: Option<ScriptError>,
}

impl ChainReport {
    /// Whether every role of the chain is deployed
    pub fn all_deployed(&self) -> bool {
        self.state == ChainDeployState::Done
    }
}

/// The outcome of a deployment across chains
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// One report per chain, in the order the chains were given
    pub chains: Vec<ChainReport>,
}

impl RunReport {
    /// Whether every chain finished
    pub fn all_deployed(&self) -> bool {
        self.chains.iter().all(ChainReport::all_deployed)
    }

    /// The chains that did not finish
    pub fn failed(&self) -> impl Iterator<Item = &ChainReport> {
        self.chains.iter().filter(|report| !report.all_deployed())
    }

    /// The report of a chain
    pub fn chain(&self, chain: ChainSlug) -> Option<&ChainReport> {
        self.chains.iter().find(|report| report.chain == chain)
    }

    /// The total number of contracts deployed by the run
    pub fn fresh_deployments(&self) -> usize {
        self.chains.iter().map(|report| report.fresh_deployments).sum()
    }
}

// -------------
// | Chain Run |
// -------------

/// The in-flight state of one chain's deployment
pub(crate) struct ChainRun {
    /// The chain
    chain: ChainSlug,
    /// The current stage
    state: ChainDeployState,
    /// The number of contracts deployed so far
    fresh_deployments: usize,
}

impl ChainRun {
    /// Start tracking a chain
    pub(crate) fn new(chain: ChainSlug) -> Self {
        Self {
            chain,
            state: ChainDeployState::Pending,
            fresh_deployments: 0,
        }
    }

    /// Move to the next stage
    pub(crate) fn enter(&mut self, state: ChainDeployState) {
        info!(chain = %self.chain, stage = %state, "entering stage");
        self.state = state;
    }

    /// Get or deploy a contract, counting it if it is fresh
    pub(crate) async fn deploy<B: DeployBackend>(
        &mut self,
        deployer: &ChainDeployer<'_, B>,
        path: LedgerPath,
        request: DeployRequest,
    ) -> Result<Address, ScriptError> {
        let deployed = deployer.get_or_deploy(path, request).await?;
        if deployed.fresh {
            self.fresh_deployments += 1;
        }
        Ok(deployed.address)
    }

    /// End the attempt: flush the chain's region and build its report.
    ///
    /// Errors that invalidate the ledger are returned instead of reported.
    pub(crate) async fn finish(
        self,
        ledger: &AddressLedger,
        result: Result<(), ScriptError>,
    ) -> Result<ChainReport, ScriptError> {
        ledger.flush(self.chain).await?;

        let (state, error) = match result {
            Ok(()) => (ChainDeployState::Done, None),
            Err(e) if e.is_fatal_for_run() => return Err(e),
            Err(e) => {
                error!(
                    chain = %self.chain,
                    stage = %self.state,
                    error = %e,
                    "chain deployment failed"
                );
                (ChainDeployState::Failed, Some(e))
            }
        };

        if state == ChainDeployState::Done {
            info!(chain = %self.chain, fresh = self.fresh_deployments, "chain deployed");
        }

        Ok(ChainReport {
            chain: self.chain,
            state,
            last_stage: self.state,
            fresh_deployments: self.fresh_deployments,
            error,
        })
    }
}

/// Look up the backend of every chain, failing before anything is deployed if
/// one is missing
pub(crate) fn select_backends<'b, B: DeployBackend>(
    chains: &[ChainSlug],
    backends: &'b BTreeMap<ChainSlug, B>,
) -> Result<Vec<&'b B>, ScriptError> {
    chains
        .iter()
        .map(|chain| {
            backends
                .get(chain)
                .ok_or_else(|| ScriptError::Config(format!("no connection to chain {chain}")))
        })
        .collect()
}

// ----------
// | Bridge |
// ----------

/// The deployment of one token's bridge across its chains
pub struct BridgeDeployment<'a> {
    /// The run's configuration
    config: &'a DeployConfig,
    /// The bridged token
    token: TokenSymbol,
    /// The token's bridge layout
    constants: &'a ProjectConstants,
    /// The chains to deploy, app chain first
    chains: Vec<ChainSlug>,
}

impl<'a> BridgeDeployment<'a> {
    /// Plan the bridge of a token, validating its configuration.
    ///
    /// An empty selection deploys every chain of the bridge.
    pub fn new(
        config: &'a DeployConfig,
        token: TokenSymbol,
        selection: &[ChainSlug],
    ) -> Result<Self, ScriptError> {
        let constants = config.project_constants(&token)?;
        let bridge_chains = constants.chains();
        for chain in bridge_chains.iter() {
            config.socket(*chain)?;
        }

        if let Some(chain) = selection.iter().find(|chain| !bridge_chains.contains(chain)) {
            return Err(ScriptError::Config(format!(
                "chain {chain} is not part of the {token} bridge"
            )));
        }
        let chains = bridge_chains
            .into_iter()
            .filter(|chain| selection.is_empty() || selection.contains(chain))
            .collect();

        Ok(Self {
            config,
            token,
            constants,
            chains,
        })
    }

    /// The chains to deploy, app chain first
    pub fn chains(&self) -> &[ChainSlug] {
        &self.chains
    }

    /// Deploy every selected chain concurrently
    pub async fn run<B: DeployBackend>(
        &self,
        ledger: &AddressLedger,
        verification: &VerificationLedger,
        backends: &BTreeMap<ChainSlug, B>,
    ) -> Result<RunReport, ScriptError> {
        let backends = select_backends(&self.chains, backends)?;
        let chains = try_join_all(
            backends
                .into_iter()
                .map(|backend| self.deploy_chain(ledger, verification, backend)),
        )
        .await?;

        Ok(RunReport { chains })
    }

    /// Deploy one chain, reporting rather than returning its failure
    async fn deploy_chain<B: DeployBackend>(
        &self,
        ledger: &AddressLedger,
        verification: &VerificationLedger,
        backend: &B,
    ) -> Result<ChainReport, ScriptError> {
        let chain = backend.chain();
        let deployer = ChainDeployer::new(
            backend,
            ledger,
            verification,
            self.config.fee_overrides(chain),
            self.config.check_code,
        );

        let mut run = ChainRun::new(chain);
        let result = self.deploy_stages(ledger, &deployer, &mut run).await;
        run.finish(ledger, result).await
    }

    /// Walk a chain through its stages
    async fn deploy_stages<B: DeployBackend>(
        &self,
        ledger: &AddressLedger,
        deployer: &ChainDeployer<'_, B>,
        run: &mut ChainRun,
    ) -> Result<(), ScriptError> {
        let chain = deployer.chain();
        let is_app_chain = self.constants.is_app_chain(chain);
        ledger.set_app_chain(chain, &self.token, is_app_chain).await?;

        run.enter(ChainDeployState::DeployingHub);
        let hub = if is_app_chain {
            self.deploy_controller(deployer, run).await?
        } else {
            self.deploy_vault(deployer, run).await?
        };

        run.enter(ChainDeployState::DeployingConnectors);
        self.deploy_connectors(deployer, run, hub).await
    }

    /// The address of a contract the hub depends on but does not deploy
    async fn require<B: DeployBackend>(
        &self,
        deployer: &ChainDeployer<'_, B>,
        role: Role,
    ) -> Result<Address, ScriptError> {
        deployer
            .recorded(&LedgerPath::token(&self.token, role))
            .await?
            .ok_or_else(|| {
                ScriptError::Precondition(format!(
                    "{role} of {} not found on chain {}",
                    self.token,
                    deployer.chain()
                ))
            })
    }

    /// Deploy the exchange rate and controller of the app chain, returning the
    /// controller
    async fn deploy_controller<B: DeployBackend>(
        &self,
        deployer: &ChainDeployer<'_, B>,
        run: &mut ChainRun,
    ) -> Result<Address, ScriptError> {
        let token = self.require(deployer, Role::MintableToken).await?;

        let exchange_rate = run
            .deploy(
                deployer,
                LedgerPath::token(&self.token, Role::ExchangeRate),
                DeployRequest::new(EXCHANGE_RATE_ARTIFACT),
            )
            .await?;

        let artifact = if self.constants.is_fiat_token_v2_1 {
            FIAT_TOKEN_CONTROLLER_ARTIFACT
        } else {
            CONTROLLER_ARTIFACT
        };
        run.deploy(
            deployer,
            LedgerPath::token(&self.token, Role::Controller),
            DeployRequest::with_args(artifact, controller_args(token, exchange_rate)),
        )
        .await
    }

    /// Deploy the vault of a non-app chain
    async fn deploy_vault<B: DeployBackend>(
        &self,
        deployer: &ChainDeployer<'_, B>,
        run: &mut ChainRun,
    ) -> Result<Address, ScriptError> {
        let token = self.require(deployer, Role::NonMintableToken).await?;
        run.deploy(
            deployer,
            LedgerPath::token(&self.token, Role::Vault),
            DeployRequest::with_args(VAULT_ARTIFACT, vault_args(token)),
        )
        .await
    }

    /// Deploy a connector per sibling chain and integration
    async fn deploy_connectors<B: DeployBackend>(
        &self,
        deployer: &ChainDeployer<'_, B>,
        run: &mut ChainRun,
        hub: Address,
    ) -> Result<(), ScriptError> {
        let chain = deployer.chain();
        let socket = self.config.socket(chain)?;

        for sibling in self.constants.siblings(chain) {
            for integration in self.constants.integration_types() {
                run.deploy(
                    deployer,
                    LedgerPath::connector(&self.token, sibling, integration),
                    DeployRequest::with_args(
                        CONNECTOR_PLUG_ARTIFACT,
                        connector_args(hub, socket, sibling.0),
                    ),
                )
                .await?;
            }
        }

        Ok(())
    }
}
