//! Deployment of vault markets: a shared `ParallelVault` implementation per
//! chain, and per token a yield strategy and an upgradeable vault proxy

use std::collections::BTreeMap;

use alloy_primitives::Address;
use futures::future::try_join_all;

use crate::{
    config::{DeployConfig, MarketConfig, MarketToken},
    constants::{
        AAVE_STRATEGY_ARTIFACT, ETH_AAVE_STRATEGY_ARTIFACT, PARALLEL_VAULT_ARTIFACT,
        PROXY_ARTIFACT,
    },
    deployer::{ChainDeployer, DeployBackend, DeployRequest},
    errors::ScriptError,
    ledger::{AddressLedger, LedgerPath},
    orchestrator::{select_backends, ChainDeployState, ChainReport, ChainRun, RunReport},
    solidity::{aave_strategy_args, eth_aave_strategy_args, vault_proxy_args},
    types::{ChainSlug, Role, StrategyKind, TokenSymbol},
    verification::VerificationLedger,
};

/// The deployment of the vault markets of one or more chains
pub struct VaultDeployment<'a> {
    /// The run's configuration
    config: &'a DeployConfig,
    /// The market of every chain in the run
    markets: Vec<(ChainSlug, &'a MarketConfig)>,
}

impl<'a> VaultDeployment<'a> {
    /// Plan the markets of the selected chains, or of every configured market
    /// if none are selected
    pub fn new(config: &'a DeployConfig, selection: &[ChainSlug]) -> Result<Self, ScriptError> {
        let markets = config.markets(selection)?;
        Ok(Self { config, markets })
    }

    /// The chains of the run
    pub fn chains(&self) -> Vec<ChainSlug> {
        self.markets.iter().map(|(chain, _)| *chain).collect()
    }

    /// Deploy every market concurrently
    pub async fn run<B: DeployBackend>(
        &self,
        ledger: &AddressLedger,
        verification: &VerificationLedger,
        backends: &BTreeMap<ChainSlug, B>,
    ) -> Result<RunReport, ScriptError> {
        let backends = select_backends(&self.chains(), backends)?;
        let chains = try_join_all(
            self.markets
                .iter()
                .zip(backends)
                .map(|((_, market), backend)| {
                    self.deploy_chain(ledger, verification, backend, market)
                }),
        )
        .await?;

        Ok(RunReport { chains })
    }

    /// Deploy one chain's market, reporting rather than returning its failure
    async fn deploy_chain<B: DeployBackend>(
        &self,
        ledger: &AddressLedger,
        verification: &VerificationLedger,
        backend: &B,
        market: &MarketConfig,
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
        let result = deploy_market(&deployer, &mut run, market).await;
        run.finish(ledger, result).await
    }
}

/// Walk a chain's market through its stages
async fn deploy_market<B: DeployBackend>(
    deployer: &ChainDeployer<'_, B>,
    run: &mut ChainRun,
    market: &MarketConfig,
) -> Result<(), ScriptError> {
    let chain = deployer.chain();
    if market.wst_eth.is_none() {
        if let Some((symbol, _)) = market
            .tokens
            .iter()
            .find(|(_, token)| token.strategy == StrategyKind::EthAave)
        {
            return Err(ScriptError::Precondition(format!(
                "{symbol} uses the ETHAAVE strategy but no wstETH is configured for chain {chain}"
            )));
        }
    }

    run.enter(ChainDeployState::DeployingImplementation);
    let implementation = run
        .deploy(
            deployer,
            LedgerPath::Chain(Role::ParallelVault),
            DeployRequest::new(PARALLEL_VAULT_ARTIFACT),
        )
        .await?;

    run.enter(ChainDeployState::DeployingVaults);
    for (symbol, token) in market.tokens.iter() {
        let strategy = deploy_strategy(deployer, run, market, symbol, token).await?;

        let proxy = run
            .deploy(
                deployer,
                LedgerPath::token(symbol, Role::VaultProxy),
                DeployRequest::with_args(
                    PROXY_ARTIFACT,
                    vault_proxy_args(
                        implementation,
                        market.upgrade_admin,
                        token.address,
                        strategy,
                        market.vault_owner,
                    ),
                ),
            )
            .await?;

        // The proxy deploys its own admin contract
        let admin = deployer.proxy_admin(proxy).await?;
        deployer.record(&LedgerPath::token(symbol, Role::ProxyAdmin), admin).await?;
    }

    Ok(())
}

/// Deploy the strategy a token's vault lends through
async fn deploy_strategy<B: DeployBackend>(
    deployer: &ChainDeployer<'_, B>,
    run: &mut ChainRun,
    market: &MarketConfig,
    symbol: &TokenSymbol,
    token: &MarketToken,
) -> Result<Address, ScriptError> {
    let request = match token.strategy {
        StrategyKind::Aave => DeployRequest::with_args(
            AAVE_STRATEGY_ARTIFACT,
            aave_strategy_args(token.address, token.strategy_pool, market.vault_owner),
        ),
        StrategyKind::EthAave => {
            let wst_eth = market.wst_eth.ok_or_else(|| {
                ScriptError::Precondition(format!("no wstETH configured for {symbol}"))
            })?;
            DeployRequest::with_args(
                ETH_AAVE_STRATEGY_ARTIFACT,
                eth_aave_strategy_args(
                    token.address,
                    token.strategy_pool,
                    wst_eth,
                    market.vault_owner,
                ),
            )
        }
    };

    let path = LedgerPath::token(symbol, token.strategy.role());
    run.deploy(deployer, path, request).await
}
