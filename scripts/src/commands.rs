//! Implementations of the various deploy scripts

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    cli::{AddressesArgs, DeployArgs, DeployVaultsArgs, GlobalArgs},
    config::{addresses_path, DeployConfig},
    deployer::AlloyBackend,
    errors::ScriptError,
    ledger::AddressLedger,
    networks::NetworkProvider,
    orchestrator::{BridgeDeployment, RunReport},
    types::ChainSlug,
    vaults::VaultDeployment,
    verification::VerificationLedger,
};

/// Deploy a token's bridge across its chains
pub async fn deploy_bridge(args: DeployArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let config = global.deploy_config(&args.options)?;
    let deployment = BridgeDeployment::new(&config, args.token.clone(), &args.chains)?;
    let chains = deployment.chains().to_vec();

    info!(
        mode = %config.mode,
        project = %config.project,
        token = %args.token,
        chains = ?chains,
        "deploying bridge"
    );

    let network = NetworkProvider::from_env(&chains, global.signer_key.as_deref())?;
    check_owner(&config, &network);
    let backends = connect_all(&network, &config, &chains).await?;

    let ledger = AddressLedger::load(config.addresses_path(), &chains).await?;
    let verification = VerificationLedger::new(config.verification_path());
    let report = deployment.run(&ledger, &verification, &backends).await?;

    print_state(&ledger, &chains).await?;
    finish(report)
}

/// Deploy the vault markets of the selected networks
pub async fn deploy_vaults(args: DeployVaultsArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let config = global.deploy_config(&args.options)?;
    let deployment = VaultDeployment::new(&config, &args.networks)?;
    let chains = deployment.chains();

    info!(mode = %config.mode, project = %config.project, chains = ?chains, "deploying vaults");

    let network = NetworkProvider::from_env(&chains, global.signer_key.as_deref())?;
    check_owner(&config, &network);
    let backends = connect_all(&network, &config, &chains).await?;

    let ledger = AddressLedger::load(config.addresses_path(), &chains).await?;
    let verification = VerificationLedger::new(config.verification_path());
    let report = deployment.run(&ledger, &verification, &backends).await?;

    print_state(&ledger, &chains).await?;
    finish(report)
}

/// Print the addresses recorded for the selected chains
pub async fn print_addresses(args: AddressesArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let path = addresses_path(&global.deployments_dir, global.mode, &global.project);
    let ledger = if args.chains.is_empty() {
        AddressLedger::load_all(path).await?
    } else {
        AddressLedger::load(path, &args.chains).await?
    };

    let chains: Vec<ChainSlug> = ledger.chains().collect();
    print_state(&ledger, &chains).await
}

/// Warn when the deployer is not the configured owner
fn check_owner(config: &DeployConfig, network: &NetworkProvider) {
    let deployer = network.deployer_address();
    match config.owner {
        Some(owner) if owner != deployer => {
            warn!(owner = %owner, deployer = %deployer, "deployer is not the configured owner")
        }
        Some(_) => {}
        None => warn!(deployer = %deployer, "no owner configured"),
    }
}

/// Connect to every chain, failing before anything is deployed if one is unreachable
async fn connect_all(
    network: &NetworkProvider,
    config: &DeployConfig,
    chains: &[ChainSlug],
) -> Result<BTreeMap<ChainSlug, AlloyBackend>, ScriptError> {
    let mut backends = BTreeMap::new();
    for chain in chains {
        backends.insert(*chain, network.connect(*chain, config).await?);
    }

    Ok(backends)
}

/// Print the recorded addresses of the given chains as JSON
async fn print_state(ledger: &AddressLedger, chains: &[ChainSlug]) -> Result<(), ScriptError> {
    let mut state = Map::new();
    for chain in chains {
        let region = ledger.snapshot(*chain).await?;
        let value = serde_json::to_value(region).map_err(|e| ScriptError::Serde(e.to_string()))?;
        state.insert(chain.to_string(), value);
    }

    let json = serde_json::to_string_pretty(&Value::Object(state))
        .map_err(|e| ScriptError::Serde(e.to_string()))?;
    println!("{json}");

    Ok(())
}

/// Turn a run report into the command's result
fn finish(report: RunReport) -> Result<(), ScriptError> {
    let fresh = report.fresh_deployments();
    if report.all_deployed() {
        info!(fresh, "all contracts deployed");
        return Ok(());
    }

    let failed: Vec<String> = report
        .failed()
        .map(|chain| match &chain.error {
            Some(e) => format!("chain {} ({}): {e}", chain.chain, chain.last_stage),
            None => format!("chain {} ({})", chain.chain, chain.last_stage),
        })
        .collect();

    Err(ScriptError::Incomplete(failed.join("; ")))
}
