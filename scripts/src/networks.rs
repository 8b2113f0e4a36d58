//! Resolution of RPC endpoints and the deployer's signing key

use std::{collections::BTreeMap, str::FromStr};

use alloy::{signers::local::PrivateKeySigner, transports::http::reqwest::Url};
use alloy_primitives::Address;

use crate::{
    artifacts::ArtifactStore,
    config::DeployConfig,
    constants::{rpc_env_var, LOCAL_RPC_URL},
    deployer::AlloyBackend,
    errors::ScriptError,
    types::ChainSlug,
};

/// The endpoints and signer of a run, resolved once at startup
#[derive(Clone, Debug)]
pub struct NetworkProvider {
    /// The RPC endpoint of every chain in the run
    rpc_urls: BTreeMap<ChainSlug, Url>,
    /// The deployer's key, used on every chain
    signer: PrivateKeySigner,
}

impl NetworkProvider {
    /// Resolve the endpoints of the given chains from the process environment
    pub fn from_env(chains: &[ChainSlug], signer_key: Option<&str>) -> Result<Self, ScriptError> {
        Self::resolve(chains, signer_key, |var| std::env::var(var).ok())
    }

    /// Resolve the endpoints of the given chains, reading variables through `lookup`.
    ///
    /// Fails if the key or any chain's endpoint is missing or malformed.
    pub fn resolve(
        chains: &[ChainSlug],
        signer_key: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ScriptError> {
        let signer_key = signer_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ScriptError::Config("no signer key configured".to_string()))?;
        let signer = PrivateKeySigner::from_str(signer_key.trim())
            .map_err(|e| ScriptError::Config(format!("invalid signer key: {e}")))?;

        let mut rpc_urls = BTreeMap::new();
        for chain in chains {
            let raw = match rpc_env_var(*chain) {
                Some(var) => lookup(var)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| {
                        ScriptError::Config(format!("{var} not set for chain {chain}"))
                    })?,
                None if *chain == ChainSlug::HARDHAT => LOCAL_RPC_URL.to_string(),
                None => {
                    return Err(ScriptError::Config(format!(
                        "no RPC endpoint known for chain {chain}"
                    )))
                }
            };

            let url = Url::parse(&raw).map_err(|e| {
                ScriptError::Config(format!("invalid RPC URL for chain {chain}: {e}"))
            })?;
            rpc_urls.insert(*chain, url);
        }

        Ok(Self { rpc_urls, signer })
    }

    /// The RPC endpoint of a chain
    pub fn rpc_url(&self, chain: ChainSlug) -> Result<&Url, ScriptError> {
        self.rpc_urls
            .get(&chain)
            .ok_or_else(|| ScriptError::Config(format!("chain {chain} is not part of this run")))
    }

    /// The deployer's signing key
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// The deployer's address
    pub fn deployer_address(&self) -> Address {
        self.signer.address()
    }

    /// Open a deployment backend on a chain
    pub async fn connect(
        &self,
        chain: ChainSlug,
        config: &DeployConfig,
    ) -> Result<AlloyBackend, ScriptError> {
        AlloyBackend::connect(
            chain,
            self.rpc_url(chain)?,
            self.signer.clone(),
            ArtifactStore::new(&config.artifacts_dir),
            config.confirmations,
            config.confirmation_timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The first development account of Hardhat and Anvil
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn resolves_urls_and_signer() {
        let provider = NetworkProvider::resolve(
            &[ChainSlug::SEPOLIA, ChainSlug::HARDHAT],
            Some(DEV_KEY),
            env(&[("SEPOLIA_RPC", "https://sepolia.example.org")]),
        )
        .unwrap();

        assert_eq!(
            provider.rpc_url(ChainSlug::SEPOLIA).unwrap().host_str(),
            Some("sepolia.example.org")
        );
        assert_eq!(
            provider.rpc_url(ChainSlug::HARDHAT).unwrap().as_str(),
            LOCAL_RPC_URL
        );
        assert_eq!(
            provider.deployer_address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
        assert!(provider.rpc_url(ChainSlug::MAINNET).is_err());
    }

    #[test]
    fn missing_configuration_is_fatal() {
        let missing_url =
            NetworkProvider::resolve(&[ChainSlug::ARBITRUM_SEPOLIA], Some(DEV_KEY), env(&[]));
        assert!(matches!(missing_url, Err(ScriptError::Config(_))));

        let missing_key = NetworkProvider::resolve(&[ChainSlug::HARDHAT], None, env(&[]));
        assert!(matches!(missing_key, Err(ScriptError::Config(_))));

        let bad_key = NetworkProvider::resolve(&[ChainSlug::HARDHAT], Some("0x1234"), env(&[]));
        assert!(matches!(bad_key, Err(ScriptError::Config(_))));

        let unknown_chain = NetworkProvider::resolve(&[ChainSlug(77)], Some(DEV_KEY), env(&[]));
        assert!(matches!(unknown_chain, Err(ScriptError::Config(_))));
    }
}
