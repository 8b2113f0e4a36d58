//! Records of freshly deployed contracts, kept for later block explorer
//! verification

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    artifacts::ArtifactRef,
    errors::ScriptError,
    ledger::{read_document, update_document},
    types::ChainSlug,
};

/// Everything needed to verify one deployed contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// The address of the contract
    pub address: Address,
    /// The name of the contract
    pub contract_name: String,
    /// The source file defining the contract
    pub path: String,
    /// The ABI-encoded constructor arguments
    pub args: Bytes,
}

impl VerificationRecord {
    /// Build the record for a contract deployed from the given artifact
    pub fn new(address: Address, artifact: &ArtifactRef, args: Bytes) -> Self {
        Self {
            address,
            contract_name: artifact.name.to_string(),
            path: artifact.source.to_string(),
            args,
        }
    }
}

/// The verification file of one deployment mode and project, shaped as
/// `{ "<chain>": [record, ..] }`
pub struct VerificationLedger {
    /// The file records are appended to
    path: PathBuf,
}

impl VerificationLedger {
    /// Create a ledger appending to the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append a record under a chain, unless a record for the same address exists
    pub async fn append(
        &self,
        chain: ChainSlug,
        record: VerificationRecord,
    ) -> Result<(), ScriptError> {
        let path = self.path.clone();
        let key = chain.to_string();
        update_document(&self.path, move |document| {
            let mut records = parse_records(&path, document.get(&key))?;
            if records.iter().any(|r| r.address == record.address) {
                return Ok(false);
            }

            debug!(
                chain = %chain,
                contract = %record.contract_name,
                address = %record.address,
                "recording for verification"
            );
            records.push(record);

            let value =
                serde_json::to_value(records).map_err(|e| ScriptError::Serde(e.to_string()))?;
            document.insert(key, value);
            Ok(true)
        })
        .await
    }

    /// The records of a chain
    pub async fn records(&self, chain: ChainSlug) -> Result<Vec<VerificationRecord>, ScriptError> {
        let document = read_document(&self.path).await?;
        parse_records(&self.path, document.get(&chain.to_string()))
    }
}

/// Parse a chain's records out of the verification document
fn parse_records(
    path: &Path,
    value: Option<&Value>,
) -> Result<Vec<VerificationRecord>, ScriptError> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::VAULT_ARTIFACT;

    #[tokio::test]
    async fn appends_each_address_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = VerificationLedger::new(dir.path().join("dev_test_verification.json"));
        let chain = ChainSlug::SEPOLIA;
        let record = VerificationRecord::new(
            Address::with_last_byte(1),
            &VAULT_ARTIFACT,
            Bytes::from(vec![0u8; 32]),
        );

        ledger.append(chain, record.clone()).await.unwrap();
        ledger.append(chain, record.clone()).await.unwrap();

        assert_eq!(ledger.records(chain).await.unwrap(), vec![record]);
        assert!(ledger.records(ChainSlug::MAINNET).await.unwrap().is_empty());

        let contents =
            std::fs::read_to_string(dir.path().join("dev_test_verification.json")).unwrap();
        let json: Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(json[chain.to_string()][0]["contractName"], "Vault");
        assert_eq!(json[chain.to_string()][0]["path"], "contracts/superbridge/Vault.sol");
    }
}
