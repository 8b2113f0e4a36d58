//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// A missing or invalid configuration value
    Config(String),
    /// Error reading the addresses file
    ReadDeployments(String),
    /// Error writing the addresses or verification file
    WriteDeployments(String),
    /// An attempt to record a second address for an occupied ledger entry
    AddressConflict(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// A contract this deployment depends on has not been deployed
    Precondition(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// The deployment transaction was not confirmed in time
    ConfirmationTimeout(String),
    /// Error reading on-chain state
    ContractInteraction(String),
    /// Error de/serializing JSON
    Serde(String),
    /// One or more chains did not finish deploying
    Incomplete(String),
}

impl ScriptError {
    /// Whether the error invalidates the whole run rather than a single chain.
    ///
    /// Once the ledger can no longer be written, continuing would deploy
    /// contracts whose addresses may be lost.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            ScriptError::ReadDeployments(_) | ScriptError::WriteDeployments(_)
        )
    }
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Config(s) => write!(f, "invalid configuration: {}", s),
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::AddressConflict(s) => write!(f, "conflicting address: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::Precondition(s) => write!(f, "missing dependency: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ConfirmationTimeout(s) => {
                write!(f, "timed out waiting for confirmation: {}", s)
            }
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::Serde(s) => write!(f, "error de/serializing: {}", s),
            ScriptError::Incomplete(s) => write!(f, "deployment incomplete: {}", s),
        }
    }
}

impl Error for ScriptError {}
