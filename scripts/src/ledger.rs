//! The address ledger: a durable mapping from chain and contract role to the
//! address the role was deployed at.
//!
//! The ledger is persisted as a single JSON document per deployment mode and
//! project, shaped as
//!
//! ```json
//! {
//!   "<chain>": {
//!     "<role>": "0x..",
//!     "<token>": {
//!       "isAppChain": true,
//!       "<role>": "0x..",
//!       "connectors": { "<sibling>": { "<integration>": "0x.." } }
//!     }
//!   }
//! }
//! ```
//!
//! Each chain's region is held behind its own lock so that chains deploying
//! concurrently never contend with one another; flushing rewrites only the
//! flushed chain's region of the document, under an advisory lock on the file
//! shared with any other process flushing to it. Keys the scripts do not know
//! about are carried through unchanged.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::{fs, sync::Mutex, task};

use crate::{
    errors::ScriptError,
    types::{ChainSlug, IntegrationType, Role, TokenSymbol},
};

// ---------
// | Paths |
// ---------

/// The location of an address within a chain's region of the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerPath {
    /// A contract shared by every token on the chain
    Chain(Role),
    /// A contract deployed for a single token
    Token {
        /// The token
        token: TokenSymbol,
        /// The contract's role
        role: Role,
    },
    /// A token's connector to a sibling chain over one integration
    Connector {
        /// The token
        token: TokenSymbol,
        /// The chain on the other end of the connector
        sibling: ChainSlug,
        /// The integration the connector is bound to
        integration: IntegrationType,
    },
}

impl LedgerPath {
    /// A per-token contract path
    pub fn token(token: &TokenSymbol, role: Role) -> Self {
        LedgerPath::Token {
            token: token.clone(),
            role,
        }
    }

    /// A connector path
    pub fn connector(
        token: &TokenSymbol,
        sibling: ChainSlug,
        integration: IntegrationType,
    ) -> Self {
        LedgerPath::Connector {
            token: token.clone(),
            sibling,
            integration,
        }
    }
}

impl Display for LedgerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerPath::Chain(role) => write!(f, "{role}"),
            LedgerPath::Token { token, role } => write!(f, "{token}.{role}"),
            LedgerPath::Connector {
                token,
                sibling,
                integration,
            } => {
                write!(f, "{token}.connectors.{sibling}.{integration}")
            }
        }
    }
}

// -------------
// | Addresses |
// -------------

/// An address as it is written in the ledger file.
///
/// The text is kept as read, so rewriting a region never changes the casing
/// of an address already on disk. New entries are written checksummed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerAddress {
    /// The parsed address
    address: Address,
    /// The address as written
    text: String,
}

impl LedgerAddress {
    /// The parsed address
    pub fn address(&self) -> Address {
        self.address
    }
}

impl From<Address> for LedgerAddress {
    fn from(address: Address) -> Self {
        Self {
            address,
            text: address.to_checksum(None),
        }
    }
}

impl TryFrom<String> for LedgerAddress {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let address = text
            .parse::<Address>()
            .map_err(|e| format!("invalid address `{text}`: {e}"))?;
        Ok(Self { address, text })
    }
}

impl From<LedgerAddress> for String {
    fn from(address: LedgerAddress) -> Self {
        address.text
    }
}

// -----------
// | Regions |
// -----------

/// A single entry directly under a chain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainEntry {
    /// A contract shared by every token on the chain
    Contract(LedgerAddress),
    /// The contracts deployed for one token
    Token(TokenAddresses),
    /// Anything else, kept verbatim
    Other(Value),
}

/// The contracts deployed for one token on one chain
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenAddresses {
    /// Whether the chain is the token's app chain
    #[serde(rename = "isAppChain", default, skip_serializing_if = "Option::is_none")]
    pub is_app_chain: Option<bool>,
    /// Connector addresses, keyed by sibling chain and then by integration
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub connectors: BTreeMap<String, BTreeMap<String, LedgerAddress>>,
    /// Role addresses, along with any unrecognized keys
    #[serde(flatten)]
    pub entries: BTreeMap<String, Value>,
}

impl TokenAddresses {
    /// The address recorded for a role
    pub fn role(&self, role: Role) -> Option<Address> {
        self.entries
            .get(role.key())
            .and_then(|value| value.as_str())
            .and_then(|s| s.parse().ok())
    }

    /// Record anything from `other` that is not recorded here
    fn merge(&mut self, other: TokenAddresses) {
        if self.is_app_chain.is_none() {
            self.is_app_chain = other.is_app_chain;
        }
        for (sibling, connectors) in other.connectors {
            let existing = self.connectors.entry(sibling).or_default();
            for (integration, address) in connectors {
                existing.entry(integration).or_insert(address);
            }
        }
        for (key, value) in other.entries {
            self.entries.entry(key).or_insert(value);
        }
    }
}

/// Everything recorded for one chain
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainAddresses(BTreeMap<String, ChainEntry>);

impl ChainAddresses {
    /// The entries of the region, keyed by role or token
    pub fn entries(&self) -> &BTreeMap<String, ChainEntry> {
        &self.0
    }

    /// The contracts recorded for a token
    pub fn token(&self, token: &TokenSymbol) -> Option<&TokenAddresses> {
        match self.0.get(token.as_str()) {
            Some(ChainEntry::Token(addresses)) => Some(addresses),
            _ => None,
        }
    }

    /// The contracts recorded for a token, creating an empty entry if none exists
    fn token_mut(&mut self, token: &TokenSymbol) -> Result<&mut TokenAddresses, ScriptError> {
        let entry = self
            .0
            .entry(token.as_str().to_string())
            .or_insert_with(|| ChainEntry::Token(TokenAddresses::default()));

        match entry {
            ChainEntry::Token(addresses) => Ok(addresses),
            _ => Err(ScriptError::ReadDeployments(format!(
                "entry `{token}` is not a token entry"
            ))),
        }
    }

    /// The address recorded at a path
    pub fn get(&self, path: &LedgerPath) -> Option<Address> {
        match path {
            LedgerPath::Chain(role) => match self.0.get(role.key()) {
                Some(ChainEntry::Contract(address)) => Some(address.address()),
                _ => None,
            },
            LedgerPath::Token { token, role } => self.token(token)?.role(*role),
            LedgerPath::Connector {
                token,
                sibling,
                integration,
            } => self
                .token(token)?
                .connectors
                .get(&sibling.to_string())?
                .get(integration.as_str())
                .map(LedgerAddress::address),
        }
    }

    /// Record an address at a path.
    ///
    /// Recording the address already held is a no-op; a different address for
    /// an occupied path is rejected.
    pub fn insert(&mut self, path: &LedgerPath, address: Address) -> Result<(), ScriptError> {
        if let Some(existing) = self.get(path) {
            if existing == address {
                return Ok(());
            }
            return Err(ScriptError::AddressConflict(format!(
                "{path} is recorded at {existing:#x}, refusing to overwrite with {address:#x}"
            )));
        }

        match path {
            LedgerPath::Chain(role) => {
                if self.0.contains_key(role.key()) {
                    return Err(ScriptError::AddressConflict(format!(
                        "{path} holds a value that is not an address"
                    )));
                }
                self.0.insert(
                    role.key().to_string(),
                    ChainEntry::Contract(address.into()),
                );
            }
            LedgerPath::Token { token, role } => {
                let addresses = self.token_mut(token)?;
                if addresses.entries.contains_key(role.key()) {
                    return Err(ScriptError::AddressConflict(format!(
                        "{path} holds a value that is not an address"
                    )));
                }
                let text: String = LedgerAddress::from(address).into();
                addresses
                    .entries
                    .insert(role.key().to_string(), Value::String(text));
            }
            LedgerPath::Connector {
                token,
                sibling,
                integration,
            } => {
                self.token_mut(token)?
                    .connectors
                    .entry(sibling.to_string())
                    .or_default()
                    .insert(integration.as_str().to_string(), address.into());
            }
        }

        Ok(())
    }

    /// Mark whether the chain is a token's app chain
    pub fn set_app_chain(
        &mut self,
        token: &TokenSymbol,
        is_app_chain: bool,
    ) -> Result<(), ScriptError> {
        self.token_mut(token)?.is_app_chain = Some(is_app_chain);
        Ok(())
    }

    /// Record everything from `partial` that is not already recorded.
    /// Recorded addresses are never replaced.
    pub fn merge(&mut self, partial: ChainAddresses) {
        for (key, entry) in partial.0 {
            match self.0.get_mut(&key) {
                None => {
                    self.0.insert(key, entry);
                }
                Some(ChainEntry::Token(existing)) => {
                    if let ChainEntry::Token(other) = entry {
                        existing.merge(other);
                    }
                }
                Some(_) => {}
            }
        }
    }
}

// ----------
// | Ledger |
// ----------

/// The address ledger of one deployment mode and project
pub struct AddressLedger {
    /// The file the ledger is persisted to
    path: PathBuf,
    /// The region of every chain taking part in the run
    chains: BTreeMap<ChainSlug, Mutex<ChainAddresses>>,
}

impl AddressLedger {
    /// Load the regions of the given chains, starting from an empty region for
    /// chains (or a file) not yet on disk
    pub async fn load(
        path: impl Into<PathBuf>,
        chains: &[ChainSlug],
    ) -> Result<Self, ScriptError> {
        let path = path.into();
        let document = read_document(&path).await?;

        let mut regions = BTreeMap::new();
        for chain in chains {
            let region = match document.get(&chain.to_string()) {
                Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                    ScriptError::ReadDeployments(format!(
                        "chain {chain} in {}: {e}",
                        path.display()
                    ))
                })?,
                None => ChainAddresses::default(),
            };
            regions.insert(*chain, Mutex::new(region));
        }

        Ok(Self {
            path,
            chains: regions,
        })
    }

    /// Load the region of every chain recorded in the file
    pub async fn load_all(path: impl Into<PathBuf>) -> Result<Self, ScriptError> {
        let path = path.into();
        let chains: Vec<ChainSlug> = read_document(&path)
            .await?
            .keys()
            .filter_map(|key| key.parse::<u32>().ok().map(ChainSlug))
            .collect();

        Self::load(path, &chains).await
    }

    /// The file backing the ledger
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The chains the ledger holds regions for
    pub fn chains(&self) -> impl Iterator<Item = ChainSlug> + '_ {
        self.chains.keys().copied()
    }

    /// The region of a chain
    fn region(&self, chain: ChainSlug) -> Result<&Mutex<ChainAddresses>, ScriptError> {
        self.chains
            .get(&chain)
            .ok_or_else(|| ScriptError::Config(format!("chain {chain} is not part of this run")))
    }

    /// The address recorded for a role on a chain
    pub async fn get(
        &self,
        chain: ChainSlug,
        path: &LedgerPath,
    ) -> Result<Option<Address>, ScriptError> {
        Ok(self.region(chain)?.lock().await.get(path))
    }

    /// Record the address of a role on a chain
    pub async fn set(
        &self,
        chain: ChainSlug,
        path: &LedgerPath,
        address: Address,
    ) -> Result<(), ScriptError> {
        self.region(chain)?.lock().await.insert(path, address)
    }

    /// Mark whether a chain is a token's app chain
    pub async fn set_app_chain(
        &self,
        chain: ChainSlug,
        token: &TokenSymbol,
        is_app_chain: bool,
    ) -> Result<(), ScriptError> {
        self.region(chain)?
            .lock()
            .await
            .set_app_chain(token, is_app_chain)
    }

    /// Merge a partial region into a chain's region
    pub async fn merge(
        &self,
        chain: ChainSlug,
        partial: ChainAddresses,
    ) -> Result<(), ScriptError> {
        self.region(chain)?.lock().await.merge(partial);
        Ok(())
    }

    /// A copy of a chain's current region
    pub async fn snapshot(&self, chain: ChainSlug) -> Result<ChainAddresses, ScriptError> {
        Ok(self.region(chain)?.lock().await.clone())
    }

    /// Persist a chain's region, leaving every other part of the file untouched
    pub async fn flush(&self, chain: ChainSlug) -> Result<(), ScriptError> {
        let region = self.snapshot(chain).await?;
        let value =
            serde_json::to_value(&region).map_err(|e| ScriptError::Serde(e.to_string()))?;

        let key = chain.to_string();
        update_document(&self.path, move |document| {
            document.insert(key, value);
            Ok(true)
        })
        .await
    }
}

// ---------
// | Files |
// ---------

/// Read a JSON object from disk, treating a missing file as empty
pub(crate) async fn read_document(path: &Path) -> Result<Map<String, Value>, ScriptError> {
    match fs::read_to_string(path).await {
        Ok(contents) => parse_document(path, &contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
        Err(e) => Err(ScriptError::ReadDeployments(format!(
            "{}: {e}",
            path.display()
        ))),
    }
}

/// Parse the contents of a JSON object file
fn parse_document(path: &Path, contents: &str) -> Result<Map<String, Value>, ScriptError> {
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }

    serde_json::from_str(contents)
        .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", path.display())))
}

/// Apply `update` to the JSON object stored at `path` and write the result
/// back if `update` reports a change.
///
/// The cycle holds an exclusive lock on a sibling `.lock` file, so it is
/// serialized with every other cycle on the same file, in this process or
/// another. The new contents are written to a fresh temporary file in the
/// same directory, which is then renamed over the original.
pub(crate) async fn update_document<F>(path: &Path, update: F) -> Result<(), ScriptError>
where
    F: FnOnce(&mut Map<String, Value>) -> Result<bool, ScriptError> + Send + 'static,
{
    let path = path.to_path_buf();
    task::spawn_blocking(move || update_document_blocking(&path, update))
        .await
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?
}

/// The blocking body of [`update_document`]
fn update_document_blocking<F>(path: &Path, update: F) -> Result<(), ScriptError>
where
    F: FnOnce(&mut Map<String, Value>) -> Result<bool, ScriptError>,
{
    let write_error = |path: &Path, e: std::io::Error| {
        ScriptError::WriteDeployments(format!("{}: {e}", path.display()))
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    let lock_path = PathBuf::from(lock_path);
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| write_error(lock_path.as_path(), e))?;
    let mut lock = RwLock::new(lock_file);
    let _guard = lock.write().map_err(|e| write_error(lock_path.as_path(), e))?;

    let mut document = match std::fs::read_to_string(path) {
        Ok(contents) => parse_document(path, &contents)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
        Err(e) => {
            return Err(ScriptError::ReadDeployments(format!(
                "{}: {e}",
                path.display()
            )))
        }
    };
    if !update(&mut document)? {
        return Ok(());
    }

    let mut contents =
        serde_json::to_string_pretty(&document).map_err(|e| ScriptError::Serde(e.to_string()))?;
    contents.push('\n');

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_error(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| write_error(dir, e))?;
    tmp.persist(path).map_err(|e| write_error(path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn addr(byte: u8) -> Address {
        Address::with_last_byte(byte)
    }

    fn usdc() -> TokenSymbol {
        "USDC".into()
    }

    #[test]
    fn records_each_path_kind() {
        let mut region = ChainAddresses::default();
        let vault = LedgerPath::token(&usdc(), Role::Vault);
        let implementation = LedgerPath::Chain(Role::ParallelVault);
        let connector =
            LedgerPath::connector(&usdc(), ChainSlug::MODE_TESTNET, IntegrationType::Fast);

        region.insert(&vault, addr(1)).unwrap();
        region.insert(&implementation, addr(2)).unwrap();
        region.insert(&connector, addr(3)).unwrap();

        assert_eq!(region.get(&vault), Some(addr(1)));
        assert_eq!(region.get(&implementation), Some(addr(2)));
        assert_eq!(region.get(&connector), Some(addr(3)));
        let controller = LedgerPath::token(&usdc(), Role::Controller);
        assert_eq!(region.get(&controller), None);

        let json = serde_json::to_value(&region).unwrap();
        assert_eq!(
            json["USDC"]["connectors"]["919"]["FAST"],
            Value::String(format!("{:#x}", addr(3)))
        );
        assert_eq!(json["ParallelVault"], Value::String(format!("{:#x}", addr(2))));
    }

    #[test]
    fn never_overwrites_a_recorded_address() {
        let mut region = ChainAddresses::default();
        let vault = LedgerPath::token(&usdc(), Role::Vault);

        region.insert(&vault, addr(1)).unwrap();
        region.insert(&vault, addr(1)).unwrap();
        assert!(matches!(
            region.insert(&vault, addr(2)),
            Err(ScriptError::AddressConflict(_))
        ));
        assert_eq!(region.get(&vault), Some(addr(1)));
    }

    #[test]
    fn merge_only_fills_gaps() {
        let mut region = ChainAddresses::default();
        let vault = LedgerPath::token(&usdc(), Role::Vault);
        let token = LedgerPath::token(&usdc(), Role::NonMintableToken);
        region.insert(&vault, addr(1)).unwrap();

        let mut partial = ChainAddresses::default();
        partial.insert(&vault, addr(9)).unwrap();
        partial.insert(&token, addr(2)).unwrap();
        partial.set_app_chain(&usdc(), false).unwrap();

        region.merge(partial);
        assert_eq!(region.get(&vault), Some(addr(1)));
        assert_eq!(region.get(&token), Some(addr(2)));
        assert_eq!(region.token(&usdc()).unwrap().is_app_chain, Some(false));
    }

    #[test]
    fn preserves_unknown_keys() {
        let raw = json!({
            "USDC": {
                "isAppChain": false,
                "NonMintableToken": "0x0000000000000000000000000000000000000001",
                "deployedAt": 123456,
                "hook": { "kind": "limit", "address": "0x02" },
                "connectors": {
                    "919": { "FAST": "0x0000000000000000000000000000000000000003" }
                }
            },
            "notes": "migrated by hand",
            "version": 2
        });

        let region: ChainAddresses = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            region.get(&LedgerPath::token(&usdc(), Role::NonMintableToken)),
            Some(addr(1))
        );
        assert_eq!(serde_json::to_value(&region).unwrap(), raw);
    }

    #[test]
    fn keeps_the_casing_of_recorded_addresses() {
        let checksummed = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let lowercase = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";
        let raw = json!({
            "ParallelVault": checksummed,
            "USDC": {
                "Vault": checksummed,
                "Controller": lowercase,
                "connectors": { "919": { "FAST": checksummed } }
            }
        });

        let mut region: ChainAddresses = serde_json::from_value(raw.clone()).unwrap();
        let address: Address = checksummed.parse().unwrap();
        let implementation = LedgerPath::Chain(Role::ParallelVault);
        assert_eq!(region.get(&implementation), Some(address));
        assert_eq!(
            region.get(&LedgerPath::connector(
                &usdc(),
                ChainSlug::MODE_TESTNET,
                IntegrationType::Fast
            )),
            Some(address)
        );
        assert_eq!(serde_json::to_value(&region).unwrap(), raw);

        // Fresh entries are checksummed, whatever their kind
        region
            .insert(&LedgerPath::token(&usdc(), Role::ExchangeRate), address)
            .unwrap();
        region
            .insert(
                &LedgerPath::connector(&usdc(), ChainSlug::SEPOLIA, IntegrationType::Fast),
                address,
            )
            .unwrap();
        let json = serde_json::to_value(&region).unwrap();
        assert_eq!(json["USDC"]["ExchangeRate"], checksummed);
        assert_eq!(json["USDC"]["connectors"]["11155111"]["FAST"], checksummed);
    }

    #[tokio::test]
    async fn flush_round_trips_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev_test_addresses.json");
        let chain = ChainSlug::ARBITRUM_SEPOLIA;

        let ledger = AddressLedger::load(&path, &[chain]).await.unwrap();
        let partial = json!({
            "USDC": {
                "NonMintableToken": "0x0000000000000000000000000000000000000001",
                "extra": [1, 2]
            }
        });
        ledger
            .merge(chain, serde_json::from_value(partial).unwrap())
            .await
            .unwrap();
        ledger.set_app_chain(chain, &usdc(), false).await.unwrap();
        ledger
            .set(chain, &LedgerPath::token(&usdc(), Role::Vault), addr(7))
            .await
            .unwrap();
        ledger.flush(chain).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        let reloaded = AddressLedger::load(&path, &[chain]).await.unwrap();
        assert_eq!(
            reloaded
                .get(chain, &LedgerPath::token(&usdc(), Role::Vault))
                .await
                .unwrap(),
            Some(addr(7))
        );
        reloaded.flush(chain).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }

    #[tokio::test]
    async fn flush_leaves_other_chains_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev_test_addresses.json");
        let existing = json!({
            "1": { "USDC": { "Vault": "0x0000000000000000000000000000000000000001" } },
            "comment": "keep"
        });
        std::fs::write(&path, existing.to_string()).unwrap();

        let chain = ChainSlug::SEPOLIA;
        let ledger = AddressLedger::load(&path, &[chain]).await.unwrap();
        ledger
            .set(chain, &LedgerPath::token(&usdc(), Role::Vault), addr(2))
            .await
            .unwrap();
        ledger.flush(chain).await.unwrap();

        let document: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document["comment"], "keep");
        assert_eq!(
            document["1"]["USDC"]["Vault"],
            "0x0000000000000000000000000000000000000001"
        );
        assert_eq!(
            document[chain.to_string()]["USDC"]["Vault"],
            Value::String(format!("{:#x}", addr(2)))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn separate_ledgers_on_one_file_flush_concurrently() {
        const ENTRIES: u8 = 40;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev_test_addresses.json");
        let first = AddressLedger::load(&path, &[ChainSlug::SEPOLIA])
            .await
            .unwrap();
        let second = AddressLedger::load(&path, &[ChainSlug::MAINNET])
            .await
            .unwrap();

        let fill = |ledger: AddressLedger, chain: ChainSlug| async move {
            for i in 0..ENTRIES {
                let token = TokenSymbol::from(format!("T{i}").as_str());
                ledger
                    .set(chain, &LedgerPath::token(&token, Role::Vault), addr(i + 1))
                    .await?;
                ledger.flush(chain).await?;
            }
            Ok::<_, ScriptError>(())
        };
        let (a, b) = tokio::join!(
            tokio::spawn(fill(first, ChainSlug::SEPOLIA)),
            tokio::spawn(fill(second, ChainSlug::MAINNET)),
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let reloaded = AddressLedger::load_all(&path).await.unwrap();
        for chain in [ChainSlug::SEPOLIA, ChainSlug::MAINNET] {
            let region = reloaded.snapshot(chain).await.unwrap();
            assert_eq!(region.entries().len(), ENTRIES as usize);
        }
    }

    #[tokio::test]
    async fn rejects_chains_outside_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AddressLedger::load(dir.path().join("a.json"), &[ChainSlug::SEPOLIA])
            .await
            .unwrap();

        let path = LedgerPath::Chain(Role::ParallelVault);
        let result = ledger.set(ChainSlug::MAINNET, &path, addr(1)).await;
        assert!(matches!(result, Err(ScriptError::Config(_))));
    }
}
