//! Loading of contract creation bytecode from compilation artifacts

use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy_primitives::Bytes;
use serde_json::Value;

use crate::errors::ScriptError;

/// A reference to a compiled contract: the source file it is defined in and
/// the name of the contract within that file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArtifactRef {
    /// The path of the source file, relative to the project root
    pub source: &'static str,
    /// The name of the contract
    pub name: &'static str,
}

impl ArtifactRef {
    /// Construct a new artifact reference
    pub const fn new(source: &'static str, name: &'static str) -> Self {
        Self { source, name }
    }
}

impl Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.name)
    }
}

/// A directory of compilation artifacts, laid out as
/// `{root}/{source}/{name}.json`
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    /// The artifacts directory
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store reading from the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The path of the JSON artifact for the given contract
    pub fn artifact_path(&self, artifact: &ArtifactRef) -> PathBuf {
        self.root
            .join(artifact.source)
            .join(format!("{}.json", artifact.name))
    }

    /// Read the creation bytecode of the given contract
    pub fn bytecode(&self, artifact: &ArtifactRef) -> Result<Bytes, ScriptError> {
        let path = self.artifact_path(artifact);
        let contents = fs::read_to_string(&path)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;

        parse_bytecode(&contents, &path)
    }
}

/// Extract the creation bytecode from an artifact.
///
/// Hardhat stores it as `bytecode: "0x.."`, Foundry as `bytecode: { object: "0x.." }`.
fn parse_bytecode(contents: &str, path: &Path) -> Result<Bytes, ScriptError> {
    let artifact: Value = serde_json::from_str(contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;

    let hex = match &artifact["bytecode"] {
        Value::String(hex) => hex.as_str(),
        Value::Object(obj) => obj
            .get("object")
            .and_then(Value::as_str)
            .unwrap_or_default(),
        _ => "",
    };

    let bytecode = Bytes::from_str(hex)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;

    // Interfaces and abstract contracts compile to empty bytecode
    if bytecode.is_empty() {
        return Err(ScriptError::ArtifactParsing(format!(
            "{}: artifact has no creation bytecode",
            path.display()
        )));
    }

    Ok(bytecode)
}
