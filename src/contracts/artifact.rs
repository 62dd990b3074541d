use std::path::PathBuf;

use ethers::abi::Abi;
use ethers::types::Bytes;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("No artifact named {name} under {dir}")]
    NotFound { name: String, dir: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Compiled contract: ABI plus creation bytecode.
///
/// Accepts both Hardhat artifacts (`"bytecode": "0x..."`) and Foundry
/// artifacts (`"bytecode": { "object": "0x..." }`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub contract_name: String,
    pub abi: Abi,
    #[serde(default, deserialize_with = "deserialize_bytecode")]
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn from_json(name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let mut artifact: Artifact = serde_json::from_str(json)?;
        if artifact.contract_name.is_empty() {
            artifact.contract_name = name.to_string();
        }
        Ok(artifact)
    }

    /// Interfaces and abstract contracts compile to empty bytecode.
    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(Bytes),
    Object { object: Bytes },
}

fn deserialize_bytecode<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match BytecodeField::deserialize(deserializer)? {
        BytecodeField::Hex(bytes) => bytes,
        BytecodeField::Object { object } => object,
    })
}

/// Looks up artifacts by contract name below a build output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load `<name>.json`, searching the tree depth first.
    ///
    /// Hardhat nests artifacts as `contracts/<File>.sol/<Name>.json`; debug
    /// files (`<Name>.dbg.json`) never match because their stem differs.
    pub fn load(&self, name: &str) -> Result<Artifact, ArtifactError> {
        let path = self.find(name)?.ok_or_else(|| ArtifactError::NotFound {
            name: name.to_string(),
            dir: self.root.clone(),
        })?;

        tracing::debug!(path = %path.display(), "Loading artifact");

        let json = std::fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        Artifact::from_json(name, &json).map_err(|source| ArtifactError::Malformed { path, source })
    }

    fn find(&self, name: &str) -> Result<Option<PathBuf>, ArtifactError> {
        let file_name = format!("{}.json", name);
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(ArtifactError::Io { path: dir, source }),
            };

            let mut subdirs = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|source| ArtifactError::Io {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                if path.is_dir() {
                    subdirs.push(path);
                } else if entry.file_name().to_str() == Some(file_name.as_str()) {
                    return Ok(Some(path));
                }
            }
            // Sorted so that lookups are deterministic across filesystems.
            subdirs.sort();
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDHAT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "Store",
        "abi": [
            {"inputs": [{"name": "owner", "type": "address"}], "stateMutability": "nonpayable", "type": "constructor"},
            {"inputs": [], "name": "count", "outputs": [{"name": "", "type": "uint256"}], "stateMutability": "view", "type": "function"}
        ],
        "bytecode": "0x6080604052"
    }"#;

    const FOUNDRY: &str = r#"{
        "abi": [],
        "bytecode": {"object": "0x60806040", "linkReferences": {}}
    }"#;

    #[test]
    fn test_parse_hardhat() {
        let artifact = Artifact::from_json("Store", HARDHAT).unwrap();
        assert_eq!(artifact.contract_name, "Store");
        assert!(artifact.abi.constructor().is_some());
        assert!(artifact.abi.function("count").is_ok());
        assert_eq!(artifact.bytecode.to_vec(), vec![0x60, 0x80, 0x60, 0x40, 0x52]);
        assert!(artifact.is_deployable());
    }

    #[test]
    fn test_parse_foundry() {
        let artifact = Artifact::from_json("Empty", FOUNDRY).unwrap();
        assert_eq!(artifact.contract_name, "Empty");
        assert_eq!(artifact.bytecode.len(), 4);
    }

    #[test]
    fn test_interface_not_deployable() {
        let artifact = Artifact::from_json("IStore", r#"{"abi": [], "bytecode": "0x"}"#).unwrap();
        assert!(!artifact.is_deployable());

        let artifact = Artifact::from_json("IStore", r#"{"abi": []}"#).unwrap();
        assert!(!artifact.is_deployable());
    }

    #[test]
    fn test_store_finds_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("contracts").join("Store.sol");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("Store.json"), HARDHAT).unwrap();
        std::fs::write(nested.join("Store.dbg.json"), "{}").unwrap();

        let store = ArtifactStore::new(dir.path());
        let artifact = store.load("Store").unwrap();
        assert_eq!(artifact.contract_name, "Store");
    }

    #[test]
    fn test_store_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(store.load("Nope"), Err(ArtifactError::NotFound { .. })));

        let store = ArtifactStore::new(dir.path().join("does-not-exist"));
        assert!(matches!(store.load("Nope"), Err(ArtifactError::NotFound { .. })));
    }

    #[test]
    fn test_store_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.json"), "{\"abi\": 3}").unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(store.load("Broken"), Err(ArtifactError::Malformed { .. })));
    }
}
