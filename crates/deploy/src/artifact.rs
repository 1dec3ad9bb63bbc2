//! Compiled contract artifacts.
//!
//! Artifacts are read from a Hardhat `artifacts/` directory, where the artifact for
//! `contracts/Foo.sol:Foo` lives at `contracts/Foo.sol/Foo.json` next to a
//! `Foo.dbg.json` file pointing at the build-info holding the compiler input.

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use anyhow::Context;
use serde::Deserialize;

use crate::{ConstructorArg, DeployError};

/// Directory Hardhat writes build-info files to; never contains artifacts.
const BUILD_INFO_DIR: &str = "build-info";

/// On-disk layout of a Hardhat artifact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: String,
}

/// On-disk layout of a Hardhat `.dbg.json` file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatDebugFile {
    build_info: String,
}

/// Compiler metadata needed to verify an artifact's source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Full compiler version, e.g. `0.8.9+commit.e5eed63a`.
    pub solc_long_version: String,
    /// Standard JSON compiler input.
    pub input: serde_json::Value,
}

/// A compiled contract: ABI plus creation bytecode.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    /// Path of the artifact JSON file.
    pub path: PathBuf,
}

impl Artifact {
    /// Load an artifact from its JSON file.
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let invalid = |reason: String| DeployError::InvalidArtifact {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let raw: HardhatArtifact =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;

        let bytecode = hex::decode(raw.bytecode.trim_start_matches("0x")).map_err(|e| {
            invalid(format!(
                "bytecode is not valid hex ({e}); unlinked libraries are not supported"
            ))
        })?;

        Ok(Self {
            contract_name: raw.contract_name,
            source_name: raw.source_name,
            abi: raw.abi,
            bytecode: bytecode.into(),
            path: path.to_path_buf(),
        })
    }

    /// The `source.sol:Name` identifier explorers expect.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Whether the artifact carries creation code (interfaces and abstract contracts don't).
    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }

    /// ABI-encode constructor arguments after checking them against the declared signature.
    pub fn encode_constructor_args(&self, args: &[ConstructorArg]) -> Result<Bytes, DeployError> {
        let inputs = self
            .abi
            .constructor
            .as_ref()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default();

        let values = coerce_args(inputs, args, &format!("{} constructor", self.contract_name))?;
        Ok(DynSolValue::Tuple(values).abi_encode_params().into())
    }

    /// ABI-encode a call to `function`, selecting the overload whose arity matches `args`.
    pub fn encode_function_call(
        &self,
        function: &str,
        args: &[ConstructorArg],
    ) -> Result<Bytes, DeployError> {
        let overloads = self.abi.function(function).ok_or_else(|| {
            DeployError::InvalidArguments(format!(
                "{} has no function named `{function}`",
                self.contract_name
            ))
        })?;

        let func = overloads
            .iter()
            .find(|f| f.inputs.len() == args.len())
            .ok_or_else(|| {
                DeployError::InvalidArguments(format!(
                    "{}.{function} takes {} arguments, got {}",
                    self.contract_name,
                    overloads
                        .iter()
                        .map(|f| f.inputs.len().to_string())
                        .collect::<Vec<_>>()
                        .join(" or "),
                    args.len()
                ))
            })?;

        let values = coerce_args(&func.inputs, args, &format!("{}.{function}", self.contract_name))?;
        func.abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| DeployError::InvalidArguments(e.to_string()))
    }

    /// Creation bytecode followed by the encoded constructor arguments.
    pub fn creation_code(&self, encoded_args: &[u8]) -> Bytes {
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(encoded_args);
        code.into()
    }

    /// Load the build-info referenced by the artifact's `.dbg.json` file.
    pub fn build_info(&self) -> anyhow::Result<BuildInfo> {
        let dbg_path = self.path.with_extension("dbg.json");
        let dbg_content = std::fs::read_to_string(&dbg_path)
            .with_context(|| format!("Failed to read {}", dbg_path.display()))?;
        let dbg: HardhatDebugFile = serde_json::from_str(&dbg_content)
            .with_context(|| format!("Failed to parse {}", dbg_path.display()))?;

        let build_info_path = dbg_path
            .parent()
            .context("Debug file path must have a parent directory")?
            .join(dbg.build_info);

        let content = std::fs::read_to_string(&build_info_path)
            .with_context(|| format!("Failed to read {}", build_info_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build info {}", build_info_path.display()))
    }
}

/// Check arity and types of `args` against `params` and convert them to ABI values.
fn coerce_args(
    params: &[Param],
    args: &[ConstructorArg],
    what: &str,
) -> Result<Vec<DynSolValue>, DeployError> {
    if params.len() != args.len() {
        return Err(DeployError::InvalidArguments(format!(
            "{what} takes {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }

    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            let ty_name = param.selector_type();
            let ty = DynSolType::parse(&ty_name).map_err(|e| {
                DeployError::InvalidArguments(format!("{what}: unsupported type `{ty_name}`: {e}"))
            })?;

            coerce_arg(&ty, arg).map_err(|reason| {
                DeployError::InvalidArguments(format!(
                    "{what}: argument {i} (`{}`) expects {ty_name}, got `{arg}`: {reason}",
                    param.name
                ))
            })
        })
        .collect()
}

fn coerce_arg(ty: &DynSolType, arg: &ConstructorArg) -> Result<DynSolValue, String> {
    match (ty, arg) {
        (DynSolType::Bool, ConstructorArg::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (DynSolType::Uint(_) | DynSolType::Int(_), ConstructorArg::Uint(n)) => {
            ty.coerce_str(&n.to_string()).map_err(|e| e.to_string())
        }
        (DynSolType::Uint(_) | DynSolType::Int(_), ConstructorArg::Int(n)) => {
            ty.coerce_str(&n.to_string()).map_err(|e| e.to_string())
        }
        (_, ConstructorArg::String(s)) => ty.coerce_str(s).map_err(|e| e.to_string()),
        _ => Err("type mismatch".to_string()),
    }
}

/// Looks up artifacts by contract name under a Hardhat artifacts directory.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    root: PathBuf,
}

impl ArtifactRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a deployable artifact.
    ///
    /// `artifact_path` may be a fully qualified `source.sol:Name`; without it the
    /// artifacts directory is searched for a unique artifact named `contract_name`.
    pub fn resolve(
        &self,
        contract_name: &str,
        artifact_path: Option<&str>,
    ) -> Result<Artifact, DeployError> {
        let qualified = artifact_path.or_else(|| contract_name.contains(':').then_some(contract_name));

        let path = match qualified {
            Some(qualified) => self.qualified_path(contract_name, qualified)?,
            None => self.search(contract_name)?,
        };

        let artifact = Artifact::load(&path)?;
        if !artifact.is_deployable() {
            return Err(DeployError::InvalidArtifact {
                path,
                reason: "no creation bytecode (abstract contract or interface)".to_string(),
            });
        }

        tracing::debug!(
            contract = %artifact.fully_qualified_name(),
            path = %artifact.path.display(),
            "Resolved artifact"
        );

        Ok(artifact)
    }

    fn qualified_path(&self, contract_name: &str, qualified: &str) -> Result<PathBuf, DeployError> {
        let unknown = || DeployError::UnknownArtifact {
            name: qualified.to_string(),
        };

        let (source, name) = qualified.rsplit_once(':').ok_or_else(unknown)?;
        let requested = contract_name.rsplit(':').next().unwrap_or(contract_name);
        if name != requested {
            return Err(unknown());
        }

        let path = self.root.join(source).join(format!("{name}.json"));
        if !path.is_file() {
            return Err(unknown());
        }

        Ok(path)
    }

    fn search(&self, contract_name: &str) -> Result<PathBuf, DeployError> {
        let file_name = format!("{contract_name}.json");
        let mut matches = Vec::new();
        collect_files(&self.root, &file_name, &mut matches).map_err(|e| {
            DeployError::InvalidArtifact {
                path: self.root.clone(),
                reason: format!("{e:#}"),
            }
        })?;

        match matches.len() {
            0 => Err(DeployError::UnknownArtifact {
                name: contract_name.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(DeployError::InvalidArtifact {
                path: self.root.clone(),
                reason: format!(
                    "multiple artifacts named {contract_name}, use a fully qualified name: {}",
                    matches
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        }
    }
}

fn collect_files(dir: &Path, file_name: &str, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read artifacts directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == BUILD_INFO_DIR) {
                continue;
            }
            collect_files(&path, file_name, out)?;
        } else if path.file_name().is_some_and(|n| n == file_name) {
            out.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempdir::TempDir;

    pub(crate) const ORACLE: &str = "0xd0D5e3DB44DE05E9F294BB0a3bEEaF030DE24Ada";
    pub(crate) const OPERATOR: &str = "0x024D3242650d6c7b0ee6DE408E33E803dbfb00Ea";

    /// Write a minimal Hardhat artifact (plus debug file and build-info) for tests.
    pub(crate) fn write_artifact(root: &Path, source: &str, name: &str, abi: serde_json::Value) {
        let dir = root.join(source);
        std::fs::create_dir_all(&dir).unwrap();
        let artifact = serde_json::json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": source,
            "abi": abi,
            "bytecode": "0x6080604052348015600f57600080fd5b50",
            "deployedBytecode": "0x6080604052",
            "linkReferences": {},
            "deployedLinkReferences": {}
        });
        std::fs::write(dir.join(format!("{name}.json")), artifact.to_string()).unwrap();

        let depth = source.split('/').count();
        let build_info = format!("{}build-info/abc123.json", "../".repeat(depth));
        std::fs::write(
            dir.join(format!("{name}.dbg.json")),
            serde_json::json!({ "_format": "hh-sol-dbg-1", "buildInfo": build_info }).to_string(),
        )
        .unwrap();

        std::fs::create_dir_all(root.join("build-info")).unwrap();
        std::fs::write(
            root.join("build-info/abc123.json"),
            serde_json::json!({
                "id": "abc123",
                "solcVersion": "0.8.9",
                "solcLongVersion": "0.8.9+commit.e5eed63a",
                "input": { "language": "Solidity", "sources": {} }
            })
            .to_string(),
        )
        .unwrap();
    }

    pub(crate) fn market_abi() -> serde_json::Value {
        serde_json::json!([
            {
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "_oracle", "type": "address", "internalType": "address" },
                    { "name": "_operator", "type": "address", "internalType": "address" }
                ]
            },
            {
                "type": "function",
                "name": "initialize",
                "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "_oracle", "type": "address", "internalType": "address" },
                    { "name": "_operator", "type": "address", "internalType": "address" }
                ],
                "outputs": []
            }
        ])
    }

    fn registry() -> (TempDir, ArtifactRegistry) {
        let dir = TempDir::new("shipwright-artifacts").expect("Failed to create temp dir");
        write_artifact(dir.path(), "contracts/PredictionMarket.sol", "PredictionMarket", market_abi());
        let registry = ArtifactRegistry::new(dir.path());
        (dir, registry)
    }

    #[test]
    fn test_resolve_by_name() {
        let (_dir, registry) = registry();
        let artifact = registry.resolve("PredictionMarket", None).unwrap();
        assert_eq!(
            artifact.fully_qualified_name(),
            "contracts/PredictionMarket.sol:PredictionMarket"
        );
        assert!(artifact.is_deployable());
    }

    #[test]
    fn test_resolve_qualified() {
        let (_dir, registry) = registry();
        let artifact = registry
            .resolve(
                "PredictionMarket",
                Some("contracts/PredictionMarket.sol:PredictionMarket"),
            )
            .unwrap();
        assert_eq!(artifact.contract_name, "PredictionMarket");
    }

    #[test]
    fn test_resolve_unknown() {
        let (_dir, registry) = registry();
        let err = registry.resolve("Staking", None).unwrap_err();
        assert!(matches!(err, DeployError::UnknownArtifact { .. }));

        let err = registry
            .resolve("Staking", Some("contracts/PredictionMarket.sol:PredictionMarket"))
            .unwrap_err();
        assert!(matches!(err, DeployError::UnknownArtifact { .. }));
    }

    #[test]
    fn test_resolve_ambiguous_name() {
        let (dir, registry) = registry();
        write_artifact(dir.path(), "contracts/v2/PredictionMarket.sol", "PredictionMarket", market_abi());
        let err = registry.resolve("PredictionMarket", None).unwrap_err();
        assert!(matches!(err, DeployError::InvalidArtifact { .. }));
    }

    #[test]
    fn test_encode_constructor_args() {
        let (_dir, registry) = registry();
        let artifact = registry.resolve("PredictionMarket", None).unwrap();
        let encoded = artifact
            .encode_constructor_args(&[ORACLE.into(), OPERATOR.into()])
            .unwrap();

        assert_eq!(encoded.len(), 64);
        assert_eq!(
            hex::encode(&encoded[..32]),
            "000000000000000000000000d0d5e3db44de05e9f294bb0a3beeaf030de24ada"
        );
    }

    #[test]
    fn test_constructor_arity_mismatch() {
        let (_dir, registry) = registry();
        let artifact = registry.resolve("PredictionMarket", None).unwrap();
        let err = artifact.encode_constructor_args(&[ORACLE.into()]).unwrap_err();
        assert!(matches!(err, DeployError::InvalidArguments(_)));
    }

    #[test]
    fn test_constructor_type_mismatch() {
        let (_dir, registry) = registry();
        let artifact = registry.resolve("PredictionMarket", None).unwrap();

        let err = artifact
            .encode_constructor_args(&[ORACLE.into(), ConstructorArg::Uint(5)])
            .unwrap_err();
        assert!(matches!(err, DeployError::InvalidArguments(_)));

        let err = artifact
            .encode_constructor_args(&[ORACLE.into(), "not-an-address".into()])
            .unwrap_err();
        assert!(matches!(err, DeployError::InvalidArguments(_)));
    }

    #[test]
    fn test_signed_integer_args() {
        let (dir, registry) = registry();
        write_artifact(
            dir.path(),
            "contracts/Bounds.sol",
            "Bounds",
            serde_json::json!([{
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "_floor", "type": "int256", "internalType": "int256" },
                    { "name": "_cap", "type": "uint256", "internalType": "uint256" }
                ]
            }]),
        );
        let artifact = registry.resolve("Bounds", None).unwrap();

        let encoded = artifact
            .encode_constructor_args(&[ConstructorArg::Int(-1), ConstructorArg::Uint(7)])
            .unwrap();
        assert_eq!(hex::encode(&encoded[..32]), "ff".repeat(32));
        assert_eq!(encoded[63], 7);

        // A negative value never fits an unsigned parameter.
        let err = artifact
            .encode_constructor_args(&[ConstructorArg::Int(-1), ConstructorArg::Int(-7)])
            .unwrap_err();
        assert!(matches!(err, DeployError::InvalidArguments(_)));
    }

    #[test]
    fn test_encode_initializer_call() {
        let (_dir, registry) = registry();
        let artifact = registry.resolve("PredictionMarket", None).unwrap();
        let calldata = artifact
            .encode_function_call("initialize", &[ORACLE.into(), OPERATOR.into()])
            .unwrap();

        // selector + two words
        assert_eq!(calldata.len(), 4 + 64);

        let err = artifact
            .encode_function_call("initialise", &[ORACLE.into(), OPERATOR.into()])
            .unwrap_err();
        assert!(matches!(err, DeployError::InvalidArguments(_)));
    }

    #[test]
    fn test_creation_code_appends_args() {
        let (_dir, registry) = registry();
        let artifact = registry.resolve("PredictionMarket", None).unwrap();
        let args = artifact
            .encode_constructor_args(&[ORACLE.into(), OPERATOR.into()])
            .unwrap();
        let code = artifact.creation_code(&args);
        assert_eq!(code.len(), artifact.bytecode.len() + 64);
        assert!(code.starts_with(&artifact.bytecode));
    }

    #[test]
    fn test_build_info() {
        let (_dir, registry) = registry();
        let artifact = registry.resolve("PredictionMarket", None).unwrap();
        let build_info = artifact.build_info().unwrap();
        assert_eq!(build_info.solc_long_version, "0.8.9+commit.e5eed63a");
        assert_eq!(build_info.input["language"], "Solidity");
    }

    #[test]
    fn test_interface_is_not_deployable() {
        let dir = TempDir::new("shipwright-artifacts").expect("Failed to create temp dir");
        let path = dir.path().join("contracts/IOracle.sol");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(
            path.join("IOracle.json"),
            serde_json::json!({
                "contractName": "IOracle",
                "sourceName": "contracts/IOracle.sol",
                "abi": [],
                "bytecode": "0x"
            })
            .to_string(),
        )
        .unwrap();

        let err = ArtifactRegistry::new(dir.path())
            .resolve("IOracle", None)
            .unwrap_err();
        assert!(matches!(err, DeployError::InvalidArtifact { .. }));
    }
}
