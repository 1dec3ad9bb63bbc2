//! Hardhat artifact fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;

use anyhow::Result;
use serde_json::{Value, json};

pub const ORACLE: &str = "0xd0D5e3DB44DE05E9F294BB0a3bEEaF030DE24Ada";
pub const OPERATOR: &str = "0x024D3242650d6c7b0ee6DE408E33E803dbfb00Ea";

fn address_inputs() -> Value {
    json!([
        { "name": "_oracle", "type": "address", "internalType": "address" },
        { "name": "_operator", "type": "address", "internalType": "address" }
    ])
}

fn initializer() -> Value {
    json!({
        "type": "function",
        "name": "initialize",
        "stateMutability": "nonpayable",
        "inputs": address_inputs(),
        "outputs": []
    })
}

pub fn write_artifact(root: &Path, source: &str, name: &str, abi: Value) -> Result<()> {
    let dir = root.join(source);
    std::fs::create_dir_all(&dir)?;

    let artifact = json!({
        "_format": "hh-sol-artifact-1",
        "contractName": name,
        "sourceName": source,
        "abi": abi,
        "bytecode": "0x6080604052348015600f57600080fd5b50",
        "deployedBytecode": "0x6080604052",
        "linkReferences": {},
        "deployedLinkReferences": {}
    });
    std::fs::write(dir.join(format!("{name}.json")), artifact.to_string())?;

    let build_info = format!("{}build-info/f00d.json", "../".repeat(source.split('/').count()));
    std::fs::write(
        dir.join(format!("{name}.dbg.json")),
        json!({ "_format": "hh-sol-dbg-1", "buildInfo": build_info }).to_string(),
    )?;

    std::fs::create_dir_all(root.join("build-info"))?;
    std::fs::write(
        root.join("build-info/f00d.json"),
        json!({
            "solcLongVersion": "0.8.9+commit.e5eed63a",
            "input": { "language": "Solidity", "sources": {} }
        })
        .to_string(),
    )?;

    Ok(())
}

pub fn write_artifacts(root: &Path) -> Result<()> {
    write_artifact(
        root,
        "contracts/PredictionMarket.sol",
        "PredictionMarket",
        json!([
            { "type": "constructor", "stateMutability": "nonpayable", "inputs": address_inputs() },
            initializer()
        ]),
    )?;
    write_artifact(
        root,
        "contracts/PredictionMarketUpgradeable.sol",
        "PredictionMarketUpgradeable",
        json!([initializer()]),
    )?;
    write_artifact(
        root,
        "contracts/PredictionMarketV2.sol",
        "PredictionMarketV2",
        json!([initializer()]),
    )?;
    write_artifact(
        root,
        "@openzeppelin/contracts/proxy/ERC1967/ERC1967Proxy.sol",
        "ERC1967Proxy",
        json!([{
            "type": "constructor",
            "stateMutability": "payable",
            "inputs": [
                { "name": "_logic", "type": "address", "internalType": "address" },
                { "name": "_data", "type": "bytes", "internalType": "bytes" }
            ]
        }]),
    )?;
    Ok(())
}
